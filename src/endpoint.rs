use std::fmt;

/// Whether a MIDI port is backed by hardware or synthesized in software
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PortClass {
    Physical,
    Virtual,
}

impl fmt::Display for PortClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PortClass::Physical => write!(f, "physical"),
            PortClass::Virtual => write!(f, "virtual"),
        }
    }
}

/// Which slice of the MIDI catalog the UI is showing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PortFilter {
    #[default]
    All,
    Physical,
    Virtual,
}

impl PortFilter {
    pub fn next(self) -> Self {
        match self {
            PortFilter::All => PortFilter::Physical,
            PortFilter::Physical => PortFilter::Virtual,
            PortFilter::Virtual => PortFilter::All,
        }
    }
}

impl fmt::Display for PortFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PortFilter::All => write!(f, "all"),
            PortFilter::Physical => write!(f, "physical"),
            PortFilter::Virtual => write!(f, "virtual"),
        }
    }
}

/// An HID device as reported by one enumeration.
///
/// `path` is the stable identifier; everything else is display metadata.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HidDescriptor {
    pub path: String,
    pub vendor_id: u16,
    pub product_id: u16,
    pub manufacturer: Option<String>,
    pub product: Option<String>,
    pub serial_number: Option<String>,
    pub usage_page: u16,
    pub usage: u16,
    pub interface_number: i32,
}

impl HidDescriptor {
    #[cfg(test)]
    pub fn new(path: impl Into<String>, vendor_id: u16, product_id: u16) -> Self {
        Self {
            path: path.into(),
            vendor_id,
            product_id,
            manufacturer: None,
            product: None,
            serial_number: None,
            usage_page: 0,
            usage: 0,
            interface_number: -1,
        }
    }

    #[cfg(test)]
    pub fn with_strings(mut self, manufacturer: &str, product: &str) -> Self {
        self.manufacturer = Some(manufacturer.to_string());
        self.product = Some(product.to_string());
        self
    }

    /// "Manufacturer Product (vvvv:pppp)", with "Unknown" for missing strings
    pub fn display_name(&self) -> String {
        format!(
            "{} {} ({:04x}:{:04x})",
            self.manufacturer.as_deref().unwrap_or("Unknown"),
            self.product.as_deref().unwrap_or("Unknown"),
            self.vendor_id,
            self.product_id
        )
    }

    /// Usage, interface and serial, for telling apart the collections of
    /// one physical device
    pub fn details(&self) -> String {
        let mut details = format!("usage {:04x}:{:04x}", self.usage_page, self.usage);
        if self.interface_number >= 0 {
            details.push_str(&format!(", interface {}", self.interface_number));
        }
        if let Some(serial) = self.serial_number.as_deref().filter(|s| !s.is_empty()) {
            details.push_str(&format!(", serial {}", serial));
        }
        details
    }
}

impl fmt::Display for HidDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

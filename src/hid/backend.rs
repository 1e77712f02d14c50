use crate::endpoint::HidDescriptor;
use crate::error::SessionError;
use hidapi::HidApi;
use std::ffi::CString;

/// An open HID device. Dropping it closes the handle.
pub trait HidDevice: Send {
    /// Reads one input report, waiting at most `timeout_ms`.
    /// `Ok(0)` means nothing arrived in time.
    fn read_timeout(&self, buf: &mut [u8], timeout_ms: i32) -> Result<usize, SessionError>;
}

/// The HID subsystem as seen by the session.
///
/// The production implementation is [`HidapiBackend`]; tests use `hid::mock`.
pub trait HidBackend {
    fn enumerate(&mut self) -> Result<Vec<HidDescriptor>, SessionError>;

    fn open(&mut self, descriptor: &HidDescriptor) -> Result<Box<dyn HidDevice>, SessionError>;
}

/// [`HidBackend`] on top of hidapi.
///
/// hidapi allows a single context per process, so it is created on first use
/// and refreshed on every later enumeration.
#[derive(Default)]
pub struct HidapiBackend {
    api: Option<HidApi>,
}

impl HidapiBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn api(&mut self) -> Result<&mut HidApi, SessionError> {
        if self.api.is_none() {
            let api = HidApi::new().map_err(|e| SessionError::open_failed("HID subsystem", e))?;
            self.api = Some(api);
        }
        self.api
            .as_mut()
            .ok_or_else(|| SessionError::open_failed("HID subsystem", "not initialized"))
    }
}

impl HidBackend for HidapiBackend {
    fn enumerate(&mut self) -> Result<Vec<HidDescriptor>, SessionError> {
        let api = self.api()?;
        api.refresh_devices()
            .map_err(|e| SessionError::open_failed("HID subsystem", e))?;

        Ok(api
            .device_list()
            .map(|info| HidDescriptor {
                path: info.path().to_string_lossy().into_owned(),
                vendor_id: info.vendor_id(),
                product_id: info.product_id(),
                manufacturer: info.manufacturer_string().map(str::to_string),
                product: info.product_string().map(str::to_string),
                serial_number: info.serial_number().map(str::to_string),
                usage_page: info.usage_page(),
                usage: info.usage(),
                interface_number: info.interface_number(),
            })
            .collect())
    }

    fn open(&mut self, descriptor: &HidDescriptor) -> Result<Box<dyn HidDevice>, SessionError> {
        let path = CString::new(descriptor.path.as_str())
            .map_err(|_| SessionError::EndpointNotFound(descriptor.path.clone()))?;
        let device = self
            .api()?
            .open_path(&path)
            .map_err(|e| SessionError::open_failed(descriptor.display_name(), e))?;

        Ok(Box::new(HidapiDevice {
            device,
            path: descriptor.path.clone(),
        }))
    }
}

struct HidapiDevice {
    device: hidapi::HidDevice,
    path: String,
}

impl HidDevice for HidapiDevice {
    fn read_timeout(&self, buf: &mut [u8], timeout_ms: i32) -> Result<usize, SessionError> {
        self.device
            .read_timeout(buf, timeout_ms)
            .map_err(|e| SessionError::read_failed(self.path.as_str(), e))
    }
}

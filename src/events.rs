use chrono::{DateTime, Local};
use std::fmt;

/// Which subsystem produced an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    Midi,
    Hid,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceKind::Midi => write!(f, "MIDI"),
            SourceKind::Hid => write!(f, "HID"),
        }
    }
}

/// One captured chunk of device traffic, ready for display
#[derive(Debug, Clone, PartialEq)]
pub struct EventRecord {
    pub kind: SourceKind,
    /// Port name for MIDI, display name for HID
    pub endpoint: String,
    pub bytes: Vec<u8>,
    pub captured_at: DateTime<Local>,
    /// Timestamp in microseconds as reported by the MIDI subsystem
    pub device_timestamp_us: Option<u64>,
    pub description: Option<String>,
}

impl EventRecord {
    pub fn hex(&self) -> String {
        self.bytes
            .iter()
            .map(|b| format!("{:02X}", b))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Renders the record as one line of the monitor display
    pub fn display_line(&self, show_timestamp: bool) -> String {
        let mut line = String::new();
        if show_timestamp {
            line.push_str(&format!("[{}] ", self.captured_at.format("%H:%M:%S%.3f")));
            if let Some(us) = self.device_timestamp_us {
                line.push_str(&format!("({:.3} ms) ", us as f64 / 1000.0));
            }
        }
        line.push_str(&format!("{} [{}]: {}", self.kind, self.endpoint, self.hex()));
        if let Some(description) = &self.description {
            line.push_str(" - ");
            line.push_str(description);
        }
        line
    }
}

/// Everything that flows from the listeners to the UI
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// Device traffic
    Record(EventRecord),

    /// An HID poll thread stopped on its own after an I/O error
    ListenerExited {
        path: String,
        name: String,
        reason: String,
    },
}

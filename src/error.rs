use thiserror::Error;

/// Errors returned by the MIDI and HID sessions.
///
/// None of these are fatal to the process; the UI reports them and carries on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// Name or path absent from the current enumeration
    #[error("endpoint not found: {0}")]
    EndpointNotFound(String),

    /// Driver or permission error while opening a handle
    #[error("failed to open {endpoint}: {reason}")]
    OpenFailed { endpoint: String, reason: String },

    /// I/O error on an open connection
    #[error("read failed on {endpoint}: {reason}")]
    ReadFailed { endpoint: String, reason: String },

    /// Write to an opened output port rejected by the driver
    #[error("send failed on {endpoint}: {reason}")]
    SendFailed { endpoint: String, reason: String },

    /// Virtual ports requested where the MIDI subsystem has none
    #[error("not supported on this platform: {0}")]
    UnsupportedPlatform(String),
}

impl SessionError {
    pub fn open_failed(endpoint: impl Into<String>, reason: impl ToString) -> Self {
        SessionError::OpenFailed {
            endpoint: endpoint.into(),
            reason: reason.to_string(),
        }
    }

    pub fn send_failed(endpoint: impl Into<String>, reason: impl ToString) -> Self {
        SessionError::SendFailed {
            endpoint: endpoint.into(),
            reason: reason.to_string(),
        }
    }

    pub fn read_failed(endpoint: impl Into<String>, reason: impl ToString) -> Self {
        SessionError::ReadFailed {
            endpoint: endpoint.into(),
            reason: reason.to_string(),
        }
    }
}

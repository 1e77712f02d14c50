use crate::aggregator::Aggregator;
use crate::catalog;
use crate::endpoint::HidDescriptor;
use crate::error::SessionError;
use crate::hid::backend::HidBackend;
use crate::hid::listener::{PollSettings, PollThread};
use crate::source::Registry;

/// Owns every open HID device and its poll thread, keyed by device path
pub struct HidSession {
    backend: Box<dyn HidBackend>,
    aggregator: Aggregator,
    settings: PollSettings,
    connections: Registry<PollThread>,
}

impl HidSession {
    pub fn new(backend: Box<dyn HidBackend>, aggregator: Aggregator, settings: PollSettings) -> Self {
        Self {
            backend,
            aggregator,
            settings,
            connections: Registry::new(),
        }
    }

    pub fn list_devices(&mut self) -> Vec<HidDescriptor> {
        catalog::list_hid_devices(self.backend.as_mut())
    }

    /// True while the device's poll thread is running
    pub fn is_connected(&self, path: &str) -> bool {
        self.connections.is_live(path)
    }

    pub fn connected_paths(&self) -> Vec<String> {
        self.connections.ids()
    }

    /// Opens the device and starts its poll thread.
    /// A stale entry left by a thread that stopped on its own is replaced.
    pub fn connect(&mut self, descriptor: &HidDescriptor) -> Result<(), SessionError> {
        if self.connections.is_live(&descriptor.path) {
            return Ok(());
        }

        let device = self.backend.open(descriptor)?;
        let listener = PollThread::spawn(descriptor, device, self.aggregator.clone(), self.settings)?;
        self.connections
            .insert(descriptor.path.clone(), Box::new(listener));

        log::info!("connected to HID device {}", descriptor.display_name());
        Ok(())
    }

    /// Stops the poll thread and closes the device.
    /// Returns false if nothing was connected at `path`.
    pub fn disconnect(&mut self, path: &str) -> bool {
        match self.connections.stop(path) {
            None => false,
            Some(Ok(())) => {
                log::info!("disconnected from HID device {}", path);
                true
            }
            Some(Err(e)) => {
                log::warn!("error disconnecting from HID device {}: {}", path, e);
                true
            }
        }
    }

    /// Drops entries whose poll thread stopped after a device error
    pub fn reap(&mut self) -> Vec<String> {
        let reaped = self.connections.reap();
        for path in &reaped {
            log::info!("removed stale HID connection {}", path);
        }
        reaped
    }

    /// Disconnects every device. Never fails.
    pub fn close_all(&mut self) -> usize {
        let count = self.connections.stop_all();
        if count > 0 {
            log::info!("closed {} HID connection(s)", count);
        }
        count
    }
}

use crate::events::{EventRecord, SessionEvent, SourceKind};
use crate::midi::decode::describe;
use chrono::Local;
use crossbeam::channel::Sender;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Funnel shared by every listener.
///
/// Each raw event becomes exactly one [`EventRecord`], built and sent on the
/// caller's own thread. Nothing is buffered or reordered here, so ordering is
/// only FIFO per listener.
#[derive(Clone)]
pub struct Aggregator {
    event_tx: Sender<SessionEvent>,
    interpret_midi: Arc<AtomicBool>,
}

impl Aggregator {
    pub fn new(event_tx: Sender<SessionEvent>, interpret_midi: bool) -> Self {
        Self {
            event_tx,
            interpret_midi: Arc::new(AtomicBool::new(interpret_midi)),
        }
    }

    pub fn set_interpret_midi(&self, enabled: bool) {
        self.interpret_midi.store(enabled, Ordering::Relaxed);
    }

    pub fn interpret_midi(&self) -> bool {
        self.interpret_midi.load(Ordering::Relaxed)
    }

    /// Called from a MIDI subsystem callback thread
    pub fn midi(&self, port_name: &str, bytes: &[u8], timestamp_us: u64) {
        let description = if self.interpret_midi() {
            describe(bytes)
        } else {
            None
        };
        self.publish(SessionEvent::Record(EventRecord {
            kind: SourceKind::Midi,
            endpoint: port_name.to_string(),
            bytes: bytes.to_vec(),
            captured_at: Local::now(),
            device_timestamp_us: Some(timestamp_us),
            description,
        }));
    }

    /// Called from an HID poll thread
    pub fn hid(&self, display_name: &str, bytes: &[u8]) {
        self.publish(SessionEvent::Record(EventRecord {
            kind: SourceKind::Hid,
            endpoint: display_name.to_string(),
            bytes: bytes.to_vec(),
            captured_at: Local::now(),
            device_timestamp_us: None,
            description: None,
        }));
    }

    pub fn listener_exited(&self, path: &str, name: &str, reason: &str) {
        self.publish(SessionEvent::ListenerExited {
            path: path.to_string(),
            name: name.to_string(),
            reason: reason.to_string(),
        });
    }

    fn publish(&self, event: SessionEvent) {
        // The receiver only goes away during shutdown
        if self.event_tx.send(event).is_err() {
            log::trace!("event dropped, monitor is gone");
        }
    }
}

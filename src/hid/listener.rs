//! One poll thread per open HID device.
//!
//! Teardown is cooperative: the thread checks a cancellation flag once per
//! poll interval. [`PollThread::shutdown`] waits a bounded time for it and
//! abandons it after that, so disconnect never hangs the caller but also does
//! not guarantee the thread is gone when it returns.

use crate::aggregator::Aggregator;
use crate::endpoint::HidDescriptor;
use crate::error::SessionError;
use crate::events::SourceKind;
use crate::hid::backend::HidDevice;
use crate::source::EventSource;
use crossbeam::channel::{bounded, Receiver, RecvTimeoutError, Sender};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Shared between the session and the poll thread so either side can close
/// the device. `None` means closed.
type DeviceSlot = Arc<Mutex<Option<Box<dyn HidDevice>>>>;

fn lock_slot(slot: &DeviceSlot) -> MutexGuard<'_, Option<Box<dyn HidDevice>>> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    pub poll_interval: Duration,
    pub join_timeout: Duration,
    pub read_buffer_len: usize,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(100),
            join_timeout: Duration::from_secs(1),
            read_buffer_len: 64,
        }
    }
}

pub struct PollThread {
    path: String,
    slot: DeviceSlot,
    cancel: Arc<AtomicBool>,
    finished: Arc<AtomicBool>,
    // Disconnects when the thread exits
    done_rx: Receiver<()>,
    handle: Option<JoinHandle<()>>,
    join_timeout: Duration,
}

struct PollContext {
    path: String,
    name: String,
    slot: DeviceSlot,
    cancel: Arc<AtomicBool>,
    finished: Arc<AtomicBool>,
    aggregator: Aggregator,
    settings: PollSettings,
    _done_tx: Sender<()>,
}

impl PollThread {
    /// Takes ownership of `device` and starts polling it
    pub fn spawn(
        descriptor: &HidDescriptor,
        device: Box<dyn HidDevice>,
        aggregator: Aggregator,
        settings: PollSettings,
    ) -> Result<Self, SessionError> {
        let slot: DeviceSlot = Arc::new(Mutex::new(Some(device)));
        let cancel = Arc::new(AtomicBool::new(false));
        let finished = Arc::new(AtomicBool::new(false));
        let (done_tx, done_rx) = bounded(0);

        let context = PollContext {
            path: descriptor.path.clone(),
            name: descriptor.display_name(),
            slot: Arc::clone(&slot),
            cancel: Arc::clone(&cancel),
            finished: Arc::clone(&finished),
            aggregator,
            settings,
            _done_tx: done_tx,
        };

        let handle = thread::Builder::new()
            .name(format!("hid-poll {}", descriptor.path))
            .spawn(move || poll_loop(context))
            .map_err(|e| SessionError::open_failed(descriptor.display_name(), e))?;

        Ok(Self {
            path: descriptor.path.clone(),
            slot,
            cancel,
            finished,
            done_rx,
            handle: Some(handle),
            join_timeout: settings.join_timeout,
        })
    }

    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Acquire)
    }

    /// Cancels the thread, closes the device and waits up to the join timeout
    pub fn shutdown(mut self) -> Result<(), SessionError> {
        self.cancel.store(true, Ordering::Release);

        // If the thread is mid-read it holds the lock and closes the device
        // itself on the way out.
        if let Ok(mut device) = self.slot.try_lock() {
            device.take();
        }

        match self.done_rx.recv_timeout(self.join_timeout) {
            Err(RecvTimeoutError::Timeout) => {
                log::warn!(
                    "HID poll thread for {} did not stop within {:?}, abandoning it",
                    self.path,
                    self.join_timeout
                );
                self.handle.take();
            }
            _ => {
                if let Some(handle) = self.handle.take() {
                    if handle.join().is_err() {
                        return Err(SessionError::read_failed(self.path.as_str(), "poll thread panicked"));
                    }
                }
            }
        }
        Ok(())
    }
}

impl EventSource for PollThread {
    fn kind(&self) -> SourceKind {
        SourceKind::Hid
    }

    fn is_alive(&self) -> bool {
        !self.is_finished()
    }

    fn stop(self: Box<Self>) -> Result<(), SessionError> {
        (*self).shutdown()
    }
}

fn poll_loop(context: PollContext) {
    let timeout_ms = i32::try_from(context.settings.poll_interval.as_millis()).unwrap_or(i32::MAX);
    let mut buf = vec![0u8; context.settings.read_buffer_len];

    let failure = loop {
        if context.cancel.load(Ordering::Acquire) {
            break None;
        }

        let read = {
            let device = lock_slot(&context.slot);
            match device.as_ref() {
                Some(device) => device.read_timeout(&mut buf, timeout_ms),
                None => break None,
            }
        };

        match read {
            Ok(0) => continue,
            Ok(n) => {
                if context.cancel.load(Ordering::Acquire) {
                    break None;
                }
                context.aggregator.hid(&context.name, &buf[..n.min(buf.len())]);
            }
            Err(e) => break Some(e),
        }
    };

    // Close before reporting so a reconnect can reopen the device
    lock_slot(&context.slot).take();
    context.finished.store(true, Ordering::Release);

    match failure {
        Some(e) => {
            log::warn!("HID device {} stopped: {}", context.name, e);
            context
                .aggregator
                .listener_exited(&context.path, &context.name, &e.to_string());
        }
        None => log::debug!("HID poll thread for {} cancelled", context.name),
    }
}

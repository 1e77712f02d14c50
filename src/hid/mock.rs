//! Scriptable [`HidBackend`] for unit tests.
//!
//! Every device added to the backend gets a [`MockHidFeed`] through which the
//! test pushes reports, faults and stalls into the poll thread.

use crate::endpoint::HidDescriptor;
use crate::error::SessionError;
use crate::hid::backend::{HidBackend, HidDevice};
use crossbeam::channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub enum MockRead {
    Report(Vec<u8>),
    /// Simulates the device being unplugged
    Fail,
    /// Blocks the read for longer than the poll timeout
    Stall(Duration),
    /// A report that only completes after blocking for a while
    Delayed(Duration, Vec<u8>),
}

#[derive(Clone)]
struct FeedState {
    rx: Receiver<MockRead>,
    closed: Arc<AtomicBool>,
    opens: Arc<AtomicUsize>,
}

/// Test-side handle to one fake device
pub struct MockHidFeed {
    tx: Sender<MockRead>,
    state: FeedState,
}

impl MockHidFeed {
    pub fn report(&self, bytes: &[u8]) {
        let _ = self.tx.send(MockRead::Report(bytes.to_vec()));
    }

    pub fn fail(&self) {
        let _ = self.tx.send(MockRead::Fail);
    }

    pub fn stall(&self, duration: Duration) {
        let _ = self.tx.send(MockRead::Stall(duration));
    }

    pub fn report_after(&self, delay: Duration, bytes: &[u8]) {
        let _ = self.tx.send(MockRead::Delayed(delay, bytes.to_vec()));
    }

    pub fn is_closed(&self) -> bool {
        self.state.closed.load(Ordering::SeqCst)
    }

    pub fn open_count(&self) -> usize {
        self.state.opens.load(Ordering::SeqCst)
    }
}

#[derive(Default)]
pub struct MockHidBackend {
    devices: Vec<HidDescriptor>,
    feeds: HashMap<String, FeedState>,
    failing_open: HashSet<String>,
    fail_enumeration: bool,
}

impl MockHidBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_device(&mut self, descriptor: HidDescriptor) -> MockHidFeed {
        let (tx, rx) = unbounded();
        let state = FeedState {
            rx,
            closed: Arc::new(AtomicBool::new(true)),
            opens: Arc::new(AtomicUsize::new(0)),
        };
        self.feeds.insert(descriptor.path.clone(), state.clone());
        self.devices.push(descriptor);
        MockHidFeed { tx, state }
    }

    pub fn fail_enumeration(&mut self, fail: bool) {
        self.fail_enumeration = fail;
    }

    pub fn fail_open(&mut self, path: &str) {
        self.failing_open.insert(path.to_string());
    }
}

impl HidBackend for MockHidBackend {
    fn enumerate(&mut self) -> Result<Vec<HidDescriptor>, SessionError> {
        if self.fail_enumeration {
            return Err(SessionError::open_failed("HID subsystem", "mock failure"));
        }
        Ok(self.devices.clone())
    }

    fn open(&mut self, descriptor: &HidDescriptor) -> Result<Box<dyn HidDevice>, SessionError> {
        if self.failing_open.contains(&descriptor.path) {
            return Err(SessionError::open_failed(descriptor.display_name(), "permission denied"));
        }
        let state = self
            .feeds
            .get(&descriptor.path)
            .ok_or_else(|| SessionError::EndpointNotFound(descriptor.path.clone()))?;
        state.opens.fetch_add(1, Ordering::SeqCst);
        state.closed.store(false, Ordering::SeqCst);
        Ok(Box::new(MockHidDevice {
            path: descriptor.path.clone(),
            rx: state.rx.clone(),
            closed: Arc::clone(&state.closed),
        }))
    }
}

struct MockHidDevice {
    path: String,
    rx: Receiver<MockRead>,
    closed: Arc<AtomicBool>,
}

impl Drop for MockHidDevice {
    fn drop(&mut self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

impl HidDevice for MockHidDevice {
    fn read_timeout(&self, buf: &mut [u8], timeout_ms: i32) -> Result<usize, SessionError> {
        let timeout = Duration::from_millis(timeout_ms.max(0) as u64);
        match self.rx.recv_timeout(timeout) {
            Ok(MockRead::Report(bytes)) => {
                let n = bytes.len().min(buf.len());
                buf[..n].copy_from_slice(&bytes[..n]);
                Ok(n)
            }
            Ok(MockRead::Fail) => Err(SessionError::read_failed(self.path.as_str(), "device unplugged")),
            Ok(MockRead::Delayed(delay, bytes)) => {
                std::thread::sleep(delay);
                let n = bytes.len().min(buf.len());
                buf[..n].copy_from_slice(&bytes[..n]);
                Ok(n)
            }
            Ok(MockRead::Stall(duration)) => {
                std::thread::sleep(duration);
                Ok(0)
            }
            Err(RecvTimeoutError::Timeout) => Ok(0),
            Err(RecvTimeoutError::Disconnected) => {
                std::thread::sleep(timeout);
                Ok(0)
            }
        }
    }
}

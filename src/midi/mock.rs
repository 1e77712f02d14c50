//! Scriptable [`MidiBackend`] for unit tests.
//!
//! Tests keep a clone of the backend after handing one to a session and use it
//! to fake dispatch-thread callbacks and inspect what was sent.

use crate::error::SessionError;
use crate::midi::backend::{InputConnection, MidiBackend, MidiCallback};
use crate::midi::virtual_ports::{input_port_name, output_port_name, VirtualPortPair};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct MockMidiState {
    inputs: Vec<String>,
    outputs: Vec<String>,
    callbacks: HashMap<String, MidiCallback>,
    sent: Vec<(String, Vec<u8>)>,
    failing_close: HashSet<String>,
    failing_open: HashSet<String>,
    failing_send: HashSet<String>,
    fail_enumeration: bool,
    supports_virtual: bool,
    opened: usize,
}

#[derive(Clone)]
pub struct MockMidiBackend {
    state: Arc<Mutex<MockMidiState>>,
}

impl MockMidiBackend {
    pub fn new(inputs: &[&str], outputs: &[&str]) -> Self {
        let state = MockMidiState {
            inputs: inputs.iter().map(|s| s.to_string()).collect(),
            outputs: outputs.iter().map(|s| s.to_string()).collect(),
            supports_virtual: true,
            ..Default::default()
        };
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockMidiState> {
        self.state.lock().expect("lock poisoned")
    }

    pub fn set_inputs(&self, inputs: &[&str]) {
        self.lock().inputs = inputs.iter().map(|s| s.to_string()).collect();
    }

    pub fn fail_enumeration(&self) {
        self.lock().fail_enumeration = true;
    }

    pub fn fail_close(&self, name: &str) {
        self.lock().failing_close.insert(name.to_string());
    }

    pub fn fail_open(&self, name: &str) {
        self.lock().failing_open.insert(name.to_string());
    }

    pub fn fail_send(&self, name: &str) {
        self.lock().failing_send.insert(name.to_string());
    }

    pub fn set_virtual_supported(&self, supported: bool) {
        self.lock().supports_virtual = supported;
    }

    /// Fakes the subsystem dispatch thread delivering a message.
    /// Returns false if no callback is registered for `name`.
    pub fn emit(&self, name: &str, bytes: &[u8], timestamp: u64) -> bool {
        let mut state = self.lock();
        match state.callbacks.get_mut(name) {
            Some(callback) => {
                callback(timestamp, bytes);
                true
            }
            None => false,
        }
    }

    pub fn has_callback(&self, name: &str) -> bool {
        self.lock().callbacks.contains_key(name)
    }

    pub fn callback_count(&self) -> usize {
        self.lock().callbacks.len()
    }

    pub fn open_count(&self) -> usize {
        self.lock().opened
    }

    pub fn sent(&self) -> Vec<(String, Vec<u8>)> {
        self.lock().sent.clone()
    }
}

struct MockInputConnection {
    name: String,
    state: Arc<Mutex<MockMidiState>>,
}

impl InputConnection for MockInputConnection {
    fn close(self: Box<Self>) -> Result<(), SessionError> {
        let mut state = self.state.lock().expect("lock poisoned");
        state.callbacks.remove(&self.name);
        if state.failing_close.contains(&self.name) {
            Err(SessionError::read_failed(self.name.as_str(), "driver refused to close"))
        } else {
            Ok(())
        }
    }
}

/// Removes the virtual pair from the fake system when dropped
struct MockVirtualGuard {
    input_name: String,
    output_name: String,
    state: Arc<Mutex<MockMidiState>>,
}

impl Drop for MockVirtualGuard {
    fn drop(&mut self) {
        if let Ok(mut state) = self.state.lock() {
            state.callbacks.remove(&self.input_name);
            state.outputs.retain(|n| n != &self.input_name);
            state.inputs.retain(|n| n != &self.output_name);
        }
    }
}

impl MidiBackend for MockMidiBackend {
    fn input_port_names(&self) -> Result<Vec<String>, SessionError> {
        let state = self.lock();
        if state.fail_enumeration {
            return Err(SessionError::open_failed("MIDI input subsystem", "mock failure"));
        }
        Ok(state.inputs.clone())
    }

    fn output_port_names(&self) -> Result<Vec<String>, SessionError> {
        let state = self.lock();
        if state.fail_enumeration {
            return Err(SessionError::open_failed("MIDI output subsystem", "mock failure"));
        }
        Ok(state.outputs.clone())
    }

    fn open_input(
        &self,
        index: usize,
        port_name: &str,
        callback: MidiCallback,
    ) -> Result<Box<dyn InputConnection>, SessionError> {
        let mut state = self.lock();
        if state.inputs.get(index).map(String::as_str) != Some(port_name) {
            return Err(SessionError::EndpointNotFound(port_name.to_string()));
        }
        if state.failing_open.contains(port_name) {
            return Err(SessionError::open_failed(port_name, "permission denied"));
        }
        state.opened += 1;
        state.callbacks.insert(port_name.to_string(), callback);
        Ok(Box::new(MockInputConnection {
            name: port_name.to_string(),
            state: Arc::clone(&self.state),
        }))
    }

    fn send(&self, index: usize, port_name: &str, bytes: &[u8]) -> Result<(), SessionError> {
        let mut state = self.lock();
        if state.outputs.get(index).map(String::as_str) != Some(port_name) {
            return Err(SessionError::EndpointNotFound(port_name.to_string()));
        }
        if state.failing_open.contains(port_name) {
            return Err(SessionError::open_failed(port_name, "permission denied"));
        }
        if state.failing_send.contains(port_name) {
            return Err(SessionError::send_failed(port_name, "device disconnected"));
        }
        state.sent.push((port_name.to_string(), bytes.to_vec()));
        Ok(())
    }

    fn create_virtual(&self, name: &str, callback: MidiCallback) -> Result<VirtualPortPair, SessionError> {
        let mut state = self.lock();
        if !state.supports_virtual {
            return Err(SessionError::UnsupportedPlatform(name.to_string()));
        }
        let input_name = input_port_name(name);
        let output_name = output_port_name(name);
        // Other clients see our input as a destination and our output as a source
        state.outputs.push(input_name.clone());
        state.inputs.push(output_name.clone());
        state.callbacks.insert(input_name.clone(), callback);

        let guard = MockVirtualGuard {
            input_name,
            output_name,
            state: Arc::clone(&self.state),
        };
        Ok(VirtualPortPair::new(name, Box::new(guard)))
    }
}

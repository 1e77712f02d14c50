use crate::aggregator::Aggregator;
use crate::catalog::{self, PortsByClass};
use crate::error::SessionError;
use crate::events::SourceKind;
use crate::midi::backend::{InputConnection, MidiBackend, MidiCallback};
use crate::midi::virtual_ports::VirtualPortPair;
use crate::source::{EventSource, Registry};
use std::collections::HashMap;

/// An open input port. Its listener is the MIDI subsystem's own dispatch
/// thread, which we only reach through the registered callback.
struct MidiConnection {
    input: Box<dyn InputConnection>,
}

impl EventSource for MidiConnection {
    fn kind(&self) -> SourceKind {
        SourceKind::Midi
    }

    fn stop(self: Box<Self>) -> Result<(), SessionError> {
        self.input.close()
    }
}

/// Owns every MIDI input connection and virtual port the app opens
pub struct MidiSession {
    backend: Box<dyn MidiBackend>,
    aggregator: Aggregator,
    connections: Registry<MidiConnection>,
    virtual_ports: HashMap<String, VirtualPortPair>,
}

impl MidiSession {
    pub fn new(backend: Box<dyn MidiBackend>, aggregator: Aggregator) -> Self {
        Self {
            backend,
            aggregator,
            connections: Registry::new(),
            virtual_ports: HashMap::new(),
        }
    }

    pub fn list_ports_by_class(&self) -> PortsByClass {
        catalog::list_midi_ports_by_class(self.backend.as_ref())
    }

    pub fn list_outputs(&self) -> Vec<String> {
        catalog::list_midi_outputs(self.backend.as_ref())
    }

    pub fn is_connected(&self, name: &str) -> bool {
        self.connections.is_live(name)
    }

    pub fn connected_ports(&self) -> Vec<String> {
        self.connections.ids()
    }

    pub fn virtual_port_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.virtual_ports.keys().cloned().collect();
        names.sort();
        names
    }

    /// Builds the callback that tags every message with `port_name`
    fn forwarder(&self, port_name: &str) -> MidiCallback {
        let aggregator = self.aggregator.clone();
        let port_name = port_name.to_string();
        Box::new(move |timestamp, bytes| aggregator.midi(&port_name, bytes, timestamp))
    }

    /// Starts listening on an input port. Already connected is success.
    pub fn connect(&mut self, name: &str) -> Result<(), SessionError> {
        if self.connections.is_live(name) {
            return Ok(());
        }

        // Names can disappear between enumerations when devices are unplugged
        let index = self
            .backend
            .input_port_names()?
            .iter()
            .position(|n| n == name)
            .ok_or_else(|| SessionError::EndpointNotFound(name.to_string()))?;

        let input = self.backend.open_input(index, name, self.forwarder(name))?;
        self.connections
            .insert(name.to_string(), Box::new(MidiConnection { input }));

        log::info!("connected to MIDI port '{}'", name);
        Ok(())
    }

    /// Stops listening on a port. Returns false if it was not connected.
    pub fn disconnect(&mut self, name: &str) -> bool {
        match self.connections.stop(name) {
            None => false,
            Some(Ok(())) => {
                log::info!("disconnected from MIDI port '{}'", name);
                true
            }
            Some(Err(e)) => {
                log::warn!("error disconnecting from MIDI port '{}': {}", name, e);
                true
            }
        }
    }

    /// Writes `bytes` through a short-lived output connection
    pub fn send(&self, name: &str, bytes: &[u8]) -> Result<(), SessionError> {
        let index = self
            .backend
            .output_port_names()?
            .iter()
            .position(|n| n == name)
            .ok_or_else(|| SessionError::EndpointNotFound(name.to_string()))?;

        self.backend.send(index, name, bytes)?;
        log::debug!("sent {} byte(s) to '{}'", bytes.len(), name);
        Ok(())
    }

    /// Creates "<name> Input" / "<name> Output". Messages other applications
    /// send into the input show up like any other MIDI traffic.
    pub fn create_virtual_port(&mut self, name: &str) -> Result<(), SessionError> {
        if self.virtual_ports.contains_key(name) {
            return Ok(());
        }

        let pair = self
            .backend
            .create_virtual(name, self.forwarder(&crate::midi::virtual_ports::input_port_name(name)))?;
        log::info!("created virtual MIDI ports '{}' and '{}'", pair.input_name, pair.output_name);
        self.virtual_ports.insert(name.to_string(), pair);
        Ok(())
    }

    /// Disconnects every port and drops every virtual port. Never fails.
    pub fn close_all(&mut self) -> usize {
        let count = self.connections.stop_all();
        self.virtual_ports.clear();
        if count > 0 {
            log::info!("closed {} MIDI connection(s)", count);
        }
        count
    }
}

use crate::error::SessionError;
use crate::midi::virtual_ports::{self, VirtualPortPair};
use midir::{Ignore, MidiInput, MidiInputConnection, MidiOutput};

/// Invoked on the MIDI subsystem's dispatch thread with `(timestamp_us, bytes)`
pub type MidiCallback = Box<dyn FnMut(u64, &[u8]) + Send + 'static>;

/// An open input port with a registered callback
pub trait InputConnection {
    /// Deregisters the callback and closes the port
    fn close(self: Box<Self>) -> Result<(), SessionError>;
}

/// The MIDI subsystem as seen by the session.
///
/// The production implementation is [`MidirBackend`]; tests use `midi::mock`.
pub trait MidiBackend {
    /// Input port names in subsystem order
    fn input_port_names(&self) -> Result<Vec<String>, SessionError>;

    /// Output port names in subsystem order
    fn output_port_names(&self) -> Result<Vec<String>, SessionError>;

    /// Opens input `index`, which must still be called `port_name`
    fn open_input(
        &self,
        index: usize,
        port_name: &str,
        callback: MidiCallback,
    ) -> Result<Box<dyn InputConnection>, SessionError>;

    /// Opens output `index` just long enough to write `bytes`
    fn send(&self, index: usize, port_name: &str, bytes: &[u8]) -> Result<(), SessionError>;

    /// Creates a virtual input/output pair named after `name`
    fn create_virtual(&self, name: &str, callback: MidiCallback) -> Result<VirtualPortPair, SessionError>;
}

/// [`MidiBackend`] on top of midir
pub struct MidirBackend {
    client_name: String,
    ignore_timing: bool,
}

impl MidirBackend {
    pub fn new(client_name: &str, ignore_timing: bool) -> Self {
        Self {
            client_name: client_name.to_string(),
            ignore_timing,
        }
    }

    fn input(&self) -> Result<MidiInput, SessionError> {
        let mut midi_in = MidiInput::new(&self.client_name)
            .map_err(|e| SessionError::open_failed("MIDI input subsystem", e))?;
        // SysEx is always let through so it can be shown
        midi_in.ignore(if self.ignore_timing {
            Ignore::TimeAndActiveSense
        } else {
            Ignore::None
        });
        Ok(midi_in)
    }

    fn output(&self) -> Result<MidiOutput, SessionError> {
        MidiOutput::new(&self.client_name).map_err(|e| SessionError::open_failed("MIDI output subsystem", e))
    }
}

struct MidirInputConnection {
    connection: MidiInputConnection<()>,
}

impl InputConnection for MidirInputConnection {
    fn close(self: Box<Self>) -> Result<(), SessionError> {
        // Closing stops the dispatch thread before returning
        let _ = self.connection.close();
        Ok(())
    }
}

impl MidiBackend for MidirBackend {
    fn input_port_names(&self) -> Result<Vec<String>, SessionError> {
        let midi_in = self.input()?;
        Ok(midi_in
            .ports()
            .iter()
            .map(|port| midi_in.port_name(port).unwrap_or_default())
            .collect())
    }

    fn output_port_names(&self) -> Result<Vec<String>, SessionError> {
        let midi_out = self.output()?;
        Ok(midi_out
            .ports()
            .iter()
            .map(|port| midi_out.port_name(port).unwrap_or_default())
            .collect())
    }

    fn open_input(
        &self,
        index: usize,
        port_name: &str,
        mut callback: MidiCallback,
    ) -> Result<Box<dyn InputConnection>, SessionError> {
        let midi_in = self.input()?;
        let ports = midi_in.ports();
        let port = ports
            .get(index)
            .filter(|port| midi_in.port_name(port).ok().as_deref() == Some(port_name))
            .ok_or_else(|| SessionError::EndpointNotFound(port_name.to_string()))?
            .clone();

        let connection = midi_in
            .connect(
                &port,
                &format!("{}-in", self.client_name),
                move |timestamp, message, _| callback(timestamp, message),
                (),
            )
            .map_err(|e| SessionError::open_failed(port_name, e))?;

        Ok(Box::new(MidirInputConnection { connection }))
    }

    fn send(&self, index: usize, port_name: &str, bytes: &[u8]) -> Result<(), SessionError> {
        let midi_out = self.output()?;
        let ports = midi_out.ports();
        let port = ports
            .get(index)
            .filter(|port| midi_out.port_name(port).ok().as_deref() == Some(port_name))
            .ok_or_else(|| SessionError::EndpointNotFound(port_name.to_string()))?
            .clone();

        let mut connection = midi_out
            .connect(&port, &format!("{}-out", self.client_name))
            .map_err(|e| SessionError::open_failed(port_name, e))?;
        let result = connection
            .send(bytes)
            .map_err(|e| SessionError::send_failed(port_name, e));
        connection.close();
        result
    }

    fn create_virtual(&self, name: &str, callback: MidiCallback) -> Result<VirtualPortPair, SessionError> {
        virtual_ports::create(&self.client_name, name, callback)
    }
}

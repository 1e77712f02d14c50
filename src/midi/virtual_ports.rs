use crate::error::SessionError;
use crate::midi::backend::MidiCallback;
use std::any::Any;

pub fn input_port_name(name: &str) -> String {
    format!("{} Input", name)
}

pub fn output_port_name(name: &str) -> String {
    format!("{} Output", name)
}

/// A virtual MIDI input and output created by this app.
/// The ports stay visible to other applications as long as this struct is alive.
pub struct VirtualPortPair {
    pub input_name: String,
    pub output_name: String,
    // Dropping the connections destroys the ports
    _connections: Box<dyn Any>,
}

impl VirtualPortPair {
    pub fn new(name: &str, connections: Box<dyn Any>) -> Self {
        Self {
            input_name: input_port_name(name),
            output_name: output_port_name(name),
            _connections: connections,
        }
    }
}

/// Creates "<name> Input" and "<name> Output".
/// Traffic that other applications send into the input is handed to `callback`.
#[cfg(unix)]
pub fn create(client_name: &str, name: &str, mut callback: MidiCallback) -> Result<VirtualPortPair, SessionError> {
    use midir::os::unix::{VirtualInput, VirtualOutput};
    use midir::{Ignore, MidiInput, MidiOutput};

    let mut midi_in = MidiInput::new(client_name).map_err(|e| SessionError::open_failed(name, e))?;
    midi_in.ignore(Ignore::None);
    let midi_out = MidiOutput::new(client_name).map_err(|e| SessionError::open_failed(name, e))?;

    let input_name = input_port_name(name);
    let output_name = output_port_name(name);

    let input_connection = midi_in
        .create_virtual(&input_name, move |timestamp, message, _| callback(timestamp, message), ())
        .map_err(|e| SessionError::open_failed(input_name.as_str(), e))?;

    let output_connection = midi_out
        .create_virtual(&output_name)
        .map_err(|e| SessionError::open_failed(output_name.as_str(), e))?;

    Ok(VirtualPortPair::new(name, Box::new((input_connection, output_connection))))
}

#[cfg(not(unix))]
pub fn create(_client_name: &str, name: &str, _callback: MidiCallback) -> Result<VirtualPortPair, SessionError> {
    Err(SessionError::UnsupportedPlatform(format!(
        "virtual port '{}' requires macOS or Linux",
        name
    )))
}

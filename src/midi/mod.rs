pub mod backend;
pub mod classifier;
pub mod decode;
#[cfg(test)]
pub mod mock;
pub mod session;
pub mod virtual_ports;

pub use backend::MidirBackend;
pub use session::MidiSession;

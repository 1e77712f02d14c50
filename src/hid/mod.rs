pub mod backend;
pub mod listener;
#[cfg(test)]
pub mod mock;
pub mod session;

pub use backend::HidapiBackend;
pub use listener::PollSettings;
pub use session::HidSession;

use crate::error::SessionError;
use crate::events::SourceKind;
use std::collections::HashMap;

/// A live listener feeding the aggregator.
///
/// MIDI inputs are callback-registered with the MIDI subsystem, HID devices
/// are polled by a thread we own. Sessions treat both the same way.
pub trait EventSource {
    fn kind(&self) -> SourceKind;

    /// False once the listener has stopped on its own
    fn is_alive(&self) -> bool {
        true
    }

    /// Deregisters or cancels the listener and closes its device
    fn stop(self: Box<Self>) -> Result<(), SessionError>;
}

/// Endpoint identifier to live listener.
///
/// Only the owning session mutates it, through `&mut self`, which keeps all
/// registry changes on the control-plane thread.
pub struct Registry<S: EventSource + ?Sized> {
    sources: HashMap<String, Box<S>>,
}

impl<S: EventSource + ?Sized> Registry<S> {
    pub fn new() -> Self {
        Self {
            sources: HashMap::new(),
        }
    }

    /// True if `id` has a listener that is still running
    pub fn is_live(&self, id: &str) -> bool {
        self.sources.get(id).is_some_and(|s| s.is_alive())
    }

    pub fn insert(&mut self, id: String, source: Box<S>) {
        if let Some(previous) = self.sources.insert(id.clone(), source) {
            // Only stale entries get replaced
            let kind = previous.kind();
            if let Err(e) = previous.stop() {
                log::debug!("stopping replaced {} listener for {}: {}", kind, id, e);
            }
        }
    }

    /// Removes and stops the listener for `id`.
    /// Returns `None` if nothing was registered.
    pub fn stop(&mut self, id: &str) -> Option<Result<(), SessionError>> {
        self.sources.remove(id).map(|source| source.stop())
    }

    /// Stops every listener, isolating failures. Returns how many were removed.
    pub fn stop_all(&mut self) -> usize {
        let mut count = 0;
        for (id, source) in self.sources.drain() {
            count += 1;
            let kind = source.kind();
            if let Err(e) = source.stop() {
                log::warn!("error closing {} {}: {}", kind, id, e);
            }
        }
        count
    }

    /// Drops entries whose listener has exited on its own
    pub fn reap(&mut self) -> Vec<String> {
        let dead: Vec<String> = self
            .sources
            .iter()
            .filter(|(_, source)| !source.is_alive())
            .map(|(id, _)| id.clone())
            .collect();
        for id in &dead {
            if let Some(source) = self.sources.remove(id) {
                let kind = source.kind();
                if let Err(e) = source.stop() {
                    log::debug!("cleaning up {} {}: {}", kind, id, e);
                }
            }
        }
        dead
    }

    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.sources.keys().cloned().collect();
        ids.sort();
        ids
    }

    #[cfg(test)]
    pub fn contains(&self, id: &str) -> bool {
        self.sources.contains_key(id)
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

impl<S: EventSource + ?Sized> Default for Registry<S> {
    fn default() -> Self {
        Self::new()
    }
}

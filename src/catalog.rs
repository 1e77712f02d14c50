//! Endpoint enumeration.
//!
//! Every listing here is safe to call on each UI refresh: subsystem errors are
//! logged and turn into empty results.

use crate::endpoint::{HidDescriptor, PortClass};
use crate::hid::backend::HidBackend;
use crate::midi::backend::MidiBackend;
use crate::midi::classifier::classify;
use std::collections::HashSet;

/// MIDI input ports partitioned by [`classify`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PortsByClass {
    pub all_ports: Vec<String>,
    pub physical_ports: Vec<String>,
    pub virtual_ports: Vec<String>,
}

/// Keeps the first occurrence of every name so identifiers are unique
fn dedup_names(names: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    names
        .into_iter()
        .filter(|name| {
            let fresh = seen.insert(name.clone());
            if !fresh {
                log::debug!("ignoring duplicate port name '{}'", name);
            }
            fresh
        })
        .collect()
}

/// Input port names in the order the MIDI subsystem reports them
pub fn list_midi_ports(backend: &dyn MidiBackend) -> Vec<String> {
    match backend.input_port_names() {
        Ok(names) => dedup_names(names),
        Err(e) => {
            log::warn!("error enumerating MIDI inputs: {}", e);
            Vec::new()
        }
    }
}

pub fn list_midi_outputs(backend: &dyn MidiBackend) -> Vec<String> {
    match backend.output_port_names() {
        Ok(names) => dedup_names(names),
        Err(e) => {
            log::warn!("error enumerating MIDI outputs: {}", e);
            Vec::new()
        }
    }
}

pub fn list_midi_ports_by_class(backend: &dyn MidiBackend) -> PortsByClass {
    let all_ports = list_midi_ports(backend);
    let (virtual_ports, physical_ports): (Vec<String>, Vec<String>) = all_ports
        .iter()
        .cloned()
        .partition(|name| classify(name) == PortClass::Virtual);

    PortsByClass {
        all_ports,
        physical_ports,
        virtual_ports,
    }
}

pub fn list_hid_devices(backend: &mut dyn HidBackend) -> Vec<HidDescriptor> {
    match backend.enumerate() {
        Ok(devices) => {
            let mut seen = HashSet::new();
            devices
                .into_iter()
                .filter(|device| seen.insert(device.path.clone()))
                .collect()
        }
        Err(e) => {
            log::warn!("error enumerating HID devices: {}", e);
            Vec::new()
        }
    }
}

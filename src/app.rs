use crate::aggregator::Aggregator;
use crate::catalog::PortsByClass;
use crate::config::Config;
use crate::endpoint::{HidDescriptor, PortFilter};
use crate::events::SessionEvent;
use crate::hid::backend::HidBackend;
use crate::hid::HidSession;
use crate::midi::backend::MidiBackend;
use crate::midi::MidiSession;
use crossbeam::channel::Receiver;
use std::collections::VecDeque;
use std::time::{Duration, Instant};

const TEST_NOTE_ON: [u8; 3] = [0x90, 60, 100];
const TEST_NOTE_OFF: [u8; 3] = [0x80, 60, 0];
const TEST_NOTE_LENGTH: Duration = Duration::from_millis(300);
const STATUS_RULE: &str = "----------------------------------------";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaneFocus {
    Midi,
    Hid,
}

pub struct App {
    pub midi_ports: PortsByClass,
    pub midi_outputs: Vec<String>,
    pub hid_devices: Vec<HidDescriptor>,
    pub port_filter: PortFilter,
    pub focus: PaneFocus,
    pub selected_midi_idx: usize,
    pub selected_hid_idx: usize,
    pub display: VecDeque<String>,
    /// Snapshot shown while auto-scroll is off
    pub paused_view: Option<Vec<String>>,
    pub show_timestamps: bool,
    pub show_help: bool,
    pub should_quit: bool,

    max_lines: usize,
    virtual_port_name: String,
    midi: MidiSession,
    hid: HidSession,
    aggregator: Aggregator,
    event_rx: Receiver<SessionEvent>,
    /// Note Offs owed to ports that got a test note
    pending_note_offs: Vec<(String, Instant)>,
}

impl App {
    pub fn new(config: &Config, midi_backend: Box<dyn MidiBackend>, hid_backend: Box<dyn HidBackend>) -> Self {
        let (event_tx, event_rx) = crossbeam::channel::unbounded();
        let aggregator = Aggregator::new(event_tx, config.display.interpret_midi);
        let midi = MidiSession::new(midi_backend, aggregator.clone());
        let hid = HidSession::new(hid_backend, aggregator.clone(), config.hid.poll_settings());

        Self {
            midi_ports: PortsByClass::default(),
            midi_outputs: Vec::new(),
            hid_devices: Vec::new(),
            port_filter: PortFilter::default(),
            focus: PaneFocus::Midi,
            selected_midi_idx: 0,
            selected_hid_idx: 0,
            display: VecDeque::new(),
            paused_view: None,
            show_timestamps: config.display.show_timestamps,
            show_help: false,
            should_quit: false,
            max_lines: config.display.max_lines.max(1),
            virtual_port_name: config.midi.virtual_port_name.clone(),
            midi,
            hid,
            aggregator,
            event_rx,
            pending_note_offs: Vec::new(),
        }
    }

    pub fn initialize(&mut self) {
        self.refresh_devices();

        if self.midi_ports.all_ports.is_empty() && self.hid_devices.is_empty() {
            self.status_message("No MIDI or HID devices found. Connect a device and press R.");
        } else {
            self.status_message(&format!(
                "Found {} MIDI port(s) ({} physical, {} virtual) and {} HID device(s)",
                self.midi_ports.all_ports.len(),
                self.midi_ports.physical_ports.len(),
                self.midi_ports.virtual_ports.len(),
                self.hid_devices.len()
            ));
        }
    }

    pub fn refresh_devices(&mut self) {
        self.midi_ports = self.midi.list_ports_by_class();
        self.midi_outputs = self.midi.list_outputs();
        self.hid_devices = self.hid.list_devices();
        self.clamp_selection();
    }

    fn clamp_selection(&mut self) {
        self.selected_midi_idx = self
            .selected_midi_idx
            .min(self.visible_midi_ports().len().saturating_sub(1));
        self.selected_hid_idx = self.selected_hid_idx.min(self.hid_devices.len().saturating_sub(1));
    }

    pub fn visible_midi_ports(&self) -> &[String] {
        match self.port_filter {
            PortFilter::All => &self.midi_ports.all_ports,
            PortFilter::Physical => &self.midi_ports.physical_ports,
            PortFilter::Virtual => &self.midi_ports.virtual_ports,
        }
    }

    pub fn selected_midi_port(&self) -> Option<&String> {
        self.visible_midi_ports().get(self.selected_midi_idx)
    }

    pub fn selected_hid_device(&self) -> Option<&HidDescriptor> {
        self.hid_devices.get(self.selected_hid_idx)
    }

    pub fn is_midi_connected(&self, name: &str) -> bool {
        self.midi.is_connected(name)
    }

    pub fn is_hid_connected(&self, path: &str) -> bool {
        self.hid.is_connected(path)
    }

    pub fn virtual_port_names(&self) -> Vec<String> {
        self.midi.virtual_port_names()
    }

    pub fn interpret_midi(&self) -> bool {
        self.aggregator.interpret_midi()
    }

    pub fn auto_scroll(&self) -> bool {
        self.paused_view.is_none()
    }

    /// Lines the monitor pane should show
    pub fn visible_lines(&self) -> Vec<&str> {
        match &self.paused_view {
            Some(lines) => lines.iter().map(String::as_str).collect(),
            None => self.display.iter().map(String::as_str).collect(),
        }
    }

    /// Drains the event funnel and runs timers. Called once per frame.
    pub fn process_events(&mut self) {
        while let Ok(event) = self.event_rx.try_recv() {
            match event {
                SessionEvent::Record(record) => {
                    let line = record.display_line(self.show_timestamps);
                    self.push_line(line);
                }
                SessionEvent::ListenerExited { name, reason, .. } => {
                    self.status_message(&format!("HID device {} stopped: {}", name, reason));
                    self.hid.reap();
                }
            }
        }

        let now = Instant::now();
        let (due, waiting): (Vec<_>, Vec<_>) = std::mem::take(&mut self.pending_note_offs)
            .into_iter()
            .partition(|(_, at)| now >= *at);
        self.pending_note_offs = waiting;
        for (port, _) in due {
            if let Err(e) = self.midi.send(&port, &TEST_NOTE_OFF) {
                log::warn!("failed to send note off to '{}': {}", port, e);
            }
        }
    }

    fn push_line(&mut self, line: String) {
        self.display.push_back(line);
        while self.display.len() > self.max_lines {
            self.display.pop_front();
        }
    }

    pub fn status_message(&mut self, msg: &str) {
        log::info!("{}", msg);
        self.push_line(STATUS_RULE.to_string());
        self.push_line(format!("STATUS: {}", msg));
        self.push_line(STATUS_RULE.to_string());
    }

    pub fn toggle_selected(&mut self) {
        match self.focus {
            PaneFocus::Midi => self.toggle_midi(),
            PaneFocus::Hid => self.toggle_hid(),
        }
    }

    fn toggle_midi(&mut self) {
        let Some(port) = self.selected_midi_port().cloned() else {
            return;
        };

        if self.midi.is_connected(&port) {
            if self.midi.disconnect(&port) {
                self.status_message(&format!("Disconnected from MIDI port: {}", port));
            }
        } else {
            match self.midi.connect(&port) {
                Ok(()) => self.status_message(&format!("Connected to MIDI port: {}", port)),
                Err(e) => self.status_message(&format!("Failed to connect to MIDI port: {}", e)),
            }
        }
    }

    fn toggle_hid(&mut self) {
        let Some(device) = self.selected_hid_device().cloned() else {
            return;
        };

        if self.hid.is_connected(&device.path) {
            if self.hid.disconnect(&device.path) {
                self.status_message(&format!("Disconnected from HID device: {}", device));
            }
        } else {
            match self.hid.connect(&device) {
                Ok(()) => self.status_message(&format!("Connected to HID device: {}", device)),
                Err(e) => self.status_message(&format!("Failed to connect to HID device: {}", e)),
            }
        }
    }

    /// Plays middle C on the selected port if it is also an output
    pub fn send_test_note(&mut self) {
        let Some(port) = self.selected_midi_port().cloned() else {
            return;
        };
        if !self.midi_outputs.contains(&port) {
            self.status_message(&format!("{} is not a MIDI output", port));
            return;
        }

        match self.midi.send(&port, &TEST_NOTE_ON) {
            Ok(()) => {
                self.status_message(&format!("Sent test note to {}", port));
                self.pending_note_offs.push((port, Instant::now() + TEST_NOTE_LENGTH));
            }
            Err(e) => self.status_message(&format!("Failed to send test note: {}", e)),
        }
    }

    pub fn create_virtual_port(&mut self) {
        let name = self.virtual_port_name.clone();
        match self.midi.create_virtual_port(&name) {
            Ok(()) => {
                self.status_message(&format!("Created virtual MIDI port: {}", name));
                self.refresh_devices();
            }
            Err(e) => self.status_message(&format!("Failed to create virtual MIDI port: {}", e)),
        }
    }

    pub fn handle_refresh(&mut self) {
        self.refresh_devices();
        self.status_message("Devices refreshed");
    }

    pub fn cycle_port_filter(&mut self) {
        self.port_filter = self.port_filter.next();
        self.selected_midi_idx = 0;
    }

    pub fn toggle_timestamps(&mut self) {
        self.show_timestamps = !self.show_timestamps;
    }

    pub fn toggle_interpret(&mut self) {
        self.aggregator.set_interpret_midi(!self.aggregator.interpret_midi());
    }

    pub fn toggle_auto_scroll(&mut self) {
        self.paused_view = match self.paused_view {
            Some(_) => None,
            None => Some(self.display.iter().cloned().collect()),
        };
    }

    pub fn clear_display(&mut self) {
        self.display.clear();
        if self.paused_view.is_some() {
            self.paused_view = Some(Vec::new());
        }
    }

    pub fn toggle_help(&mut self) {
        self.show_help = !self.show_help;
    }

    // Keyboard input handlers

    pub fn handle_tab(&mut self) {
        self.focus = match self.focus {
            PaneFocus::Midi => PaneFocus::Hid,
            PaneFocus::Hid => PaneFocus::Midi,
        };
    }

    pub fn handle_key_up(&mut self) {
        match self.focus {
            PaneFocus::Midi => self.selected_midi_idx = self.selected_midi_idx.saturating_sub(1),
            PaneFocus::Hid => self.selected_hid_idx = self.selected_hid_idx.saturating_sub(1),
        }
    }

    pub fn handle_key_down(&mut self) {
        match self.focus {
            PaneFocus::Midi if self.selected_midi_idx + 1 < self.visible_midi_ports().len() => {
                self.selected_midi_idx += 1
            }
            PaneFocus::Hid if self.selected_hid_idx + 1 < self.hid_devices.len() => self.selected_hid_idx += 1,
            _ => {}
        }
    }

    /// Closes every connection. Must run before the process exits so no HID
    /// poll thread outlives the terminal teardown.
    pub fn shutdown(&mut self) {
        self.pending_note_offs.clear();
        log::debug!(
            "shutting down with MIDI {:?} and HID {:?} open",
            self.midi.connected_ports(),
            self.hid.connected_paths()
        );
        let midi = self.midi.close_all();
        let hid = self.hid.close_all();
        log::info!("shutdown closed {} MIDI and {} HID connection(s)", midi, hid);
    }

    pub fn quit(&mut self) {
        self.should_quit = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hid::mock::{MockHidBackend, MockHidFeed};
    use crate::midi::mock::MockMidiBackend;

    fn config() -> Config {
        let mut config = Config::default();
        config.display.show_timestamps = false;
        config.hid.poll_interval_ms = 10;
        config
    }

    fn app_with(midi: &MockMidiBackend, hid_devices: &[HidDescriptor], config: &Config) -> (App, Vec<MockHidFeed>) {
        let mut hid = MockHidBackend::new();
        let feeds = hid_devices.iter().map(|d| hid.add_device(d.clone())).collect();
        let mut app = App::new(config, Box::new(midi.clone()), Box::new(hid));
        app.initialize();
        (app, feeds)
    }

    fn wait_for_line(app: &mut App, needle: &str) -> bool {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            app.process_events();
            if app.display.iter().any(|l| l.contains(needle)) {
                return true;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        false
    }

    #[test]
    fn test_empty_system() {
        let midi = MockMidiBackend::new(&[], &[]);
        let (app, _) = app_with(&midi, &[], &config());

        assert!(app.visible_midi_ports().is_empty());
        assert!(app.hid_devices.is_empty());
        assert!(app.display.iter().any(|l| l.contains("No MIDI or HID devices found")));
    }

    #[test]
    fn test_midi_traffic_is_displayed() {
        let midi = MockMidiBackend::new(&["Keystation 49"], &[]);
        let (mut app, _) = app_with(&midi, &[], &config());

        app.toggle_selected();
        assert!(app.is_midi_connected("Keystation 49"));

        midi.emit("Keystation 49", &[0x90, 60, 0], 0);
        app.process_events();
        assert_eq!(
            app.display.back().map(String::as_str),
            Some("MIDI [Keystation 49]: 90 3C 00 - Note Off, Channel 1, Note 60")
        );

        app.toggle_interpret();
        midi.emit("Keystation 49", &[0x90, 60, 0], 0);
        app.process_events();
        assert_eq!(app.display.back().map(String::as_str), Some("MIDI [Keystation 49]: 90 3C 00"));

        app.toggle_selected();
        assert!(!app.is_midi_connected("Keystation 49"));
    }

    #[test]
    fn test_port_filter() {
        let midi = MockMidiBackend::new(&["Keystation 49", "IAC Driver Bus 1"], &[]);
        let (mut app, _) = app_with(&midi, &[], &config());

        assert_eq!(app.visible_midi_ports().len(), 2);
        app.cycle_port_filter();
        assert_eq!(app.visible_midi_ports(), ["Keystation 49".to_string()]);
        app.cycle_port_filter();
        assert_eq!(app.visible_midi_ports(), ["IAC Driver Bus 1".to_string()]);
        app.cycle_port_filter();
        assert_eq!(app.port_filter, PortFilter::All);
    }

    #[test]
    fn test_display_is_bounded() {
        let mut config = config();
        config.display.max_lines = 5;
        let midi = MockMidiBackend::new(&["Keystation 49"], &[]);
        let (mut app, _) = app_with(&midi, &[], &config);
        app.toggle_selected();

        for note in 0..20 {
            midi.emit("Keystation 49", &[0x90, note, 1], 0);
        }
        app.process_events();

        assert_eq!(app.display.len(), 5);
        assert!(app.display.back().unwrap().contains("Note 19"));
    }

    #[test]
    fn test_paused_view_is_frozen() {
        let midi = MockMidiBackend::new(&["Keystation 49"], &[]);
        let (mut app, _) = app_with(&midi, &[], &config());
        app.toggle_selected();

        app.toggle_auto_scroll();
        let frozen = app.visible_lines().len();
        midi.emit("Keystation 49", &[0xB0, 1, 2], 0);
        app.process_events();
        assert_eq!(app.visible_lines().len(), frozen);

        app.toggle_auto_scroll();
        assert_eq!(app.visible_lines().len(), frozen + 1);

        app.clear_display();
        assert!(app.visible_lines().is_empty());
    }

    #[test]
    fn test_send_test_note() {
        let midi = MockMidiBackend::new(&["Synth"], &["Synth"]);
        let (mut app, _) = app_with(&midi, &[], &config());

        app.send_test_note();
        assert_eq!(midi.sent(), vec![("Synth".to_string(), TEST_NOTE_ON.to_vec())]);

        std::thread::sleep(TEST_NOTE_LENGTH + Duration::from_millis(20));
        app.process_events();
        assert_eq!(midi.sent().last().map(|(_, b)| b.clone()), Some(TEST_NOTE_OFF.to_vec()));
    }

    #[test]
    fn test_overlapping_test_notes_all_end() {
        let midi = MockMidiBackend::new(&["Synth A", "Synth B"], &["Synth A", "Synth B"]);
        let (mut app, _) = app_with(&midi, &[], &config());

        app.send_test_note();
        app.handle_key_down();
        app.send_test_note();

        std::thread::sleep(TEST_NOTE_LENGTH + Duration::from_millis(20));
        app.process_events();

        let sent = midi.sent();
        for port in ["Synth A", "Synth B"] {
            assert!(
                sent.contains(&(port.to_string(), TEST_NOTE_OFF.to_vec())),
                "no note off for {}: {:?}",
                port,
                sent
            );
        }
        assert_eq!(sent.len(), 4);
    }

    #[test]
    fn test_send_test_note_input_only() {
        let midi = MockMidiBackend::new(&["Keystation 49"], &[]);
        let (mut app, _) = app_with(&midi, &[], &config());

        app.send_test_note();
        assert!(midi.sent().is_empty());
        assert!(app.display.iter().any(|l| l.contains("is not a MIDI output")));
    }

    #[test]
    fn test_create_virtual_port_refreshes() {
        let midi = MockMidiBackend::new(&[], &[]);
        let (mut app, _) = app_with(&midi, &[], &config());

        app.create_virtual_port();
        assert_eq!(app.midi_ports.virtual_ports, vec!["Inspektr Virtual Port Output".to_string()]);
        assert_eq!(app.midi_outputs, vec!["Inspektr Virtual Port Input".to_string()]);
        assert_eq!(app.virtual_port_names(), vec!["Inspektr Virtual Port".to_string()]);
    }

    #[test]
    fn test_hid_failure_is_reported_and_reaped() {
        let device = HidDescriptor::new("/dev/hidraw3", 0x17cc, 0x2305).with_strings("NI", "X1");
        let midi = MockMidiBackend::new(&[], &[]);
        let (mut app, feeds) = app_with(&midi, &[device.clone()], &config());

        app.handle_tab();
        app.toggle_selected();
        assert!(app.is_hid_connected("/dev/hidraw3"));

        feeds[0].report(&[0xAB]);
        assert!(wait_for_line(&mut app, "HID [NI X1 (17cc:2305)]: AB"));

        feeds[0].fail();
        assert!(wait_for_line(&mut app, "HID device NI X1 (17cc:2305) stopped"));
        assert!(!app.is_hid_connected("/dev/hidraw3"));

        // Enter reconnects instead of trying to disconnect the stale entry
        app.toggle_selected();
        assert!(app.is_hid_connected("/dev/hidraw3"));
        app.shutdown();
        assert!(!app.is_hid_connected("/dev/hidraw3"));
    }

    #[test]
    fn test_shutdown_closes_everything() {
        let device = HidDescriptor::new("/dev/hidraw0", 1, 2);
        let midi = MockMidiBackend::new(&["Keystation 49"], &[]);
        let (mut app, feeds) = app_with(&midi, &[device], &config());

        app.toggle_selected();
        app.handle_tab();
        app.toggle_selected();

        app.shutdown();
        assert!(!app.is_midi_connected("Keystation 49"));
        assert!(!app.is_hid_connected("/dev/hidraw0"));
        assert_eq!(midi.callback_count(), 0);
        assert!(feeds[0].is_closed());
    }
}

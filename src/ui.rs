use crate::app::{App, PaneFocus};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph},
    Frame,
};

const CONNECTED_MARKER: &str = "► ";

pub fn render(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Title
            Constraint::Min(10),   // Devices + monitor
            Constraint::Length(1), // Help
        ])
        .split(f.area());

    render_title(f, chunks[0], app);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(35), Constraint::Percentage(65)])
        .split(chunks[1]);

    let devices = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(body[0]);

    render_midi_ports(f, devices[0], app);
    render_hid_devices(f, devices[1], app);
    render_monitor(f, body[1], app);
    render_help(f, chunks[2], app);
}

fn render_title(f: &mut Frame, area: Rect, app: &App) {
    let flag = |on: bool| if on { "on" } else { "off" };
    let mut spans = vec![
        Span::styled(
            "MIDI/HID Inspektr",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            format!(
                "   timestamps: {}  interpret: {}  auto-scroll: {}",
                flag(app.show_timestamps),
                flag(app.interpret_midi()),
                flag(app.auto_scroll())
            ),
            Style::default().fg(Color::DarkGray),
        ),
    ];
    let virtual_ports = app.virtual_port_names();
    if !virtual_ports.is_empty() {
        spans.push(Span::styled(
            format!("   hosting: {}", virtual_ports.join(", ")),
            Style::default().fg(Color::LightGreen),
        ));
    }
    let title = Paragraph::new(Line::from(spans)).block(Block::default().borders(Borders::ALL));
    f.render_widget(title, area);
}

fn border_style(active: bool) -> Style {
    if active {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default()
    }
}

fn device_item(label: String, selected: bool, connected: bool, highlight: Option<Color>) -> ListItem<'static> {
    let prefix = if connected { CONNECTED_MARKER } else { "  " };
    let mut style = match highlight {
        Some(color) => Style::default().fg(color),
        None => Style::default(),
    };
    if connected {
        style = style.fg(Color::Green);
    }
    if selected {
        style = style.add_modifier(Modifier::BOLD | Modifier::REVERSED);
    }
    ListItem::new(format!("{}{}", prefix, label)).style(style)
}

fn render_midi_ports(f: &mut Frame, area: Rect, app: &App) {
    let active = app.focus == PaneFocus::Midi;
    let ports = app.visible_midi_ports();

    let items: Vec<ListItem> = if ports.is_empty() {
        vec![ListItem::new(format!("No {} MIDI ports found", app.port_filter))
            .style(Style::default().fg(Color::DarkGray))]
    } else {
        ports
            .iter()
            .enumerate()
            .map(|(idx, port)| {
                let is_virtual = app.midi_ports.virtual_ports.contains(port);
                device_item(
                    port.clone(),
                    active && idx == app.selected_midi_idx,
                    app.is_midi_connected(port),
                    is_virtual.then_some(Color::LightGreen),
                )
            })
            .collect()
    };

    let list = List::new(items).block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!("MIDI PORTS ({})", app.port_filter))
            .border_style(border_style(active)),
    );
    f.render_widget(list, area);
}

fn render_hid_devices(f: &mut Frame, area: Rect, app: &App) {
    let active = app.focus == PaneFocus::Hid;

    let items: Vec<ListItem> = if app.hid_devices.is_empty() {
        vec![ListItem::new("No HID devices found").style(Style::default().fg(Color::DarkGray))]
    } else {
        app.hid_devices
            .iter()
            .enumerate()
            .map(|(idx, device)| {
                device_item(
                    device.display_name(),
                    active && idx == app.selected_hid_idx,
                    app.is_hid_connected(&device.path),
                    None,
                )
            })
            .collect()
    };

    let list = List::new(items).block(
        Block::default()
            .borders(Borders::ALL)
            .title("HID DEVICES")
            .border_style(border_style(active)),
    );
    f.render_widget(list, area);
}

fn line_style(line: &str) -> Style {
    if line.starts_with("STATUS:") || line.starts_with("----") {
        Style::default().fg(Color::Yellow)
    } else if line.contains("HID [") {
        Style::default().fg(Color::Magenta)
    } else {
        Style::default()
    }
}

fn render_monitor(f: &mut Frame, area: Rect, app: &App) {
    let lines = app.visible_lines();
    // Only the tail that fits inside the borders
    let height = area.height.saturating_sub(2) as usize;
    let start = lines.len().saturating_sub(height);

    let text: Vec<Line> = lines[start..]
        .iter()
        .map(|line| Line::styled(line.to_string(), line_style(line)))
        .collect();

    let title = if app.auto_scroll() { "MONITOR" } else { "MONITOR (paused)" };
    let paragraph = Paragraph::new(text).block(Block::default().borders(Borders::ALL).title(title));
    f.render_widget(paragraph, area);
}

fn render_help(f: &mut Frame, area: Rect, app: &App) {
    let help_text = if app.show_help {
        "[Enter] Connect/Disconnect | [n] Test Note | [v] Virtual Port | [f] Port Filter | [t] Timestamps | [i] Interpret | [p] Pause | [c] Clear | [R] Refresh"
    } else {
        "[↑↓] Navigate | [Tab] Switch Pane | [Enter] Connect/Disconnect | [?] More | [q] Quit"
    };

    let paragraph = Paragraph::new(help_text).style(Style::default().fg(Color::DarkGray));
    f.render_widget(paragraph, area);
}

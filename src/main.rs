mod aggregator;
mod app;
mod catalog;
mod config;
mod endpoint;
mod error;
mod events;
mod hid;
mod midi;
mod source;
mod ui;

use anyhow::{Context, Result};
use app::App;
use clap::Parser;
use config::Config;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use env_logger::Env;
use hid::{HidSession, HidapiBackend};
use midi::{MidiSession, MidirBackend};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::fs::OpenOptions;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Live MIDI and HID traffic inspector
#[derive(Debug, Parser)]
#[command(name = "inspektr", version, about)]
struct Cli {
    /// TOML configuration file
    #[arg(long, env = "INSPEKTR_CONFIG")]
    config: Option<PathBuf>,

    /// Where to write the log while the TUI is running
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Print MIDI ports and HID devices, then exit
    #[arg(long)]
    scan: bool,

    /// Create a virtual MIDI port pair and keep it open until Enter is pressed
    #[arg(long, value_name = "NAME")]
    create_virtual: Option<String>,
}

fn init_logging(log_file: Option<&Path>) -> Result<()> {
    let mut builder = env_logger::Builder::from_env(Env::default().default_filter_or("info"));
    if let Some(path) = log_file {
        // The terminal belongs to the TUI
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("opening log file {}", path.display()))?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
    }
    builder.init();
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load_or_default(cli.config.as_deref()).context("loading configuration")?;

    if cli.scan {
        init_logging(None)?;
        scan_and_exit(&config);
        return Ok(());
    }

    if let Some(name) = &cli.create_virtual {
        init_logging(None)?;
        return create_virtual_and_wait(&config, name);
    }

    let log_file = cli.log_file.clone().unwrap_or_else(|| config.log_file());
    init_logging(Some(&log_file))?;
    log::info!("starting inspektr {}", env!("CARGO_PKG_VERSION"));

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(
        &config,
        Box::new(MidirBackend::new(&config.midi.client_name, config.midi.ignore_timing)),
        Box::new(HidapiBackend::new()),
    );
    app.initialize();

    let result = run_app(&mut terminal, &mut app);

    // No poll thread may outlive the terminal
    app.shutdown();

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    result.context("application error")
}

/// CLI mode: print the catalog and exit
fn scan_and_exit(config: &Config) {
    let (event_tx, _event_rx) = crossbeam::channel::unbounded();
    let aggregator = aggregator::Aggregator::new(event_tx, false);
    let midi = MidiSession::new(
        Box::new(MidirBackend::new(&config.midi.client_name, config.midi.ignore_timing)),
        aggregator.clone(),
    );
    let mut hid = HidSession::new(Box::new(HidapiBackend::new()), aggregator, config.hid.poll_settings());

    let ports = midi.list_ports_by_class();
    println!("\n=== MIDI Ports ===");
    println!("Physical ports ({}):", ports.physical_ports.len());
    for port in &ports.physical_ports {
        println!("  - {}", port);
    }
    println!("\nVirtual ports ({}):", ports.virtual_ports.len());
    for port in &ports.virtual_ports {
        println!("  - {}", port);
    }

    let devices = hid.list_devices();
    println!("\n=== HID Devices ({}) ===", devices.len());
    for device in &devices {
        println!("  - {} [{}]", device, device.details());
        println!("    {}", device.path);
    }
    println!();
}

/// CLI mode: create a virtual port pair and hold it open
fn create_virtual_and_wait(config: &Config, name: &str) -> Result<()> {
    let (event_tx, _event_rx) = crossbeam::channel::unbounded();
    let mut midi = MidiSession::new(
        Box::new(MidirBackend::new(&config.midi.client_name, config.midi.ignore_timing)),
        aggregator::Aggregator::new(event_tx, false),
    );

    midi.create_virtual_port(name)
        .with_context(|| format!("creating virtual MIDI port '{}'", name))?;
    println!("Created virtual MIDI port: {}", name);
    println!("Press Enter to remove it and exit.");

    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    midi.close_all();
    Ok(())
}

fn run_app<B: ratatui::backend::Backend>(terminal: &mut Terminal<B>, app: &mut App) -> io::Result<()> {
    loop {
        // Process any pending device events
        app.process_events();

        // Draw UI
        terminal.draw(|f| ui::render(f, app))?;

        // Handle keyboard input with timeout
        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                match key.code {
                    KeyCode::Char('q') => app.quit(),
                    KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => app.quit(),
                    KeyCode::Char('R') | KeyCode::Char('r') => app.handle_refresh(),
                    KeyCode::Up | KeyCode::Char('k') => app.handle_key_up(),
                    KeyCode::Down | KeyCode::Char('j') => app.handle_key_down(),
                    KeyCode::Tab => app.handle_tab(),
                    KeyCode::Enter | KeyCode::Char(' ') => app.toggle_selected(),
                    KeyCode::Char('n') => app.send_test_note(),
                    KeyCode::Char('v') => app.create_virtual_port(),
                    KeyCode::Char('f') => app.cycle_port_filter(),
                    KeyCode::Char('t') => app.toggle_timestamps(),
                    KeyCode::Char('i') => app.toggle_interpret(),
                    KeyCode::Char('p') => app.toggle_auto_scroll(),
                    KeyCode::Char('c') => app.clear_display(),
                    KeyCode::Char('?') => app.toggle_help(),
                    _ => {}
                }
            }
        }

        if app.should_quit {
            break;
        }
    }

    Ok(())
}

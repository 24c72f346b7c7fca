// src/main.rs

use clap::Parser;
use color_eyre::eyre::{Result, WrapErr};
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use ratatui::prelude::*;
use std::io::stdout;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

mod app;
mod cli;
mod config;
mod core;
mod logging;
mod ui;

use app::{App, InputMode};
use cli::{Cli, Command};
use config::{default_config_path, AppConfig};
use crate::core::commands::CommandDispatcher;
use crate::core::http::build_client;
use crate::core::models::{PrinterCommand, ScanTrigger};
use crate::core::scanner::probe::{MoonrakerProbe, NetworkProbe};

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    let config_path = cli.config.clone().unwrap_or_else(default_config_path);
    let mut config = AppConfig::load(&config_path);
    logging::initialize_logging(&config.log_level)?;
    info!(config = %config_path.display(), hosts = config.hosts.len(), "Starting up.");

    let client = build_client().wrap_err("cannot build HTTP client")?;
    let probe: Arc<dyn NetworkProbe> = Arc::new(MoonrakerProbe::new(client.clone(), &config.scanner));
    let dispatcher = CommandDispatcher::new(client, config.scanner.port, config.scanner.command_timeout());

    let result = match cli.command.unwrap_or(Command::Tui) {
        Command::Tui => run_tui(App::new(config, config_path, probe, dispatcher)).await,
        Command::Scan => {
            cli::run_headless_scan(ScanTrigger::ManualScan, &mut config, &config_path, probe, &mut stdout()).await
        }
        Command::Refresh => {
            cli::run_headless_scan(ScanTrigger::ManualRefresh, &mut config, &config_path, probe, &mut stdout())
                .await
        }
        Command::Send { address, command } => cli::run_send(&dispatcher, address, &command, &mut stdout()).await,
    };

    if let Err(e) = &result {
        error!(error = ?e, "Exiting with error.");
    }
    result
}

async fn run_tui(mut app: App) -> Result<()> {
    // --- Setup ---
    stdout().execute(EnterAlternateScreen)?;
    stdout().execute(EnableMouseCapture)?;
    enable_raw_mode()?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;
    terminal.clear()?;

    let outcome = event_loop(&mut terminal, &mut app).await;
    // Scans must not outlive the interface, whatever ended the loop.
    if !app.should_quit {
        app.quit();
    }

    // --- Restore Terminal ---
    stdout().execute(LeaveAlternateScreen)?;
    stdout().execute(DisableMouseCapture)?;
    disable_raw_mode()?;
    outcome
}

async fn event_loop<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<()> {
    if app.config.auto_refresh {
        app.start_scan(ScanTrigger::AutoRefresh);
    }

    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        if event::poll(Duration::from_millis(100))? {
            handle_events(app)?;
        }

        app.pump();
        app.on_tick();
        // Let spawned probes and command tasks make progress between frames.
        tokio::task::yield_now().await;
    }
    Ok(())
}

fn handle_events(app: &mut App) -> Result<()> {
    if let Event::Key(key) = event::read()? {
        if key.kind == KeyEventKind::Press {
            match app.input_mode {
                InputMode::Normal => handle_normal_input(app, key.code),
                _ => handle_prompt_input(app, key.code),
            }
        }
    }
    Ok(())
}

/// Key bindings while no prompt is open.
fn handle_normal_input(app: &mut App, key_code: KeyCode) {
    match key_code {
        KeyCode::Char('q') => app.quit(),
        KeyCode::Char('s') => {
            app.start_scan(ScanTrigger::ManualScan);
        }
        KeyCode::Char('r') => {
            app.start_scan(ScanTrigger::ManualRefresh);
        }
        KeyCode::Char('a') => app.begin_input(InputMode::AddHost),
        KeyCode::Char('n') => app.begin_input(InputMode::AddSubnet),
        KeyCode::Char('N') => app.remove_last_subnet(),
        KeyCode::Char('e') => app.begin_rename(),
        KeyCode::Char('d') | KeyCode::Delete => app.remove_selected(),
        KeyCode::Char('t') => app.send_command(PrinterCommand::Start),
        KeyCode::Char('p') => app.send_command(PrinterCommand::Pause),
        KeyCode::Char('c') => app.send_command(PrinterCommand::Cancel),
        KeyCode::Char('x') => app.send_command(PrinterCommand::EmergencyStop),
        KeyCode::Char('f') => app.toggle_auto_refresh(),
        KeyCode::Char('l') => app.show_logs = !app.show_logs,
        KeyCode::Up => app.select_previous(),
        KeyCode::Down => app.select_next(),
        KeyCode::Left => app.scroll_logs_left(),
        KeyCode::Right => app.scroll_logs_right(),
        _ => {}
    }
}

/// Key bindings while the operator is typing into the prompt.
fn handle_prompt_input(app: &mut App, key_code: KeyCode) {
    match key_code {
        KeyCode::Esc => app.cancel_input(),
        KeyCode::Enter => app.submit_input(),
        KeyCode::Backspace => {
            app.input.pop();
        }
        KeyCode::Char(c) => app.input.push(c),
        _ => {}
    }
}

//! ticketpin - a terminal client for browsing, pinning, and exporting JIRA
//! tickets.

mod api;
mod app;
mod config;
mod effects;
mod error;
mod events;
mod logging;
mod store;
mod tasks;
mod ui;

use std::io;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    event::{DisableBracketedPaste, EnableBracketedPaste},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing::{error, warn};

use app::{App, Command};
use config::Config;
use error::AppError;
use effects::{FsExportWriter, SystemBrowser};
use events::EventHandler;
use tasks::{create_task_channel, TaskSpawner};

/// Browse, pin, and export JIRA tickets from the terminal.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Path of the config file [default: ticketpin.toml beside the executable]
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

type Tui = Terminal<CrosstermBackend<io::Stdout>>;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Err(e) = logging::init() {
        eprintln!("Warning: failed to initialize logging: {:#}", e);
    }

    let config_path = cli.config.unwrap_or_else(Config::default_path);
    let (config, load_error) = Config::load_or_default(&config_path);

    let mut terminal = setup_terminal().context("Failed to set up terminal")?;
    let mut app = App::new(
        &config,
        Box::new(SystemBrowser),
        Box::new(FsExportWriter::new()),
    );
    let keep_config_file = load_error.is_some();
    if let Some(e) = load_error {
        app.handle_error(&AppError::from(e));
    }

    let result = run(&mut terminal, &mut app);

    if let Err(e) = restore_terminal(&mut terminal) {
        error!(error = %e, "Failed to restore terminal");
    }

    // A file that failed to load is left for the user to fix
    if keep_config_file {
        warn!(path = %config_path.display(), "Config file left unchanged");
    } else if let Err(e) = app.config().save_to(&config_path) {
        warn!(error = %e, "Failed to save config");
        eprintln!("Warning: {}", e);
    }

    if let Err(e) = &result {
        error!(error = %e, "Event loop failed");
        if let Some(dir) = logging::log_directory() {
            eprintln!("Logs are in {}", dir.display());
        }
    }

    logging::shutdown();
    result
}

/// Draw, read the next event, update, and apply finished background work
/// until the app asks to quit.
fn run(terminal: &mut Tui, app: &mut App) -> Result<()> {
    let events = EventHandler::new();
    let (spawner, mut rx) = create_task_channel();

    while !app.should_quit() {
        terminal.draw(|frame| app.view(frame))?;

        let event = events.next()?;
        if let Some(command) = app.update(event) {
            dispatch(&spawner, command);
        }

        while let Ok(message) = rx.try_recv() {
            app.handle_message(message);
        }
    }
    Ok(())
}

fn dispatch(spawner: &TaskSpawner, command: Command) {
    match command {
        Command::FetchLatest { client, request } => spawner.spawn_fetch_latest(&client, request),
        Command::Search { client, request } => spawner.spawn_search(&client, request),
        Command::FetchDetails { client, key } => spawner.spawn_fetch_details(&client, key),
    }
}

fn setup_terminal() -> Result<Tui> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableBracketedPaste)?;

    // Leave the alternate screen before a panic message is printed
    let hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen, DisableBracketedPaste);
        hook(info);
    }));

    Ok(Terminal::new(CrosstermBackend::new(stdout))?)
}

fn restore_terminal(terminal: &mut Tui) -> Result<()> {
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableBracketedPaste
    )?;
    terminal.show_cursor()?;
    Ok(())
}

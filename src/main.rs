use std::fs::OpenOptions;
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing::info;
use tracing_subscriber::EnvFilter;

use jobwatch::{
    BuildDirectory, CommandPlayer, Exit, MonitorSession, Settings, TerminalInput, Theme,
    ThemeChoice,
};

#[derive(Parser, Debug)]
#[command(name = "jobwatch")]
#[command(about = "Live terminal dashboard for a running build")]
struct Args {
    /// Directory with the exported build state (build.json, stages.json, server.json)
    dir: PathBuf,

    /// Settings file (defaults to ./jobwatch.toml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Start with sound notifications enabled
    #[arg(short, long)]
    sound: bool,

    /// Refresh tick (e.g., "100ms", "1s")
    #[arg(short, long)]
    tick: Option<String>,

    /// Color theme: auto, dark or light
    #[arg(long)]
    theme: Option<ThemeChoice>,

    /// Write logs to this file (filtered by RUST_LOG)
    #[arg(long)]
    log_file: Option<PathBuf>,
}

fn main() -> ExitCode {
    let args = Args::parse();
    match run(args) {
        Ok(exit) => ExitCode::from(exit.code() as u8),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<Exit> {
    let mut settings = Settings::load(args.config.as_deref())?;
    if args.sound {
        settings.sound = true;
    }
    if let Some(tick) = args.tick {
        settings.tick = tick;
    }
    if let Some(theme) = args.theme {
        settings.theme = theme;
    }
    if let Some(log_file) = args.log_file {
        settings.log_file = Some(log_file);
    }
    if let Some(path) = &settings.log_file {
        init_tracing(path)?;
    }
    let config = settings.resolve()?;

    let dir = BuildDirectory::new(&args.dir);
    if !dir.root().is_dir() {
        bail!("{} is not a directory", dir.root().display());
    }
    info!(dir = %dir.root().display(), "starting jobwatch");

    // Detect the theme before raw mode takes over the terminal
    let theme = Theme::from_choice(config.theme);
    let mut session = MonitorSession::new(
        config,
        theme,
        Box::new(dir.clone()),
        Arc::new(CommandPlayer::default()),
    );
    session.start(dir.feeds())?;

    let exit = run_tui(&mut session);
    session.shutdown();
    let exit = exit?;

    if exit == Exit::ShowLogs {
        session.actions_mut().show_logs()?;
    }
    Ok(exit)
}

/// Run the dashboard in the alternate screen, restoring the terminal afterwards.
fn run_tui(session: &mut MonitorSession) -> Result<Exit> {
    // Setup terminal, undoing whatever part of it succeeded on failure
    let mut terminal = setup_or_restore(
        || {
            enable_raw_mode().context("terminal does not support raw mode")?;
            let mut stdout = io::stdout();
            execute!(stdout, EnterAlternateScreen)?;
            Ok(Terminal::new(CrosstermBackend::new(stdout))?)
        },
        restore_terminal,
    )?;

    // Setup panic hook to restore terminal
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic| {
        restore_terminal();
        original_hook(panic);
    }));

    let result = session.run(&mut terminal, &mut TerminalInput);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

/// Run `setup`, calling `restore` before returning its error.
fn setup_or_restore<T>(setup: impl FnOnce() -> Result<T>, restore: impl FnOnce()) -> Result<T> {
    setup().inspect_err(|_| restore())
}

/// Best-effort terminal restore for error and panic paths.
fn restore_terminal() {
    let _ = disable_raw_mode();
    let _ = execute!(io::stdout(), LeaveAlternateScreen);
}

/// Install a file-backed subscriber; the terminal itself belongs to the dashboard.
fn init_tracing(path: &Path) -> Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("opening log file {}", path.display()))?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init()
        .map_err(|e| anyhow!("installing log subscriber: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_failed_setup_restores_terminal() {
        let restored = Cell::new(false);
        let result: Result<()> = setup_or_restore(
            || bail!("entering alternate screen: not a tty"),
            || restored.set(true),
        );
        assert!(result.is_err());
        assert!(restored.get());
    }

    #[test]
    fn test_successful_setup_keeps_terminal() {
        let restored = Cell::new(false);
        let value = setup_or_restore(|| Ok(3), || restored.set(true)).unwrap();
        assert_eq!(value, 3);
        assert!(!restored.get());
    }
}

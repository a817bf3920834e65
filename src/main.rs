use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::{fs::OpenOptions, io, path::PathBuf, sync::Mutex};
use taskers::ui::{run_app, App};
use taskers::{JsonFileStore, KanbanBoard};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Terminal task board: Planned → In Progress → Testing → Done.
#[derive(Parser, Debug)]
#[command(name = "taskers", version, about)]
struct Cli {
    /// Board snapshot file
    #[arg(long, env = "TASKERS_BOARD", default_value = "kanban_board.json")]
    board: PathBuf,

    /// Log file (the terminal belongs to the board)
    #[arg(long, env = "TASKERS_LOG", default_value = "taskers.log")]
    log_file: PathBuf,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn init_tracing(cli: &Cli) -> Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&cli.log_file)
        .with_context(|| format!("cannot open log file {}", cli.log_file.display()))?;
    let default = if cli.verbose {
        "taskers=debug"
    } else {
        "taskers=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli)?;

    // Refuse to start on an unreadable board rather than overwrite it on the first save.
    let board = KanbanBoard::open(JsonFileStore::new(&cli.board))
        .with_context(|| format!("cannot load board from {}", cli.board.display()))?;
    info!(path = %cli.board.display(), tasks = board.len(), "board opened");
    let mut app = App::new(board);

    // Terminal setup
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, &mut app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = app.board.save() {
        error!(error = %err, "final save failed");
        eprintln!("Failed to save tasks: {}", err);
    }

    result.context("board session ended with an error")
}

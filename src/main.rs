use std::fs::File;
use std::io::{self, IsTerminal, Read};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use crossterm::event::{self, Event as CEvent, KeyEventKind};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::{execute, ExecutableCommand};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use tracing::info;
use tracing_subscriber::EnvFilter;

use waypoint::app::App;
use waypoint::catalog::Catalog;
use waypoint::itinerary;
use waypoint::model::{Event, SortMode};

#[derive(Debug, Parser)]
#[command(
    name = "waypoint",
    version,
    about = "Plan and edit a trip itinerary in the terminal"
)]
struct Cli {
    /// Itinerary JSON file. Use '-' to read from stdin.
    input: Option<String>,

    /// Offer and destination catalog (JSON). Defaults to the built-in one.
    #[arg(long, value_name = "PATH")]
    catalog: Option<PathBuf>,

    /// Initial order: default (by day), time or price.
    #[arg(long, default_value_t = SortMode::Default)]
    sort: SortMode,

    /// Force interactive mode.
    #[arg(short, long, conflicts_with = "plain")]
    interactive: bool,

    /// Print the timeline once and exit.
    #[arg(long)]
    plain: bool,

    /// Reload when the itinerary file changes (file input only).
    #[arg(long)]
    watch: bool,

    /// Write logs here. Without it interactive mode does not log.
    #[arg(long, value_name = "PATH")]
    log_file: Option<PathBuf>,
}

enum InputSource {
    File(PathBuf),
    Stdin,
    Empty,
}

fn detect_input(cli: &Cli) -> InputSource {
    match cli.input.as_deref() {
        Some("-") => InputSource::Stdin,
        Some(path) => InputSource::File(PathBuf::from(path)),
        None if io::stdin().is_terminal() => InputSource::Empty,
        None => InputSource::Stdin,
    }
}

fn read_input(source: &InputSource, catalog: &Catalog) -> Result<Vec<Event>> {
    match source {
        InputSource::File(path) => itinerary::load(path, catalog)
            .with_context(|| format!("Failed to load {}", path.display())),
        InputSource::Stdin => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read itinerary from stdin")?;
            itinerary::parse(&buf, catalog).context("Failed to parse itinerary from stdin")
        }
        InputSource::Empty => Ok(Vec::new()),
    }
}

fn load_catalog(path: Option<&Path>) -> Result<Catalog> {
    match path {
        Some(path) => {
            Catalog::load(path).with_context(|| format!("Failed to load catalog {}", path.display()))
        }
        None => Ok(Catalog::builtin()),
    }
}

fn is_tty_stdout() -> bool {
    io::stdout().is_terminal()
}

fn default_interactive(input: &InputSource) -> bool {
    !matches!(input, InputSource::Stdin) && is_tty_stdout()
}

fn init_logging(log_file: Option<&Path>, interactive: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match log_file {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create log file {}", path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init()
                .map_err(|err| anyhow!("Failed to install logger: {err}"))?;
        }
        None if !interactive => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(io::stderr)
                .try_init()
                .map_err(|err| anyhow!("Failed to install logger: {err}"))?;
        }
        None => {}
    }
    Ok(())
}

struct TerminalGuard;

impl TerminalGuard {
    fn enter() -> Result<Self> {
        enable_raw_mode()?;
        io::stdout().execute(EnterAlternateScreen)?;
        Ok(Self)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
    }
}

fn run_interactive(mut app: App) -> Result<()> {
    let _guard = TerminalGuard::enter()?;
    app.ensure_watcher()?;

    let stdout = io::stdout();
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    loop {
        terminal.draw(|frame| app.draw(frame))?;

        if app.watch_requested {
            if let Err(err) = app.reload_current() {
                app.set_status(format!("Reload failed: {err:#}"));
            }
            app.watch_requested = false;
        }

        app.poll_watch();

        if event::poll(Duration::from_millis(120))? {
            match event::read()? {
                CEvent::Key(key) if key.kind == KeyEventKind::Press => {
                    if app.handle_key(key)? {
                        break;
                    }
                }
                _ => {}
            }
        }
    }

    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let input = detect_input(&cli);
    if cli.watch && !matches!(input, InputSource::File(_)) {
        return Err(anyhow!("--watch requires file input"));
    }

    let interactive = if cli.interactive {
        true
    } else if cli.plain {
        false
    } else {
        default_interactive(&input)
    };
    init_logging(cli.log_file.as_deref(), interactive)?;

    let catalog = Rc::new(load_catalog(cli.catalog.as_deref())?);
    let events = read_input(&input, &catalog)?;
    info!(events = events.len(), sort = %cli.sort, interactive, "starting");

    let path = match input {
        InputSource::File(path) => Some(path),
        InputSource::Stdin | InputSource::Empty => None,
    };
    let app = App::new(catalog, events, cli.sort, path, cli.watch);

    if !interactive {
        println!("{}", app.render_plain());
        return Ok(());
    }

    run_interactive(app)
}

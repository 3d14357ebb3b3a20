use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use crossterm::{
    event::Event,
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tokio::runtime::Runtime;
use tracing_subscriber::{fmt::writer::BoxMakeWriter, layer::SubscriberExt, util::SubscriberInitExt};

use srvwatch::duration::parse_duration;
use srvwatch::events::{self, Action};
use srvwatch::ui::{self, Theme};
use srvwatch::{App, Engine, Settings};
use srvwatch_core::{Expression, Resolver};

#[derive(Parser, Debug)]
#[command(name = "srvwatch", version)]
#[command(about = "Derived server metrics from pluggable monitors")]
struct Args {
    /// Config file (default: ./srvwatch.toml if present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Evaluate one expression, e.g. "mem.MemTotal - mem.MemFree"
    Eval { expr: String },

    /// Evaluate every configured computed variable once
    Compute {
        /// Print a JSON report per computed variable
        #[arg(long)]
        json: bool,
    },

    /// List the variables a monitor exposes
    Vars { monitor: String },

    /// Live dashboard with computed values and tracked-variable sparklines
    Watch {
        /// Recompute interval (e.g. "1s", "500ms")
        #[arg(short, long, default_value = "1s")]
        refresh: String,

        /// Write logs here; logging is off otherwise while the dashboard runs
        #[arg(long)]
        log_file: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    let log_writer = match &args.command {
        Command::Watch { log_file: Some(path), .. } => {
            let file = File::create(path)
                .with_context(|| format!("failed to create log file {}", path.display()))?;
            BoxMakeWriter::new(Mutex::new(file))
        }
        Command::Watch { log_file: None, .. } => BoxMakeWriter::new(io::sink),
        _ => BoxMakeWriter::new(io::stderr),
    };
    init_tracing(args.verbose, log_writer);

    let rt = Runtime::new()?;
    // monitor construction may need a runtime context (connection pools)
    let _guard = rt.enter();
    let engine = Settings::load(args.config.as_deref())?.build()?;

    match args.command {
        Command::Eval { expr } => eval(&rt, &engine, &expr),
        Command::Compute { json } => compute(&rt, &engine, json),
        Command::Vars { monitor } => vars(&rt, &engine, &monitor),
        Command::Watch { refresh, .. } => {
            let refresh = parse_duration(&refresh)?;
            watch(&rt, engine, refresh)
        }
    }
}

fn init_tracing(verbose: bool, writer: BoxMakeWriter) {
    let default = if verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(writer).with_ansi(false))
        .init();
}

fn eval(rt: &Runtime, engine: &Engine, text: &str) -> Result<()> {
    let expr = Expression::parse(text).with_context(|| format!("invalid expression '{}'", text))?;
    let value = rt.block_on(Resolver::new(&engine.registry).evaluate_one(&expr))?;
    println!("{}", value);
    Ok(())
}

fn compute(rt: &Runtime, engine: &Engine, json: bool) -> Result<()> {
    if engine.computed.is_empty() {
        bail!("no computed variables configured");
    }
    let values = rt.block_on(Resolver::new(&engine.registry).evaluate_batch(&engine.computed));

    if json {
        println!("{}", serde_json::to_string_pretty(&engine.report(&values))?);
        return Ok(());
    }
    for cv in &engine.computed {
        match values.get(&cv.name) {
            Some(v) => println!("{} = {}", cv.name, v),
            None => println!("{} = unavailable", cv.name),
        }
    }
    Ok(())
}

fn vars(rt: &Runtime, engine: &Engine, monitor: &str) -> Result<()> {
    let mut names = rt.block_on(engine.registry.list_variables(monitor))?;
    names.sort();
    for name in names {
        println!("{}", name);
    }
    Ok(())
}

fn watch(rt: &Runtime, engine: Engine, refresh: Duration) -> Result<()> {
    let tracking = engine.registry.start_tracking();
    let mut app = App::new(engine, Theme::auto_detect());
    let result = run_tui(rt, &mut app, refresh);
    tracking.stop();
    result
}

/// Set up the terminal, run the dashboard and restore the terminal.
fn run_tui(rt: &Runtime, app: &mut App, refresh: Duration) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        original_hook(panic);
    }));

    let result = run_app(rt, &mut terminal, app, refresh);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn run_app(
    rt: &Runtime,
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    refresh: Duration,
) -> Result<()> {
    rt.block_on(app.refresh());
    let mut last_refresh = Instant::now();

    while app.running {
        terminal.draw(|frame| ui::dashboard::render(frame, app))?;

        let mut refresh_now = false;
        if let Some(Event::Key(key)) = events::poll_event(Duration::from_millis(100))? {
            refresh_now = events::handle_key_event(app, key) == Action::Refresh;
        }

        if refresh_now || last_refresh.elapsed() >= refresh {
            rt.block_on(app.refresh());
            last_refresh = Instant::now();
        } else {
            // pick up tracker samples between recomputes
            app.reload_rows();
        }
    }

    Ok(())
}

mod app;
mod config;
mod logging;
mod report;
mod tui;
mod ui;

use std::fmt::Write as _;
use std::io::{self, IsTerminal, Write, stdout};
use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use clap::{ArgGroup, CommandFactory, Parser};
use color_eyre::Result;
use color_eyre::eyre::WrapErr;
use crossterm::{
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use crossbeam_channel::{Sender, TryRecvError};
use ratatui::{Terminal, backend::CrosstermBackend, style::Style, widgets::Widget};
use vanish_core::engine::workflow::RequestKind;
use vanish_core::{
    AuditSink, CacheEngine, CancellationToken, Effect, Executor, FileAuditLog, NullAudit, Phase,
    Request, Workflow, audit, run_to_completion,
};

use app::AppState;
use config::{Config, ConfigSource};
use tui::{AppEvent, EventHandler, handle_key};
use ui::{AppLayout, ConfirmView, Footer, Header, ProgressView, SummaryView, Theme, list_capacity};

/// vx - Move files to a restorable cache instead of deleting them
#[derive(Parser, Debug)]
#[command(name = "vx")]
#[command(about = "Safe rm replacement: deleted files stay restorable for a while")]
#[command(version)]
#[command(group(
    ArgGroup::new("mode")
        .args(["files", "clear", "restore", "list", "info", "stats", "log_stats", "purge", "path", "config_path"])
        .multiple(false)
))]
struct Args {
    /// Files and directories to move into the cache
    files: Vec<PathBuf>,

    /// Remove everything from the cache immediately
    #[arg(long)]
    clear: bool,

    /// Restore cached items whose id or original path matches a pattern
    #[arg(long, value_name = "PATTERN", num_args = 1..)]
    restore: Option<Vec<String>>,

    /// Show all cached items
    #[arg(long)]
    list: bool,

    /// Show details of cached items matching a pattern
    #[arg(long, value_name = "PATTERN")]
    info: Option<String>,

    /// Show cache statistics
    #[arg(long)]
    stats: bool,

    /// Show statistics of recorded operations
    #[arg(long)]
    log_stats: bool,

    /// Remove cached items older than N days
    #[arg(long, value_name = "DAYS")]
    purge: Option<u32>,

    /// Print the cache directory
    #[arg(long)]
    path: bool,

    /// Print the configuration file path
    #[arg(long)]
    config_path: bool,

    /// Skip confirmation unless an item is protected, large or sensitive
    #[arg(long)]
    noconfirm: bool,

    /// Use this configuration file instead of the default one
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
}

/// What one invocation does.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Run(Request),
    List,
    Info(String),
    Stats,
    LogStats,
    Path,
    ConfigPath,
    Usage,
}

impl Args {
    fn mode(&self) -> Command {
        if self.clear {
            Command::Run(Request::Clear)
        } else if let Some(patterns) = &self.restore {
            Command::Run(Request::Restore(patterns.clone()))
        } else if let Some(days) = self.purge {
            Command::Run(Request::Purge(days))
        } else if self.list {
            Command::List
        } else if let Some(pattern) = &self.info {
            Command::Info(pattern.clone())
        } else if self.stats {
            Command::Stats
        } else if self.log_stats {
            Command::LogStats
        } else if self.path {
            Command::Path
        } else if self.config_path {
            Command::ConfigPath
        } else if !self.files.is_empty() {
            Command::Run(Request::Delete(self.files.clone()))
        } else {
            Command::Usage
        }
    }
}

fn main() -> Result<()> {
    color_eyre::install()?;

    let args = Args::parse();
    let command = args.mode();

    let config_path = args.config.clone().or_else(config::default_path);
    match command {
        Command::Usage => {
            Args::command().print_help()?;
            return Ok(());
        }
        Command::ConfigPath => {
            match &config_path {
                Some(path) => println!("{}", path.display()),
                None => eprintln!("Error: cannot determine the home directory"),
            }
            return Ok(());
        }
        _ => {}
    }

    // An explicit --config file is never created
    let (config, source) = match &config_path {
        Some(path) => Config::load_or_init(path, args.config.is_none())?,
        None => (Config::default(), ConfigSource::Missing),
    };

    let interactive = matches!(command, Command::Run(_))
        && io::stdin().is_terminal()
        && io::stdout().is_terminal();
    logging::init(&config.logging, interactive)?;
    report_config_source(config_path.as_deref(), &source);

    let engine_config = config.engine_config(args.noconfirm)?;
    let retention_days = engine_config.retention_days;
    let log_dir = config.logging.resolved_directory();
    let sink: Arc<dyn AuditSink> = if config.logging.enabled {
        Arc::new(FileAuditLog::new(&log_dir, config.logging.audit_level()))
    } else {
        Arc::new(NullAudit)
    };
    let engine = CacheEngine::new(engine_config, sink);

    let mut out = String::new();
    match command {
        Command::Path => {
            writeln!(out, "{}", engine.cache_dir().display())?;
        }
        Command::List => {
            let entries = engine.list()?;
            report::write_list(&mut out, &entries, retention_days, Utc::now())?;
        }
        Command::Info(pattern) => {
            let entries = engine.info(&pattern)?;
            report::write_info(&mut out, &pattern, &entries, retention_days, Utc::now())?;
        }
        Command::Stats => {
            let stats = engine.stats()?;
            report::write_stats(&mut out, &stats, engine.cache_dir())?;
        }
        Command::LogStats => match audit::summarize(&log_dir) {
            Ok(summary) => report::write_log_stats(&mut out, &summary)?,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                writeln!(
                    out,
                    "No operations recorded. Statistics are kept when [logging] level = \"debug\"."
                )?;
            }
            Err(err) => {
                return Err(err).wrap_err_with(|| {
                    format!("failed to read {}", log_dir.join(audit::JSON_LOG).display())
                });
            }
        },
        Command::Run(request) => {
            let operation = operation_label(&request);
            let workflow = if interactive {
                run_tui(Arc::new(engine), request, &operation)?
            } else {
                run_to_completion(&engine, request, |workflow| {
                    confirm_on_stdin(workflow, retention_days)
                })
            };

            report::write_summary(&mut out, &workflow, retention_days)?;
            print!("{out}");
            io::stdout().flush()?;

            if workflow.phase() == Phase::Error || workflow.report().failed() > 0 {
                std::process::exit(1);
            }
            return Ok(());
        }
        Command::Usage | Command::ConfigPath => {}
    }

    print!("{out}");
    Ok(())
}

fn report_config_source(path: Option<&std::path::Path>, source: &ConfigSource) {
    let shown = path.map(|p| p.display().to_string()).unwrap_or_default();
    match source {
        ConfigSource::File => tracing::debug!(path = %shown, "loaded configuration"),
        ConfigSource::CreatedDefault => tracing::info!(path = %shown, "wrote default configuration"),
        ConfigSource::DefaultUnwritten(err) => tracing::warn!(
            path = %shown,
            error = %err,
            "could not write default configuration, using defaults"
        ),
        ConfigSource::Missing => tracing::warn!(path = %shown, "configuration not found, using defaults"),
    }
}

fn operation_label(request: &Request) -> String {
    match request {
        Request::Delete(paths) => ui::operation_label(RequestKind::Delete, paths.len(), None),
        Request::Restore(patterns) => {
            ui::operation_label(RequestKind::Restore, patterns.len(), None)
        }
        Request::Clear => ui::operation_label(RequestKind::Clear, 0, None),
        Request::Purge(days) => ui::operation_label(RequestKind::Purge, 0, Some(*days)),
    }
}

/// Ask on stderr, read the answer from stdin. Anything but yes declines.
fn confirm_on_stdin(workflow: &Workflow, retention_days: u32) -> bool {
    let mut prompt = String::new();
    if report::write_confirmation(&mut prompt, workflow, retention_days).is_err() {
        return false;
    }
    eprint!("{prompt}Proceed? [y/N] ");
    let _ = io::stderr().flush();

    let mut line = String::new();
    match io::stdin().read_line(&mut line) {
        Ok(0) | Err(_) => false,
        Ok(_) => matches!(line.trim(), "y" | "Y" | "yes" | "Yes"),
    }
}

fn run_tui(engine: Arc<CacheEngine>, request: Request, operation: &str) -> Result<Workflow> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    // Run app
    let result = run_app(&mut terminal, engine, request, operation);

    // Restore terminal
    disable_raw_mode()?;
    execute!(io::stdout(), LeaveAlternateScreen)?;

    result
}

fn send_all(tx: &Sender<Effect>, effects: Vec<Effect>) {
    for effect in effects {
        if tx.send(effect).is_err() {
            tracing::warn!("worker stopped, dropping effect");
            break;
        }
    }
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    engine: Arc<CacheEngine>,
    request: Request,
    operation: &str,
) -> Result<Workflow> {
    let theme = Theme::default();
    let event_handler = EventHandler::new(50); // 50ms tick rate
    let retention_days = engine.config().retention_days;
    let auto_confirm = engine.config().auto_confirm;

    let cancel_token = CancellationToken::new();
    let (effect_tx, message_rx, worker) = Executor::new(engine)
        .with_cancellation(cancel_token.clone())
        .spawn();

    let (workflow, effects) = Workflow::start(request, auto_confirm);
    let mut state = AppState::new(workflow, retention_days, cancel_token);
    send_all(&effect_tx, effects);

    loop {
        loop {
            let effects = match message_rx.try_recv() {
                Ok(message) => state.handle_worker(message),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    let effects = state.worker_lost();
                    send_all(&effect_tx, effects);
                    break;
                }
            };
            send_all(&effect_tx, effects);
        }

        // Draw UI
        terminal.draw(|frame| {
            let area = frame.area();
            let layout = AppLayout::new(area);

            // Background
            frame
                .buffer_mut()
                .set_style(area, Style::default().bg(theme.bg));

            let rows = state
                .workflow()
                .targets()
                .len()
                .max(state.workflow().candidates().len());
            state.visible_height = list_capacity(layout.body, rows);

            Header::new(&state, operation, &theme).render(layout.header, frame.buffer_mut());
            render_progress_bar(&state, &theme, layout.progress_bar, frame.buffer_mut());

            match state.phase() {
                Phase::Confirming => {
                    ConfirmView::new(&state, &theme).render(layout.body, frame.buffer_mut());
                }
                phase if phase.is_terminal() => {
                    SummaryView::new(&state, &theme).render(layout.body, frame.buffer_mut());
                }
                _ => {
                    ProgressView::new(&state, &theme).render(layout.body, frame.buffer_mut());
                }
            }

            Footer::new(&state, &theme).render(layout.footer, frame.buffer_mut());
        })?;

        match event_handler.next()? {
            AppEvent::Key(key) => {
                let action = handle_key(key, state.phase());
                let effects = state.handle_action(action);
                send_all(&effect_tx, effects);
            }
            AppEvent::Resize => {
                // Terminal will redraw on next loop
            }
            AppEvent::Tick => {
                state.tick_spinner();
            }
        }

        if state.should_quit {
            break;
        }
    }

    // Quitting while checking leaves the worker measuring; it only reads
    drop(effect_tx);
    if state.phase().is_terminal() && worker.join().is_err() {
        tracing::warn!("worker thread panicked");
    }

    Ok(state.into_workflow())
}

fn render_progress_bar(
    state: &AppState,
    theme: &Theme,
    area: ratatui::layout::Rect,
    buf: &mut ratatui::buffer::Buffer,
) {
    if area.width < 10 {
        return;
    }

    let workflow = state.workflow();
    let pct = workflow.progress() * 100.0;
    let bar_width = area.width.saturating_sub(8) as usize;
    let bar = ui::bar_chart::render_bar(pct, bar_width);
    let color = if workflow.phase().is_terminal() {
        theme.outcome_color(workflow.phase())
    } else {
        theme.blue
    };
    buf.set_string(area.x + 1, area.y, &bar, Style::default().fg(color));

    let label = format!("{pct:>3.0}%");
    buf.set_string(
        area.x + area.width - label.len() as u16 - 1,
        area.y,
        &label,
        Style::default().fg(theme.fg_dim),
    );
}

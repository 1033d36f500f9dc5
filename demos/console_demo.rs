// tui-devconsole/demos/console_demo.rs
use std::{fs::File, path::PathBuf, sync::Arc, sync::Mutex};

use anyhow::{Context, Result};
use clap::Parser;
use rand::Rng;
use ratatui::{
    crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseEvent},
    layout::Alignment,
    text::Line,
    widgets::{Block, Borders, Paragraph, Widget},
};
use serde_json::json;
use tracing::{error, info, warn};
use tracing_subscriber::{
    EnvFilter, Layer, fmt, fmt::writer::BoxMakeWriter, layer::SubscriberExt,
    util::SubscriberInitExt,
};
use tui_devconsole::{
    CaptureMode, ConsoleConfig, DevConsoleOverlay, FilterState, Scope, ScopeEvaluator, Tui,
    TuiApp, console_layer,
};

#[derive(Debug, Parser)]
#[command(about = "A host screen with the dev console floating over it")]
struct Args {
    /// JSON console settings
    #[arg(long)]
    config: Option<PathBuf>,
    /// Initial category filter: all, log, warn or error
    #[arg(long)]
    filter: Option<FilterState>,
    /// Only capture messages that pass the filter
    #[arg(long)]
    capture_matching: bool,
    /// Where the host's own log output goes while the console is closed
    #[arg(long)]
    log_file: Option<PathBuf>,
    /// Frames between generated host messages
    #[arg(long, default_value_t = 20)]
    every: u64,
}

struct ConsoleDemo {
    overlay: DevConsoleOverlay,
    frame: u64,
    every: u64,
    quit: bool,
}

impl ConsoleDemo {
    fn new(config: ConsoleConfig, every: u64) -> Result<Self> {
        let scope = Scope::new();
        scope.set("app", json!({"name": "console-demo", "version": env!("CARGO_PKG_VERSION")}))?;
        scope.set("users", json!([{"id": 1, "name": "ada"}, {"id": 2, "name": "grace"}]))?;
        scope.set("answer", json!(42))?;

        let overlay = DevConsoleOverlay::install(config, Arc::new(ScopeEvaluator::with_scope(scope)));
        info!("console demo started; F12 toggles the console");
        Ok(Self {
            overlay,
            frame: 0,
            every: every.max(1),
            quit: false,
        })
    }

    fn emit_host_message(&mut self) {
        let mut rng = rand::thread_rng();
        let request = rng.gen_range(1000..9999);
        match rng.gen_range(0..10) {
            0 => error!(request, "upstream timed out"),
            1 | 2 => warn!(request, latency_ms = rng.gen_range(300..900), "slow response"),
            _ => info!(request, "handled request"),
        }
    }
}

impl TuiApp for ConsoleDemo {
    fn before_frame(&mut self, #[allow(unused)] terminal: &tui_devconsole::TerminalBackend) {
        self.frame += 1;
        if self.frame % self.every == 0 {
            self.emit_host_message();
        }
        self.overlay.preprocess();
    }

    fn render(&mut self, frame: &mut tui_devconsole::TerminalFrame) {
        let area = frame.area();
        let state = if self.overlay.is_open() { "open" } else { "closed" };
        Paragraph::new(vec![
            Line::from("Host application"),
            Line::from(format!("frame {}", self.frame)),
            Line::from(format!("console {state}: F12 toggles, Ctrl+Q quits")),
        ])
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL).title(" demo "))
        .render(area, frame.buffer_mut());

        self.overlay.render(frame);
    }

    fn should_quit(&self) -> bool {
        self.quit
    }

    fn handle_mouse_events(&mut self, mouse_events: Vec<MouseEvent>) {
        for event in mouse_events {
            self.overlay.mouse_event(event);
        }
    }

    fn handle_key_events(&mut self, keys: Vec<KeyEvent>) {
        for key in keys {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            match key.code {
                KeyCode::F(12) => self.overlay.toggle(),
                KeyCode::Char('q') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                    self.quit = true;
                }
                KeyCode::Char('q') if !self.overlay.is_open() => self.quit = true,
                _ => {
                    self.overlay.key_event(key);
                }
            }
        }
    }
}

fn host_logging(log_file: Option<&PathBuf>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let writer = match log_file {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("creating log file {}", path.display()))?;
            BoxMakeWriter::new(Mutex::new(file))
        }
        None => BoxMakeWriter::new(std::io::sink),
    };
    // The host's filter only narrows its own output; the console sees every
    // INFO, WARN and ERROR event.
    tracing_subscriber::registry()
        .with(fmt::layer().with_ansi(false).with_writer(writer).with_filter(filter))
        .with(console_layer())
        .try_init()
        .context("installing host logging")?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    host_logging(args.log_file.as_ref())?;

    let mut config = match &args.config {
        Some(path) => ConsoleConfig::from_json_file(path)?,
        None => ConsoleConfig::default(),
    };
    if let Some(filter) = args.filter {
        config = config.with_initial_filter(filter);
    }
    if args.capture_matching {
        config = config.with_capture_mode(CaptureMode::MatchingFilter);
    }

    let app = ConsoleDemo::new(config, args.every)?;
    Tui::new()?.run(app)?;
    Ok(())
}

// tui-devconsole/src/tui/tui_app.rs
use anyhow::Result;
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture, KeyEvent, MouseEvent},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, prelude::CrosstermBackend};
use std::{
    io::stdout,
    time::{Duration, Instant},
};

use crate::tui::input_backend::{InputBackendOpts, InputHandler};

/// A host application driven by [`Tui::run`].
pub trait TuiApp {
    fn render(&mut self, frame: &mut TerminalFrame);
    #[allow(unused)]
    fn handle_mouse_events(&mut self, mouse_events: Vec<MouseEvent>) {}
    fn handle_key_events(&mut self, keys_events: Vec<KeyEvent>);
    fn before_frame(&mut self, #[allow(unused)] terminal: &TerminalBackend) {}
    fn after_frame(&mut self, #[allow(unused)] terminal: &TerminalBackend) {}
    fn should_quit(&self) -> bool;
    fn should_draw(&mut self) -> bool {
        true
    }
}
pub use ratatui::{buffer::Buffer, layout::Rect};

/// A component that draws into a buffer region and consumes input.
pub trait TuiWidget: Send + Sync {
    fn preprocess(&mut self) {}
    fn draw(&mut self, area: Rect, buf: &mut Buffer);
    fn key_event(&mut self, event: KeyEvent) -> bool; // Return true if handled
    #[allow(unused)]
    fn mouse_event(&mut self, event: MouseEvent) -> bool {
        false
    }
    fn focus(&mut self);
    fn unfocus(&mut self);
    fn is_focused(&self) -> bool;
    fn need_draw(&self) -> bool {
        true
    }
}

pub type TerminalBackend = ratatui::DefaultTerminal;
pub type TerminalFrame<'a> = ratatui::Frame<'a>;

const DEFAULT_FRAME_TIME: Duration = Duration::from_millis(50);

/// Terminal setup plus the frame loop. Must be created and run inside a
/// tokio runtime; input is read on a runtime task.
pub struct Tui {
    key_handler: Option<InputHandler>,
    frame_sync: bool,
    frame_length: Duration,
}

impl Tui {
    pub fn new() -> Result<Self> {
        Ok(Tui {
            key_handler: Some(InputHandler::new()),
            frame_sync: true,
            frame_length: DEFAULT_FRAME_TIME,
        })
    }

    pub fn with_input_opts(mut self, opts: InputBackendOpts) -> Self {
        self.key_handler = Some(InputHandler::with_opts(opts));
        self
    }

    pub fn without_key_capture(mut self) -> Self {
        self.key_handler = None;
        self
    }

    pub fn without_frame_sync(mut self) -> Self {
        self.frame_sync = false;
        self
    }

    pub fn with_frame_length(mut self, frame_time: Duration) -> Self {
        self.frame_length = frame_time;
        self
    }

    /// Runs `app` until it asks to quit. The terminal is restored even when
    /// a frame fails.
    pub fn run<A: TuiApp>(mut self, mut app: A) -> Result<A> {
        enable_raw_mode()?;
        execute!(stdout(), EnterAlternateScreen, EnableMouseCapture)?;
        let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;
        if let Some(handler) = &mut self.key_handler {
            handler.start()?;
        }

        let outcome = self.frame_loop(&mut terminal, &mut app);

        if let Some(handler) = &mut self.key_handler {
            handler.stop();
        }
        disable_raw_mode()?;
        execute!(
            terminal.backend_mut(),
            LeaveAlternateScreen,
            DisableMouseCapture
        )?;

        outcome.map(|()| app)
    }

    fn frame_loop<A: TuiApp>(&mut self, terminal: &mut TerminalBackend, app: &mut A) -> Result<()> {
        let mut last_size = ratatui::layout::Size::default();
        while !app.should_quit() {
            let frame_start = Instant::now();

            app.before_frame(terminal);

            if let Some((key_events, mouse_events)) = self
                .key_handler
                .as_mut()
                .and_then(InputHandler::flush_events)
            {
                if let Some(events) = key_events {
                    app.handle_key_events(events);
                }
                if let Some(events) = mouse_events {
                    app.handle_mouse_events(events);
                }
            }

            let frame_size = terminal.size().unwrap_or(last_size);
            let frame_changed = frame_size != last_size;
            if app.should_draw() || frame_changed {
                last_size = frame_size;
                terminal.draw(|frame| app.render(frame))?;
            }

            app.after_frame(terminal);

            if self.frame_sync {
                let frame_elapsed = frame_start.elapsed();
                if frame_elapsed < self.frame_length {
                    std::thread::sleep(self.frame_length - frame_elapsed);
                }
            }
        }
        Ok(())
    }
}

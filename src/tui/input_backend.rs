// tui-devconsole/src/tui/input_backend.rs
use std::time::Duration;

use anyhow::{Result, anyhow};
use crossterm::event::{
    Event as CrosstermEvent, EventStream, KeyCode, KeyEvent, KeyEventKind, KeyModifiers,
    MouseEvent, MouseEventKind,
};
use futures::{FutureExt, StreamExt};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub type InputEvents = (Option<Vec<KeyEvent>>, Option<Vec<MouseEvent>>);

#[derive(Clone, Copy, Debug)]
pub struct InputBackendOpts {
    key_buffer: usize,
    mouse_buffer: usize,
    tick_rate: Duration,
    flush_cap: usize,
}

impl Default for InputBackendOpts {
    fn default() -> Self {
        Self {
            key_buffer: 5,
            // drags arrive as a stream of moves; keep them flowing
            mouse_buffer: 8,
            tick_rate: Duration::from_millis(50),
            flush_cap: 512,
        }
    }
}

impl InputBackendOpts {
    pub fn with_tick_rate(mut self, tick_rate: Duration) -> Self {
        self.tick_rate = tick_rate;
        self
    }

    pub fn with_key_buffer(mut self, len: usize) -> Self {
        self.key_buffer = len.max(1);
        self
    }

    pub fn with_mouse_buffer(mut self, len: usize) -> Self {
        self.mouse_buffer = len.max(1);
        self
    }
}

/// Reads terminal input on a tokio task and hands it to the frame loop in
/// batches.
pub struct InputHandler {
    key_rx: UnboundedReceiver<InputEvents>,
    task_handle: Option<JoinHandle<JoinHandle<()>>>,
    cancel: CancellationToken,
    backend: Option<InputBackend>,

    opts: InputBackendOpts,
}

impl InputHandler {
    pub fn new() -> Self {
        Self::with_opts(InputBackendOpts::default())
    }

    pub fn with_opts(opts: InputBackendOpts) -> Self {
        let (key_tx, key_rx) = tokio::sync::mpsc::unbounded_channel();

        let cancel = CancellationToken::new();
        Self {
            key_rx,
            task_handle: None,
            backend: Some(InputBackend::new(opts, key_tx, cancel.clone())),
            opts,
            cancel,
        }
    }

    pub fn is_running(&self) -> bool {
        !self.cancel.is_cancelled()
    }

    pub fn start(&mut self) -> Result<()> {
        let backend = self
            .backend
            .take()
            .ok_or(anyhow!("Input handler already started"))?;

        self.task_handle = Some(tokio::task::spawn_blocking(move || {
            tokio::spawn(backend.run())
        }));

        Ok(())
    }

    pub fn stop(&mut self) {
        self.cancel.cancel();

        if let Some(handle) = self.task_handle.take() {
            handle.abort();
        }
    }

    /// Everything received since the last call, keys and mouse separately.
    pub fn flush_events(&mut self) -> Option<InputEvents> {
        if !self.is_running() {
            return None;
        }

        let mut key_events: Vec<KeyEvent> = Vec::new();
        let mut mouse_events: Vec<MouseEvent> = Vec::new();

        while let Ok((k, m)) = self.key_rx.try_recv() {
            if let Some(k) = k {
                key_events.extend(k);
            }
            if let Some(m) = m {
                mouse_events.extend(m);
            }
            if key_events.len() + mouse_events.len() > self.opts.flush_cap {
                break;
            }
        }
        packet(key_events, mouse_events)
    }
}

impl Default for InputHandler {
    fn default() -> Self {
        Self::new()
    }
}

fn packet(keys: Vec<KeyEvent>, mouse: Vec<MouseEvent>) -> Option<InputEvents> {
    match (keys.is_empty(), mouse.is_empty()) {
        (true, true) => None,
        (false, true) => Some((Some(keys), None)),
        (true, false) => Some((None, Some(mouse))),
        (false, false) => Some((Some(keys), Some(mouse))),
    }
}

/// Buffers raw terminal events between ticks. Wheel notches and repeated
/// backspaces are counted rather than queued one by one.
#[derive(Debug)]
struct EventCoalescer {
    key_buffer: Vec<KeyEvent>,
    mouse_buffer: Vec<MouseEvent>,
    /// +N down, -N up
    scroll_delta: i32,
    /// Position and modifiers of the latest wheel notch
    scroll_at: Option<MouseEvent>,
    backspace_cnt: usize,
    opts: InputBackendOpts,
}

impl EventCoalescer {
    fn new(opts: InputBackendOpts) -> Self {
        Self {
            key_buffer: Vec::with_capacity(opts.key_buffer),
            mouse_buffer: Vec::with_capacity(opts.mouse_buffer),
            scroll_delta: 0,
            scroll_at: None,
            backspace_cnt: 0,
            opts,
        }
    }

    /// Records one event; true when a buffer is full and should be shipped.
    fn push(&mut self, event: CrosstermEvent) -> bool {
        match event {
            CrosstermEvent::Mouse(mev) => {
                match mev.kind {
                    MouseEventKind::ScrollUp => self.wheel(mev, -1),
                    MouseEventKind::ScrollDown => self.wheel(mev, 1),
                    _ => {
                        // a click or drag must not overtake earlier wheel notches
                        self.materialise_scroll();
                        self.mouse_buffer.push(mev);
                    }
                }
                self.mouse_buffer.len() >= self.opts.mouse_buffer
            }
            CrosstermEvent::Key(kev) if kev.kind == KeyEventKind::Press => {
                if kev.code == KeyCode::Backspace && kev.modifiers == KeyModifiers::NONE {
                    self.backspace_cnt += 1;
                    return false;
                }
                self.push_backspaces();
                self.key_buffer.push(kev);
                self.key_buffer.len() >= self.opts.key_buffer
            }
            _ => false,
        }
    }

    fn wheel(&mut self, event: MouseEvent, step: i32) {
        // wheel over a different spot starts a new run
        if self
            .scroll_at
            .is_some_and(|at| (at.column, at.row) != (event.column, event.row))
        {
            self.materialise_scroll();
        }
        self.scroll_delta += step;
        self.scroll_at = Some(event);
    }

    fn materialise_scroll(&mut self) {
        let Some(at) = self.scroll_at.take() else {
            return;
        };
        let kind = if self.scroll_delta > 0 {
            MouseEventKind::ScrollDown
        } else {
            MouseEventKind::ScrollUp
        };
        for _ in 0..self.scroll_delta.unsigned_abs() {
            self.mouse_buffer.push(MouseEvent { kind, ..at });
        }
        self.scroll_delta = 0;
    }

    fn push_backspaces(&mut self) {
        for _ in 0..std::mem::take(&mut self.backspace_cnt) {
            self.key_buffer
                .push(KeyEvent::new(KeyCode::Backspace, KeyModifiers::NONE));
        }
    }

    /// Turns pending counts into events and takes everything buffered.
    fn drain(&mut self) -> Option<InputEvents> {
        self.materialise_scroll();
        self.push_backspaces();
        self.take()
    }

    fn take(&mut self) -> Option<InputEvents> {
        packet(
            std::mem::take(&mut self.key_buffer),
            std::mem::take(&mut self.mouse_buffer),
        )
    }
}

struct InputBackend {
    tx: UnboundedSender<InputEvents>,
    coalescer: EventCoalescer,
    cancel: CancellationToken,
    event_reader: EventStream,
    interval: tokio::time::Interval,
}

impl InputBackend {
    fn new(
        opts: InputBackendOpts,
        tx: UnboundedSender<InputEvents>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            tx,
            coalescer: EventCoalescer::new(opts),
            cancel,
            event_reader: EventStream::new(),
            interval: tokio::time::interval(opts.tick_rate),
        }
    }

    fn send(&self, events: Option<InputEvents>) {
        if let Some(events) = events {
            let _ = self.tx.send(events);
        }
    }

    async fn run(mut self) {
        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                maybe_event = self.event_reader.next().fuse() => {
                    match maybe_event {
                        Some(Ok(event)) => {
                            if self.coalescer.push(event) {
                                let events = self.coalescer.take();
                                self.send(events);
                            }
                        }
                        Some(Err(err)) => tracing::warn!(%err, "terminal input error"),
                        None => break,
                    }
                }
                _ = self.interval.tick() => {
                    let events = self.coalescer.drain();
                    self.send(events);
                }
            }
        }
    }
}

// tui-devconsole/src/console/debounce.rs
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

pub const SEARCH_DEBOUNCE: Duration = Duration::from_millis(300);

/// Coalesces bursts of values: only the last value scheduled within
/// `delay` of the previous one is ever delivered.
pub struct Debouncer<T> {
    delay: Duration,
    pending: Option<CancellationToken>,
    tx: mpsc::UnboundedSender<T>,
    rx: mpsc::UnboundedReceiver<T>,
}

impl<T: Send + 'static> Debouncer<T> {
    pub fn new(delay: Duration) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            delay,
            pending: None,
            tx,
            rx,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Cancels whatever is pending and arms a fresh timer for `value`.
    ///
    /// Outside a tokio runtime there is nothing to run the timer on, so the
    /// value becomes ready immediately.
    pub fn schedule(&mut self, value: T) {
        self.cancel();

        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            let _ = self.tx.send(value);
            return;
        };

        let token = CancellationToken::new();
        let tx = self.tx.clone();
        let delay = self.delay;
        let cancelled = token.clone();
        handle.spawn(async move {
            tokio::select! {
                _ = cancelled.cancelled() => {}
                _ = tokio::time::sleep(delay) => {
                    let _ = tx.send(value);
                }
            }
        });
        self.pending = Some(token);
    }

    /// Drops the pending timer and anything it already delivered but that
    /// was not yet taken.
    pub fn cancel(&mut self) {
        if let Some(token) = self.pending.take() {
            token.cancel();
        }
        while self.rx.try_recv().is_ok() {}
    }

    pub fn is_pending(&self) -> bool {
        self.pending.as_ref().is_some_and(|t| !t.is_cancelled())
    }

    /// The value whose delay has elapsed, if any.
    pub fn take_ready(&mut self) -> Option<T> {
        let mut latest = None;
        while let Ok(value) = self.rx.try_recv() {
            latest = Some(value);
        }
        if latest.is_some() {
            self.pending = None;
        }
        latest
    }
}

impl<T> Drop for Debouncer<T> {
    fn drop(&mut self) {
        if let Some(token) = self.pending.take() {
            token.cancel();
        }
    }
}

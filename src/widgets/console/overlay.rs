// tui-devconsole/src/widgets/console/overlay.rs
use std::sync::Arc;

use ratatui::{
    buffer::Buffer,
    crossterm::event::{KeyEvent, MouseEvent},
    layout::Rect,
};
use tracing::debug;

use super::DevConsole;
use crate::{
    TerminalFrame, TuiWidget,
    console::{ConsoleConfig, Evaluator, LogInterceptor},
};

/// A [`DevConsole`] together with the log interception feeding it.
///
/// Interception covers logging from every thread of the process and lasts
/// until the console is closed or the overlay dropped.
#[derive(Debug)]
pub struct DevConsoleOverlay {
    console: DevConsole,
    interceptor: LogInterceptor,
}

impl DevConsoleOverlay {
    /// Builds the console, starts capturing the process's log output into it
    /// and shows it focused.
    pub fn install(config: ConsoleConfig, evaluator: Arc<dyn Evaluator>) -> Self {
        let mut console = DevConsole::new(config, evaluator);
        let interceptor = LogInterceptor::install(console.capture_sink());
        console.show();
        console.focus();
        Self {
            console,
            interceptor,
        }
    }

    pub fn is_open(&self) -> bool {
        self.console.is_visible()
    }

    pub fn is_intercepting(&self) -> bool {
        self.interceptor.is_installed()
    }

    pub fn console(&self) -> &DevConsole {
        &self.console
    }

    pub fn console_mut(&mut self) -> &mut DevConsole {
        &mut self.console
    }

    /// Hides the panel and hands logging back to whatever handled it before.
    /// Captured history is kept for [`DevConsoleOverlay::reopen`].
    pub fn close(&mut self) {
        if !self.console.is_visible() && !self.interceptor.is_installed() {
            return;
        }
        // Deliver what was logged before the hand-back.
        self.console.preprocess();
        self.console.hide();
        self.console.unfocus();
        self.interceptor.restore();
        debug!("dev console closed");
    }

    pub fn reopen(&mut self) {
        if !self.interceptor.is_installed() {
            self.interceptor = LogInterceptor::install(self.console.capture_sink());
        }
        self.console.show();
        self.console.focus();
        debug!("dev console reopened");
    }

    pub fn toggle(&mut self) {
        if self.is_open() {
            self.close();
        } else {
            self.reopen();
        }
    }

    pub fn preprocess(&mut self) {
        if !self.console.is_visible() {
            return;
        }
        self.console.preprocess();
        if self.console.take_close_request() {
            self.close();
        }
    }

    pub fn need_draw(&self) -> bool {
        self.console.is_visible() && self.console.need_draw()
    }

    pub fn key_event(&mut self, key: KeyEvent) -> bool {
        self.console.is_visible() && self.console.key_event(key)
    }

    /// True when the event landed on the panel; the host should then not
    /// act on it.
    pub fn mouse_event(&mut self, event: MouseEvent) -> bool {
        if !self.console.is_visible() {
            return false;
        }
        let handled = self.console.mouse_event(event);
        if self.console.take_close_request() {
            self.close();
        }
        handled
    }

    pub fn draw(&mut self, frame_area: Rect, buf: &mut Buffer) {
        self.console.draw(frame_area, buf);
    }

    /// Draws over whatever the host rendered into `frame` already.
    pub fn render(&mut self, frame: &mut TerminalFrame) {
        let area = frame.area();
        self.draw(area, frame.buffer_mut());
    }
}

#[cfg(test)]
mod tests {
    use crossterm::event::{KeyModifiers, MouseButton, MouseEventKind};

    use super::*;
    use crate::console::{Category, PanelGeometry, ScopeEvaluator, capture_lock};

    fn overlay() -> DevConsoleOverlay {
        DevConsoleOverlay::install(
            ConsoleConfig::default().with_geometry(PanelGeometry::new(0, 0, 50, 12)),
            Arc::new(ScopeEvaluator::new()),
        )
    }

    fn payloads(overlay: &DevConsoleOverlay) -> Vec<(Category, String)> {
        overlay
            .console()
            .store()
            .snapshot()
            .map(|m| (m.category(), m.payload().to_string()))
            .collect()
    }

    #[test]
    fn captures_until_closed_and_again_after_reopen() {
        let _capture = capture_lock();
        let mut overlay = overlay();
        assert!(overlay.is_open());
        assert!(overlay.is_intercepting());

        tracing::info!("first");
        tracing::warn!("second");
        overlay.close();
        tracing::error!("while closed");
        assert!(!overlay.is_intercepting());
        assert_eq!(
            payloads(&overlay),
            [
                (Category::Log, "first".to_string()),
                (Category::Warn, "second".to_string())
            ]
        );

        overlay.reopen();
        tracing::error!("third");
        overlay.preprocess();
        assert_eq!(overlay.console().store().len(), 3);
        assert_eq!(overlay.console().output().len(), 3);
    }

    #[test]
    fn close_control_ends_interception() {
        let _capture = capture_lock();
        let mut overlay = overlay();
        let area = Rect::new(0, 0, 80, 24);
        let mut buf = Buffer::empty(area);
        overlay.draw(area, &mut buf);

        let click = MouseEvent {
            kind: MouseEventKind::Down(MouseButton::Left),
            column: 47,
            row: 0,
            modifiers: KeyModifiers::NONE,
        };
        assert!(overlay.mouse_event(click));
        assert!(!overlay.is_open());
        assert!(!overlay.is_intercepting());
        assert!(!overlay.mouse_event(click));
    }

    #[test]
    fn closed_console_ignores_keys() {
        let _capture = capture_lock();
        let mut overlay = overlay();
        overlay.close();
        let key = KeyEvent::new(crossterm::event::KeyCode::Char('a'), KeyModifiers::NONE);
        assert!(!overlay.key_event(key));
        overlay.toggle();
        assert!(overlay.key_event(key));
        assert_eq!(overlay.console().session().input().text(), "a");
    }
}

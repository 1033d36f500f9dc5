// tui-devconsole/src/widgets/selector/selector_widget.rs
use ratatui::{
    buffer::Buffer,
    crossterm::event::{KeyCode, KeyEvent, KeyEventKind, MouseButton, MouseEvent, MouseEventKind},
    layout::{Position, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Paragraph, Widget},
};

use crate::{TuiWidget, tui_theme};

const PREV_ARROW: &str = "◂ ";
const NEXT_ARROW: &str = " ▸";

/// Inline option picker drawn as `◂ Label ▸`. Left/Right (or a click on an
/// arrow) step through the options, wrapping at both ends. Every change is
/// queued for [`SelectorWidget::take_change`].
#[derive(Debug)]
pub struct SelectorWidget<T> {
    options: Vec<(T, String)>,
    selected: usize,
    is_focused: bool,
    changed: bool,
    last_area: Rect,
}

impl<T: Clone + PartialEq> SelectorWidget<T> {
    pub fn new(options: impl IntoIterator<Item = (T, String)>) -> Self {
        Self {
            options: options.into_iter().collect(),
            selected: 0,
            is_focused: false,
            changed: false,
            last_area: Rect::default(),
        }
    }

    pub fn with_selected(mut self, value: &T) -> Self {
        self.select_value(value);
        self.changed = false;
        self
    }

    pub fn selected(&self) -> Option<&T> {
        self.options.get(self.selected).map(|(value, _)| value)
    }

    pub fn selected_label(&self) -> &str {
        self.options
            .get(self.selected)
            .map_or("", |(_, label)| label.as_str())
    }

    /// Selects `value` if it is one of the options.
    pub fn select_value(&mut self, value: &T) -> bool {
        match self.options.iter().position(|(option, _)| option == value) {
            Some(idx) => {
                self.set_index(idx);
                true
            }
            None => false,
        }
    }

    pub fn next(&mut self) {
        if !self.options.is_empty() {
            self.set_index((self.selected + 1) % self.options.len());
        }
    }

    pub fn prev(&mut self) {
        if !self.options.is_empty() {
            let len = self.options.len();
            self.set_index((self.selected + len - 1) % len);
        }
    }

    pub fn take_change(&mut self) -> Option<T> {
        if !std::mem::take(&mut self.changed) {
            return None;
        }
        self.selected().cloned()
    }

    /// Width of the widest rendering, arrows included.
    pub fn width(&self) -> u16 {
        let widest = self
            .options
            .iter()
            .map(|(_, label)| label.chars().count())
            .max()
            .unwrap_or(0);
        (widest + PREV_ARROW.chars().count() + NEXT_ARROW.chars().count()) as u16
    }

    fn set_index(&mut self, idx: usize) {
        if idx != self.selected {
            self.selected = idx;
            self.changed = true;
        }
    }
}

impl<T: Clone + PartialEq + Send + Sync> TuiWidget for SelectorWidget<T> {
    fn draw(&mut self, area: Rect, buf: &mut Buffer) {
        self.last_area = area;
        let label_style = if self.is_focused {
            tui_theme::button_selected_style()
        } else {
            tui_theme::button_style()
        };
        let arrow_style = Style::default().fg(tui_theme::ACTIVE_FG);
        let line = Line::from(vec![
            Span::styled(PREV_ARROW, arrow_style),
            Span::styled(self.selected_label(), label_style),
            Span::styled(NEXT_ARROW, arrow_style),
        ]);
        Paragraph::new(line).render(area, buf);
    }

    fn key_event(&mut self, key: KeyEvent) -> bool {
        if key.kind != KeyEventKind::Press || !self.is_focused {
            return false;
        }
        match key.code {
            KeyCode::Left => self.prev(),
            KeyCode::Right | KeyCode::Enter | KeyCode::Char(' ') => self.next(),
            _ => return false,
        }
        true
    }

    fn mouse_event(&mut self, event: MouseEvent) -> bool {
        if event.kind != MouseEventKind::Down(MouseButton::Left)
            || !self.last_area.contains(Position::new(event.column, event.row))
        {
            return false;
        }
        if event.column < self.last_area.x + PREV_ARROW.chars().count() as u16 {
            self.prev();
        } else {
            self.next();
        }
        true
    }

    fn focus(&mut self) {
        self.is_focused = true;
    }

    fn unfocus(&mut self) {
        self.is_focused = false;
    }

    fn is_focused(&self) -> bool {
        self.is_focused
    }
}

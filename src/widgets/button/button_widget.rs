// tui-devconsole/src/widgets/button/button_widget.rs

use ratatui::{
    buffer::Buffer,
    crossterm::event::{KeyCode, KeyEvent, KeyEventKind, MouseButton, MouseEvent, MouseEventKind},
    layout::{Alignment, Position, Rect},
    style::Style,
    widgets::{Paragraph, Widget},
};

use crate::TuiWidget;

/// A row of labelled buttons, left aligned. Activations (Enter or a click)
/// are queued and read back with [`ButtonsWidget::take_pressed`].
pub struct ButtonsWidget {
    /// Label, normal style and selected style for each button
    buttons: Vec<(String, Style, Style)>,
    selected: usize,
    is_focused: bool,
    padding: u16,
    /// Where each button was last drawn
    hit_areas: Vec<Rect>,
    pressed: Option<usize>,
}

impl std::fmt::Debug for ButtonsWidget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ButtonsWidget")
            .field("buttons", &self.buttons)
            .field("selected", &self.selected)
            .field("is_focused", &self.is_focused)
            .field("padding", &self.padding)
            .field("pressed", &self.pressed)
            .finish()
    }
}

impl ButtonsWidget {
    pub fn new() -> Self {
        Self {
            buttons: Vec::new(),
            selected: 0,
            is_focused: false,
            padding: 1,
            hit_areas: Vec::new(),
            pressed: None,
        }
    }

    pub fn add_button(
        mut self,
        text: impl Into<String>,
        normal_style: Style,
        selected_style: Style,
    ) -> Self {
        self.buttons
            .push((text.into(), normal_style, selected_style));
        self
    }

    pub fn with_padding(mut self, padding: u16) -> Self {
        self.padding = padding;
        self
    }

    pub fn button_count(&self) -> usize {
        self.buttons.len()
    }

    pub fn selected(&self) -> usize {
        self.selected
    }

    /// Columns needed to draw every button.
    pub fn width(&self) -> u16 {
        let labels: u16 = self
            .buttons
            .iter()
            .map(|(text, _, _)| text.chars().count() as u16 + 2)
            .sum();
        labels + self.padding * (self.buttons.len().saturating_sub(1) as u16)
    }

    pub fn next_button(&mut self) {
        if !self.buttons.is_empty() {
            self.selected = (self.selected + 1) % self.buttons.len();
        }
    }

    pub fn prev_button(&mut self) {
        if !self.buttons.is_empty() {
            self.selected = if self.selected == 0 {
                self.buttons.len() - 1
            } else {
                self.selected - 1
            };
        }
    }

    /// Index of the button under a screen position, as of the last draw.
    pub fn button_at(&self, column: u16, row: u16) -> Option<usize> {
        self.hit_areas
            .iter()
            .position(|area| area.contains(Position::new(column, row)))
    }

    pub fn take_pressed(&mut self) -> Option<usize> {
        self.pressed.take()
    }
}

impl Default for ButtonsWidget {
    fn default() -> Self {
        Self::new()
    }
}

impl TuiWidget for ButtonsWidget {
    fn draw(&mut self, area: Rect, buf: &mut Buffer) {
        self.hit_areas.clear();
        let mut x = area.x;
        for (i, (text, normal_style, selected_style)) in self.buttons.iter().enumerate() {
            let button_width = (text.chars().count() as u16 + 2).min(area.right().saturating_sub(x));
            if button_width == 0 {
                break;
            }
            let style = if i == self.selected && self.is_focused {
                *selected_style
            } else {
                *normal_style
            };
            let button_area = Rect::new(x, area.y, button_width, 1);

            Paragraph::new(text.as_str())
                .style(style)
                .alignment(Alignment::Center)
                .render(button_area, buf);

            self.hit_areas.push(button_area);
            x = x.saturating_add(button_width + self.padding);
        }
    }

    fn key_event(&mut self, key: KeyEvent) -> bool {
        if key.kind != KeyEventKind::Press {
            return false;
        }

        match key.code {
            KeyCode::Left => self.prev_button(),
            KeyCode::Right => self.next_button(),
            KeyCode::Enter => self.pressed = Some(self.selected),
            _ => return false,
        };
        true
    }

    fn mouse_event(&mut self, event: MouseEvent) -> bool {
        if event.kind != MouseEventKind::Down(MouseButton::Left) {
            return false;
        }
        match self.button_at(event.column, event.row) {
            Some(idx) => {
                self.selected = idx;
                self.pressed = Some(idx);
                true
            }
            None => false,
        }
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

#[cfg(test)]
mod tests {
    use crossterm::event::KeyModifiers;

    use super::*;

    #[test]
    fn clicks_report_the_button_under_the_pointer() {
        let mut buttons = ButtonsWidget::new()
            .add_button("Clear", Style::default(), Style::default())
            .add_button("Copy", Style::default(), Style::default());
        let area = Rect::new(3, 1, 30, 1);
        let mut buf = Buffer::empty(area);
        buttons.draw(area, &mut buf);

        let click = |column| MouseEvent {
            kind: MouseEventKind::Down(MouseButton::Left),
            column,
            row: 1,
            modifiers: KeyModifiers::NONE,
        };
        // "Clear" spans 3..10, one cell of padding, then "Copy" at 11..17
        assert!(buttons.mouse_event(click(4)));
        assert_eq!(buttons.take_pressed(), Some(0));
        assert!(!buttons.mouse_event(click(10)));
        assert!(buttons.mouse_event(click(12)));
        assert_eq!(buttons.take_pressed(), Some(1));
        assert_eq!(buttons.take_pressed(), None);
    }
}

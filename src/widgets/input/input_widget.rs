// tui-devconsole/src/widgets/input/input_widget.rs
use ratatui::{
    buffer::Buffer,
    crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget},
};

use crate::{TuiWidget, tui_theme};

/// Single-line text field. The cursor is a char index, so multi-byte input
/// is edited one character at a time.
pub struct InputWidget {
    input: String,
    cursor: usize,
    is_focused: bool,
    hint: String,
    borders: Option<Borders>,
    text_style: Style,
    hint_style: Style,
    prefix_style: Style,
    prefix: String,
    submit_on_enter: bool,
    submission: Option<String>,
    needs_redraw: bool,
    last_area: Rect,
}

impl std::fmt::Debug for InputWidget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InputWidget")
            .field("input", &self.input)
            .field("cursor", &self.cursor)
            .field("is_focused", &self.is_focused)
            .field("hint", &self.hint)
            .field("prefix", &self.prefix)
            .field("submit_on_enter", &self.submit_on_enter)
            .finish()
    }
}

impl InputWidget {
    pub fn new() -> Self {
        Self {
            input: String::new(),
            cursor: 0,
            is_focused: false,
            hint: String::new(),
            borders: None,
            text_style: Style::default().fg(tui_theme::TEXT_FG),
            hint_style: Style::default().fg(tui_theme::HINT_FG),
            prefix_style: Style::default().fg(Color::White),
            prefix: String::new(),
            submit_on_enter: true,
            submission: None,
            needs_redraw: true,
            last_area: Rect::default(),
        }
    }

    /// Enter is left to the owner instead of producing a submission.
    pub fn without_submit(mut self) -> Self {
        self.submit_on_enter = false;
        self
    }

    pub fn with_border(mut self, borders: Borders) -> Self {
        self.borders = Some(borders);
        self
    }

    pub fn with_text_style(mut self, style: Style) -> Self {
        self.text_style = style;
        self
    }

    pub fn with_prefix_style(mut self, style: Style) -> Self {
        self.prefix_style = style;
        self
    }

    pub fn with_hint_style(mut self, style: Style) -> Self {
        self.hint_style = style;
        self
    }

    pub fn with_hint(mut self, hint: impl AsRef<str>) -> Self {
        self.hint = hint.as_ref().to_string();
        self
    }

    pub fn with_prefix(mut self, prefix: impl AsRef<str>) -> Self {
        self.prefix = prefix.as_ref().to_string();
        self
    }

    pub fn hint(&self) -> &str {
        &self.hint
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn text(&self) -> &str {
        &self.input
    }

    /// Cursor position in chars.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Replaces the text and puts the cursor at its end.
    pub fn set_text(&mut self, text: impl AsRef<str>) {
        let new_text = text.as_ref();
        if self.input != new_text {
            self.input = new_text.to_string();
            self.redraw();
        }
        self.cursor = self.char_len();
    }

    pub fn clear(&mut self) {
        if !self.input.is_empty() {
            self.input.clear();
            self.redraw();
        }
        self.cursor = 0;
    }

    pub fn take_submission(&mut self) -> Option<String> {
        let result = self.submission.take();
        if result.is_some() {
            self.redraw();
        }
        result
    }

    pub fn redraw(&mut self) {
        self.needs_redraw = true;
    }

    fn char_len(&self) -> usize {
        self.input.chars().count()
    }

    fn byte_offset(&self, char_idx: usize) -> usize {
        self.input
            .char_indices()
            .nth(char_idx)
            .map_or(self.input.len(), |(offset, _)| offset)
    }

    fn insert_char(&mut self, c: char) {
        let offset = self.byte_offset(self.cursor);
        self.input.insert(offset, c);
        self.cursor += 1;
    }

    fn remove_char(&mut self, char_idx: usize) -> bool {
        if char_idx >= self.char_len() {
            return false;
        }
        let offset = self.byte_offset(char_idx);
        self.input.remove(offset);
        true
    }

    fn handle_enter(&mut self) {
        if self.submission.is_none() {
            self.submission = Some(std::mem::take(&mut self.input));
            self.cursor = 0;
        }
    }

    fn content(&self) -> Line<'_> {
        let base_style = if self.is_focused {
            self.text_style
        } else {
            self.text_style.fg(tui_theme::UNFOCUSED_FG)
        };
        let cursor_style = base_style
            .bg(if self.is_focused {
                tui_theme::TEXT_FG
            } else {
                tui_theme::UNFOCUSED_FG
            })
            .fg(tui_theme::TEXT_BG);
        let mut spans = vec![Span::styled(self.prefix.as_str(), self.prefix_style)];

        if self.input.is_empty() {
            if self.is_focused {
                spans.push(Span::styled(" ", cursor_style));
            }
            if !self.hint.is_empty() {
                spans.push(Span::styled(self.hint.as_str(), self.hint_style));
            }
            return Line::from(spans);
        }

        if !self.is_focused {
            spans.push(Span::styled(self.input.as_str(), base_style));
            return Line::from(spans);
        }

        let at = self.byte_offset(self.cursor);
        let (before, rest) = self.input.split_at(at);
        if !before.is_empty() {
            spans.push(Span::styled(before, base_style));
        }
        match rest.chars().next() {
            Some(c) => {
                let (under, after) = rest.split_at(c.len_utf8());
                spans.push(Span::styled(under, cursor_style));
                if !after.is_empty() {
                    spans.push(Span::styled(after, base_style));
                }
            }
            None => spans.push(Span::styled(" ", cursor_style)),
        }
        Line::from(spans)
    }
}

impl Default for InputWidget {
    fn default() -> Self {
        Self::new()
    }
}

impl TuiWidget for InputWidget {
    fn need_draw(&self) -> bool {
        self.needs_redraw
    }

    fn draw(&mut self, area: Rect, buf: &mut Buffer) {
        if self.last_area != area {
            self.redraw();
        }
        self.last_area = area;

        let mut block = Block::default();
        if let Some(border) = self.borders {
            block = block
                .borders(border)
                .border_style(Style::default().fg(if self.is_focused {
                    tui_theme::BORDER_FOCUSED
                } else {
                    tui_theme::BORDER_DEFAULT
                }));
        }

        Paragraph::new(self.content()).block(block).render(area, buf);
        self.needs_redraw = false;
    }

    fn key_event(&mut self, key: KeyEvent) -> bool {
        if key.kind != KeyEventKind::Press {
            return false;
        }
        if key.modifiers.contains(KeyModifiers::CONTROL) {
            return false;
        }
        if !self.is_focused {
            return false;
        }

        let handled = match key.code {
            KeyCode::Enter if self.submit_on_enter => {
                self.handle_enter();
                true
            }
            KeyCode::Char(to_insert) => {
                self.insert_char(to_insert);
                true
            }
            KeyCode::Backspace => {
                if self.cursor > 0 && self.remove_char(self.cursor - 1) {
                    self.cursor -= 1;
                }
                true
            }
            KeyCode::Delete => {
                self.remove_char(self.cursor);
                true
            }
            KeyCode::Left => {
                self.cursor = self.cursor.saturating_sub(1);
                true
            }
            KeyCode::Right => {
                self.cursor = (self.cursor + 1).min(self.char_len());
                true
            }
            KeyCode::Home => {
                self.cursor = 0;
                true
            }
            KeyCode::End => {
                self.cursor = self.char_len();
                true
            }
            _ => false,
        };

        if handled {
            self.redraw();
        }
        handled
    }

    fn focus(&mut self) {
        if !self.is_focused {
            self.is_focused = true;
            self.redraw();
        }
    }

    fn unfocus(&mut self) {
        if self.is_focused {
            self.is_focused = false;
            self.redraw();
        }
    }

    fn is_focused(&self) -> bool {
        self.is_focused
    }
}

// tui-devconsole/src/widgets/console/output_view.rs
//! The scrolling output region of the console.
//!
//! Entries keep their [`RenderNode`] tree (so highlights and value toggles
//! can be rewritten in place) and are flattened into wrapped ratatui lines
//! lazily, whenever the tree or the available width changed.

use std::ops::Range;

use ratatui::{
    buffer::Buffer,
    crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseEvent, MouseEventKind},
    layout::{Position, Rect},
    style::{Modifier, Style},
    symbols::line,
    text::{Line, Span, Text},
    widgets::{Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState, StatefulWidget, Widget},
};
use unicode_width::UnicodeWidthChar;

use crate::{
    TuiWidget,
    console::{Category, Message, NodeRole, RenderNode, ValueNode, render_error, render_prompt},
    tui_theme,
};

const WHEEL_STEP: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Message(Category),
    Prompt,
    Result,
    Error,
}

/// One item of the output stream.
#[derive(Debug, Clone)]
pub struct OutputEntry {
    id: u64,
    kind: EntryKind,
    node: RenderNode,
    value: Option<ValueNode>,
}

impl OutputEntry {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn kind(&self) -> EntryKind {
        self.kind
    }

    pub fn node(&self) -> &RenderNode {
        &self.node
    }

    /// The result value behind a `Result` entry.
    pub fn value(&self) -> Option<&ValueNode> {
        self.value.as_ref()
    }

    pub fn plain_text(&self) -> String {
        self.node.plain_text()
    }
}

#[derive(Debug, Clone)]
struct ToggleTarget {
    line: usize,
    columns: Range<u16>,
    entry: usize,
    path: Vec<usize>,
}

pub fn message_node(message: &Message, show_timestamp: bool) -> RenderNode {
    let category = message.category();
    let mut children = Vec::with_capacity(3);
    if show_timestamp {
        children.push(RenderNode::labeled(
            NodeRole::Timestamp,
            message.timestamp().format("%H:%M:%S ").to_string(),
        ));
    }
    children.push(RenderNode::labeled(
        NodeRole::Indicator(category),
        category.indicator(),
    ));
    children.push(RenderNode::labeled(
        NodeRole::Content(category),
        message.payload(),
    ));
    RenderNode::block(0, children)
}

fn role_style(role: &NodeRole) -> Style {
    match role {
        NodeRole::Block { .. } | NodeRole::Matched => Style::default(),
        NodeRole::Timestamp => Style::default().fg(tui_theme::TIMESTAMP_FG),
        NodeRole::Indicator(category) => Style::default()
            .fg(tui_theme::category_fg(*category))
            .add_modifier(Modifier::BOLD),
        NodeRole::Content(category) => Style::default().fg(tui_theme::category_fg(*category)),
        NodeRole::Prompt => tui_theme::prompt_style(),
        NodeRole::Command | NodeRole::Result => Style::default().fg(tui_theme::TEXT_FG),
        NodeRole::Error => Style::default().fg(tui_theme::ERROR_FG),
        NodeRole::Key => Style::default().fg(tui_theme::UNFOCUSED_FG),
        NodeRole::Toggle { .. } => Style::default()
            .fg(tui_theme::OBJECT_FG)
            .add_modifier(Modifier::UNDERLINED),
    }
}

/// Flattens render trees into wrapped lines.
struct LineBuilder {
    width: usize,
    lines: Vec<Line<'static>>,
    current: Vec<Span<'static>>,
    open: bool,
    col: usize,
    indents: Vec<usize>,
    marked_lines: Vec<usize>,
    toggles: Vec<ToggleTarget>,
}

impl LineBuilder {
    /// `width == 0` disables wrapping.
    fn new(width: usize) -> Self {
        Self {
            width,
            lines: Vec::new(),
            current: Vec::new(),
            open: false,
            col: 0,
            indents: Vec::new(),
            marked_lines: Vec::new(),
            toggles: Vec::new(),
        }
    }

    fn indent(&self) -> usize {
        let indent = self.indents.last().copied().unwrap_or(0);
        if self.width > 0 {
            indent.min(self.width / 2)
        } else {
            indent
        }
    }

    fn break_line(&mut self) {
        if self.open {
            self.lines.push(Line::from(std::mem::take(&mut self.current)));
            self.open = false;
        }
    }

    fn ensure_open(&mut self) {
        if !self.open {
            self.open = true;
            self.col = self.indent();
            if self.col > 0 {
                self.current.push(Span::raw(" ".repeat(self.col)));
            }
        }
    }

    fn entry(&mut self, entry: usize, node: &RenderNode) -> Range<usize> {
        let start = self.lines.len();
        self.walk(entry, node, Style::default(), None);
        self.break_line();
        start..self.lines.len()
    }

    fn walk(&mut self, entry: usize, node: &RenderNode, style: Style, toggle: Option<&[usize]>) {
        match node {
            RenderNode::Text(text) => self.push_text(entry, text, style, false, toggle),
            RenderNode::Mark(text) => {
                self.push_text(entry, text, style.patch(tui_theme::mark_style()), true, toggle)
            }
            RenderNode::Element {
                role: NodeRole::Block { indent },
                children,
            } => {
                self.break_line();
                let base = self.indents.last().copied().unwrap_or(0);
                self.indents.push(base.max(usize::from(*indent)));
                self.ensure_open();
                for child in children {
                    self.walk(entry, child, style, toggle);
                }
                self.indents.pop();
                self.break_line();
            }
            RenderNode::Element { role, children } => {
                let style = style.patch(role_style(role));
                let toggle = match role {
                    NodeRole::Toggle { path, .. } => Some(path.as_slice()),
                    _ => toggle,
                };
                for child in children {
                    self.walk(entry, child, style, toggle);
                }
            }
        }
    }

    fn push_text(
        &mut self,
        entry: usize,
        text: &str,
        style: Style,
        marked: bool,
        toggle: Option<&[usize]>,
    ) {
        for (idx, segment) in text.split('\n').enumerate() {
            if idx > 0 {
                self.break_line();
            }
            self.ensure_open();
            let mut rest = segment;
            while !rest.is_empty() {
                let available = if self.width == 0 {
                    usize::MAX
                } else {
                    self.width.saturating_sub(self.col)
                };
                if available == 0 {
                    self.break_line();
                    self.ensure_open();
                    continue;
                }
                let (mut split, mut piece_width) = fit_width(rest, available);
                if split == 0 {
                    // a wide char that does not fit the rest of this row
                    if self.col > self.indent() {
                        self.break_line();
                        self.ensure_open();
                        continue;
                    }
                    let first = rest.chars().next().unwrap_or(' ');
                    split = first.len_utf8();
                    piece_width = first.width().unwrap_or(0);
                }
                let (piece, tail) = rest.split_at(split);
                let line = self.lines.len();
                if let Some(path) = toggle {
                    self.toggles.push(ToggleTarget {
                        line,
                        columns: self.col as u16..(self.col + piece_width) as u16,
                        entry,
                        path: path.to_vec(),
                    });
                }
                if marked && self.marked_lines.last() != Some(&line) {
                    self.marked_lines.push(line);
                }
                self.current.push(Span::styled(piece.to_string(), style));
                self.col += piece_width;
                rest = tail;
            }
        }
    }
}

/// Byte length and display width of the longest prefix of `text` that fits
/// in `columns` terminal cells.
fn fit_width(text: &str, columns: usize) -> (usize, usize) {
    let mut width = 0;
    for (offset, c) in text.char_indices() {
        let w = c.width().unwrap_or(0);
        if width + w > columns {
            return (offset, width);
        }
        width += w;
    }
    (text.len(), width)
}

/// Scrollable list of console entries.
#[derive(Debug)]
pub struct OutputView {
    entries: Vec<OutputEntry>,
    next_id: u64,
    show_timestamps: bool,

    lines: Vec<Line<'static>>,
    entry_lines: Vec<Range<usize>>,
    marked_lines: Vec<usize>,
    toggles: Vec<ToggleTarget>,
    layout_width: u16,
    dirty: bool,

    offset: usize,
    scroll_target: Option<usize>,
    follow_tail: bool,
    viewport: Rect,
    v_scrollbar: ScrollbarState,

    needs_redraw: bool,
    is_focused: bool,
}

impl OutputView {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            next_id: 0,
            show_timestamps: false,
            lines: Vec::new(),
            entry_lines: Vec::new(),
            marked_lines: Vec::new(),
            toggles: Vec::new(),
            layout_width: 0,
            dirty: false,
            offset: 0,
            scroll_target: None,
            follow_tail: true,
            viewport: Rect::default(),
            v_scrollbar: ScrollbarState::default(),
            needs_redraw: true,
            is_focused: false,
        }
    }

    pub fn with_timestamps(mut self, show: bool) -> Self {
        self.show_timestamps = show;
        self
    }

    pub fn entries(&self) -> &[OutputEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.offset = 0;
        self.scroll_target = None;
        self.follow_tail = true;
        self.invalidate();
    }

    fn push(&mut self, kind: EntryKind, node: RenderNode, value: Option<ValueNode>) -> usize {
        self.entries.push(OutputEntry {
            id: self.next_id,
            kind,
            node,
            value,
        });
        self.next_id += 1;
        self.invalidate();
        self.entries.len() - 1
    }

    pub fn append_message(&mut self, message: &Message) -> usize {
        let node = message_node(message, self.show_timestamps);
        self.push(EntryKind::Message(message.category()), node, None)
    }

    pub fn append_prompt(&mut self, command: &str) -> usize {
        self.push(EntryKind::Prompt, render_prompt(command), None)
    }

    pub fn append_value(&mut self, value: ValueNode) -> usize {
        let node = value.render();
        self.push(EntryKind::Result, node, Some(value))
    }

    pub fn append_error(&mut self, description: &str) -> usize {
        self.push(EntryKind::Error, render_error(description), None)
    }

    pub fn node_mut(&mut self, idx: usize) -> Option<&mut RenderNode> {
        self.invalidate();
        self.entries.get_mut(idx).map(|entry| &mut entry.node)
    }

    pub fn nodes_mut(&mut self) -> impl Iterator<Item = &mut RenderNode> {
        self.invalidate();
        self.entries.iter_mut().map(|entry| &mut entry.node)
    }

    /// Expands or collapses a composite inside a result entry and re-renders
    /// that entry. Highlights on it have to be reapplied by the caller.
    pub fn toggle_value(&mut self, entry: usize, path: &[usize]) -> bool {
        let Some(OutputEntry {
            value: Some(value),
            node,
            ..
        }) = self.entries.get_mut(entry)
        else {
            return false;
        };
        if !value.toggle(path) {
            return false;
        }
        *node = value.render();
        self.invalidate();
        true
    }

    /// The value placeholder under a screen position, as of the last draw.
    pub fn toggle_at(&mut self, column: u16, row: u16) -> Option<(usize, Vec<usize>)> {
        if !self.viewport.contains(Position::new(column, row)) {
            return None;
        }
        self.ensure_layout();
        let line = self.offset + usize::from(row - self.viewport.y);
        let col = column - self.viewport.x;
        self.toggles
            .iter()
            .find(|t| t.line == line && t.columns.contains(&col))
            .map(|t| (t.entry, t.path.clone()))
    }

    fn invalidate(&mut self) {
        self.dirty = true;
        self.needs_redraw = true;
    }

    fn text_width(&self) -> u16 {
        self.viewport.width.saturating_sub(1)
    }

    fn ensure_layout(&mut self) {
        let width = self.text_width();
        if !self.dirty && width == self.layout_width {
            return;
        }
        let mut builder = LineBuilder::new(usize::from(width));
        self.entry_lines = self
            .entries
            .iter()
            .enumerate()
            .map(|(idx, entry)| builder.entry(idx, &entry.node))
            .collect();
        self.lines = builder.lines;
        self.marked_lines = builder.marked_lines;
        self.toggles = builder.toggles;
        self.layout_width = width;
        self.dirty = false;

        if self.follow_tail {
            self.offset = self.max_offset();
        } else {
            self.offset = self.offset.min(self.max_offset());
        }
    }

    pub fn line_count(&mut self) -> usize {
        self.ensure_layout();
        self.lines.len()
    }

    /// Plain text of every laid-out line.
    pub fn rendered_lines(&mut self) -> Vec<String> {
        self.ensure_layout();
        self.lines
            .iter()
            .map(|line| line.spans.iter().map(|span| span.content.as_ref()).collect())
            .collect()
    }

    /// Lines occupied by an entry.
    pub fn entry_lines(&mut self, entry: usize) -> Option<Range<usize>> {
        self.ensure_layout();
        self.entry_lines.get(entry).cloned()
    }

    pub fn first_marked_line(&mut self) -> Option<usize> {
        self.ensure_layout();
        self.marked_lines.first().copied()
    }

    fn page_height(&self) -> usize {
        usize::from(self.viewport.height)
    }

    fn max_offset(&self) -> usize {
        self.lines.len().saturating_sub(self.page_height())
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn is_following(&self) -> bool {
        self.follow_tail
    }

    pub fn is_scrolling(&self) -> bool {
        self.scroll_target.is_some()
    }

    fn set_offset(&mut self, offset: usize) -> bool {
        let offset = offset.min(self.max_offset());
        if offset != self.offset {
            self.offset = offset;
            self.needs_redraw = true;
            true
        } else {
            false
        }
    }

    pub fn scroll_up(&mut self, lines: usize) {
        self.ensure_layout();
        self.scroll_target = None;
        self.follow_tail = false;
        self.set_offset(self.offset.saturating_sub(lines));
    }

    pub fn scroll_down(&mut self, lines: usize) {
        self.ensure_layout();
        self.scroll_target = None;
        self.set_offset(self.offset + lines);
        self.follow_tail = self.offset >= self.max_offset();
    }

    pub fn scroll_to_top(&mut self) {
        self.scroll_up(usize::MAX);
    }

    pub fn scroll_to_bottom(&mut self) {
        self.scroll_down(usize::MAX / 2);
    }

    /// Starts an animated scroll that brings `line` into view by the
    /// shortest distance. Nothing moves if it is already visible.
    pub fn scroll_into_view(&mut self, line: usize) {
        self.ensure_layout();
        let height = self.page_height().max(1);
        let target = if line < self.offset {
            line
        } else if line >= self.offset + height {
            line + 1 - height
        } else {
            return;
        };
        let target = target.min(self.max_offset());
        self.follow_tail = false;
        self.scroll_target = (target != self.offset).then_some(target);
    }

    /// Moves one animation step toward the scroll target. Returns whether
    /// anything moved.
    pub fn advance_animation(&mut self) -> bool {
        let Some(target) = self.scroll_target else {
            return false;
        };
        let distance = target.abs_diff(self.offset);
        let step = distance.div_ceil(2).max(1);
        let next = if target > self.offset {
            self.offset + step
        } else {
            self.offset - step
        };
        let moved = self.set_offset(next);
        if !moved || self.offset == target {
            self.scroll_target = None;
            self.follow_tail = self.offset >= self.max_offset();
        }
        moved
    }
}

impl Default for OutputView {
    fn default() -> Self {
        Self::new()
    }
}

impl TuiWidget for OutputView {
    fn need_draw(&self) -> bool {
        self.needs_redraw || self.scroll_target.is_some()
    }

    fn draw(&mut self, area: Rect, buf: &mut Buffer) {
        self.viewport = area;
        self.ensure_layout();
        if self.follow_tail {
            self.offset = self.max_offset();
        }
        self.offset = self.offset.min(self.max_offset());

        let visible: Vec<Line<'static>> = self
            .lines
            .iter()
            .skip(self.offset)
            .take(self.page_height())
            .cloned()
            .collect();
        let text_area = Rect {
            width: self.text_width(),
            ..area
        };
        Paragraph::new(Text::from(visible)).render(text_area, buf);

        if self.lines.len() > self.page_height() {
            self.v_scrollbar = self
                .v_scrollbar
                .content_length(self.max_offset())
                .position(self.offset);
            Scrollbar::new(ScrollbarOrientation::VerticalRight)
                .begin_symbol(None)
                .end_symbol(None)
                .track_symbol(Some(line::VERTICAL))
                .track_style(Style::default().fg(tui_theme::BORDER_UNFOCUSED))
                .thumb_style(Style::default().fg(tui_theme::UNFOCUSED_FG))
                .render(area, buf, &mut self.v_scrollbar);
        }
        self.needs_redraw = false;
    }

    fn key_event(&mut self, key: KeyEvent) -> bool {
        if key.kind != KeyEventKind::Press {
            return false;
        }
        let page = self.page_height().max(1);
        match key.code {
            KeyCode::PageUp => self.scroll_up(page),
            KeyCode::PageDown => self.scroll_down(page),
            KeyCode::Home if key.modifiers.contains(KeyModifiers::CONTROL) => self.scroll_to_top(),
            KeyCode::End if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.scroll_to_bottom()
            }
            _ => return false,
        }
        true
    }

    fn mouse_event(&mut self, event: MouseEvent) -> bool {
        if !self
            .viewport
            .contains(Position::new(event.column, event.row))
        {
            return false;
        }
        match event.kind {
            MouseEventKind::ScrollUp => self.scroll_up(WHEEL_STEP),
            MouseEventKind::ScrollDown => self.scroll_down(WHEEL_STEP),
            _ => return false,
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

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::console::SearchHighlighter;

    fn view_with_area(width: u16, height: u16) -> (OutputView, Rect, Buffer) {
        let area = Rect::new(0, 0, width, height);
        (OutputView::new(), area, Buffer::empty(area))
    }

    fn log(text: &str) -> Message {
        Message::new(Category::Log, text)
    }

    #[test]
    fn entries_flatten_to_indicator_lines() {
        let (mut view, area, mut buf) = view_with_area(40, 5);
        view.append_message(&log("hello"));
        view.append_message(&Message::new(Category::Error, "boom"));
        view.draw(area, &mut buf);
        assert_eq!(view.rendered_lines(), ["LOG: hello", "ERROR: boom"]);
    }

    #[test]
    fn long_lines_wrap_at_the_text_width() {
        let (mut view, area, mut buf) = view_with_area(11, 5);
        view.append_message(&log("abcdefghij"));
        view.draw(area, &mut buf);
        // ten columns of text, one for the scrollbar
        assert_eq!(view.rendered_lines(), ["LOG: abcde", "fghij"]);
    }

    #[test]
    fn wide_characters_wrap_by_display_width() {
        let (mut view, area, mut buf) = view_with_area(11, 5);
        view.append_message(&log("漢字テスト漢字"));
        view.draw(area, &mut buf);
        assert_eq!(view.rendered_lines(), ["LOG: 漢字", "テスト漢字"]);
    }

    #[test]
    fn toggle_columns_account_for_wide_keys() {
        let (mut view, area, mut buf) = view_with_area(40, 4);
        let idx = view.append_value(ValueNode::from_value(json!({"名前": [1]})));
        view.draw(area, &mut buf);
        assert!(view.toggle_value(idx, &[]));
        view.draw(area, &mut buf);
        assert_eq!(view.rendered_lines(), ["{...}", "  名前: [...]"]);

        assert_eq!(view.toggle_at(7, 1), None);
        assert_eq!(view.toggle_at(8, 1), Some((idx, vec![0])));
        assert_eq!(view.toggle_at(12, 1), Some((idx, vec![0])));
    }

    #[test]
    fn expanded_values_are_indented_and_clickable() {
        let (mut view, area, mut buf) = view_with_area(40, 6);
        let idx = view.append_value(ValueNode::from_value(json!({"a": 1, "b": [2]})));
        view.draw(area, &mut buf);
        assert_eq!(view.rendered_lines(), ["{...}"]);

        assert_eq!(view.toggle_at(2, 0), Some((idx, vec![])));
        assert_eq!(view.toggle_at(7, 0), None);
        assert!(view.toggle_value(idx, &[]));
        view.draw(area, &mut buf);
        assert_eq!(view.rendered_lines(), ["{...}", "  a: 1", "  b: [...]"]);
        assert_eq!(view.toggle_at(6, 2), Some((idx, vec![1])));
    }

    #[test]
    fn tail_is_followed_until_the_user_scrolls_up() {
        let (mut view, area, mut buf) = view_with_area(40, 3);
        for n in 0..10 {
            view.append_message(&log(&format!("line {n}")));
        }
        view.draw(area, &mut buf);
        assert_eq!(view.offset(), 7);

        view.scroll_up(2);
        assert!(!view.is_following());
        view.append_message(&log("more"));
        view.draw(area, &mut buf);
        assert_eq!(view.offset(), 5);

        view.scroll_to_bottom();
        assert!(view.is_following());
        assert_eq!(view.offset(), 8);
    }

    #[test]
    fn scroll_into_view_animates_to_the_nearest_position() {
        let (mut view, area, mut buf) = view_with_area(40, 3);
        for n in 0..20 {
            view.append_message(&log(&format!("line {n}")));
        }
        view.draw(area, &mut buf);
        assert_eq!(view.offset(), 17);

        view.scroll_into_view(4);
        assert!(view.is_scrolling());
        let mut steps = 0;
        while view.advance_animation() {
            steps += 1;
            assert!(steps < 20);
        }
        assert!(steps > 1);
        assert_eq!(view.offset(), 4);

        // already visible: no movement
        view.scroll_into_view(5);
        assert!(!view.is_scrolling());

        // below the viewport: the line lands on the last row
        view.scroll_into_view(10);
        while view.advance_animation() {}
        assert_eq!(view.offset(), 8);
    }

    #[test]
    fn first_marked_line_follows_highlights() {
        let (mut view, area, mut buf) = view_with_area(40, 3);
        view.append_message(&log("alpha"));
        view.append_message(&log("beta"));
        view.append_message(&log("alphabet"));
        view.draw(area, &mut buf);

        let mut highlighter = SearchHighlighter::new();
        highlighter.set_term("BET");
        assert_eq!(highlighter.apply(view.nodes_mut()), Some(1));
        assert_eq!(view.first_marked_line(), Some(1));

        highlighter.set_term("");
        highlighter.apply(view.nodes_mut());
        assert_eq!(view.first_marked_line(), None);
    }

    #[test]
    fn multi_line_payloads_split() {
        let (mut view, area, mut buf) = view_with_area(40, 5);
        view.append_message(&log("one\ntwo"));
        view.draw(area, &mut buf);
        assert_eq!(view.rendered_lines(), ["LOG: one", "two"]);
        assert_eq!(view.entry_lines(0), Some(0..2));
    }
}

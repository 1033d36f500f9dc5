// tui-devconsole/src/widgets/console/dev_console.rs
use std::sync::Arc;

use ratatui::{
    buffer::Buffer,
    crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEvent, MouseEventKind},
    layout::{Constraint, Layout, Margin, Position, Rect},
    style::Style,
    widgets::{Block, Borders, Clear, Widget},
};
use tokio::sync::{mpsc, watch};
use tracing::debug;

use super::OutputView;
use crate::{
    ButtonsWidget, InputWidget, SelectorWidget, TuiWidget,
    console::{
        CaptureSink, CommandOutcome, ConsoleConfig, Debouncer, Evaluator, FilterState, Message,
        MessageStore, PanelGeometry, PanelGeometryController, PointerTarget, SearchHighlighter,
        CommandSession, SessionKey, project,
    },
    tui_theme,
};

const CLOSE_LABEL: &str = "[x]";

/// Which control receives typed keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleFocus {
    Command,
    Search,
    Filter,
}

impl ConsoleFocus {
    fn next(self) -> Self {
        match self {
            ConsoleFocus::Command => ConsoleFocus::Search,
            ConsoleFocus::Search => ConsoleFocus::Filter,
            ConsoleFocus::Filter => ConsoleFocus::Command,
        }
    }

    fn prev(self) -> Self {
        match self {
            ConsoleFocus::Command => ConsoleFocus::Filter,
            ConsoleFocus::Search => ConsoleFocus::Command,
            ConsoleFocus::Filter => ConsoleFocus::Search,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PanelHit {
    Close,
    Resize,
    TitleBar,
    Clear,
    Filter,
    Search,
    Output,
    Command,
    Frame,
}

/// Regions of the panel relative to its own top-left corner.
#[derive(Debug, Clone, Copy, Default)]
struct PanelLayout {
    panel: Rect,
    close: Rect,
    resize: Rect,
    clear: Rect,
    filter: Rect,
    search: Rect,
    output: Rect,
    command: Rect,
}

impl PanelLayout {
    fn compute(panel: Rect, clear_width: u16, filter_width: u16) -> Self {
        let inner = panel.inner(Margin::new(1, 1));
        let toolbar = Rect { height: 1.min(inner.height), ..inner };
        let [clear, filter, search] = Layout::horizontal([
            Constraint::Length(clear_width),
            Constraint::Length(filter_width),
            Constraint::Fill(1),
        ])
        .spacing(1)
        .areas(toolbar);
        Self {
            panel,
            close: Rect::new(panel.width.saturating_sub(4), 0, 3.min(panel.width), 1),
            resize: Rect::new(
                panel.width.saturating_sub(2),
                panel.height.saturating_sub(1),
                2.min(panel.width),
                1,
            ),
            clear,
            filter,
            search,
            output: Rect::new(
                inner.x,
                inner.y + 1,
                inner.width,
                inner.height.saturating_sub(2),
            ),
            command: Rect::new(inner.x, inner.bottom().saturating_sub(1), inner.width, 1),
        }
    }

    fn hit(&self, x: u16, y: u16) -> Option<PanelHit> {
        let at = Position::new(x, y);
        if !self.panel.contains(at) {
            return None;
        }
        let regions = [
            (self.close, PanelHit::Close),
            (self.resize, PanelHit::Resize),
            (self.clear, PanelHit::Clear),
            (self.filter, PanelHit::Filter),
            (self.search, PanelHit::Search),
            (self.output, PanelHit::Output),
            (self.command, PanelHit::Command),
        ];
        let hit = regions
            .iter()
            .find(|(area, _)| area.contains(at))
            .map(|(_, hit)| *hit);
        Some(hit.unwrap_or(if y == 0 {
            PanelHit::TitleBar
        } else {
            PanelHit::Frame
        }))
    }
}

/// The floating developer console: captured log messages, a command line
/// with history, a category filter and a search box.
///
/// Messages arrive through the channel behind [`DevConsole::capture_sink`]
/// and are drained on every `preprocess`.
pub struct DevConsole {
    config: ConsoleConfig,
    visible: bool,
    is_focused: bool,
    focus: ConsoleFocus,
    close_requested: bool,
    needs_redraw: bool,

    store: MessageStore,
    capture_tx: mpsc::UnboundedSender<Message>,
    capture_rx: mpsc::UnboundedReceiver<Message>,
    filter_tx: watch::Sender<FilterState>,

    output: OutputView,
    session: CommandSession,
    search: InputWidget,
    search_debounce: Debouncer<String>,
    highlighter: SearchHighlighter,
    toolbar: ButtonsWidget,
    filter_selector: SelectorWidget<FilterState>,

    geometry: PanelGeometryController,
    placed: bool,
    layout: PanelLayout,
}

impl std::fmt::Debug for DevConsole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DevConsole")
            .field("visible", &self.visible)
            .field("focus", &self.focus)
            .field("filter", &self.filter())
            .field("messages", &self.store.len())
            .field("entries", &self.output.len())
            .field("search", &self.highlighter.term())
            .field("geometry", &self.geometry.geometry())
            .finish()
    }
}

impl DevConsole {
    pub fn new(config: ConsoleConfig, evaluator: Arc<dyn Evaluator>) -> Self {
        let store = config
            .capacity
            .map_or_else(MessageStore::new, MessageStore::with_capacity_limit);
        let (capture_tx, capture_rx) = mpsc::unbounded_channel();
        let (filter_tx, _) = watch::channel(config.initial_filter);

        let initial = config
            .geometry
            .unwrap_or_else(|| PanelGeometry::new(0, 0, config.min_width, config.min_height));
        let geometry =
            PanelGeometryController::with_min_size(initial, config.min_width, config.min_height);

        let mut session = CommandSession::new(evaluator);
        session.input_mut().focus();

        Self {
            visible: true,
            is_focused: true,
            focus: ConsoleFocus::Command,
            close_requested: false,
            needs_redraw: true,
            store,
            capture_tx,
            capture_rx,
            filter_tx,
            output: OutputView::new().with_timestamps(config.show_timestamps),
            session,
            search: InputWidget::new()
                .without_submit()
                .with_prefix("/ ")
                .with_prefix_style(Style::default().fg(tui_theme::ACTIVE_FG))
                .with_hint("Search..."),
            search_debounce: Debouncer::new(config.search_debounce()),
            highlighter: SearchHighlighter::new(),
            toolbar: ButtonsWidget::new().add_button(
                "Clear",
                tui_theme::button_style(),
                tui_theme::button_selected_style(),
            ),
            filter_selector: SelectorWidget::new(
                FilterState::options()
                    .into_iter()
                    .map(|filter| (filter, filter.label().to_string())),
            )
            .with_selected(&config.initial_filter),
            placed: config.geometry.is_some(),
            geometry,
            layout: PanelLayout::default(),
            config,
        }
    }

    /// A sink feeding this console, for [`crate::LogInterceptor::install`].
    pub fn capture_sink(&self) -> CaptureSink {
        CaptureSink::new(
            self.capture_tx.clone(),
            self.filter_tx.subscribe(),
            self.config.capture_mode,
        )
    }

    pub fn config(&self) -> &ConsoleConfig {
        &self.config
    }

    pub fn store(&self) -> &MessageStore {
        &self.store
    }

    pub fn output(&self) -> &OutputView {
        &self.output
    }

    pub fn output_mut(&mut self) -> &mut OutputView {
        &mut self.output
    }

    pub fn session(&self) -> &CommandSession {
        &self.session
    }

    pub fn filter(&self) -> FilterState {
        *self.filter_tx.borrow()
    }

    pub fn search_term(&self) -> &str {
        self.highlighter.term()
    }

    pub fn search_text(&self) -> &str {
        self.search.text()
    }

    pub fn geometry(&self) -> PanelGeometry {
        self.geometry.geometry()
    }

    pub fn geometry_controller(&self) -> &PanelGeometryController {
        &self.geometry
    }

    pub fn focused_control(&self) -> ConsoleFocus {
        self.focus
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn show(&mut self) {
        self.visible = true;
        self.needs_redraw = true;
    }

    pub fn hide(&mut self) {
        self.visible = false;
        self.search_debounce.cancel();
        self.needs_redraw = true;
    }

    /// True once after the close control was clicked.
    pub fn take_close_request(&mut self) -> bool {
        std::mem::take(&mut self.close_requested)
    }

    /// Empties the output region and the message store.
    pub fn clear_console(&mut self) {
        self.output.clear();
        self.store.clear();
        self.needs_redraw = true;
        debug!("console cleared");
    }

    /// Switches the category filter and rebuilds the output from the store.
    /// Command prompts and results are not stored, so they are dropped.
    pub fn set_filter(&mut self, filter: FilterState) {
        if self.filter() == filter {
            return;
        }
        self.filter_tx.send_replace(filter);
        if self.filter_selector.selected() != Some(&filter) {
            self.filter_selector.select_value(&filter);
        }
        self.filter_selector.take_change();

        self.output.clear();
        for message in project(self.store.snapshot(), filter) {
            self.output.append_message(message);
        }
        if self.highlighter.is_active() {
            self.highlighter.apply(self.output.nodes_mut());
        }
        self.needs_redraw = true;
        debug!(%filter, "console filter changed");
    }

    /// Replaces the search field's text and schedules the debounced search.
    pub fn set_search_text(&mut self, text: impl AsRef<str>) {
        self.search.set_text(text);
        self.search_debounce.schedule(self.search.text().to_string());
    }

    /// Applies `term` to every rendered entry and scrolls to the first
    /// match, bypassing the debounce.
    pub fn search_now(&mut self, term: &str) {
        self.search_debounce.cancel();
        self.apply_search(term);
    }

    fn apply_search(&mut self, term: &str) {
        self.highlighter.set_term(term);
        let first = self.highlighter.apply(self.output.nodes_mut());
        if first.is_some() {
            if let Some(line) = self.output.first_marked_line() {
                self.output.scroll_into_view(line);
            }
        }
        self.needs_redraw = true;
    }

    /// Evaluates `command` as if it had been typed into the command field.
    pub fn submit_command(&mut self, command: &str) -> CommandOutcome {
        let outcome = self.session.submit(command);
        self.show_outcome(outcome.clone());
        outcome
    }

    fn show_outcome(&mut self, outcome: CommandOutcome) {
        let prompt = self.output.append_prompt(&outcome.command);
        self.highlight_entry(prompt);
        let result = match outcome.result {
            Ok(value) => self.output.append_value(value),
            Err(description) => self.output.append_error(&description),
        };
        self.highlight_entry(result);
        self.output.scroll_to_bottom();
        self.needs_redraw = true;
    }

    fn highlight_entry(&mut self, idx: usize) {
        if !self.highlighter.is_active() {
            return;
        }
        if let Some(node) = self.output.node_mut(idx) {
            self.highlighter.highlight(node);
        }
    }

    fn toggle_value(&mut self, entry: usize, path: &[usize]) {
        if self.output.toggle_value(entry, path) {
            self.highlight_entry(entry);
            self.needs_redraw = true;
        }
    }

    fn ingest(&mut self, message: Message) {
        let filter = self.filter();
        let message = self.store.push(message);
        if filter.matches(message) {
            let idx = self.output.append_message(message);
            self.highlight_entry(idx);
        }
        self.needs_redraw = true;
    }

    pub fn focus_control(&mut self, target: ConsoleFocus) {
        self.focus = target;
        self.session.input_mut().unfocus();
        self.search.unfocus();
        self.filter_selector.unfocus();
        if !self.is_focused {
            return;
        }
        match target {
            ConsoleFocus::Command => self.session.input_mut().focus(),
            ConsoleFocus::Search => self.search.focus(),
            ConsoleFocus::Filter => self.filter_selector.focus(),
        }
        self.needs_redraw = true;
    }

    fn search_key(&mut self, key: KeyEvent) -> bool {
        if key.code == KeyCode::Enter {
            let term = self.search.text().to_string();
            self.search_now(&term);
            return true;
        }
        let before = self.search.text().to_string();
        let handled = self.search.key_event(key);
        if handled && self.search.text() != before {
            self.search_debounce.schedule(self.search.text().to_string());
        }
        handled
    }

    fn filter_changed(&mut self) {
        if let Some(filter) = self.filter_selector.take_change() {
            self.set_filter(filter);
        }
    }

    fn pointer_down(&mut self, event: MouseEvent, local: MouseEvent) {
        let (x, y) = (i32::from(event.column), i32::from(event.row));
        match self.layout.hit(local.column, local.row) {
            Some(PanelHit::Close) => self.close_requested = true,
            Some(PanelHit::Resize) => {
                self.geometry.pointer_down(PointerTarget::ResizeHandle, x, y);
            }
            Some(PanelHit::TitleBar) => {
                self.geometry.pointer_down(PointerTarget::TitleBar, x, y);
            }
            Some(PanelHit::Clear) => {
                if self.toolbar.mouse_event(local) && self.toolbar.take_pressed().is_some() {
                    self.clear_console();
                }
            }
            Some(PanelHit::Filter) => {
                self.focus_control(ConsoleFocus::Filter);
                self.filter_selector.mouse_event(local);
                self.filter_changed();
            }
            Some(PanelHit::Search) => self.focus_control(ConsoleFocus::Search),
            Some(PanelHit::Command) => self.focus_control(ConsoleFocus::Command),
            Some(PanelHit::Output) => {
                if let Some((entry, path)) = self.output.toggle_at(local.column, local.row) {
                    self.toggle_value(entry, &path);
                }
            }
            Some(PanelHit::Frame) | None => {}
        }
    }

    fn refresh_layout(&mut self) {
        let geometry = self.geometry.geometry();
        self.layout = PanelLayout::compute(
            Rect::new(0, 0, geometry.width, geometry.height),
            self.toolbar.width(),
            self.filter_selector.width(),
        );
    }

    fn render_panel(&mut self, panel: Rect, buf: &mut Buffer) {
        self.refresh_layout();

        let border = if self.is_focused {
            tui_theme::BORDER_FOCUSED
        } else {
            tui_theme::BORDER_DEFAULT
        };
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(border))
            .style(tui_theme::panel_style())
            .render(panel, buf);

        let title_width = panel.width.saturating_sub(7);
        buf.set_stringn(
            2,
            0,
            format!(" {} ", self.config.title),
            usize::from(title_width),
            tui_theme::title_style(),
        );
        buf.set_string(
            self.layout.close.x,
            self.layout.close.y,
            CLOSE_LABEL,
            Style::default().fg(tui_theme::ERROR_FG),
        );
        buf.set_string(
            panel.right().saturating_sub(1),
            panel.bottom().saturating_sub(1),
            tui_theme::RESIZE_HANDLE,
            Style::default().fg(border),
        );

        self.toolbar.draw(self.layout.clear, buf);
        self.filter_selector.draw(self.layout.filter, buf);
        self.search.draw(self.layout.search, buf);
        self.output.draw(self.layout.output, buf);
        self.session.input_mut().draw(self.layout.command, buf);
    }
}

impl TuiWidget for DevConsole {
    fn preprocess(&mut self) {
        while let Ok(message) = self.capture_rx.try_recv() {
            self.ingest(message);
        }
        if let Some(term) = self.search_debounce.take_ready() {
            self.apply_search(&term);
        }
        if self.output.advance_animation() {
            self.needs_redraw = true;
        }
    }

    fn need_draw(&self) -> bool {
        self.needs_redraw
            || self.output.need_draw()
            || self.search.need_draw()
            || self.session.input().need_draw()
    }

    /// `area` is the whole frame; the panel is placed inside it according
    /// to its geometry and clipped to it.
    fn draw(&mut self, area: Rect, buf: &mut Buffer) {
        if !self.visible || area.is_empty() {
            return;
        }
        if !self.placed {
            self.geometry
                .set_geometry(PanelGeometry::bottom_right_half(area));
            self.placed = true;
        }

        let geometry = self.geometry.geometry();
        let panel = Rect::new(0, 0, geometry.width, geometry.height);
        let mut scratch = Buffer::empty(panel);
        self.render_panel(panel, &mut scratch);

        let visible = geometry.visible_area(area);
        Clear.render(visible, buf);
        for y in visible.top()..visible.bottom() {
            for x in visible.left()..visible.right() {
                let local = (
                    (i32::from(x) - geometry.x) as u16,
                    (i32::from(y) - geometry.y) as u16,
                );
                if let (Some(src), Some(dst)) = (scratch.cell(local), buf.cell_mut((x, y))) {
                    *dst = src.clone();
                }
            }
        }
        self.needs_redraw = false;
    }

    fn key_event(&mut self, key: KeyEvent) -> bool {
        if !self.visible || key.kind != KeyEventKind::Press {
            return false;
        }
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        let handled = match key.code {
            KeyCode::Char('l') if ctrl => {
                self.clear_console();
                true
            }
            KeyCode::Char('f') if ctrl => {
                self.focus_control(ConsoleFocus::Search);
                true
            }
            KeyCode::Tab => {
                self.focus_control(self.focus.next());
                true
            }
            KeyCode::BackTab => {
                self.focus_control(self.focus.prev());
                true
            }
            KeyCode::Esc => {
                self.focus_control(ConsoleFocus::Command);
                true
            }
            KeyCode::PageUp | KeyCode::PageDown => self.output.key_event(key),
            KeyCode::Home | KeyCode::End if ctrl => self.output.key_event(key),
            _ => match self.focus {
                ConsoleFocus::Command => match self.session.key_event(key) {
                    SessionKey::Submitted(outcome) => {
                        self.show_outcome(outcome);
                        true
                    }
                    SessionKey::Handled => true,
                    SessionKey::Ignored => false,
                },
                ConsoleFocus::Search => self.search_key(key),
                ConsoleFocus::Filter => {
                    let handled = self.filter_selector.key_event(key);
                    self.filter_changed();
                    handled
                }
            },
        };
        if handled {
            self.needs_redraw = true;
        }
        handled
    }

    /// Pointer events in screen coordinates. While a move or resize is in
    /// progress every event belongs to the panel.
    fn mouse_event(&mut self, event: MouseEvent) -> bool {
        if !self.visible {
            return false;
        }
        if !self.geometry.mode().is_idle() {
            if self.geometry.handle_mouse(event, |_, _| None) {
                self.needs_redraw = true;
            }
            return true;
        }

        let geometry = self.geometry.geometry();
        let (x, y) = (i32::from(event.column), i32::from(event.row));
        if !geometry.contains(x, y) {
            return false;
        }
        let local = MouseEvent {
            column: (x - geometry.x) as u16,
            row: (y - geometry.y) as u16,
            ..event
        };
        self.refresh_layout();
        match event.kind {
            MouseEventKind::ScrollUp | MouseEventKind::ScrollDown => {
                self.output.mouse_event(local);
            }
            MouseEventKind::Down(MouseButton::Left) => self.pointer_down(event, local),
            _ => {}
        }
        self.needs_redraw = true;
        true
    }

    fn focus(&mut self) {
        self.is_focused = true;
        self.focus_control(self.focus);
    }

    fn unfocus(&mut self) {
        self.is_focused = false;
        self.focus_control(self.focus);
    }

    fn is_focused(&self) -> bool {
        self.is_focused
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use crossterm::event::KeyModifiers;
    use serde_json::json;

    use super::*;
    use crate::{
        EntryKind,
        console::{Category, Scope, ScopeEvaluator},
    };

    fn console() -> DevConsole {
        let scope = Scope::new();
        scope.set("user", json!({"name": "ada", "langs": ["rust", "c"]})).unwrap();
        DevConsole::new(
            ConsoleConfig::default().with_geometry(PanelGeometry::new(10, 5, 60, 20)),
            Arc::new(ScopeEvaluator::with_scope(scope)),
        )
    }

    fn frame() -> (Rect, Buffer) {
        let area = Rect::new(0, 0, 100, 40);
        (area, Buffer::empty(area))
    }

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn ctrl(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL)
    }

    fn type_text(console: &mut DevConsole, text: &str) {
        for c in text.chars() {
            console.key_event(press(KeyCode::Char(c)));
        }
    }

    fn mouse(kind: MouseEventKind, column: u16, row: u16) -> MouseEvent {
        MouseEvent {
            kind,
            column,
            row,
            modifiers: KeyModifiers::NONE,
        }
    }

    fn row_text(buf: &Buffer, row: u16, columns: std::ops::Range<u16>) -> String {
        columns
            .filter_map(|x| buf.cell((x, row)).map(|cell| cell.symbol().to_string()))
            .collect()
    }

    fn capture(console: &DevConsole, category: Category, payload: &str) {
        assert!(console.capture_sink().capture(category, payload.to_string()));
    }

    fn settle(console: &mut DevConsole) {
        for _ in 0..32 {
            if !console.output().is_scrolling() {
                return;
            }
            console.preprocess();
        }
        panic!("scrolling never settled");
    }

    #[test]
    fn search_scrolls_the_first_match_into_view() {
        let mut console = console();
        for n in 0..40 {
            let payload = match n {
                2 => "line 2 needle".to_string(),
                n => format!("line {n}"),
            };
            capture(&console, Category::Log, &payload);
        }
        console.preprocess();
        let (area, mut buf) = frame();
        console.draw(area, &mut buf);
        let tail = console.output().offset();
        let height = 40 - tail;
        assert!(tail > 2);

        console.search_now("NEEDLE");
        assert_eq!(console.output_mut().first_marked_line(), Some(2));
        assert!(console.output().is_scrolling());
        settle(&mut console);
        assert_eq!(console.output().offset(), 2);

        // below the viewport: the match lands on the last row
        console.search_now("line 35");
        settle(&mut console);
        assert_eq!(console.output().offset(), 36 - height);

        // already visible: nothing moves
        let offset = console.output().offset();
        console.search_now("line 30");
        assert!(!console.output().is_scrolling());
        assert_eq!(console.output().offset(), offset);
    }

    #[test]
    fn search_without_a_match_leaves_the_scroll_position() {
        let mut console = console();
        for n in 0..40 {
            capture(&console, Category::Log, &format!("line {n}"));
        }
        console.preprocess();
        let (area, mut buf) = frame();
        console.draw(area, &mut buf);
        console.output_mut().scroll_into_view(0);
        settle(&mut console);
        assert_eq!(console.output().offset(), 0);

        console.search_now("zzz");
        assert!(!console.output().is_scrolling());
        assert_eq!(console.output().offset(), 0);
        assert_eq!(console.output_mut().first_marked_line(), None);
    }

    #[test]
    fn captured_messages_show_after_preprocess() {
        let mut console = console();
        capture(&console, Category::Log, "hello");
        capture(&console, Category::Warn, "careful");
        assert!(console.output().is_empty());

        console.preprocess();
        assert_eq!(console.store().len(), 2);
        let texts: Vec<_> = console.output().entries().iter().map(|e| e.plain_text()).collect();
        assert_eq!(texts, ["LOG: hello", "WARN: careful"]);
    }

    #[test]
    fn filter_rebuilds_from_the_store_and_drops_command_output() {
        let mut console = console();
        capture(&console, Category::Log, "a");
        capture(&console, Category::Error, "b");
        console.preprocess();
        console.submit_command("1+1");
        assert_eq!(console.output().len(), 4);

        console.set_filter(FilterState::Only(Category::Error));
        let texts: Vec<_> = console.output().entries().iter().map(|e| e.plain_text()).collect();
        assert_eq!(texts, ["ERROR: b"]);

        // display-time filtering keeps everything in the store
        capture(&console, Category::Log, "c");
        console.preprocess();
        assert_eq!(console.store().len(), 3);
        assert_eq!(console.output().len(), 1);

        console.set_filter(FilterState::All);
        assert_eq!(console.output().len(), 3);
    }

    #[test]
    fn commands_echo_a_prompt_then_the_result() {
        let mut console = console();
        type_text(&mut console, "1+1");
        assert!(console.key_event(press(KeyCode::Enter)));
        let texts: Vec<_> = console.output().entries().iter().map(|e| e.plain_text()).collect();
        assert_eq!(texts, ["> 1+1", "2"]);

        type_text(&mut console, "undefinedVar");
        console.key_event(press(KeyCode::Enter));
        let last = console.output().entries().last().unwrap();
        assert_eq!(last.kind(), EntryKind::Error);
        assert!(last.plain_text().contains("undefinedVar"));
    }

    #[test]
    fn blank_enter_echoes_an_empty_prompt_and_the_error() {
        let mut console = console();
        assert!(console.key_event(press(KeyCode::Enter)));
        let texts: Vec<_> = console.output().entries().iter().map(|e| e.plain_text()).collect();
        assert_eq!(texts, ["> ", "unexpected end of input"]);
        assert_eq!(console.session().history().len(), 1);

        let outcome = console.submit_command("  ");
        assert!(outcome.is_error());
        assert_eq!(console.output().len(), 4);
        assert_eq!(console.session().history().len(), 2);
    }

    #[test]
    fn ctrl_l_clears_output_and_store() {
        let mut console = console();
        capture(&console, Category::Log, "x");
        console.preprocess();
        console.submit_command("2*3");
        assert!(console.key_event(ctrl('l')));
        assert!(console.output().is_empty());
        assert!(console.store().is_empty());
    }

    #[test]
    fn tab_cycles_focus_and_esc_returns_to_the_command_line() {
        let mut console = console();
        assert_eq!(console.focused_control(), ConsoleFocus::Command);
        console.key_event(press(KeyCode::Tab));
        assert_eq!(console.focused_control(), ConsoleFocus::Search);
        console.key_event(press(KeyCode::Tab));
        assert_eq!(console.focused_control(), ConsoleFocus::Filter);

        console.key_event(press(KeyCode::Right));
        assert_eq!(console.filter(), FilterState::Only(Category::Log));

        console.key_event(press(KeyCode::Esc));
        assert_eq!(console.focused_control(), ConsoleFocus::Command);
        console.key_event(ctrl('f'));
        assert_eq!(console.focused_control(), ConsoleFocus::Search);
    }

    #[tokio::test(start_paused = true)]
    async fn search_waits_for_typing_to_settle() {
        let mut console = console();
        capture(&console, Category::Log, "alpha");
        capture(&console, Category::Log, "beta");
        console.preprocess();

        console.key_event(ctrl('f'));
        type_text(&mut console, "BET");
        console.preprocess();
        assert_eq!(console.search_term(), "");

        tokio::time::sleep(Duration::from_millis(301)).await;
        console.preprocess();
        assert_eq!(console.search_term(), "BET");
        let marks: Vec<_> = console
            .output()
            .entries()
            .iter()
            .flat_map(|e| e.node().marks().into_iter().map(str::to_string).collect::<Vec<_>>())
            .collect();
        assert_eq!(marks, ["bet"]);
    }

    #[test]
    fn new_entries_pick_up_the_active_search() {
        let mut console = console();
        console.search_now("err");
        capture(&console, Category::Error, "an error");
        console.preprocess();
        assert_eq!(console.output().entries()[0].node().count_marks(), 2);
    }

    #[test]
    fn draws_inside_its_geometry_only() {
        let mut console = console();
        let (area, mut buf) = frame();
        console.draw(area, &mut buf);
        assert!(row_text(&buf, 5, 10..70).contains("Dev Console"));
        assert_eq!(row_text(&buf, 5, 66..69), CLOSE_LABEL);
        assert_eq!(row_text(&buf, 4, 0..100).trim(), "");
        assert_eq!(row_text(&buf, 10, 0..10).trim(), "");
    }

    #[test]
    fn default_placement_is_the_bottom_right_half() {
        let mut console = DevConsole::new(ConsoleConfig::default(), Arc::new(ScopeEvaluator::new()));
        let (area, mut buf) = frame();
        console.draw(area, &mut buf);
        assert_eq!(console.geometry(), PanelGeometry::new(50, 20, 50, 20));
    }

    #[test]
    fn collapsed_terminal_defers_default_placement() {
        let mut console = DevConsole::new(ConsoleConfig::default(), Arc::new(ScopeEvaluator::new()));
        let empty = Rect::new(0, 0, 0, 0);
        console.draw(empty, &mut Buffer::empty(empty));
        let sliver = Rect::new(0, 0, 80, 0);
        console.draw(sliver, &mut Buffer::empty(sliver));

        let (area, mut buf) = frame();
        console.draw(area, &mut buf);
        assert_eq!(console.geometry(), PanelGeometry::new(50, 20, 50, 20));
    }

    #[test]
    fn title_drag_moves_and_corner_drag_resizes() {
        let mut console = console();
        let (area, mut buf) = frame();
        console.draw(area, &mut buf);

        console.mouse_event(mouse(MouseEventKind::Down(MouseButton::Left), 20, 5));
        console.mouse_event(mouse(MouseEventKind::Drag(MouseButton::Left), 25, 8));
        console.mouse_event(mouse(MouseEventKind::Up(MouseButton::Left), 25, 8));
        assert_eq!(console.geometry(), PanelGeometry::new(15, 8, 60, 20));

        // resize handle at the bottom-right corner, shrunk below the minimum
        console.mouse_event(mouse(MouseEventKind::Down(MouseButton::Left), 74, 27));
        assert!(console.geometry_controller().mode().is_resizing());
        console.mouse_event(mouse(MouseEventKind::Drag(MouseButton::Left), 16, 9));
        console.mouse_event(mouse(MouseEventKind::Up(MouseButton::Left), 16, 9));
        let geometry = console.geometry();
        assert_eq!((geometry.width, geometry.height), (40, 10));
    }

    #[test]
    fn close_control_raises_a_request() {
        let mut console = console();
        let (area, mut buf) = frame();
        console.draw(area, &mut buf);
        assert!(console.mouse_event(mouse(MouseEventKind::Down(MouseButton::Left), 67, 5)));
        assert!(console.take_close_request());
        assert!(!console.take_close_request());
        assert!(!console.mouse_event(mouse(MouseEventKind::Down(MouseButton::Left), 0, 0)));
    }

    #[test]
    fn clicking_a_placeholder_expands_it() {
        let mut console = console();
        console.submit_command("user");
        let (area, mut buf) = frame();
        console.draw(area, &mut buf);

        // output starts two rows below the title bar, inside the border
        let lines = console.output_mut().rendered_lines();
        assert_eq!(lines, ["> user", "{...}"]);
        let output_top = 5 + 2;
        let row = output_top + 1;
        console.mouse_event(mouse(MouseEventKind::Down(MouseButton::Left), 12, row));
        assert_eq!(
            console.output_mut().rendered_lines(),
            ["> user", "{...}", "  langs: [...]", "  name: ada"]
        );
    }
}

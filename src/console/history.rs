// tui-devconsole/src/console/history.rs
use std::collections::VecDeque;

/// Result of stepping toward newer history entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryStep<'a> {
    /// The cursor moved onto this entry.
    Entry(&'a str),
    /// The cursor left the history; the input goes back to free text.
    Exit,
}

/// Previously submitted commands, most recent first, plus a browsing
/// cursor. A cursor of `None` means the input holds free text.
#[derive(Debug, Clone, Default)]
pub struct HistoryBuffer {
    entries: VecDeque<String>,
    cursor: Option<usize>,
}

impl HistoryBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, command: impl Into<String>) {
        self.entries.push_front(command.into());
        self.cursor = None;
    }

    /// History-up: moves to the next older entry if there is one.
    pub fn older(&mut self) -> Option<&str> {
        let next = self.cursor.map_or(0, |c| c + 1);
        if next < self.entries.len() {
            self.cursor = Some(next);
            Some(&self.entries[next])
        } else {
            None
        }
    }

    /// History-down: moves to the next newer entry, or leaves the history
    /// when already on the newest one (or not browsing at all).
    pub fn newer(&mut self) -> HistoryStep<'_> {
        match self.cursor {
            Some(c) if c > 0 => {
                self.cursor = Some(c - 1);
                HistoryStep::Entry(&self.entries[c - 1])
            }
            _ => {
                self.cursor = None;
                HistoryStep::Exit
            }
        }
    }

    pub fn reset_cursor(&mut self) {
        self.cursor = None;
    }

    /// Cursor as an index in `[-1, len - 1]`.
    pub fn cursor(&self) -> isize {
        self.cursor.map_or(-1, |c| c as isize)
    }

    pub fn get(&self, idx: usize) -> Option<&str> {
        self.entries.get(idx).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

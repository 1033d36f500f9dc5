// tui-devconsole/src/console/message_store.rs
use std::{collections::VecDeque, fmt, str::FromStr};

use anyhow::{Result, bail};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use tracing::Level;

/// Classification of a captured log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Log,
    Warn,
    Error,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Log, Category::Warn, Category::Error];

    /// Maps the three intercepted tracing levels; anything more verbose
    /// than `INFO` is not captured.
    pub fn from_level(level: &Level) -> Option<Self> {
        match *level {
            Level::INFO => Some(Category::Log),
            Level::WARN => Some(Category::Warn),
            Level::ERROR => Some(Category::Error),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Category::Log => "log",
            Category::Warn => "warn",
            Category::Error => "error",
        }
    }

    pub fn indicator(self) -> &'static str {
        match self {
            Category::Log => "LOG: ",
            Category::Warn => "WARN: ",
            Category::Error => "ERROR: ",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Category {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "log" | "info" => Ok(Category::Log),
            "warn" | "warning" => Ok(Category::Warn),
            "error" => Ok(Category::Error),
            other => bail!("unknown message category '{other}'"),
        }
    }
}

/// A captured log entry. Never mutated after creation.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    category: Category,
    payload: String,
    timestamp: DateTime<Local>,
}

impl Message {
    pub fn new(category: Category, payload: impl Into<String>) -> Self {
        Self::at(category, payload, Local::now())
    }

    pub fn at(category: Category, payload: impl Into<String>, timestamp: DateTime<Local>) -> Self {
        Self {
            category,
            payload: payload.into(),
            timestamp,
        }
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn payload(&self) -> &str {
        &self.payload
    }

    pub fn timestamp(&self) -> DateTime<Local> {
        self.timestamp
    }
}

/// Append-only, chronologically ordered record of captured messages.
///
/// By default the store grows without bound for the lifetime of the
/// console. A capacity limit turns it into a ring buffer that evicts the
/// oldest entries first.
#[derive(Debug, Default)]
pub struct MessageStore {
    messages: VecDeque<Message>,
    capacity: Option<usize>,
    evicted: u64,
}

impl MessageStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity_limit(capacity: usize) -> Self {
        Self {
            messages: VecDeque::with_capacity(capacity.min(1024)),
            capacity: Some(capacity.max(1)),
            evicted: 0,
        }
    }

    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    pub fn append(&mut self, category: Category, payload: impl Into<String>) -> &Message {
        self.push(Message::new(category, payload))
    }

    pub fn push(&mut self, message: Message) -> &Message {
        if let Some(capacity) = self.capacity {
            while self.messages.len() >= capacity {
                self.messages.pop_front();
                self.evicted += 1;
            }
        }
        self.messages.push_back(message);
        &self.messages[self.messages.len() - 1]
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    /// Read-only view of every stored message in insertion order.
    pub fn snapshot(&self) -> impl DoubleEndedIterator<Item = &Message> + ExactSizeIterator {
        self.messages.iter()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Number of messages dropped by the ring buffer so far.
    pub fn evicted(&self) -> u64 {
        self.evicted
    }
}

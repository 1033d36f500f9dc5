// tui-devconsole/src/console/filter.rs
use std::{fmt, str::FromStr};

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::{Category, Message};

/// The category selected for display, or everything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum FilterState {
    #[default]
    All,
    Only(Category),
}

impl FilterState {
    /// Selector order.
    pub fn options() -> [FilterState; 4] {
        [
            FilterState::All,
            FilterState::Only(Category::Log),
            FilterState::Only(Category::Warn),
            FilterState::Only(Category::Error),
        ]
    }

    pub fn matches(self, message: &Message) -> bool {
        self.admits(message.category())
    }

    pub fn admits(self, category: Category) -> bool {
        match self {
            FilterState::All => true,
            FilterState::Only(selected) => selected == category,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            FilterState::All => "All",
            FilterState::Only(Category::Log) => "Logs",
            FilterState::Only(Category::Warn) => "Warnings",
            FilterState::Only(Category::Error) => "Errors",
        }
    }
}

impl fmt::Display for FilterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterState::All => f.write_str("all"),
            FilterState::Only(category) => write!(f, "{category}"),
        }
    }
}

impl FromStr for FilterState {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        if s.trim().eq_ignore_ascii_case("all") {
            Ok(FilterState::All)
        } else {
            Ok(FilterState::Only(s.parse()?))
        }
    }
}

impl TryFrom<String> for FilterState {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<FilterState> for String {
    fn from(value: FilterState) -> Self {
        value.to_string()
    }
}

/// Visible subset of `messages` under `filter`, in the original order.
pub fn project<'a, I>(messages: I, filter: FilterState) -> Vec<&'a Message>
where
    I: IntoIterator<Item = &'a Message>,
{
    messages
        .into_iter()
        .filter(|message| filter.matches(message))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MessageStore;

    fn sample_store() -> MessageStore {
        let mut store = MessageStore::new();
        store.append(Category::Log, "boot");
        store.append(Category::Warn, "slow");
        store.append(Category::Error, "boom");
        store.append(Category::Log, "tick");
        store.append(Category::Error, "again");
        store
    }

    #[test]
    fn all_keeps_everything_in_order() {
        let store = sample_store();
        let visible: Vec<_> = project(store.snapshot(), FilterState::All)
            .into_iter()
            .map(Message::payload)
            .collect();
        assert_eq!(visible, ["boot", "slow", "boom", "tick", "again"]);
    }

    #[test]
    fn projection_is_an_ordered_subsequence_of_matching_messages() {
        let store = sample_store();
        for filter in FilterState::options() {
            let visible = project(store.snapshot(), filter);
            assert!(visible.iter().all(|m| filter.matches(m)));

            // subsequence check: walk the store once
            let mut source = store.snapshot();
            for message in &visible {
                assert!(source.any(|candidate| std::ptr::eq(candidate, *message)));
            }
        }
    }

    #[test]
    fn projection_is_idempotent() {
        let store = sample_store();
        for filter in FilterState::options() {
            let once = project(store.snapshot(), filter);
            let twice = project(once.iter().copied(), filter);
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn error_filter_only_shows_errors() {
        let store = sample_store();
        let visible: Vec<_> = project(store.snapshot(), FilterState::Only(Category::Error))
            .into_iter()
            .map(Message::payload)
            .collect();
        assert_eq!(visible, ["boom", "again"]);
    }

    #[test]
    fn parses_and_prints_selector_values() {
        for filter in FilterState::options() {
            assert_eq!(filter.to_string().parse::<FilterState>().unwrap(), filter);
        }
        assert_eq!("ALL".parse::<FilterState>().unwrap(), FilterState::All);
        assert!("nope".parse::<FilterState>().is_err());
    }
}

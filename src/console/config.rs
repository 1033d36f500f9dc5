// tui-devconsole/src/console/config.rs
use std::{path::Path, time::Duration};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use super::{CaptureMode, FilterState, MIN_HEIGHT, MIN_WIDTH, PanelGeometry, SEARCH_DEBOUNCE};

/// Settings for one console panel. Every field has a default, so a config
/// file only needs the keys it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    pub title: String,
    pub min_width: u16,
    pub min_height: u16,
    pub search_debounce_ms: u64,
    pub capture_mode: CaptureMode,
    pub initial_filter: FilterState,
    /// Oldest messages are evicted past this many; unbounded when `None`.
    pub capacity: Option<usize>,
    /// Bottom-right half of the frame when `None`.
    pub geometry: Option<PanelGeometry>,
    pub show_timestamps: bool,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            title: "Dev Console".to_string(),
            min_width: MIN_WIDTH,
            min_height: MIN_HEIGHT,
            search_debounce_ms: SEARCH_DEBOUNCE.as_millis() as u64,
            capture_mode: CaptureMode::default(),
            initial_filter: FilterState::default(),
            capacity: None,
            geometry: None,
            show_timestamps: false,
        }
    }
}

impl ConsoleConfig {
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading console config {}", path.display()))?;
        Self::from_json(&raw).with_context(|| format!("parsing console config {}", path.display()))
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn search_debounce(&self) -> Duration {
        Duration::from_millis(self.search_debounce_ms)
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_min_size(mut self, width: u16, height: u16) -> Self {
        self.min_width = width;
        self.min_height = height;
        self
    }

    pub fn with_search_debounce(mut self, delay: Duration) -> Self {
        self.search_debounce_ms = delay.as_millis() as u64;
        self
    }

    pub fn with_capture_mode(mut self, mode: CaptureMode) -> Self {
        self.capture_mode = mode;
        self
    }

    pub fn with_initial_filter(mut self, filter: FilterState) -> Self {
        self.initial_filter = filter;
        self
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = Some(capacity);
        self
    }

    pub fn with_geometry(mut self, geometry: PanelGeometry) -> Self {
        self.geometry = Some(geometry);
        self
    }

    pub fn with_timestamps(mut self) -> Self {
        self.show_timestamps = true;
        self
    }
}

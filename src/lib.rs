// tui-devconsole/src/lib.rs
//! A floating developer console for ratatui applications.
//!
//! [`DevConsoleOverlay::install`] starts capturing the process's `tracing`
//! output (INFO, WARN and ERROR events) into a panel the host draws on top
//! of its own UI. Hosts with their own subscriber add [`console_layer`] to
//! it. The panel filters by category, highlights search matches, evaluates
//! commands with history and can be moved and resized with the mouse.
extern crate self as tui_devconsole;

pub mod console;
pub use console::*;

mod widgets;
pub use widgets::*;

pub use ratatui::layout::Constraint;

mod tui;
pub use tui::*;

pub mod tui_theme;

pub use ratatui;

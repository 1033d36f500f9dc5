// tui-devconsole/src/widgets/selector/mod.rs
mod selector_widget;
pub use selector_widget::*;

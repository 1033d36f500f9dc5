// tui-devconsole/src/widgets/input/mod.rs
mod input_widget;
pub use input_widget::*;

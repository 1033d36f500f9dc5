// tui-devconsole/src/widgets/button/mod.rs
mod button_widget;
pub use button_widget::*;

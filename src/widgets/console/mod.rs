// tui-devconsole/src/widgets/console/mod.rs
mod output_view;
pub use output_view::*;

mod dev_console;
pub use dev_console::*;

mod overlay;
pub use overlay::*;

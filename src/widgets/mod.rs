// tui-devconsole/src/widgets/mod.rs
mod input;
pub use input::*;

mod button;
pub use button::*;

mod selector;
pub use selector::*;

mod console;
pub use console::*;

// tui-devconsole/src/console/mod.rs
mod message_store;
pub use message_store::*;

mod interceptor;
pub use interceptor::*;

mod filter;
pub use filter::*;

mod highlight;
pub use highlight::*;

mod debounce;
pub use debounce::*;

mod history;
pub use history::*;

mod value_tree;
pub use value_tree::*;

mod evaluator;
pub use evaluator::*;

mod session;
pub use session::*;

mod geometry;
pub use geometry::*;

mod config;
pub use config::*;

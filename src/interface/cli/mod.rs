pub mod repl;
pub mod tabled_rowtype;
pub mod tree_view;

pub use repl::{parse_command, run, Command, Session};
pub use tabled_rowtype::AccountRow;
pub use tree_view::{render_tree, ExpandedNodes};

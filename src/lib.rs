pub mod model;
pub mod storage;
pub mod index;
pub mod hierarchy;
pub mod codegen;
pub mod chart;
pub mod config;
pub mod error;
pub mod install;
pub mod interface;

pub use model::*;
pub use storage::*;
pub use index::*;
pub use hierarchy::*;
pub use codegen::*;
pub use crate::chart::ChartOfAccounts;
pub use crate::config::ChartConfig;
pub use error::*;
pub use install::*;
pub use interface::*;

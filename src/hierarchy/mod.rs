pub mod builder;
pub mod resolver;

pub use builder::*;
pub use resolver::*;

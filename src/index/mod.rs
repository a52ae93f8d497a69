pub mod btree;

pub use btree::CodeIndex;

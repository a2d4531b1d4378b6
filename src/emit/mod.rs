//! Emission layer: depth-first address assignment, wire-shape output tree,
//! and the second-pass reference resolver.

pub mod addr;
pub mod output;
pub mod resolve;
pub mod serialize;

pub use addr::{Address, Step};
pub use output::{OutputNode, OutputValue};
pub use resolve::resolve;
pub use serialize::{serialize, PendingRef, Serialized};

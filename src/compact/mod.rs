//! Compaction: cluster structurally identical sibling subtrees and merge
//! each cluster into one scaled template node.
//!
//! Split in two:
//! - shape: the pure structural comparator (`mergeable`)
//! - merge: the in-place compactor driving clustering, merging and registry
//!   rewrites

pub mod merge;
pub mod shape;

pub use merge::{compact_collection, compact_tree};
pub use shape::mergeable;

//! scaletree: scale-preserving compaction and serialization of
//! configuration trees.
//!
//! Protocol builders produce one subtree per logical entity instance (one
//! per BGP peer, per route range, per device...). This crate detects which
//! sibling subtrees are structurally identical, merges each cluster into one
//! scaled template node whose per-instance scalars become per-instance
//! arrays, assigns every node a stable hierarchical address, and back-fills
//! cross-entity references once addressing is final.
//!
//! Entry points: [`Pipeline::run`] (or the free [`run`]) for
//! compact -> serialize -> resolve, and [`RunOutput::lookup`] to address a
//! possibly-merged logical entity by its original name afterwards.

pub mod compact;
pub mod emit;
pub mod error;
pub mod input;
pub mod node;
pub mod pipeline;
pub mod registry;

pub use emit::{OutputNode, OutputValue};
pub use error::{Error, Result};
pub use node::{AttrValue, Node};
pub use pipeline::{run, Pipeline, Placement, RunOutput};
pub use registry::Registry;

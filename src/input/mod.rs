//! Input layer: JSON schema for raw tree dumps + validated Node construction.
//!
//! Kept separate from the engine itself: the engine only ever sees `Node`
//! trees, whether they come from protocol builders in-process or from a JSON
//! dump fed through the CLI.

pub mod tree;

pub use tree::{AttrSpec, TreeSpec};

//! Error taxonomy for one compaction-and-serialization run.
//!
//! Non-mergeable siblings are not an error (the compactor just starts a new
//! cluster); everything below is fatal for the entire run. A half-resolved
//! tree handed to the transport would silently misconfigure hardware, so no
//! partial output ever escapes on failure.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// The same logical name was registered for two structurally different
    /// entities.
    #[error("duplicate entity name {name:?} in scope {scope:?}: attribute sets differ")]
    DuplicateName { name: String, scope: String },

    /// A deferred reference names an entity that was never registered.
    #[error("unresolved reference to entity {0:?}")]
    UnresolvedReference(String),

    /// Internal invariant violation: the comparator and the compactor
    /// disagreed about shape. Must never happen on well-formed input.
    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),
}

pub type Result<T> = std::result::Result<T, Error>;

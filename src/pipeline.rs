//! One compaction-and-serialization run.
//!
//! `Built -> Compacted -> Addressed -> Resolved -> Ready`, each transition
//! driven by exactly one component, no rollback: a fatal error at any stage
//! discards the in-progress payload and nothing partial escapes. The entity
//! registry is constructed at the start of the call, passed explicitly to
//! every stage that needs it, and folded into the returned placements at the
//! end; no state survives across runs.

use crate::compact::compact_tree;
use crate::emit::{addr, resolve, serialize, Serialized};
use crate::error::{Error, Result};
use crate::node::Node;
use crate::registry::Registry;
use std::collections::BTreeMap;
use tracing::debug;

/// Where a logical entity ended up after compaction: the (possibly shared)
/// node's final address, the entity's slot in that node's value arrays, and
/// how many instances the node now represents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    pub address: String,
    pub index: usize,
    pub multiplier: usize,
}

#[derive(Debug)]
pub struct RunOutput {
    pub tree: crate::emit::OutputNode,
    placements: BTreeMap<String, Placement>,
}

impl RunOutput {
    /// Address a specific, possibly-merged, logical entity by its original
    /// name after the run has completed.
    pub fn lookup(&self, name: &str) -> Result<&Placement> {
        self.placements
            .get(name)
            .ok_or_else(|| Error::UnresolvedReference(name.to_string()))
    }
}

#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    base: String,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Absolute base path prepended to every rendered address.
    pub fn with_base(mut self, base: impl Into<String>) -> Self {
        self.base = base.into();
        self
    }

    /// compact -> serialize -> resolve, consuming the raw tree.
    pub fn run(&self, mut root: Node) -> Result<RunOutput> {
        let mut registry = Registry::new();
        registry.register_tree(&root, "")?;

        compact_tree(&mut root, &mut registry)?;

        let Serialized {
            mut tree,
            pending,
            index,
        } = serialize(&root, &self.base);

        resolve(&mut tree, &pending, &registry, &index, &self.base)?;

        let mut placements = BTreeMap::new();
        for (name, record) in registry.iter() {
            let address = index
                .get(&record.node)
                .ok_or_else(|| Error::UnresolvedReference(name.to_string()))?;
            placements.insert(
                name.to_string(),
                Placement {
                    address: addr::render(&self.base, address),
                    index: record.index,
                    multiplier: record.multiplier,
                },
            );
        }

        debug!(entities = placements.len(), "run complete");
        Ok(RunOutput { tree, placements })
    }
}

/// Convenience entry point with no base path.
pub fn run(root: Node) -> Result<RunOutput> {
    Pipeline::new().run(root)
}

//! Reference resolver: second pass that back-fills queued cross-entity
//! references in the already-emitted output tree.
//!
//! By the time this runs, every merge has happened and every node has its
//! final address, so each queued `(node, attribute, target)` can be answered
//! from the registry. The resolver performs no further addressing and never
//! touches the Node tree; it only writes into the output tree. A target
//! missing from the registry aborts the whole run.

use crate::emit::addr::{self, Address};
use crate::emit::output::{OutputNode, OutputValue};
use crate::emit::serialize::PendingRef;
use crate::error::{Error, Result};
use crate::node::NodeId;
use crate::registry::Registry;
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::debug;

pub fn resolve(
    tree: &mut OutputNode,
    pending: &[PendingRef],
    registry: &Registry,
    index: &BTreeMap<NodeId, Address>,
    base: &str,
) -> Result<()> {
    for p in pending {
        let record = registry.lookup(&p.target)?;
        // A record pointing at a node that was never emitted means the
        // registry and the tree disagree; surface it as the same fatal error.
        let target_addr = index
            .get(&record.node)
            .ok_or_else(|| Error::UnresolvedReference(p.target.clone()))?;
        let node = tree
            .node_at_mut(&p.node)
            .ok_or_else(|| Error::UnresolvedReference(p.target.clone()))?;
        node.attrs.insert(
            p.attr.clone(),
            OutputValue::single(Value::String(addr::render(base, target_addr))),
        );
    }
    if !pending.is_empty() {
        debug!(count = pending.len(), "resolved deferred references");
    }
    Ok(())
}

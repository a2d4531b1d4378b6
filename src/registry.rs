//! Entity registry: logical name -> (node, index, multiplier, scope).
//!
//! One registry lives for exactly one pipeline run. It is filled by a
//! pre-pass walk over the raw tree before compaction, rewritten by the
//! compactor after each merge, and consulted by the resolver and by
//! post-run `lookup`. Nothing here persists across runs.
//!
//! `index` identifies which slot (0..multiplier-1) of the node's Array
//! attributes corresponds to this logical name.

use crate::error::{Error, Result};
use crate::node::{Node, NodeId};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone)]
pub struct Record {
    pub node: NodeId,
    pub index: usize,
    pub multiplier: usize,
    pub scope: String,
    /// All logical names sharing this (possibly merged) node, in index order.
    pub siblings: Vec<String>,
    /// Attribute-name set at registration time, kept to tell a true naming
    /// collision from a same-shape re-registration.
    attr_names: BTreeSet<String>,
}

/// One node absorbed by a cluster merge: every record still pointing at
/// `from` (the absorbed node, anywhere in the member subtree) must be
/// rewritten to the paired surviving node.
#[derive(Debug)]
pub struct MergeUpdate {
    pub from: NodeId,
    pub to: NodeId,
    /// Instance offset of the merged member within the cluster; added to the
    /// record's existing index.
    pub offset: usize,
}

#[derive(Debug, Default)]
pub struct Registry {
    records: BTreeMap<String, Record>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a logical name for `node`. A second registration of the same
    /// name is a fatal conflict iff the attribute-name sets differ; a
    /// same-shape re-registration overwrites (the two entities may later be
    /// merged into one).
    pub fn register(&mut self, name: &str, node: &Node, scope: &str) -> Result<()> {
        let attr_names: BTreeSet<String> = node.attr_names().map(str::to_string).collect();
        if let Some(existing) = self.records.get(name) {
            if existing.attr_names != attr_names {
                return Err(Error::DuplicateName {
                    name: name.to_string(),
                    scope: scope.to_string(),
                });
            }
        }
        self.records.insert(
            name.to_string(),
            Record {
                node: node.id(),
                index: 0,
                multiplier: 1,
                scope: scope.to_string(),
                siblings: vec![name.to_string()],
                attr_names,
            },
        );
        Ok(())
    }

    /// Rewrite records after one cluster merge. A record registered to any
    /// node absorbed from a member subtree, whether registered to the member
    /// itself or left over from an earlier merge into it, now points at the
    /// paired surviving node, at its merged-order instance slot. Surviving
    /// nodes' own records keep their index but pick up the new multiplier.
    /// Unregistered members need no update. Sibling lists of all touched
    /// nodes are rebuilt in index order.
    pub fn apply_merge(&mut self, updates: &[MergeUpdate], survivors: &[NodeId], multiplier: usize) {
        // Member ids are distinct and updated records point at survivor ids
        // afterwards, so no record is ever rewritten twice per merge.
        for u in updates {
            for rec in self.records.values_mut().filter(|r| r.node == u.from) {
                rec.node = u.to;
                rec.index += u.offset;
                rec.multiplier = multiplier;
            }
        }
        for id in survivors {
            for rec in self.records.values_mut().filter(|r| r.node == *id) {
                rec.multiplier = multiplier;
            }
        }

        let touched: BTreeSet<NodeId> = survivors.iter().copied().collect();
        for id in touched {
            let mut names: Vec<(usize, String)> = self
                .records
                .iter()
                .filter(|(_, r)| r.node == id)
                .map(|(n, r)| (r.index, n.clone()))
                .collect();
            names.sort();
            let siblings: Vec<String> = names.into_iter().map(|(_, n)| n).collect();
            for (_, rec) in self.records.iter_mut().filter(|(_, r)| r.node == id) {
                rec.siblings = siblings.clone();
            }
        }
    }

    pub fn lookup(&self, name: &str) -> Result<&Record> {
        self.records
            .get(name)
            .ok_or_else(|| Error::UnresolvedReference(name.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Record)> {
        self.records.iter().map(|(n, r)| (n.as_str(), r))
    }

    /// Pre-pass: register every named node in the tree, scoped by its
    /// collection path ("device/bgp_peer"). Runs before compaction so the
    /// compactor can rewrite records as it merges.
    pub fn register_tree(&mut self, node: &Node, scope: &str) -> Result<()> {
        if let Some(name) = node.name() {
            self.register(name, node, scope)?;
        }
        for (collection, kids) in node.collections() {
            let child_scope = if scope.is_empty() {
                collection.to_string()
            } else {
                format!("{}/{}", scope, collection)
            };
            for kid in kids {
                self.register_tree(kid, &child_scope)?;
            }
        }
        Ok(())
    }
}

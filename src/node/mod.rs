//! Generic configuration node model.
//!
//! A `Node` is one configuration entity: an ordered attribute map, named
//! child collections, and a `multiplier` recording how many original
//! instances the node represents after compaction (1 until it absorbs
//! structurally identical siblings).
//!
//! Protocol builders grow the raw tree through `add_child` and never look at
//! it again; the compactor mutates it in place; the serializer only reads it.
//! Trees are pure and acyclic: cross-entity links are named deferred
//! references (`set_ref`), resolved only after the whole tree has been
//! compacted and addressed.

use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// Process-unique node identity. Never serialized; used to key registry
/// records and the NodeId -> Address index across the in-place mutations of
/// compaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(u64);

impl NodeId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(0);
        NodeId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// One attribute value on a `Node`.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    /// One instance's value.
    Scalar(Value),
    /// Already-merged per-instance values; length == owning node's multiplier.
    Array(Vec<Value>),
    /// Named forward/cross reference, resolvable only after addressing.
    Reference(String),
}

#[derive(Debug, Clone)]
pub struct Node {
    pub(crate) id: NodeId,
    pub(crate) name: Option<String>,
    pub(crate) attrs: BTreeMap<String, AttrValue>,
    pub(crate) children: BTreeMap<String, Vec<Node>>,
    pub(crate) multiplier: usize,
}

impl Default for Node {
    fn default() -> Self {
        Self::new()
    }
}

impl Node {
    pub fn new() -> Self {
        Node {
            id: NodeId::next(),
            name: None,
            attrs: BTreeMap::new(),
            children: BTreeMap::new(),
            multiplier: 1,
        }
    }

    /// Set a scalar attribute. Last write wins.
    pub fn set(&mut self, attr: &str, value: impl Into<Value>) -> &mut Self {
        self.attrs
            .insert(attr.to_string(), AttrValue::Scalar(value.into()));
        self
    }

    /// Set a deferred reference attribute naming another entity.
    pub fn set_ref(&mut self, attr: &str, target: &str) -> &mut Self {
        self.attrs
            .insert(attr.to_string(), AttrValue::Reference(target.to_string()));
        self
    }

    /// Builder-style `set` for literal tree construction.
    pub fn with_attr(mut self, attr: &str, value: impl Into<Value>) -> Self {
        self.set(attr, value);
        self
    }

    /// Builder-style `set_ref`.
    pub fn with_ref(mut self, attr: &str, target: &str) -> Self {
        self.set_ref(attr, target);
        self
    }

    /// Append `child` to the named collection, optionally tagging it with a
    /// logical entity name (picked up by the registry pre-pass at run time).
    /// Returns the inserted child so builders can keep growing the subtree.
    pub fn add_child(&mut self, collection: &str, name: Option<&str>, mut child: Node) -> &mut Node {
        child.name = name.map(str::to_string);
        let kids = self.children.entry(collection.to_string()).or_default();
        kids.push(child);
        // Just pushed, cannot be empty.
        let last = kids.len() - 1;
        &mut kids[last]
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn multiplier(&self) -> usize {
        self.multiplier
    }

    pub fn attr(&self, name: &str) -> Option<&AttrValue> {
        self.attrs.get(name)
    }

    /// Attribute names, in map order.
    pub fn attr_names(&self) -> impl Iterator<Item = &str> {
        self.attrs.keys().map(String::as_str)
    }

    pub fn collection(&self, name: &str) -> &[Node] {
        self.children.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn collections(&self) -> impl Iterator<Item = (&str, &[Node])> {
        self.children.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }
}

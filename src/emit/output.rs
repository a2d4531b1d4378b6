//! Address-qualified output tree, the shape handed to the external bulk
//! import.
//!
//! JSON shape:
//! {
//!   "address": "/device[0]",
//!   "attrs": {
//!     "slot":  { "value": 1 },              // single-value form
//!     "asn":   { "values": [1, 2, 3] }      // value-list form, one per instance
//!   },
//!   "children": { "bgp_peer": [ ... ] }
//! }
//!
//! The output tree is separate from the Node tree: the serializer builds it,
//! the resolver back-fills reference attributes in it, nothing else mutates
//! it.

use crate::emit::addr::Address;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// "Single value" vs "value list" attribute forms. Distinct field names keep
/// the untagged representation unambiguous even for equal contents.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum OutputValue {
    Single { value: Value },
    List { values: Vec<Value> },
}

impl OutputValue {
    pub fn single(value: Value) -> Self {
        OutputValue::Single { value }
    }

    pub fn list(values: Vec<Value>) -> Self {
        OutputValue::List { values }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutputNode {
    /// Rendered absolute address, base prefix included.
    pub address: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub attrs: BTreeMap<String, OutputValue>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub children: BTreeMap<String, Vec<OutputNode>>,
}

impl OutputNode {
    pub(crate) fn new(address: String) -> Self {
        OutputNode {
            address,
            attrs: BTreeMap::new(),
            children: BTreeMap::new(),
        }
    }

    /// Walk the (collection, ordinal) steps of `addr` down from this node.
    pub fn node_at_mut(&mut self, addr: &Address) -> Option<&mut OutputNode> {
        let mut node = self;
        for step in addr.steps() {
            node = node.children.get_mut(&step.collection)?.get_mut(step.ordinal)?;
        }
        Some(node)
    }
}

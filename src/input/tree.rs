//! Raw-tree JSON schema (serde-friendly) and validation into a `Node` tree.
//!
//! JSON shape:
//! {
//!   "children": {
//!     "bgp_peer": [
//!       {
//!         "name": "p0",                           // optional logical name
//!         "attrs": {
//!           "asn": 100,                            // scalar
//!           "next_hop": { "$ref": "gateway1" }    // deferred reference
//!         },
//!         "children": { ... }
//!       }
//!     ]
//!   }
//! }
//!
//! Scalar values must be JSON scalars (string/number/bool/null); nested
//! entities go in `children`, never inside an attribute value.

use crate::node::Node;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TreeSpec {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub attrs: BTreeMap<String, AttrSpec>,
    #[serde(default)]
    pub children: BTreeMap<String, Vec<TreeSpec>>,
}

/// Attribute values in the dump: a deferred reference or a plain value.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum AttrSpec {
    Reference {
        #[serde(rename = "$ref")]
        target: String,
    },
    Value(Value),
}

impl TreeSpec {
    /// Validate the dump and build the raw Node tree through the producer
    /// interface.
    pub fn validate_and_build(&self) -> anyhow::Result<Node> {
        let mut root = Node::new();
        root.name = self.name.clone();
        self.fill(&mut root, "(root)")?;
        Ok(root)
    }

    fn fill(&self, node: &mut Node, at: &str) -> anyhow::Result<()> {
        use anyhow::bail;

        for (attr, value) in &self.attrs {
            if attr.is_empty() {
                bail!("{}: empty attribute name", at);
            }
            match value {
                AttrSpec::Reference { target } => {
                    if target.is_empty() {
                        bail!("{}: attribute {:?} has an empty $ref target", at, attr);
                    }
                    node.set_ref(attr, target);
                }
                AttrSpec::Value(v) => {
                    if v.is_object() || v.is_array() {
                        bail!(
                            "{}: attribute {:?} must be a JSON scalar; use children for nested entities",
                            at,
                            attr
                        );
                    }
                    node.set(attr, v.clone());
                }
            }
        }

        for (collection, kids) in &self.children {
            if collection.is_empty() {
                bail!("{}: empty child collection name", at);
            }
            for (i, kid_spec) in kids.iter().enumerate() {
                let here = format!("{}/{}[{}]", at, collection, i);
                let kid = node.add_child(collection, kid_spec.name.as_deref(), Node::new());
                kid_spec.fill(kid, &here)?;
            }
        }

        Ok(())
    }
}

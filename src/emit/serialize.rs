//! Template serializer: depth-first address assignment and output emission.
//!
//! Walks the compacted Node tree without mutating it, assigns every node a
//! hierarchical address (parent address + (collection, ordinal)), and builds
//! the address-qualified output tree. Deferred references are not resolved
//! here: a reference's target may be merged later in traversal order, or may
//! already have been merged into a primary whose final address differs from
//! any pre-merge identity, so references are queued and their attributes
//! omitted until the resolver back-fills them.

use crate::emit::addr::{self, Address};
use crate::emit::output::{OutputNode, OutputValue};
use crate::node::{AttrValue, Node, NodeId};
use std::collections::BTreeMap;
use tracing::debug;

/// One queued cross-entity reference: which output node, which attribute,
/// which logical target name.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingRef {
    pub node: Address,
    pub attr: String,
    pub target: String,
}

#[derive(Debug)]
pub struct Serialized {
    pub tree: OutputNode,
    pub pending: Vec<PendingRef>,
    /// Final address of every emitted node, for registry-backed lookups.
    pub index: BTreeMap<NodeId, Address>,
}

/// Emit the whole tree. Infallible: shape errors are caught during
/// compaction, reference errors during resolution.
pub fn serialize(root: &Node, base: &str) -> Serialized {
    let mut pending = Vec::new();
    let mut index = BTreeMap::new();
    let tree = emit(root, Address::root(), base, &mut pending, &mut index);
    debug!(
        nodes = index.len(),
        pending = pending.len(),
        "serialized configuration tree"
    );
    Serialized {
        tree,
        pending,
        index,
    }
}

fn emit(
    node: &Node,
    address: Address,
    base: &str,
    pending: &mut Vec<PendingRef>,
    index: &mut BTreeMap<NodeId, Address>,
) -> OutputNode {
    index.insert(node.id(), address.clone());

    let mut out = OutputNode::new(addr::render(base, &address));
    for (attr, value) in &node.attrs {
        match value {
            AttrValue::Scalar(v) => {
                out.attrs.insert(attr.clone(), OutputValue::single(v.clone()));
            }
            AttrValue::Array(items) => {
                let form = match items.as_slice() {
                    [only] => OutputValue::single(only.clone()),
                    _ => OutputValue::list(items.clone()),
                };
                out.attrs.insert(attr.clone(), form);
            }
            // Queued, not resolved; the attribute is omitted for now.
            AttrValue::Reference(target) => {
                pending.push(PendingRef {
                    node: address.clone(),
                    attr: attr.clone(),
                    target: target.clone(),
                });
            }
        }
    }

    for (collection, kids) in node.collections() {
        let emitted: Vec<OutputNode> = kids
            .iter()
            .enumerate()
            .map(|(ordinal, kid)| {
                emit(kid, address.child(collection, ordinal), base, pending, index)
            })
            .collect();
        out.children.insert(collection.to_string(), emitted);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{AttrValue, Node};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn addresses_follow_collection_and_ordinal() {
        let mut root = Node::new();
        let dev = root.add_child("device", None, Node::new());
        dev.add_child("bgp_peer", None, Node::new().with_attr("asn", 1));
        dev.add_child("bgp_peer", None, Node::new().with_ref("gw", "g0"));

        let out = serialize(&root, "");
        assert_eq!(out.tree.address, "/");
        let dev = &out.tree.children["device"][0];
        assert_eq!(dev.address, "/device[0]");
        assert_eq!(
            dev.children["bgp_peer"][1].address,
            "/device[0]/bgp_peer[1]"
        );
    }

    #[test]
    fn scalar_and_unit_array_emit_single_form_longer_arrays_emit_lists() {
        let mut root = Node::new();
        let peer = root.add_child("peer", None, Node::new());
        peer.set("asn", 100);
        peer.attrs
            .insert("vlan".into(), AttrValue::Array(vec![json!(5)]));
        peer.attrs.insert(
            "ip".into(),
            AttrValue::Array(vec![json!("10.0.0.1"), json!("10.0.0.2")]),
        );

        let out = serialize(&root, "");
        let peer = &out.tree.children["peer"][0];
        assert_eq!(peer.attrs["asn"], OutputValue::single(json!(100)));
        assert_eq!(peer.attrs["vlan"], OutputValue::single(json!(5)));
        assert_eq!(
            peer.attrs["ip"],
            OutputValue::list(vec![json!("10.0.0.1"), json!("10.0.0.2")])
        );
    }

    #[test]
    fn references_are_queued_and_omitted() {
        let mut root = Node::new();
        root.add_child(
            "route",
            None,
            Node::new().with_attr("prefix", "10.0.0.0/24").with_ref("next_hop", "peer1"),
        );

        let out = serialize(&root, "");
        let route = &out.tree.children["route"][0];
        assert!(!route.attrs.contains_key("next_hop"));
        assert_eq!(
            out.pending,
            vec![PendingRef {
                node: Address::root().child("route", 0),
                attr: "next_hop".into(),
                target: "peer1".into(),
            }]
        );
    }

    #[test]
    fn base_prefix_lands_in_every_rendered_address() {
        let mut root = Node::new();
        root.add_child("device", None, Node::new());
        let out = serialize(&root, "/api/config");
        assert_eq!(out.tree.address, "/api/config");
        assert_eq!(out.tree.children["device"][0].address, "/api/config/device[0]");
    }

    #[test]
    fn index_maps_every_node_to_its_address() {
        let mut root = Node::new();
        let dev = root.add_child("device", None, Node::new());
        let peer_id = dev.add_child("peer", None, Node::new()).id();

        let out = serialize(&root, "");
        assert_eq!(
            out.index[&peer_id],
            Address::root().child("device", 0).child("peer", 0)
        );
    }
}

//! In-place compactor.
//!
//! Scans each child collection in insertion order, clusters siblings against
//! the first-seen primary of each distinct shape (linear scan, first match
//! wins), then merges every non-singleton cluster into its primary:
//! per-instance scalars become arrays, child subtrees merge position-wise,
//! multipliers add up, merged members disappear from the parent, and the
//! entity registry is rewritten so every previously registered name still
//! resolves to the right slot of the surviving node's arrays.
//!
//! Order matters: clusters and value arrays follow original sibling
//! insertion order, never a sorted order, so structurally identical input
//! compacts to byte-identical output run after run.

use crate::compact::shape::mergeable;
use crate::error::{Error, Result};
use crate::node::{AttrValue, Node, NodeId};
use crate::registry::{MergeUpdate, Registry};
use tracing::debug;

/// Compact every collection of the tree, top-down. A collection is compacted
/// before its surviving children are descended into, so a merge always sees
/// uniform multipliers throughout the member subtrees.
pub fn compact_tree(node: &mut Node, registry: &mut Registry) -> Result<()> {
    for kids in node.children.values_mut() {
        compact_collection(kids, registry)?;
        for kid in kids.iter_mut() {
            compact_tree(kid, registry)?;
        }
    }
    Ok(())
}

/// Cluster and merge one ordered sibling collection in place.
pub fn compact_collection(siblings: &mut Vec<Node>, registry: &mut Registry) -> Result<()> {
    if siblings.len() < 2 {
        return Ok(());
    }
    let orig = std::mem::take(siblings);

    // 1) Assign each sibling to a cluster: first primary it is mergeable
    //    with, else it founds a new cluster.
    let mut cluster_of = Vec::with_capacity(orig.len());
    let mut primaries: Vec<usize> = Vec::new();
    for node in &orig {
        match primaries.iter().position(|&p| mergeable(&orig[p], node)) {
            Some(c) => cluster_of.push(c),
            None => {
                cluster_of.push(primaries.len());
                primaries.push(cluster_of.len() - 1);
            }
        }
    }

    // 2) Route nodes into buckets, preserving insertion order within each.
    let mut buckets: Vec<Vec<Node>> = (0..primaries.len()).map(|_| Vec::new()).collect();
    for (i, node) in orig.into_iter().enumerate() {
        buckets[cluster_of[i]].push(node);
    }

    // 3) Merge each bucket into its first-seen primary; buckets come back in
    //    first-seen order, so surviving order equals insertion order.
    for bucket in buckets {
        let mut members = bucket.into_iter();
        let Some(mut primary) = members.next() else {
            continue;
        };

        let mut updates: Vec<MergeUpdate> = Vec::new();
        let mut merged = 0usize;
        for member in members {
            // Instance slots of this member start where the primary's
            // current instances end.
            let offset = primary.multiplier;
            let mut absorbed = Vec::new();
            merge_into(&mut primary, member, &mut absorbed)?;
            merged += 1;
            updates.extend(
                absorbed
                    .into_iter()
                    .map(|(from, to)| MergeUpdate { from, to, offset }),
            );
        }

        if merged > 0 {
            let mut survivors = Vec::new();
            collect_ids(&primary, &mut survivors);
            let total = primary.multiplier;
            debug!(size = merged + 1, multiplier = total, "merged sibling cluster");
            registry.apply_merge(&updates, &survivors, total);
        }
        siblings.push(primary);
    }

    Ok(())
}

/// Merge `member` into `primary`, attribute by attribute, then child
/// collections position-wise. Records every (absorbed, surviving) node pair
/// of the two subtrees so the registry can rewrite any name still pointing
/// into the member, including names absorbed by an earlier merge.
///
/// The comparator has already vouched for the shapes; any disagreement found
/// here is an internal invariant violation and fails loudly.
fn merge_into(
    primary: &mut Node,
    member: Node,
    absorbed: &mut Vec<(NodeId, NodeId)>,
) -> Result<()> {
    let Node {
        id,
        name: _,
        attrs,
        children,
        multiplier: incoming,
    } = member;

    absorbed.push((id, primary.id));

    let base = primary.multiplier;
    for (attr, value) in attrs {
        let Some(current) = primary.attrs.remove(&attr) else {
            return Err(Error::ShapeMismatch(format!(
                "attribute {attr:?} missing on merge primary"
            )));
        };
        let merged = merge_attr(&attr, current, value, base, incoming)?;
        primary.attrs.insert(attr, merged);
    }

    for (collection, kids) in children {
        let Some(p_kids) = primary.children.get_mut(&collection) else {
            return Err(Error::ShapeMismatch(format!(
                "collection {collection:?} missing on merge primary"
            )));
        };
        if p_kids.len() != kids.len() {
            return Err(Error::ShapeMismatch(format!(
                "collection {collection:?} child counts diverged mid-merge"
            )));
        }
        for (p, m) in p_kids.iter_mut().zip(kids) {
            merge_into(p, m, absorbed)?;
        }
    }

    primary.multiplier = base + incoming;

    // Every array must now cover exactly one value per represented instance.
    for (attr, value) in &primary.attrs {
        if let AttrValue::Array(items) = value {
            if items.len() != primary.multiplier {
                return Err(Error::ShapeMismatch(format!(
                    "attribute {attr:?} has {} values for multiplier {}",
                    items.len(),
                    primary.multiplier
                )));
            }
        }
    }

    Ok(())
}

/// Merge one attribute slot: promote scalars to arrays, append the member's
/// values, keep identical references as-is.
fn merge_attr(
    attr: &str,
    current: AttrValue,
    incoming_value: AttrValue,
    base: usize,
    incoming: usize,
) -> Result<AttrValue> {
    match (current, incoming_value) {
        (AttrValue::Reference(t), AttrValue::Reference(u)) if t == u => {
            Ok(AttrValue::Reference(t))
        }
        (AttrValue::Scalar(s), AttrValue::Scalar(v)) => {
            let mut items = vec![s; base];
            items.extend(vec![v; incoming]);
            Ok(AttrValue::Array(items))
        }
        (AttrValue::Scalar(s), AttrValue::Array(vs)) => {
            let mut items = vec![s; base];
            items.extend(vs);
            Ok(AttrValue::Array(items))
        }
        (AttrValue::Array(mut items), AttrValue::Scalar(v)) => {
            items.extend(vec![v; incoming]);
            Ok(AttrValue::Array(items))
        }
        (AttrValue::Array(mut items), AttrValue::Array(vs)) => {
            items.extend(vs);
            Ok(AttrValue::Array(items))
        }
        _ => Err(Error::ShapeMismatch(format!(
            "attribute {attr:?} changed kind mid-merge"
        ))),
    }
}

fn collect_ids(node: &Node, out: &mut Vec<NodeId>) {
    out.push(node.id());
    for (_, kids) in node.collections() {
        for kid in kids {
            collect_ids(kid, out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{AttrValue, Node};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn peer(asn: i64) -> Node {
        Node::new().with_attr("asn", asn)
    }

    #[test]
    fn identical_siblings_merge_into_one_scaled_node() {
        let mut root = Node::new();
        root.add_child("bgp_peer", Some("p0"), peer(1));
        root.add_child("bgp_peer", Some("p1"), peer(2));
        root.add_child("bgp_peer", Some("p2"), peer(3));

        let mut reg = Registry::new();
        reg.register_tree(&root, "").unwrap();
        compact_tree(&mut root, &mut reg).unwrap();

        let peers = root.collection("bgp_peer");
        assert_eq!(peers.len(), 1);
        assert_eq!(peers[0].multiplier(), 3);
        assert_eq!(
            peers[0].attr("asn"),
            Some(&AttrValue::Array(vec![json!(1), json!(2), json!(3)]))
        );

        // All three names point at the surviving node, in insertion order.
        let id = peers[0].id();
        for (name, index) in [("p0", 0), ("p1", 1), ("p2", 2)] {
            let rec = reg.lookup(name).unwrap();
            assert_eq!((rec.node, rec.index, rec.multiplier), (id, index, 3));
            assert_eq!(rec.siblings, ["p0", "p1", "p2"]);
        }
    }

    #[test]
    fn differing_shapes_are_left_alone() {
        let mut root = Node::new();
        root.add_child("item", None, peer(1));
        root.add_child("item", None, Node::new().with_attr("mtu", 1500));
        root.add_child("item", None, Node::new().with_ref("next_hop", "gw"));

        let mut reg = Registry::new();
        compact_tree(&mut root, &mut reg).unwrap();

        let items = root.collection("item");
        assert_eq!(items.len(), 3);
        assert!(items.iter().all(|n| n.multiplier() == 1));
    }

    #[test]
    fn mixed_collection_merges_only_matching_clusters_in_order() {
        let mut root = Node::new();
        root.add_child("item", None, peer(1));
        root.add_child("item", None, Node::new().with_attr("mtu", 1500));
        root.add_child("item", None, peer(2));
        root.add_child("item", None, Node::new().with_attr("mtu", 9000));

        let mut reg = Registry::new();
        compact_tree(&mut root, &mut reg).unwrap();

        let items = root.collection("item");
        assert_eq!(items.len(), 2);
        // First-seen order: the peer cluster, then the mtu cluster.
        assert_eq!(
            items[0].attr("asn"),
            Some(&AttrValue::Array(vec![json!(1), json!(2)]))
        );
        assert_eq!(
            items[1].attr("mtu"),
            Some(&AttrValue::Array(vec![json!(1500), json!(9000)]))
        );
    }

    #[test]
    fn equal_scalars_still_become_arrays() {
        let mut root = Node::new();
        root.add_child("peer", None, peer(7));
        root.add_child("peer", None, peer(7));

        let mut reg = Registry::new();
        compact_tree(&mut root, &mut reg).unwrap();

        let peers = root.collection("peer");
        assert_eq!(
            peers[0].attr("asn"),
            Some(&AttrValue::Array(vec![json!(7), json!(7)]))
        );
    }

    #[test]
    fn shared_references_survive_a_merge_unchanged() {
        let mut root = Node::new();
        root.add_child("route", None, peer(1).with_ref("next_hop", "gw"));
        root.add_child("route", None, peer(2).with_ref("next_hop", "gw"));

        let mut reg = Registry::new();
        compact_tree(&mut root, &mut reg).unwrap();

        let routes = root.collection("route");
        assert_eq!(routes.len(), 1);
        assert_eq!(
            routes[0].attr("next_hop"),
            Some(&AttrValue::Reference("gw".into()))
        );
    }

    #[test]
    fn nested_subtrees_merge_position_wise_and_cascade() {
        // Two devices, two peers each. The device merge folds the peers
        // position-wise; descending then merges the two scaled peers again.
        let mut root = Node::new();
        let d0 = root.add_child("device", Some("d0"), Node::new().with_attr("slot", 1));
        d0.add_child("bgp_peer", Some("pA"), peer(1));
        d0.add_child("bgp_peer", Some("pB"), peer(2));
        let d1 = root.add_child("device", Some("d1"), Node::new().with_attr("slot", 2));
        d1.add_child("bgp_peer", Some("pC"), peer(3));
        d1.add_child("bgp_peer", Some("pD"), peer(4));

        let mut reg = Registry::new();
        reg.register_tree(&root, "").unwrap();
        compact_tree(&mut root, &mut reg).unwrap();

        let devices = root.collection("device");
        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].multiplier(), 2);
        assert_eq!(
            devices[0].attr("slot"),
            Some(&AttrValue::Array(vec![json!(1), json!(2)]))
        );

        let peers = devices[0].collection("bgp_peer");
        assert_eq!(peers.len(), 1);
        assert_eq!(peers[0].multiplier(), 4);
        // Position-wise device merge gives [1,3] and [2,4]; the cascade
        // appends the second peer's slots after the first's.
        assert_eq!(
            peers[0].attr("asn"),
            Some(&AttrValue::Array(vec![
                json!(1),
                json!(3),
                json!(2),
                json!(4)
            ]))
        );

        let id = peers[0].id();
        for (name, index) in [("pA", 0), ("pC", 1), ("pB", 2), ("pD", 3)] {
            let rec = reg.lookup(name).unwrap();
            assert_eq!((rec.node, rec.index, rec.multiplier), (id, index, 4));
        }
    }

    #[test]
    fn asymmetric_child_counts_block_the_parent_merge_only() {
        let mut root = Node::new();
        let d0 = root.add_child("device", None, Node::new());
        d0.add_child("peer", None, peer(1));
        d0.add_child("peer", None, peer(2));
        let d1 = root.add_child("device", None, Node::new());
        d1.add_child("peer", None, peer(3));

        let mut reg = Registry::new();
        compact_tree(&mut root, &mut reg).unwrap();

        // Devices stay apart, but d0's own peers still compact.
        let devices = root.collection("device");
        assert_eq!(devices.len(), 2);
        assert_eq!(devices[0].collection("peer").len(), 1);
        assert_eq!(devices[0].collection("peer")[0].multiplier(), 2);
        assert_eq!(devices[1].collection("peer").len(), 1);
    }

    #[test]
    fn array_length_disagreement_is_a_fatal_shape_mismatch() {
        // Hand-built inconsistent state: unit multiplier but two-slot arrays.
        // The comparator accepts the pair (equal lengths), the merge must
        // then fail loudly on the multiplier invariant.
        let mut a = Node::new();
        a.attrs.insert(
            "asn".into(),
            AttrValue::Array(vec![json!(1), json!(2)]),
        );
        let mut b = Node::new();
        b.attrs.insert(
            "asn".into(),
            AttrValue::Array(vec![json!(3), json!(4)]),
        );

        let mut siblings = vec![a, b];
        let mut reg = Registry::new();
        let err = compact_collection(&mut siblings, &mut reg).unwrap_err();
        assert!(matches!(err, Error::ShapeMismatch(_)));
    }
}

//! Structural comparator: are two sibling nodes "the same shape"?
//!
//! Merging is only safe when two entities' entire subtrees are
//! interchangeable up to per-instance values, so the comparison is recursive
//! and structural:
//! - attribute-name sets must match (the logical entity name is identity,
//!   not an attribute, and is ignored);
//! - scalar values may differ (that is exactly what compaction arrays up);
//! - deferred references must name the same target (a reference can never
//!   become a per-instance list);
//! - child collections must match name-for-name, length-for-length and
//!   position-for-position.
//!
//! Children are matched strictly by position, never by identity or content.
//! Two siblings whose children are logically equivalent but emitted in a
//! different relative order are classified as non-mergeable.

use crate::node::{AttrValue, Node};

/// Pure predicate; short-circuits on the first mismatch.
pub fn mergeable(a: &Node, b: &Node) -> bool {
    if a.multiplier != b.multiplier {
        return false;
    }

    if a.attrs.len() != b.attrs.len() {
        return false;
    }
    for (name, av) in &a.attrs {
        let Some(bv) = b.attrs.get(name) else {
            return false;
        };
        let compatible = match (av, bv) {
            // Per-instance values are allowed to differ.
            (AttrValue::Scalar(_), AttrValue::Scalar(_)) => true,
            (AttrValue::Array(xs), AttrValue::Array(ys)) => xs.len() == ys.len(),
            (AttrValue::Reference(x), AttrValue::Reference(y)) => x == y,
            _ => false,
        };
        if !compatible {
            return false;
        }
    }

    if a.children.len() != b.children.len() {
        return false;
    }
    for (collection, a_kids) in &a.children {
        let Some(b_kids) = b.children.get(collection) else {
            return false;
        };
        // Asymmetric child counts: simply not mergeable.
        if a_kids.len() != b_kids.len() {
            return false;
        }
        if !a_kids
            .iter()
            .zip(b_kids)
            .all(|(x, y)| mergeable(x, y))
        {
            return false;
        }
    }

    true
}

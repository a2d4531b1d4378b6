//! Hierarchical node addresses.
//!
//! An address is the path of (collection, ordinal) steps from the tree root,
//! e.g. `/device[0]/bgp_peer[2]`. Ordinals count surviving siblings after
//! compaction, so addresses are only stable once the whole tree has been
//! compacted. Rendered addresses may carry a caller-supplied absolute base
//! prefix for the external transport.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Step {
    pub collection: String,
    pub ordinal: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Address(pub Vec<Step>);

impl Address {
    pub fn root() -> Self {
        Address(Vec::new())
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Child address: this address extended by one step.
    pub fn child(&self, collection: &str, ordinal: usize) -> Self {
        let mut steps = self.0.clone();
        steps.push(Step {
            collection: collection.to_string(),
            ordinal,
        });
        Address(steps)
    }

    pub fn steps(&self) -> &[Step] {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return write!(f, "/");
        }
        for step in &self.0 {
            write!(f, "/{}[{}]", step.collection, step.ordinal)?;
        }
        Ok(())
    }
}

/// Render with an absolute base prefix ("" renders plain).
pub fn render(base: &str, addr: &Address) -> String {
    if base.is_empty() {
        return addr.to_string();
    }
    if addr.is_root() {
        base.to_string()
    } else {
        format!("{}{}", base, addr)
    }
}

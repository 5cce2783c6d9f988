//! Support classification

use serde::{Deserialize, Serialize};

/// Support classification of the node set
///
/// `all` holds every node whose position is frozen for the run, `optimizable`
/// the frozen nodes whose reaction is left free. `optimizable` is always a
/// subset of `all`; both lists are sorted and free of duplicates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupportClassification {
    all: Vec<usize>,
    optimizable: Vec<usize>,
}

/// Per-node support kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SupportKind {
    /// Not a support
    None,
    /// Frozen, reaction predefined by the loads applied to it
    Fixed,
    /// Frozen, reaction free to take whatever balances the node
    Optimizable,
}

impl SupportClassification {
    /// Build the index sets from a per-node kind list
    pub fn from_kinds(kinds: &[SupportKind]) -> Self {
        let mut all = Vec::new();
        let mut optimizable = Vec::new();
        for (i, kind) in kinds.iter().enumerate() {
            match kind {
                SupportKind::None => {}
                SupportKind::Fixed => all.push(i),
                SupportKind::Optimizable => {
                    all.push(i);
                    optimizable.push(i);
                }
            }
        }
        Self { all, optimizable }
    }

    /// All frozen nodes (AllSuppIndex)
    pub fn all(&self) -> &[usize] {
        &self.all
    }

    /// Frozen nodes with a free reaction (OptSuppIndex)
    pub fn optimizable(&self) -> &[usize] {
        &self.optimizable
    }

    /// Check whether the node is frozen
    pub fn is_frozen(&self, node: usize) -> bool {
        self.all.binary_search(&node).is_ok()
    }

    /// Check whether the node's reaction is free
    pub fn is_optimizable(&self, node: usize) -> bool {
        self.optimizable.binary_search(&node).is_ok()
    }

    /// Nodes whose force balance is driven to zero (everything except optimizable supports)
    pub fn is_balanced(&self, node: usize) -> bool {
        !self.is_optimizable(node)
    }

    /// Support kind of a node
    pub fn kind(&self, node: usize) -> SupportKind {
        if self.is_optimizable(node) {
            SupportKind::Optimizable
        } else if self.is_frozen(node) {
            SupportKind::Fixed
        } else {
            SupportKind::None
        }
    }
}

//! Deferred-resolution queue
//!
//! Nodes whose `when` condition cannot be decided yet are parked here and
//! re-checked once the rest of the tree has settled. The queue keeps
//! insertion order and holds at most one item per node: pushing a node that
//! is already pending is a no-op.

use std::fmt;

use indexmap::IndexMap;

use crate::data_tree::NodeId;

use super::schemas::SchemaId;

/// Why a node was deferred
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeferReason {
    /// The node's own `when` condition is undecided
    When,
    /// The `when` condition of an enclosing choice or case is undecided
    CaseWhen(SchemaId),
}

impl fmt::Display for DeferReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeferReason::When => write!(f, "when"),
            DeferReason::CaseWhen(id) => write!(f, "when of {}", id),
        }
    }
}

/// One pending node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeferredItem {
    /// The pending node
    pub node: NodeId,
    /// Reason tag
    pub reason: DeferReason,
}

/// Ordered queue of pending nodes with duplicate suppression
#[derive(Debug, Clone, Default)]
pub struct DeferredQueue {
    items: IndexMap<NodeId, DeferReason>,
}

impl DeferredQueue {
    /// Create an empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a node; returns false if it was already pending
    pub fn push(&mut self, node: NodeId, reason: DeferReason) -> bool {
        if self.items.contains_key(&node) {
            return false;
        }
        self.items.insert(node, reason);
        true
    }

    /// Whether a node is pending
    pub fn contains(&self, node: NodeId) -> bool {
        self.items.contains_key(&node)
    }

    /// Drop a node from the queue, keeping the order of the others
    pub fn remove(&mut self, node: NodeId) -> Option<DeferReason> {
        self.items.shift_remove(&node)
    }

    /// Number of pending nodes
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Check if nothing is pending
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Pending items in insertion order
    pub fn iter(&self) -> impl Iterator<Item = DeferredItem> + '_ {
        self.items
            .iter()
            .map(|(node, reason)| DeferredItem { node: *node, reason: *reason })
    }

    /// Take every pending item, leaving the queue empty
    pub fn drain(&mut self) -> Vec<DeferredItem> {
        self.items
            .drain(..)
            .map(|(node, reason)| DeferredItem { node, reason })
            .collect()
    }

    /// Forget every pending item
    pub fn clear(&mut self) {
        self.items.clear();
    }
}

//! Bidirectional lookup over a finished search result.

use crate::chain::{Assignment, Chain};
use indextree::NodeId;

/// The decisions of a finished search, flattened for lookups from either
/// side. Built once from the result chain; both directions are dense tables
/// keyed by arena index.
#[derive(Debug, Default, Clone)]
pub struct Matching {
    a_to_b: Vec<Option<NodeId>>,
    b_to_a: Vec<Option<NodeId>>,
    /// Matched pairs, in decision order
    pairs: Vec<(NodeId, NodeId)>,
    /// A nodes with no counterpart, in decision order
    dropped: Vec<NodeId>,
    /// B nodes with no counterpart
    inserted: Vec<NodeId>,
}

impl Matching {
    /// Create an empty matching.
    pub fn new() -> Self {
        Self::default()
    }

    /// Collect every decision of a chain, oldest first.
    pub fn from_chain(chain: &Chain) -> Self {
        let mut decisions: Vec<Assignment> = chain.iter().collect();
        decisions.reverse();

        let mut matching = Self::new();
        for decision in decisions {
            match (decision.a, decision.b) {
                (Some(a), Some(b)) => matching.add(a, b),
                (Some(a), None) => matching.dropped.push(a),
                (None, Some(b)) => matching.inserted.push(b),
                (None, None) => {}
            }
        }
        matching
    }

    /// Record `a ↦ b`.
    pub fn add(&mut self, a: NodeId, b: NodeId) {
        set_slot(&mut self.a_to_b, a, b);
        set_slot(&mut self.b_to_a, b, a);
        self.pairs.push((a, b));
    }

    /// Check if a node of the first document is matched.
    pub fn contains_a(&self, a: NodeId) -> bool {
        self.get_b(a).is_some()
    }

    /// Check if a node of the second document is matched.
    pub fn contains_b(&self, b: NodeId) -> bool {
        self.get_a(b).is_some()
    }

    /// Counterpart of a node of the first document.
    pub fn get_b(&self, a: NodeId) -> Option<NodeId> {
        self.a_to_b.get(usize::from(a)).copied().flatten()
    }

    /// Counterpart of a node of the second document.
    pub fn get_a(&self, b: NodeId) -> Option<NodeId> {
        self.b_to_a.get(usize::from(b)).copied().flatten()
    }

    /// Matched pairs, in decision order.
    pub fn pairs(&self) -> impl Iterator<Item = (NodeId, NodeId)> + '_ {
        self.pairs.iter().copied()
    }

    /// Nodes of the first document left without a counterpart.
    pub fn dropped(&self) -> &[NodeId] {
        &self.dropped
    }

    /// Nodes of the second document left without a counterpart.
    pub fn inserted(&self) -> &[NodeId] {
        &self.inserted
    }

    /// Number of matched pairs.
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Whether nothing is matched.
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

fn set_slot(table: &mut Vec<Option<NodeId>>, key: NodeId, value: NodeId) {
    let at = usize::from(key);
    if at >= table.len() {
        table.resize(at + 1, None);
    }
    table[at] = Some(value);
}

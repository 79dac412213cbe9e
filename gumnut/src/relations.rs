//! Relation bookkeeping shared by documents and the credit table.

use crate::class::RelationClass;
use rapidhash::RapidHashMap as HashMap;

/// Which way a relation list is read from a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Nodes this node relates to (`self -> other`).
    Down,
    /// Nodes that relate to this node (`other -> self`).
    Up,
}

impl Direction {
    /// Both directions, in the order the cost model settles them.
    pub const ALL: [Direction; 2] = [Direction::Down, Direction::Up];
}

/// Built-in structural relations, evaluated per node.
///
/// Attribute nodes are never selected as relation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Axis {
    /// Every non-attribute child (`./node()`).
    Children,
    /// Every non-attribute descendant (`.//node()`).
    Descendants,
    /// Every non-attribute child plus every element grandchild reached
    /// through an element child (`./node() | ./*/*`).
    #[default]
    ChildrenAndGrandchildren,
}

/// Per-document occurrence counts of each relation class.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelationCounts {
    counts: HashMap<RelationClass, u32>,
}

impl RelationCounts {
    /// Create an empty count map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one occurrence of `class`.
    pub fn add(&mut self, class: RelationClass) {
        *self.counts.entry(class).or_default() += 1;
    }

    /// Occurrences of `class`, if it was seen at all.
    pub fn get(&self, class: &RelationClass) -> Option<u32> {
        self.counts.get(class).copied()
    }

    /// Number of distinct classes.
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    /// Whether no relation was recorded.
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Total number of relation occurrences.
    pub fn total(&self) -> u64 {
        self.counts.values().map(|&c| u64::from(c)).sum()
    }

    /// Iterate over (class, count) pairs in unspecified order.
    pub fn iter(&self) -> impl Iterator<Item = (&RelationClass, u32)> + '_ {
        self.counts.iter().map(|(k, &v)| (k, v))
    }

    /// Classes in canonical (sorted) order.
    pub fn sorted_classes(&self) -> Vec<RelationClass> {
        let mut classes: Vec<_> = self.counts.keys().copied().collect();
        classes.sort_unstable();
        classes
    }

    /// Upper bound on relations any matching between the two documents can
    /// keep: the smaller count of every class both documents share.
    pub fn max_retained(a: &Self, b: &Self) -> u64 {
        a.counts
            .iter()
            .filter_map(|(class, &ca)| b.get(class).map(|cb| u64::from(ca.min(cb))))
            .sum()
    }
}

impl FromIterator<RelationClass> for RelationCounts {
    fn from_iter<I: IntoIterator<Item = RelationClass>>(iter: I) -> Self {
        let mut counts = Self::new();
        for class in iter {
            counts.add(class);
        }
        counts
    }
}

//! Persistent assignment chains.
//!
//! Each search state holds the decisions made so far as a singly linked list,
//! newest first. Extending a chain allocates one link and shares the tail, so
//! sibling states branching from the same parent cost one link each. A link is
//! freed when the last chain referencing it goes away.

use core::fmt;
use indextree::NodeId;
use std::rc::Rc;

/// One matching decision.
///
/// `(Some(a), Some(b))` matches two nodes, `(Some(a), None)` drops a node of
/// the first document, `(None, Some(b))` inserts a node of the second.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Assignment {
    /// Node in the first document.
    pub a: Option<NodeId>,
    /// Node in the second document.
    pub b: Option<NodeId>,
}

struct Link {
    pair: Assignment,
    tail: Chain,
}

/// A shared, immutable list of assignments, newest first.
#[derive(Clone, Default)]
pub struct Chain {
    head: Option<Rc<Link>>,
}

impl Chain {
    /// The empty chain.
    pub fn new() -> Self {
        Self::default()
    }

    /// A new chain with one more decision in front of this one.
    pub fn extend(&self, a: Option<NodeId>, b: Option<NodeId>) -> Chain {
        Chain {
            head: Some(Rc::new(Link {
                pair: Assignment { a, b },
                tail: self.clone(),
            })),
        }
    }

    /// The most recent decision.
    pub fn head(&self) -> Option<Assignment> {
        self.head.as_ref().map(|link| link.pair)
    }

    /// Find the decision involving `a` from the first document.
    pub fn find_by_a(&self, a: NodeId) -> Option<Assignment> {
        self.iter().find(|pair| pair.a == Some(a))
    }

    /// Find the decision involving `b` from the second document.
    pub fn find_by_b(&self, b: NodeId) -> Option<Assignment> {
        self.iter().find(|pair| pair.b == Some(b))
    }

    /// Iterate newest first.
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            next: self.head.as_deref(),
        }
    }

    /// Number of decisions.
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    /// Whether no decision was made yet.
    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    /// Number of chains sharing the head link (0 for the empty chain).
    pub fn share_count(&self) -> usize {
        self.head.as_ref().map_or(0, Rc::strong_count)
    }
}

// Long chains would recurse once per link in the default drop.
impl Drop for Chain {
    fn drop(&mut self) {
        let mut next = self.head.take();
        while let Some(link) = next {
            match Rc::try_unwrap(link) {
                Ok(mut link) => next = link.tail.head.take(),
                Err(_) => break,
            }
        }
    }
}

impl fmt::Debug for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

/// Iterator over a chain, newest first.
pub struct Iter<'a> {
    next: Option<&'a Link>,
}

impl Iterator for Iter<'_> {
    type Item = Assignment;

    fn next(&mut self) -> Option<Self::Item> {
        let link = self.next?;
        self.next = link.tail.head.as_deref();
        Some(link.pair)
    }
}

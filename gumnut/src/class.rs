//! Equivalence classes for nodes and relations.
//!
//! Two nodes are candidates for matching only when they share a [`NodeClass`].
//! A [`RelationClass`] groups directed relations by the classes of both ends;
//! it is the unit the credit table keeps its books in.

use crate::intern::Sym;
use core::fmt;

/// The (label, content) pair that groups interchangeable nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeClass {
    /// Element or attribute name; empty for text.
    pub label: Sym,
    /// Text or attribute value; empty for elements.
    pub content: Sym,
}

impl NodeClass {
    /// Build a class from two interned handles.
    pub const fn new(label: Sym, content: Sym) -> Self {
        Self { label, content }
    }

    /// Build a class by interning raw text.
    pub fn from_text(label: &str, content: &str) -> Self {
        Self::new(Sym::intern(label), Sym::intern(content))
    }
}

impl fmt::Display for NodeClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.label.is_empty(), self.content.is_empty()) {
            (false, true) => write!(f, "<{}>", self.label),
            (true, false) => write!(f, "{:?}", self.content.as_str()),
            _ => write!(f, "{}={:?}", self.label, self.content.as_str()),
        }
    }
}

/// A directed relation between two node classes. `from -> to` differs from
/// `to -> from`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RelationClass {
    /// Class of the relating node.
    pub from: NodeClass,
    /// Class of the related node.
    pub to: NodeClass,
}

impl RelationClass {
    /// Build a relation class from its two ends.
    pub const fn new(from: NodeClass, to: NodeClass) -> Self {
        Self { from, to }
    }
}

impl fmt::Display for RelationClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.from, self.to)
    }
}

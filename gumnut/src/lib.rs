//! # Gumnut
//!
//! Relation-preserving node matching between two labeled, ordered trees.
//!
//! Named after the woody seed capsule of the gum tree: small, hard, and full
//! of seeds that each might grow into something.
//!
//! ## Algorithm Overview
//!
//! Each document is a set of nodes, each with a [`NodeClass`] (label plus
//! content), and a set of directed relations between nodes (typically
//! "parent of" or "ancestor of"). A matching pairs nodes of equal class across
//! the two documents, one-to-one, or leaves them unmatched. A relation
//! survives when both of its ends are matched to the two ends of a relation
//! of the same [`RelationClass`] on the other side.
//!
//! The search looks for the matching that loses the fewest relations:
//!
//! 1. **Bootstrap**: every relation class is classified once ([`ClassIndex`]),
//!    and classes occurring more than once get a signed credit counter.
//! 2. **Best-first search**: partial matchings are expanded one decision at a
//!    time, cheapest first. The incremental cost of a decision is computed
//!    from the credit counters in time proportional to the node's degree.
//! 3. **Result**: the first complete matching popped from the frontier.
//!
//! A fast mode keeps only the best state after each step, trading optimality
//! for linear behavior on large inputs.
//!
//! ## Usage
//!
//! ```
//! use gumnut::{Axis, Document, SearchConfig, match_documents};
//!
//! let mut a = Document::new("ul");
//! let li = a.add_element(a.root, "li");
//! a.add_text(li, "first");
//! a.relate_axis(Axis::Children);
//!
//! let mut b = Document::new("ul");
//! let li = b.add_element(b.root, "li");
//! b.add_text(li, "first");
//! b.relate_axis(Axis::Children);
//!
//! let outcome = match_documents(&a, &b, &SearchConfig::default()).unwrap();
//! assert_eq!(outcome.cost, 0);
//! assert_eq!(outcome.matching().len(), 3);
//! ```

#![warn(missing_docs)]
#![warn(clippy::std_instead_of_core)]

pub use indextree;

mod tracing_macros;
pub(crate) use tracing_macros::{debug, trace, warning};

/// Persistent assignment chains
pub mod chain;
/// Node and relation classes
pub mod class;
/// Relation class index and credit vectors
pub mod credit;
/// Document model and the read-only view the search consumes
pub mod document;
mod error;
/// Symbol interning
pub mod intern;
/// Lookup view over a search result
pub mod matching;
/// Relation directions, axes and counts
pub mod relations;
/// The search engine
pub mod search;
/// Search states
pub mod state;
/// Per-step diagnostics
pub mod trace;

pub use chain::{Assignment, Chain};
pub use class::{NodeClass, RelationClass};
pub use credit::{ClassEntry, ClassIndex, CreditTable};
pub use document::{Document, DocumentOptions, NodeData, NodeKind, RelationTree};
pub use error::MatchError;
pub use intern::Sym;
pub use matching::Matching;
pub use relations::{Axis, Direction, RelationCounts};
pub use search::{CancelFlag, Outcome, Search, SearchConfig, SearchMode, Step, match_documents};
pub use state::{Rank, SearchState};
pub use trace::{JsonLinesTrace, StepRecord, TraceSink};

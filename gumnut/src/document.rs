//! Documents as seen by the search: nodes, their classes, and their relations.
//!
//! The search only needs the read-only view described by [`RelationTree`].
//! [`Document`] is the in-memory implementation: an `indextree` arena of
//! element, attribute and text nodes, built programmatically and then
//! annotated with relations, either one at a time ([`Document::relate`]) or
//! from a built-in structural [`Axis`].

use crate::class::{NodeClass, RelationClass};
use crate::intern::Sym;
use crate::relations::{Axis, Direction, RelationCounts};
use crate::trace;
use indextree::{Arena, NodeId};
use rapidhash::RapidHashMap as HashMap;
use smallvec::SmallVec;

/// Read-only view of a document, as consumed by the search.
///
/// The two documents of a search may be different concrete types; they only
/// need to agree on [`NodeClass`] (which is global, via the interner).
pub trait RelationTree {
    /// Number of nodes taking part in matching.
    fn node_count(&self) -> usize;

    /// All nodes, in document order.
    fn nodes(&self) -> impl Iterator<Item = NodeId> + '_;

    /// The equivalence class of a node.
    fn class(&self, id: NodeId) -> NodeClass;

    /// All nodes of the given class, in document order.
    fn nodes_of_class(&self, class: NodeClass) -> &[NodeId];

    /// Relation neighbors of a node in one direction.
    fn related(&self, id: NodeId, direction: Direction) -> &[NodeId];

    /// Occurrence count of every relation class in the document.
    fn relation_counts(&self) -> &RelationCounts;
}

/// What a node represents in the source document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// An element; class is (name, empty).
    Element,
    /// An attribute of an element; class is (name, value).
    Attribute,
    /// A text node; class is (empty, text).
    Text,
}

/// Per-node payload stored in the arena.
#[derive(Debug, Clone)]
pub struct NodeData {
    /// Node kind
    pub kind: NodeKind,
    /// Matching class
    pub class: NodeClass,
    down: SmallVec<[NodeId; 4]>,
    up: SmallVec<[NodeId; 4]>,
}

impl NodeData {
    fn new(kind: NodeKind, class: NodeClass) -> Self {
        Self {
            kind,
            class,
            down: SmallVec::new(),
            up: SmallVec::new(),
        }
    }
}

/// Options applied while building a document.
#[derive(Debug, Clone, Copy, Default)]
pub struct DocumentOptions {
    /// Keep whitespace-only text nodes instead of skipping them.
    pub keep_whitespace: bool,
}

/// An in-memory labeled, ordered tree with relation lists.
#[derive(Debug, Clone)]
pub struct Document {
    /// All nodes live here.
    pub arena: Arena<NodeData>,
    /// The root element.
    pub root: NodeId,
    order: Vec<NodeId>,
    by_class: HashMap<NodeClass, Vec<NodeId>>,
    counts: RelationCounts,
    options: DocumentOptions,
}

impl Document {
    /// Create a document consisting of a single root element.
    pub fn new(root_label: &str) -> Self {
        Self::with_options(root_label, DocumentOptions::default())
    }

    /// Create a document with explicit build options.
    pub fn with_options(root_label: &str, options: DocumentOptions) -> Self {
        let class = NodeClass::new(Sym::intern(root_label), Sym::EMPTY);
        let mut arena = Arena::new();
        let root = arena.new_node(NodeData::new(NodeKind::Element, class));
        let mut doc = Self {
            arena,
            root,
            order: Vec::new(),
            by_class: HashMap::default(),
            counts: RelationCounts::new(),
            options,
        };
        doc.register(root);
        doc
    }

    /// Append an element as the last child of `parent`.
    pub fn add_element(&mut self, parent: NodeId, label: &str) -> NodeId {
        let class = NodeClass::new(Sym::intern(label), Sym::EMPTY);
        let id = self
            .arena
            .new_node(NodeData::new(NodeKind::Element, class));
        parent.append(id, &mut self.arena);
        self.register(id);
        id
    }

    /// Add an attribute to `element`.
    ///
    /// Attributes precede all other children of their element, and directly
    /// follow it in document order, regardless of when they are added.
    pub fn add_attribute(&mut self, element: NodeId, name: &str, value: &str) -> NodeId {
        let class = NodeClass::new(Sym::intern(name), Sym::intern(value));
        let id = self
            .arena
            .new_node(NodeData::new(NodeKind::Attribute, class));

        let last_attr = element
            .children(&self.arena)
            .take_while(|&c| self.arena[c].get().kind == NodeKind::Attribute)
            .last();
        match last_attr {
            Some(prev) => prev.insert_after(id, &mut self.arena),
            None => element.prepend(id, &mut self.arena),
        }
        self.register(id);
        id
    }

    /// Append a text node under `parent`.
    ///
    /// Returns `None` when the text is whitespace-only and the document does
    /// not keep whitespace.
    pub fn add_text(&mut self, parent: NodeId, text: &str) -> Option<NodeId> {
        let content = Sym::intern(text);
        if content.is_empty() && !self.options.keep_whitespace {
            return None;
        }
        let class = NodeClass::new(Sym::EMPTY, content);
        let id = self.arena.new_node(NodeData::new(NodeKind::Text, class));
        parent.append(id, &mut self.arena);
        self.register(id);
        Some(id)
    }

    /// Record an already-linked node in document order and in its class
    /// bucket.
    fn register(&mut self, id: NodeId) {
        let class = self.arena[id].get().class;
        let pos = match self.preorder_predecessor(id) {
            None => 0,
            Some(prev) if self.order.last() == Some(&prev) => self.order.len(),
            Some(prev) => self
                .order
                .iter()
                .position(|&n| n == prev)
                .map_or(self.order.len(), |i| i + 1),
        };

        if pos == self.order.len() {
            self.order.push(id);
            self.by_class.entry(class).or_default().push(id);
            return;
        }

        self.order.insert(pos, id);
        let arena = &self.arena;
        let bucket = self
            .order
            .iter()
            .copied()
            .filter(|&n| arena[n].get().class == class)
            .collect();
        self.by_class.insert(class, bucket);
    }

    /// The node right before `id` in preorder: the deepest last descendant
    /// of its previous sibling, or else its parent.
    fn preorder_predecessor(&self, id: NodeId) -> Option<NodeId> {
        let Some(mut prev) = self.arena[id].previous_sibling() else {
            return self.arena[id].parent();
        };
        while let Some(last) = self.arena[prev].last_child() {
            prev = last;
        }
        Some(prev)
    }

    /// Node payload.
    pub fn get(&self, id: NodeId) -> &NodeData {
        self.arena[id].get()
    }

    /// Node kind.
    pub fn kind(&self, id: NodeId) -> NodeKind {
        self.get(id).kind
    }

    /// Tree children, attributes first.
    pub fn children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        id.children(&self.arena)
    }

    /// Record one directed relation `from -> to`.
    pub fn relate(&mut self, from: NodeId, to: NodeId) {
        let class = RelationClass::new(self.get(from).class, self.get(to).class);
        self.arena[from].get_mut().down.push(to);
        self.arena[to].get_mut().up.push(from);
        self.counts.add(class);
    }

    /// Evaluate a structural axis on every node and record the results.
    pub fn relate_axis(&mut self, axis: Axis) {
        let mut pairs = Vec::new();
        for &node in &self.order {
            let mut targets: SmallVec<[NodeId; 8]> = SmallVec::new();
            let mut push = |t: NodeId| {
                if !targets.contains(&t) {
                    targets.push(t);
                }
            };
            match axis {
                Axis::Children => {
                    for c in self.selectable_children(node) {
                        push(c);
                    }
                }
                Axis::Descendants => {
                    for d in node.descendants(&self.arena).skip(1) {
                        if self.kind(d) != NodeKind::Attribute {
                            push(d);
                        }
                    }
                }
                Axis::ChildrenAndGrandchildren => {
                    for c in self.selectable_children(node) {
                        push(c);
                    }
                    for c in self.selectable_children(node) {
                        if self.kind(c) != NodeKind::Element {
                            continue;
                        }
                        for g in self.selectable_children(c) {
                            if self.kind(g) == NodeKind::Element {
                                push(g);
                            }
                        }
                    }
                }
            }
            pairs.extend(targets.into_iter().map(|t| (node, t)));
        }

        trace!(?axis, relations = pairs.len(), "relate_axis");
        for (from, to) in pairs {
            self.relate(from, to);
        }
    }

    fn selectable_children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        id.children(&self.arena)
            .filter(|&c| self.kind(c) != NodeKind::Attribute)
    }
}

impl RelationTree for Document {
    fn node_count(&self) -> usize {
        self.order.len()
    }

    fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.order.iter().copied()
    }

    fn class(&self, id: NodeId) -> NodeClass {
        self.get(id).class
    }

    fn nodes_of_class(&self, class: NodeClass) -> &[NodeId] {
        self.by_class.get(&class).map(Vec::as_slice).unwrap_or(&[])
    }

    fn related(&self, id: NodeId, direction: Direction) -> &[NodeId] {
        let data = self.get(id);
        match direction {
            Direction::Down => &data.down,
            Direction::Up => &data.up,
        }
    }

    fn relation_counts(&self) -> &RelationCounts {
        &self.counts
    }
}

//! Segment trie mixing literal and macro segments.
//!
//! Nodes live in an arena and refer to each other by [`NodeId`]. Each node
//! keeps its literal children in a map and its macro children in
//! registration order, which is the tie-break order during resolution.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fmt;

use crate::macros::{MacroSegment, SegmentPattern};
use crate::request::Method;

/// Stable index of a node inside its trie.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

const ROOT: NodeId = NodeId(0);

/// One trie node: a single segment class plus the handlers ending here.
#[derive(Debug)]
struct RouteNode<V> {
    /// `None` only for the root.
    segment: Option<SegmentPattern>,
    parent: Option<NodeId>,
    literals: HashMap<String, NodeId>,
    macros: Vec<NodeId>,
    /// Keyed by method; `None` is the method-agnostic fallback.
    handlers: HashMap<Option<Method>, V>,
}

impl<V> RouteNode<V> {
    fn new(segment: Option<SegmentPattern>, parent: Option<NodeId>) -> Self {
        Self {
            segment,
            parent,
            literals: HashMap::new(),
            macros: Vec::new(),
            handlers: HashMap::new(),
        }
    }

    fn handler_for(&self, method: &Method) -> Option<&V> {
        self.handlers
            .get(&Some(method.clone()))
            .or_else(|| self.handlers.get(&None))
    }
}

/// A resolved terminal node and the macro values bound on the way there.
#[derive(Debug)]
pub struct Resolution<'t, 's, V> {
    /// The terminal node.
    pub node: NodeRef<'t, V>,
    /// The handler selected for the requested method.
    pub value: &'t V,
    /// `(macro, value)` pairs from root to leaf.
    pub captures: Vec<(&'t MacroSegment, &'s str)>,
}

/// Prefix tree of path patterns.
#[derive(Debug)]
pub struct RouteTrie<V> {
    nodes: Vec<RouteNode<V>>,
}

impl<V> Default for RouteTrie<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> RouteTrie<V> {
    /// Creates a trie holding only the root node.
    pub fn new() -> Self {
        Self {
            nodes: vec![RouteNode::new(None, None)],
        }
    }

    /// Returns the number of nodes, root included.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Returns a handle to the root node.
    pub fn root(&self) -> NodeRef<'_, V> {
        NodeRef {
            trie: self,
            id: ROOT,
        }
    }

    /// Returns a handle to a node, `None` if `id` is out of range.
    ///
    /// Ids are only meaningful for the trie that issued them.
    pub fn node(&self, id: NodeId) -> Option<NodeRef<'_, V>> {
        (id.0 < self.nodes.len()).then_some(NodeRef { trie: self, id })
    }

    /// Walks the pattern, creating missing nodes, and returns the last one.
    ///
    /// An existing macro child is reused only when its descriptor is
    /// structurally identical; otherwise a new child is appended.
    pub fn node_for(&mut self, segments: &[SegmentPattern]) -> NodeId {
        let mut current = ROOT;
        for segment in segments {
            current = match segment {
                SegmentPattern::Literal(text) => {
                    let existing = self.nodes[current.0].literals.get(text).copied();
                    match existing {
                        Some(child) => child,
                        None => {
                            let child = self.push(segment.clone(), current);
                            self.nodes[current.0].literals.insert(text.clone(), child);
                            child
                        }
                    }
                }
                SegmentPattern::Macro(_) => {
                    let existing = self.nodes[current.0]
                        .macros
                        .iter()
                        .copied()
                        .find(|&child| self.nodes[child.0].segment.as_ref() == Some(segment));
                    match existing {
                        Some(child) => child,
                        None => {
                            let child = self.push(segment.clone(), current);
                            self.nodes[current.0].macros.push(child);
                            child
                        }
                    }
                }
            };
        }
        current
    }

    /// Stores a handler at `node` for `method`.
    ///
    /// Returns the rejected value if the slot is already occupied.
    pub fn attach(&mut self, node: NodeId, method: Option<Method>, value: V) -> Result<&V, V> {
        match self.nodes[node.0].handlers.entry(method) {
            Entry::Occupied(_) => Err(value),
            Entry::Vacant(slot) => Ok(slot.insert(value)),
        }
    }

    /// Inserts a handler for a pattern.
    pub fn insert(
        &mut self,
        segments: &[SegmentPattern],
        method: Option<Method>,
        value: V,
    ) -> Result<&V, V> {
        let node = self.node_for(segments);
        self.attach(node, method, value)
    }

    /// Resolves request segments to a handler.
    ///
    /// Depth-first with backtracking. At each level the literal child is
    /// tried before macro children, and macro children in registration
    /// order; the first complete match wins. A node only terminates a
    /// match when all segments are consumed and it holds a handler for
    /// `method` or a method-agnostic one.
    pub fn resolve<'t, 's>(
        &'t self,
        segments: &[&'s str],
        method: &Method,
    ) -> Option<Resolution<'t, 's, V>> {
        let mut path = Vec::with_capacity(segments.len());
        let (id, value) = self.walk(ROOT, segments, method, &mut path)?;
        let captures = path
            .into_iter()
            .filter_map(|(node, value)| {
                self.nodes[node.0]
                    .segment
                    .as_ref()
                    .and_then(SegmentPattern::as_macro)
                    .map(|m| (m, value))
            })
            .collect();
        Some(Resolution {
            node: NodeRef { trie: self, id },
            value,
            captures,
        })
    }

    fn walk<'s>(
        &self,
        id: NodeId,
        segments: &[&'s str],
        method: &Method,
        path: &mut Vec<(NodeId, &'s str)>,
    ) -> Option<(NodeId, &V)> {
        let node = &self.nodes[id.0];
        let Some((&head, rest)) = segments.split_first() else {
            return node.handler_for(method).map(|value| (id, value));
        };

        if let Some(&child) = node.literals.get(head) {
            if let Some(found) = self.walk(child, rest, method, path) {
                return Some(found);
            }
        }

        for &child in &node.macros {
            let Some(SegmentPattern::Macro(m)) = &self.nodes[child.0].segment else {
                continue;
            };
            let Some(value) = m.capture(head) else {
                continue;
            };
            path.push((child, value));
            if let Some(found) = self.walk(child, rest, method, path) {
                return Some(found);
            }
            path.pop();
        }

        None
    }

    /// Iterates over every stored handler.
    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.nodes.iter().flat_map(|node| node.handlers.values())
    }

    fn push(&mut self, segment: SegmentPattern, parent: NodeId) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(RouteNode::new(Some(segment), Some(parent)));
        id
    }
}

/// Borrowed view of a trie node, used to walk a match back to the root.
pub struct NodeRef<'t, V> {
    trie: &'t RouteTrie<V>,
    id: NodeId,
}

impl<V> Clone for NodeRef<'_, V> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<V> Copy for NodeRef<'_, V> {}

impl<V> fmt::Debug for NodeRef<'_, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeRef")
            .field("id", &self.id)
            .field("pattern", &self.pattern())
            .finish()
    }
}

impl<'t, V> NodeRef<'t, V> {
    fn raw(&self) -> &'t RouteNode<V> {
        &self.trie.nodes[self.id.0]
    }

    /// Returns the node id.
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Returns whether this is the root node.
    pub fn is_root(&self) -> bool {
        self.id == ROOT
    }

    /// Returns the segment this node matches; `None` for the root.
    pub fn segment(&self) -> Option<&'t SegmentPattern> {
        self.raw().segment.as_ref()
    }

    /// Returns the macro this node matches, if any.
    pub fn path_macro(&self) -> Option<&'t MacroSegment> {
        self.segment().and_then(SegmentPattern::as_macro)
    }

    /// Returns the parent node; `None` for the root.
    pub fn parent(&self) -> Option<Self> {
        self.raw().parent.map(|id| Self {
            trie: self.trie,
            id,
        })
    }

    /// Iterates from this node up to the root, both included.
    pub fn ancestors(&self) -> impl Iterator<Item = Self> {
        std::iter::successors(Some(*self), Self::parent)
    }

    /// Returns the handler stored for exactly `method`.
    pub fn handler(&self, method: Option<Method>) -> Option<&'t V> {
        self.raw().handlers.get(&method)
    }

    /// Rebuilds the canonical pattern from the root down to this node.
    pub fn pattern(&self) -> String {
        let mut segments: Vec<String> = self
            .ancestors()
            .filter_map(|node| node.segment().map(ToString::to_string))
            .collect();
        if segments.is_empty() {
            return "/".to_string();
        }
        segments.reverse();
        format!("/{}", segments.join("/"))
    }
}

//! B+-tree node types and the arena that owns them.
//!
//! The tree uses two node kinds:
//! - Internal nodes: an ordered list of `(max_key, child)` index entries
//! - Leaf nodes: an ordered list of entries, doubly-linked for range scans
//!
//! Nodes refer to each other (parent, children, leaf siblings) by
//! [`NodeId`], an index into [`NodeArena`]. The arena is the only owner.

use crate::entry::Entry;

/// Stable index of a node in the arena.
pub type NodeId = usize;

/// Index entry of an internal node: the largest key stored under `child`.
#[derive(Debug, Clone)]
pub struct IndexEntry<K> {
    pub max_key: K,
    pub child: NodeId,
}

/// Payload of a node.
#[derive(Debug, Clone)]
pub enum NodeKind<K, V> {
    Internal {
        children: Vec<IndexEntry<K>>,
    },
    Leaf {
        entries: Vec<Entry<K, V>>,
        prev: Option<NodeId>,
        next: Option<NodeId>,
    },
}

/// A tree node. `parent` is navigational only; the parent does not own the
/// child through it.
#[derive(Debug, Clone)]
pub struct Node<K, V> {
    pub parent: Option<NodeId>,
    pub kind: NodeKind<K, V>,
}

impl<K, V> Node<K, V> {
    /// Create a leaf holding `entries`.
    pub const fn leaf(parent: Option<NodeId>, entries: Vec<Entry<K, V>>) -> Self {
        Self {
            parent,
            kind: NodeKind::Leaf {
                entries,
                prev: None,
                next: None,
            },
        }
    }

    /// Create an internal node over `children`.
    pub const fn internal(parent: Option<NodeId>, children: Vec<IndexEntry<K>>) -> Self {
        Self {
            parent,
            kind: NodeKind::Internal { children },
        }
    }

    /// Number of entries (leaf) or children (internal).
    pub fn len(&self) -> usize {
        match &self.kind {
            NodeKind::Internal { children } => children.len(),
            NodeKind::Leaf { entries, .. } => entries.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub const fn is_leaf(&self) -> bool {
        matches!(self.kind, NodeKind::Leaf { .. })
    }

    /// Key of the last child or entry.
    pub fn max_key(&self) -> Option<&K> {
        match &self.kind {
            NodeKind::Internal { children } => children.last().map(|c| &c.max_key),
            NodeKind::Leaf { entries, .. } => entries.last().map(Entry::key),
        }
    }
}

/// Slot storage for tree nodes. Freed slots are recycled by later
/// allocations.
#[derive(Debug, Clone)]
pub struct NodeArena<K, V> {
    slots: Vec<Option<Node<K, V>>>,
    free: Vec<NodeId>,
}

impl<K, V> Default for NodeArena<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> NodeArena<K, V> {
    pub const fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
        }
    }

    pub fn alloc(&mut self, node: Node<K, V>) -> NodeId {
        if let Some(id) = self.free.pop() {
            self.slots[id] = Some(node);
            id
        } else {
            self.slots.push(Some(node));
            self.slots.len() - 1
        }
    }

    /// Take a node out of the arena and free its slot.
    pub fn release(&mut self, id: NodeId) -> Node<K, V> {
        match self.slots.get_mut(id).and_then(Option::take) {
            Some(node) => {
                self.free.push(id);
                node
            }
            None => unreachable!("released dangling node {id}"),
        }
    }

    /// Number of live nodes.
    pub fn live(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    pub fn get(&self, id: NodeId) -> &Node<K, V> {
        match self.slots.get(id) {
            Some(Some(node)) => node,
            _ => unreachable!("dangling node {id}"),
        }
    }

    pub fn get_mut(&mut self, id: NodeId) -> &mut Node<K, V> {
        match self.slots.get_mut(id) {
            Some(Some(node)) => node,
            _ => unreachable!("dangling node {id}"),
        }
    }

    pub fn entries(&self, id: NodeId) -> &[Entry<K, V>] {
        match &self.get(id).kind {
            NodeKind::Leaf { entries, .. } => entries,
            NodeKind::Internal { .. } => unreachable!("node {id} is not a leaf"),
        }
    }

    pub fn entries_mut(&mut self, id: NodeId) -> &mut Vec<Entry<K, V>> {
        match &mut self.get_mut(id).kind {
            NodeKind::Leaf { entries, .. } => entries,
            NodeKind::Internal { .. } => unreachable!("node {id} is not a leaf"),
        }
    }

    pub fn children(&self, id: NodeId) -> &[IndexEntry<K>] {
        match &self.get(id).kind {
            NodeKind::Internal { children } => children,
            NodeKind::Leaf { .. } => unreachable!("node {id} is not internal"),
        }
    }

    pub fn children_mut(&mut self, id: NodeId) -> &mut Vec<IndexEntry<K>> {
        match &mut self.get_mut(id).kind {
            NodeKind::Internal { children } => children,
            NodeKind::Leaf { .. } => unreachable!("node {id} is not internal"),
        }
    }

    /// `(prev, next)` leaf links.
    pub fn leaf_links(&self, id: NodeId) -> (Option<NodeId>, Option<NodeId>) {
        match &self.get(id).kind {
            NodeKind::Leaf { prev, next, .. } => (*prev, *next),
            NodeKind::Internal { .. } => unreachable!("node {id} is not a leaf"),
        }
    }

    pub fn set_prev(&mut self, id: NodeId, link: Option<NodeId>) {
        match &mut self.get_mut(id).kind {
            NodeKind::Leaf { prev, .. } => *prev = link,
            NodeKind::Internal { .. } => unreachable!("node {id} is not a leaf"),
        }
    }

    pub fn set_next(&mut self, id: NodeId, link: Option<NodeId>) {
        match &mut self.get_mut(id).kind {
            NodeKind::Leaf { next, .. } => *next = link,
            NodeKind::Internal { .. } => unreachable!("node {id} is not a leaf"),
        }
    }

    pub fn set_parent(&mut self, id: NodeId, parent: Option<NodeId>) {
        self.get_mut(id).parent = parent;
    }
}

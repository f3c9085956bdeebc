//! B+-tree ordered map.
//!
//! All entries live in leaves; internal nodes only route. Each internal
//! index entry records the largest key of its child, so descending picks the
//! first child whose max key is at or above the search key.
//!
//! # Invariants
//!
//! - Order `m` is in `[MIN_ORDER, MAX_ORDER]`.
//! - Every non-root node holds between `(m - 1) / 2 + 1` and `m` children or
//!   entries.
//! - An internal root has at least 2 children; an empty tree has no root.
//! - Every index entry's key equals its child's max key.
//! - The leaf chain is sorted end to end and all leaves sit at one depth.

use crate::Direction;
use crate::btree::node::{IndexEntry, Node, NodeArena, NodeId, NodeKind};
use crate::comparator::{Comparator, NaturalOrder};
use crate::entry::Entry;

/// Smallest supported order.
pub const MIN_ORDER: usize = 3;

/// Largest supported order.
pub const MAX_ORDER: usize = 31;

/// Order used by [`BTree::default`].
pub const DEFAULT_ORDER: usize = 8;

/// A B+-tree map ordered by a [`Comparator`].
#[derive(Debug, Clone)]
pub struct BTree<K, V, C = NaturalOrder> {
    arena: NodeArena<K, V>,
    root: Option<NodeId>,
    order: usize,
    min_fanout: usize,
    len: usize,
    comparator: C,
}

impl<K: Ord + Clone, V> BTree<K, V, NaturalOrder> {
    /// Create an empty tree of the given order using `K`'s natural ordering.
    #[must_use]
    pub const fn new_natural(order: usize) -> Self {
        Self::new(order, NaturalOrder)
    }
}

impl<K: Ord + Clone, V> Default for BTree<K, V, NaturalOrder> {
    fn default() -> Self {
        Self::new_natural(DEFAULT_ORDER)
    }
}

impl<K, V, C> BTree<K, V, C> {
    /// Create an empty tree.
    ///
    /// `order` is clamped to `[MIN_ORDER, MAX_ORDER]`.
    #[must_use]
    pub const fn new(order: usize, comparator: C) -> Self {
        let order = if order < MIN_ORDER {
            MIN_ORDER
        } else if order > MAX_ORDER {
            MAX_ORDER
        } else {
            order
        };
        Self {
            arena: NodeArena::new(),
            root: None,
            order,
            min_fanout: (order - 1) / 2 + 1,
            len: 0,
            comparator,
        }
    }

    /// Maximum children or entries per node.
    #[must_use]
    pub const fn order(&self) -> usize {
        self.order
    }

    /// Minimum children or entries per non-root node.
    #[must_use]
    pub const fn min_fanout(&self) -> usize {
        self.min_fanout
    }

    /// Number of entries.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Whether the tree is empty.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Remove every entry.
    pub fn clear(&mut self) {
        self.arena = NodeArena::new();
        self.root = None;
        self.len = 0;
    }
}

impl<K: Clone, V, C: Comparator<K>> BTree<K, V, C> {
    /// Insert `key`, returning `true` if it was new and `false` if an
    /// existing value was overwritten.
    pub fn add(&mut self, key: K, value: V) -> bool {
        self.insert(key, value).is_none()
    }

    /// Insert `key`, returning the previous value if the key was present.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        let Some(leaf) = self.find_leaf(&key) else {
            let root = self
                .arena
                .alloc(Node::leaf(None, vec![Entry::new(key, value)]));
            self.root = Some(root);
            self.len = 1;
            return None;
        };

        let entries = self.arena.entries_mut(leaf);
        let index = match entries.binary_search_by(|e| self.comparator.compare(e.key(), &key)) {
            Ok(index) => return Some(entries[index].set_value(value)),
            Err(index) => index,
        };
        entries.insert(index, Entry::new(key, value));
        let new_max = index + 1 == entries.len();
        let overflow = entries.len() > self.order;
        self.len += 1;

        if new_max {
            self.rebuild_up(leaf);
        }
        if overflow {
            self.split(leaf);
        }
        None
    }

    /// Remove `key`, returning its value.
    pub fn remove(&mut self, key: &K) -> Option<V> {
        self.remove_entry(key).map(|entry| entry.into_parts().1)
    }

    /// Remove `key`, returning the whole entry.
    pub fn remove_entry(&mut self, key: &K) -> Option<Entry<K, V>> {
        let leaf = self.find_leaf(key)?;
        let entries = self.arena.entries_mut(leaf);
        let index = entries
            .binary_search_by(|e| self.comparator.compare(e.key(), key))
            .ok()?;
        let removed = entries.remove(index);
        let max_changed = index == entries.len() && !entries.is_empty();
        self.len -= 1;

        if max_changed {
            self.rebuild_up(leaf);
        }
        self.rebalance(leaf);
        Some(removed)
    }

    /// Look up the value for `key`.
    #[must_use]
    pub fn search(&self, key: &K) -> Option<&V> {
        let leaf = self.find_leaf(key)?;
        let entries = self.arena.entries(leaf);
        let index = entries
            .binary_search_by(|e| self.comparator.compare(e.key(), key))
            .ok()?;
        Some(entries[index].value())
    }

    /// Look up the value for `key` mutably.
    pub fn search_mut(&mut self, key: &K) -> Option<&mut V> {
        let leaf = self.find_leaf(key)?;
        let entries = self.arena.entries_mut(leaf);
        let index = entries
            .binary_search_by(|e| self.comparator.compare(e.key(), key))
            .ok()?;
        Some(entries[index].value_mut())
    }

    /// Whether `key` is present.
    #[must_use]
    pub fn contains_key(&self, key: &K) -> bool {
        self.search(key).is_some()
    }

    /// All entries with `start <= key <= end`, in ascending order.
    pub fn search_range(&self, start: &K, end: &K) -> Result<Vec<(&K, &V)>, BTreeError> {
        Ok(self.range(start, end)?.collect())
    }

    /// Lazy form of [`search_range`](Self::search_range).
    ///
    /// Walks the leaf chain from the first key at or above `start` and stops
    /// at the first key past `end`.
    pub fn range(&self, start: &K, end: &K) -> Result<Range<'_, K, V, C>, BTreeError> {
        if self.comparator.compare(start, end).is_gt() {
            return Err(BTreeError::InvalidRange);
        }
        Ok(Range {
            tree: self,
            position: self.seek_at_or_after(start),
            end: end.clone(),
        })
    }

    /// The entry with the smallest key.
    #[must_use]
    pub fn first(&self) -> Option<(&K, &V)> {
        let leaf = self.edge_leaf(Direction::Forward)?;
        self.arena.entries(leaf).first().map(Entry::as_pair)
    }

    /// The entry with the largest key.
    #[must_use]
    pub fn last(&self) -> Option<(&K, &V)> {
        let leaf = self.edge_leaf(Direction::Reverse)?;
        self.arena.entries(leaf).last().map(Entry::as_pair)
    }

    /// Remove and return the entry with the smallest key.
    pub fn remove_first(&mut self) -> Option<Entry<K, V>> {
        let key = self.first()?.0.clone();
        self.remove_entry(&key)
    }

    /// Remove and return the entry with the largest key.
    pub fn remove_last(&mut self) -> Option<Entry<K, V>> {
        let key = self.last()?.0.clone();
        self.remove_entry(&key)
    }

    /// Iterate in ascending key order. Use `.rev()` for descending order.
    #[must_use]
    pub fn iter(&self) -> Iter<'_, K, V, C> {
        let front = self.edge_leaf(Direction::Forward).map(|leaf| (leaf, 0));
        let back = self
            .edge_leaf(Direction::Reverse)
            .map(|leaf| (leaf, self.arena.entries(leaf).len() - 1));
        Iter {
            tree: self,
            front,
            back,
            remaining: self.len,
        }
    }

    /// A cursor that can remove entries while walking in `direction`.
    pub fn cursor(&mut self, direction: Direction) -> CursorMut<'_, K, V, C> {
        let upcoming = self.edge_leaf(direction).map(|leaf| match direction {
            Direction::Forward => (leaf, 0),
            Direction::Reverse => (leaf, self.arena.entries(leaf).len() - 1),
        });
        CursorMut {
            tree: self,
            direction,
            upcoming,
            yielded: None,
        }
    }

    /// Index of the child to descend into: the first child whose max key is
    /// at or above `key`, else the last child.
    fn find_child(&self, children: &[IndexEntry<K>], key: &K) -> usize {
        let index =
            children.partition_point(|c| self.comparator.compare(&c.max_key, key).is_lt());
        index.min(children.len() - 1)
    }

    fn find_leaf(&self, key: &K) -> Option<NodeId> {
        let mut id = self.root?;
        loop {
            match &self.arena.get(id).kind {
                NodeKind::Leaf { .. } => return Some(id),
                NodeKind::Internal { children } => {
                    id = children[self.find_child(children, key)].child;
                }
            }
        }
    }

    /// Leftmost (`Forward`) or rightmost (`Reverse`) leaf.
    fn edge_leaf(&self, direction: Direction) -> Option<NodeId> {
        let mut id = self.root?;
        loop {
            match &self.arena.get(id).kind {
                NodeKind::Leaf { .. } => return Some(id),
                NodeKind::Internal { children } => {
                    let edge = match direction {
                        Direction::Forward => children.first(),
                        Direction::Reverse => children.last(),
                    };
                    match edge {
                        Some(c) => id = c.child,
                        None => unreachable!("internal node {id} has no children"),
                    }
                }
            }
        }
    }

    /// Position of the first entry with key `>= key`.
    fn seek_at_or_after(&self, key: &K) -> Option<(NodeId, usize)> {
        let leaf = self.find_leaf(key)?;
        let entries = self.arena.entries(leaf);
        let index = entries.partition_point(|e| self.comparator.compare(e.key(), key).is_lt());
        if index < entries.len() {
            Some((leaf, index))
        } else {
            self.arena.leaf_links(leaf).1.map(|next| (next, 0))
        }
    }

    /// Position of the last entry with key `< key`.
    fn seek_before(&self, key: &K) -> Option<(NodeId, usize)> {
        let leaf = self.find_leaf(key)?;
        let entries = self.arena.entries(leaf);
        let index = entries.partition_point(|e| self.comparator.compare(e.key(), key).is_lt());
        if index > 0 {
            Some((leaf, index - 1))
        } else {
            self.arena
                .leaf_links(leaf)
                .0
                .map(|prev| (prev, self.arena.entries(prev).len() - 1))
        }
    }

    /// Position one step from `(leaf, index)` along the leaf chain.
    fn step(&self, leaf: NodeId, index: usize, direction: Direction) -> Option<(NodeId, usize)> {
        let (prev, next) = self.arena.leaf_links(leaf);
        match direction {
            Direction::Forward => {
                if index + 1 < self.arena.entries(leaf).len() {
                    Some((leaf, index + 1))
                } else {
                    next.map(|next| (next, 0))
                }
            }
            Direction::Reverse => {
                if index > 0 {
                    Some((leaf, index - 1))
                } else {
                    prev.map(|prev| (prev, self.arena.entries(prev).len() - 1))
                }
            }
        }
    }

    fn max_key_of(&self, id: NodeId) -> K {
        match self.arena.get(id).max_key() {
            Some(key) => key.clone(),
            None => unreachable!("node {id} is empty"),
        }
    }

    fn position_in_parent(&self, parent: NodeId, child: NodeId) -> usize {
        match self
            .arena
            .children(parent)
            .iter()
            .position(|c| c.child == child)
        {
            Some(pos) => pos,
            None => unreachable!("node {child} is not a child of {parent}"),
        }
    }

    /// Copy `id`'s max key into its parent's index entry, continuing upward
    /// while the updated entry is also its parent's last.
    fn rebuild_up(&mut self, id: NodeId) {
        let mut child = id;
        while let Some(parent) = self.arena.get(child).parent {
            let max_key = self.max_key_of(child);
            let pos = self.position_in_parent(parent, child);
            let children = self.arena.children_mut(parent);
            if self
                .comparator
                .compare(&children[pos].max_key, &max_key)
                .is_eq()
            {
                break;
            }
            children[pos].max_key = max_key;
            if pos + 1 != children.len() {
                break;
            }
            child = parent;
        }
    }

    /// Split `id` and its ancestors while they exceed the order.
    fn split(&mut self, id: NodeId) {
        let mut current = id;
        while self.arena.get(current).len() > self.order {
            current = match self.split_node(current) {
                Some(parent) => parent,
                None => break,
            };
        }
    }

    /// Move the upper half of `id` into a new right sibling. Returns the
    /// parent, which gained a child, or `None` if a new root was created.
    fn split_node(&mut self, id: NodeId) -> Option<NodeId> {
        let node = self.arena.get_mut(id);
        let parent = node.parent;
        let mid = node.len() / 2;
        debug_assert!(mid >= self.min_fanout, "splitting undersized node {id}");

        let right_kind = match &mut node.kind {
            NodeKind::Internal { children } => NodeKind::Internal {
                children: children.split_off(mid),
            },
            NodeKind::Leaf { entries, next, .. } => NodeKind::Leaf {
                entries: entries.split_off(mid),
                prev: Some(id),
                next: *next,
            },
        };
        let right = self.arena.alloc(Node {
            parent,
            kind: right_kind,
        });

        if self.arena.get(right).is_leaf() {
            let (_, old_next) = self.arena.leaf_links(right);
            self.arena.set_next(id, Some(right));
            if let Some(old_next) = old_next {
                self.arena.set_prev(old_next, Some(right));
            }
        } else {
            let moved: Vec<NodeId> = self
                .arena
                .children(right)
                .iter()
                .map(|c| c.child)
                .collect();
            for child in moved {
                self.arena.set_parent(child, Some(right));
            }
        }
        tracing::trace!(node = id, sibling = right, "split node");

        let left_max = self.max_key_of(id);
        let right_max = self.max_key_of(right);
        if let Some(parent) = parent {
            let pos = self.position_in_parent(parent, id);
            let children = self.arena.children_mut(parent);
            children[pos].max_key = left_max;
            children.insert(
                pos + 1,
                IndexEntry {
                    max_key: right_max,
                    child: right,
                },
            );
            Some(parent)
        } else {
            let root = self.arena.alloc(Node::internal(
                None,
                vec![
                    IndexEntry {
                        max_key: left_max,
                        child: id,
                    },
                    IndexEntry {
                        max_key: right_max,
                        child: right,
                    },
                ],
            ));
            self.arena.set_parent(id, Some(root));
            self.arena.set_parent(right, Some(root));
            self.root = Some(root);
            None
        }
    }

    /// Restore the fan-out bound from `id` upward after a removal.
    fn rebalance(&mut self, id: NodeId) {
        let mut current = id;
        loop {
            let Some(parent) = self.arena.get(current).parent else {
                self.collapse_root();
                return;
            };
            if self.arena.get(current).len() >= self.min_fanout {
                return;
            }

            let pos = self.position_in_parent(parent, current);
            let siblings = self.arena.children(parent);
            let left = pos.checked_sub(1).map(|p| siblings[p].child);
            let right = siblings.get(pos + 1).map(|c| c.child);

            if left.is_some_and(|l| self.arena.get(l).len() > self.min_fanout) {
                self.borrow_from_left(parent, pos);
                return;
            }
            if right.is_some_and(|r| self.arena.get(r).len() > self.min_fanout) {
                self.borrow_from_right(parent, pos);
                return;
            }
            match (left, right) {
                (Some(_), _) => self.merge(parent, pos - 1),
                (None, Some(_)) => self.merge(parent, pos),
                (None, None) => unreachable!("node {current} has no sibling"),
            }
            current = parent;
        }
    }

    /// Move the last item of the left sibling to the front of the child at
    /// `pos`.
    fn borrow_from_left(&mut self, parent: NodeId, pos: usize) {
        let siblings = self.arena.children(parent);
        let (left, node) = (siblings[pos - 1].child, siblings[pos].child);

        if self.arena.get(node).is_leaf() {
            let Some(entry) = self.arena.entries_mut(left).pop() else {
                unreachable!("borrowing from empty leaf {left}");
            };
            self.arena.entries_mut(node).insert(0, entry);
        } else {
            let Some(index_entry) = self.arena.children_mut(left).pop() else {
                unreachable!("borrowing from empty node {left}");
            };
            self.arena.set_parent(index_entry.child, Some(node));
            self.arena.children_mut(node).insert(0, index_entry);
        }

        let left_max = self.max_key_of(left);
        self.arena.children_mut(parent)[pos - 1].max_key = left_max;
        tracing::trace!(node, sibling = left, "borrowed from left sibling");
    }

    /// Move the first item of the right sibling to the back of the child at
    /// `pos`.
    fn borrow_from_right(&mut self, parent: NodeId, pos: usize) {
        let siblings = self.arena.children(parent);
        let (node, right) = (siblings[pos].child, siblings[pos + 1].child);

        if self.arena.get(node).is_leaf() {
            let entry = self.arena.entries_mut(right).remove(0);
            self.arena.entries_mut(node).push(entry);
        } else {
            let index_entry = self.arena.children_mut(right).remove(0);
            self.arena.set_parent(index_entry.child, Some(node));
            self.arena.children_mut(node).push(index_entry);
        }

        let node_max = self.max_key_of(node);
        self.arena.children_mut(parent)[pos].max_key = node_max;
        tracing::trace!(node, sibling = right, "borrowed from right sibling");
    }

    /// Merge the child at `left_pos + 1` into the child at `left_pos` and
    /// drop it from the parent.
    fn merge(&mut self, parent: NodeId, left_pos: usize) {
        let siblings = self.arena.children(parent);
        let (left, right) = (siblings[left_pos].child, siblings[left_pos + 1].child);
        let absorbed = self.arena.release(right);

        match absorbed.kind {
            NodeKind::Leaf {
                mut entries, next, ..
            } => {
                self.arena.entries_mut(left).append(&mut entries);
                self.arena.set_next(left, next);
                if let Some(next) = next {
                    self.arena.set_prev(next, Some(left));
                }
            }
            NodeKind::Internal { mut children } => {
                for c in &children {
                    self.arena.set_parent(c.child, Some(left));
                }
                self.arena.children_mut(left).append(&mut children);
            }
        }

        let left_max = self.max_key_of(left);
        let children = self.arena.children_mut(parent);
        children[left_pos].max_key = left_max;
        children.remove(left_pos + 1);
        tracing::trace!(node = left, absorbed = right, "merged siblings");
    }

    /// Drop an empty root leaf, or promote the only child of an internal
    /// root.
    fn collapse_root(&mut self) {
        while let Some(root) = self.root {
            let node = self.arena.get(root);
            match &node.kind {
                NodeKind::Leaf { entries, .. } if entries.is_empty() => {
                    self.arena.release(root);
                    self.root = None;
                }
                NodeKind::Internal { children } if children.len() == 1 => {
                    let child = children[0].child;
                    self.arena.release(root);
                    self.arena.set_parent(child, None);
                    self.root = Some(child);
                }
                _ => return,
            }
        }
    }

    /// Number of levels from root to leaves.
    #[must_use]
    pub fn height(&self) -> usize {
        let mut height = 0;
        let mut current = self.root;
        while let Some(id) = current {
            height += 1;
            current = match &self.arena.get(id).kind {
                NodeKind::Internal { children } => children.first().map(|c| c.child),
                NodeKind::Leaf { .. } => None,
            };
        }
        height
    }

    /// Keys of each leaf, in leaf-chain order.
    #[cfg(test)]
    pub(crate) fn leaf_chain(&self) -> Vec<Vec<K>> {
        let mut leaves = Vec::new();
        let mut current = self.edge_leaf(Direction::Forward);
        while let Some(id) = current {
            leaves.push(self.arena.entries(id).iter().map(|e| e.key().clone()).collect());
            current = self.arena.leaf_links(id).1;
        }
        leaves
    }

    #[cfg(test)]
    pub(crate) fn check_invariants(&self) {
        let Some(root) = self.root else {
            assert_eq!(self.len, 0, "empty tree must have len 0");
            assert_eq!(self.arena.live(), 0, "empty tree must not hold nodes");
            return;
        };
        assert!(self.arena.get(root).parent.is_none(), "root has a parent");

        let mut reachable = 0;
        let mut leaves_in_order = Vec::new();
        let mut leaf_depth = None;
        let mut stack = vec![(root, 0usize)];
        while let Some((id, depth)) = stack.pop() {
            reachable += 1;
            let node = self.arena.get(id);
            let len = node.len();
            if id == root {
                if node.is_leaf() {
                    assert!((1..=self.order).contains(&len), "root leaf size {len}");
                } else {
                    assert!((2..=self.order).contains(&len), "internal root size {len}");
                }
            } else {
                assert!(
                    (self.min_fanout..=self.order).contains(&len),
                    "node {id} size {len} outside [{}, {}]",
                    self.min_fanout,
                    self.order
                );
            }

            match &node.kind {
                NodeKind::Leaf { entries, .. } => {
                    for pair in entries.windows(2) {
                        assert!(pair[0].cmp_by_key(&pair[1], &self.comparator).is_lt());
                    }
                    match leaf_depth {
                        None => leaf_depth = Some(depth),
                        Some(d) => assert_eq!(d, depth, "leaves at different depths"),
                    }
                    leaves_in_order.push(id);
                }
                NodeKind::Internal { children } => {
                    for pair in children.windows(2) {
                        assert!(
                            self.comparator
                                .compare(&pair[0].max_key, &pair[1].max_key)
                                .is_lt(),
                            "index entries of {id} not ascending"
                        );
                    }
                    // Reverse so children pop in key order.
                    for c in children.iter().rev() {
                        let child = self.arena.get(c.child);
                        assert_eq!(child.parent, Some(id), "bad parent link on {}", c.child);
                        assert!(
                            self.comparator
                                .compare(&c.max_key, &self.max_key_of(c.child))
                                .is_eq(),
                            "stale index key for child {}",
                            c.child
                        );
                        stack.push((c.child, depth + 1));
                    }
                }
            }
        }
        assert_eq!(reachable, self.arena.live(), "unreachable nodes in arena");

        let mut prev: Option<NodeId> = None;
        let mut count = 0;
        let mut last_key: Option<K> = None;
        let mut current = self.edge_leaf(Direction::Forward);
        let mut chain = Vec::new();
        while let Some(id) = current {
            let (back, next) = self.arena.leaf_links(id);
            assert_eq!(back, prev, "broken prev link on leaf {id}");
            for entry in self.arena.entries(id) {
                if let Some(last) = &last_key {
                    assert!(self.comparator.compare(last, entry.key()).is_lt());
                }
                last_key = Some(entry.key().clone());
                count += 1;
            }
            chain.push(id);
            prev = Some(id);
            current = next;
        }
        assert_eq!(chain, leaves_in_order, "leaf chain disagrees with tree order");
        assert_eq!(count, self.len, "leaf chain entry count");
        assert_eq!(self.edge_leaf(Direction::Reverse), prev);
    }
}

/// Double-ended iterator over a [`BTree`].
pub struct Iter<'a, K, V, C> {
    tree: &'a BTree<K, V, C>,
    front: Option<(NodeId, usize)>,
    back: Option<(NodeId, usize)>,
    remaining: usize,
}

impl<'a, K: Clone, V, C: Comparator<K>> Iterator for Iter<'a, K, V, C> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let (leaf, index) = self.front?;
        self.front = self.tree.step(leaf, index, Direction::Forward);
        self.remaining -= 1;
        Some(self.tree.arena.entries(leaf)[index].as_pair())
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K: Clone, V, C: Comparator<K>> DoubleEndedIterator for Iter<'_, K, V, C> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let (leaf, index) = self.back?;
        self.back = self.tree.step(leaf, index, Direction::Reverse);
        self.remaining -= 1;
        Some(self.tree.arena.entries(leaf)[index].as_pair())
    }
}

impl<K: Clone, V, C: Comparator<K>> ExactSizeIterator for Iter<'_, K, V, C> {}

impl<'a, K: Clone, V, C: Comparator<K>> IntoIterator for &'a BTree<K, V, C> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V, C>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over an inclusive key range of a [`BTree`].
pub struct Range<'a, K, V, C> {
    tree: &'a BTree<K, V, C>,
    position: Option<(NodeId, usize)>,
    end: K,
}

impl<'a, K: Clone, V, C: Comparator<K>> Iterator for Range<'a, K, V, C> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let (leaf, index) = self.position?;
        let entry = &self.tree.arena.entries(leaf)[index];
        if self.tree.comparator.compare(entry.key(), &self.end).is_gt() {
            self.position = None;
            return None;
        }
        self.position = self.tree.step(leaf, index, Direction::Forward);
        Some(entry.as_pair())
    }
}

/// Cursor over a [`BTree`] that supports removing the entry it last
/// yielded.
///
/// Removal can rebalance leaves, so the cursor re-locates its next position
/// from the removed key instead of trusting the old leaf and index.
pub struct CursorMut<'a, K, V, C> {
    tree: &'a mut BTree<K, V, C>,
    direction: Direction,
    upcoming: Option<(NodeId, usize)>,
    yielded: Option<K>,
}

impl<K: Clone, V, C: Comparator<K>> CursorMut<'_, K, V, C> {
    /// Advance and return the next entry, or `None` at the end.
    pub fn next(&mut self) -> Option<(&K, &mut V)> {
        let Some((leaf, index)) = self.upcoming else {
            self.yielded = None;
            return None;
        };
        self.upcoming = self.tree.step(leaf, index, self.direction);
        let entry = &mut self.tree.arena.entries_mut(leaf)[index];
        self.yielded = Some(entry.key().clone());
        Some(entry.pair_mut())
    }

    /// Remove the entry returned by the last call to [`next`](Self::next).
    ///
    /// Returns `None` if nothing was yielded or it was already removed.
    pub fn remove(&mut self) -> Option<Entry<K, V>> {
        let key = self.yielded.take()?;
        let removed = self.tree.remove_entry(&key)?;
        self.upcoming = match self.direction {
            Direction::Forward => self.tree.seek_at_or_after(&key),
            Direction::Reverse => self.tree.seek_before(&key),
        };
        Some(removed)
    }
}

/// Errors returned by [`BTree`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BTreeError {
    /// A range query's start key is greater than its end key.
    InvalidRange,
}

impl std::fmt::Display for BTreeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidRange => write!(f, "invalid range: start key is greater than end key"),
        }
    }
}

impl std::error::Error for BTreeError {}

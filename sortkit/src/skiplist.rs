//! Skip list: a probabilistic ordered map.
//!
//! Nodes live in an arena and link to each other by slot index. Every node
//! carries a `next` and a `prev` link per level it participates in, so
//! splicing a node out never needs a search. Two sentinels anchor all
//! levels:
//!
//! ```text
//! Level 2:  HEAD ───────────► 20 ───────────────► TAIL
//! Level 1:  HEAD ──► 10 ───► 20 ───► 30 ───────► TAIL
//! Level 0:  HEAD ──► 10 ───► 20 ───► 30 ──► 40 ─► TAIL
//! ```
//!
//! # Level distribution
//!
//! A new node's level is drawn uniformly from `[1, max_level]`, not from the
//! textbook geometric distribution. Upper levels are therefore as populated
//! as lower ones.
//!
//! # Invariants
//!
//! - At every level the chain reachable from `HEAD` through `next` is
//!   strictly ascending and ends at `TAIL`; `prev` mirrors it.
//! - `level` is the number of active levels: the highest level whose head
//!   link points at a real node, or 1 when the list is empty.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::Direction;
use crate::comparator::{Comparator, NaturalOrder};
use crate::entry::Entry;

/// Default number of levels.
pub const DEFAULT_MAX_LEVEL: usize = 16;

/// Upper bound on `max_level`.
pub const MAX_LEVEL_LIMIT: usize = 32;

const HEAD: usize = 0;
const TAIL: usize = 1;

#[derive(Debug, Clone)]
struct SkipNode<K, V> {
    /// `None` for the sentinels and for free slots.
    entry: Option<Entry<K, V>>,
    next: Vec<usize>,
    prev: Vec<usize>,
}

impl<K, V> SkipNode<K, V> {
    const fn sentinel() -> Self {
        Self {
            entry: None,
            next: Vec::new(),
            prev: Vec::new(),
        }
    }

    fn level(&self) -> usize {
        self.next.len()
    }
}

/// An ordered map backed by a skip list.
#[derive(Debug, Clone)]
pub struct SkipList<K, V, C = NaturalOrder> {
    nodes: Vec<SkipNode<K, V>>,
    free: Vec<usize>,
    level: usize,
    max_level: usize,
    len: usize,
    comparator: C,
    rng: StdRng,
}

impl<K: Ord, V> SkipList<K, V, NaturalOrder> {
    /// Create an empty list ordered by `K`'s natural ordering.
    #[must_use]
    pub fn new_natural() -> Self {
        Self::new(NaturalOrder)
    }
}

impl<K: Ord, V> Default for SkipList<K, V, NaturalOrder> {
    fn default() -> Self {
        Self::new_natural()
    }
}

impl<K, V, C: Comparator<K>> SkipList<K, V, C> {
    /// Create an empty list with [`DEFAULT_MAX_LEVEL`] levels.
    #[must_use]
    pub fn new(comparator: C) -> Self {
        Self::with_max_level(DEFAULT_MAX_LEVEL, comparator)
    }

    /// Create an empty list with `max_level` levels, clamped to
    /// `[1, MAX_LEVEL_LIMIT]`.
    #[must_use]
    pub fn with_max_level(max_level: usize, comparator: C) -> Self {
        Self::build(max_level, comparator, StdRng::from_os_rng())
    }

    /// Create an empty list whose level draws are reproducible.
    #[must_use]
    pub fn with_seed(max_level: usize, comparator: C, seed: u64) -> Self {
        Self::build(max_level, comparator, StdRng::seed_from_u64(seed))
    }

    fn build(max_level: usize, comparator: C, rng: StdRng) -> Self {
        let max_level = max_level.clamp(1, MAX_LEVEL_LIMIT);
        let mut head = SkipNode::sentinel();
        let mut tail = SkipNode::sentinel();
        head.next = vec![TAIL; max_level];
        head.prev = vec![HEAD; max_level];
        tail.next = vec![TAIL; max_level];
        tail.prev = vec![HEAD; max_level];
        Self {
            nodes: vec![head, tail],
            free: Vec::new(),
            level: 1,
            max_level,
            len: 0,
            comparator,
            rng,
        }
    }

    /// Number of entries.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Whether the list is empty.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Configured maximum level.
    #[must_use]
    pub const fn max_level(&self) -> usize {
        self.max_level
    }

    /// Number of levels currently in use.
    #[must_use]
    pub const fn level(&self) -> usize {
        self.level
    }

    /// Remove every entry.
    pub fn clear(&mut self) {
        self.nodes.truncate(2);
        for sentinel in &mut self.nodes {
            sentinel.next.fill(TAIL);
            sentinel.prev.fill(HEAD);
        }
        self.free.clear();
        self.level = 1;
        self.len = 0;
    }

    /// Insert `key`, returning `true` if it was new and `false` if an
    /// existing value was overwritten.
    pub fn add(&mut self, key: K, value: V) -> bool {
        self.insert(key, value).is_none()
    }

    /// Insert `key`, returning the previous value if the key was present.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        let mut update = self.predecessors(&key);
        let candidate = self.nodes[update[0]].next[0];
        if candidate != TAIL
            && self
                .comparator
                .compare(self.entry(candidate).key(), &key)
                .is_eq()
        {
            return Some(self.entry_mut(candidate).set_value(value));
        }

        let node_level = self.random_level();
        if node_level > self.level {
            for slot in &mut update[self.level..node_level] {
                *slot = HEAD;
            }
            self.level = node_level;
        }

        let id = self.alloc(Entry::new(key, value), node_level);
        for (lvl, &pred) in update.iter().enumerate().take(node_level) {
            let succ = self.nodes[pred].next[lvl];
            self.nodes[id].next[lvl] = succ;
            self.nodes[id].prev[lvl] = pred;
            self.nodes[pred].next[lvl] = id;
            self.nodes[succ].prev[lvl] = id;
        }
        self.len += 1;
        None
    }

    /// Look up the value for `key`.
    #[must_use]
    pub fn get(&self, key: &K) -> Option<&V> {
        self.find(key).map(|id| self.entry(id).value())
    }

    /// Look up the value for `key` mutably.
    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        let id = self.find(key)?;
        Some(self.entry_mut(id).value_mut())
    }

    /// Whether `key` is present.
    #[must_use]
    pub fn contains_key(&self, key: &K) -> bool {
        self.find(key).is_some()
    }

    /// Remove `key`, returning its value.
    pub fn remove(&mut self, key: &K) -> Option<V> {
        let id = self.find(key)?;
        let (_, value) = self.unlink(id).into_parts();
        Some(value)
    }

    /// The entry with the smallest key.
    #[must_use]
    pub fn first(&self) -> Option<(&K, &V)> {
        let id = self.nodes[HEAD].next[0];
        (id != TAIL).then(|| self.entry(id).as_pair())
    }

    /// The entry with the largest key.
    #[must_use]
    pub fn last(&self) -> Option<(&K, &V)> {
        let id = self.nodes[TAIL].prev[0];
        (id != HEAD).then(|| self.entry(id).as_pair())
    }

    /// Remove and return the entry with the smallest key.
    pub fn remove_first(&mut self) -> Option<Entry<K, V>> {
        let id = self.nodes[HEAD].next[0];
        (id != TAIL).then(|| self.unlink(id))
    }

    /// Remove and return the entry with the largest key.
    pub fn remove_last(&mut self) -> Option<Entry<K, V>> {
        let id = self.nodes[TAIL].prev[0];
        (id != HEAD).then(|| self.unlink(id))
    }

    /// Iterate in ascending key order. Use `.rev()` for descending order.
    #[must_use]
    pub fn iter(&self) -> Iter<'_, K, V, C> {
        Iter {
            list: self,
            front: self.nodes[HEAD].next[0],
            back: self.nodes[TAIL].prev[0],
            remaining: self.len,
        }
    }

    /// A cursor that can remove entries while walking in `direction`.
    pub fn cursor(&mut self, direction: Direction) -> CursorMut<'_, K, V, C> {
        let upcoming = match direction {
            Direction::Forward => self.nodes[HEAD].next[0],
            Direction::Reverse => self.nodes[TAIL].prev[0],
        };
        CursorMut {
            list: self,
            direction,
            upcoming,
            yielded: None,
        }
    }

    /// Rightmost node before `key` on each level. Levels at or above the
    /// active level point at `HEAD`.
    fn predecessors(&self, key: &K) -> Vec<usize> {
        let mut update = vec![HEAD; self.max_level];
        let mut x = HEAD;
        for lvl in (0..self.level).rev() {
            loop {
                let next = self.nodes[x].next[lvl];
                if next != TAIL && self.comparator.compare(self.entry(next).key(), key).is_lt() {
                    x = next;
                } else {
                    break;
                }
            }
            update[lvl] = x;
        }
        update
    }

    fn find(&self, key: &K) -> Option<usize> {
        let mut x = HEAD;
        for lvl in (0..self.level).rev() {
            loop {
                let next = self.nodes[x].next[lvl];
                if next == TAIL {
                    break;
                }
                match self.comparator.compare(self.entry(next).key(), key) {
                    std::cmp::Ordering::Less => x = next,
                    std::cmp::Ordering::Equal => return Some(next),
                    std::cmp::Ordering::Greater => break,
                }
            }
        }
        None
    }

    fn random_level(&mut self) -> usize {
        self.rng.random_range(1..=self.max_level)
    }

    fn alloc(&mut self, entry: Entry<K, V>, level: usize) -> usize {
        let node = SkipNode {
            entry: Some(entry),
            next: vec![TAIL; level],
            prev: vec![HEAD; level],
        };
        if let Some(id) = self.free.pop() {
            self.nodes[id] = node;
            id
        } else {
            self.nodes.push(node);
            self.nodes.len() - 1
        }
    }

    /// Splice `id` out of every level it is on and free its slot.
    fn unlink(&mut self, id: usize) -> Entry<K, V> {
        for lvl in 0..self.nodes[id].level() {
            let prev = self.nodes[id].prev[lvl];
            let next = self.nodes[id].next[lvl];
            self.nodes[prev].next[lvl] = next;
            self.nodes[next].prev[lvl] = prev;
        }
        while self.level > 1 && self.nodes[HEAD].next[self.level - 1] == TAIL {
            self.level -= 1;
        }

        let node = std::mem::replace(&mut self.nodes[id], SkipNode::sentinel());
        self.free.push(id);
        self.len -= 1;
        match node.entry {
            Some(entry) => entry,
            None => unreachable!("skip list node {id} has no entry"),
        }
    }

    fn entry(&self, id: usize) -> &Entry<K, V> {
        match &self.nodes[id].entry {
            Some(entry) => entry,
            None => unreachable!("skip list node {id} has no entry"),
        }
    }

    fn entry_mut(&mut self, id: usize) -> &mut Entry<K, V> {
        match &mut self.nodes[id].entry {
            Some(entry) => entry,
            None => unreachable!("skip list node {id} has no entry"),
        }
    }

    #[cfg(test)]
    pub(crate) fn check_invariants(&self) {
        assert!((1..=self.max_level).contains(&self.level));
        for lvl in 0..self.max_level {
            let mut x = self.nodes[HEAD].next[lvl];
            let mut prev = HEAD;
            let mut count = 0;
            while x != TAIL {
                assert!(self.nodes[x].level() > lvl, "node {x} linked above its level");
                assert_eq!(self.nodes[x].prev[lvl], prev, "broken prev link at level {lvl}");
                if prev != HEAD {
                    assert!(
                        self.comparator
                            .compare(self.entry(prev).key(), self.entry(x).key())
                            .is_lt(),
                        "level {lvl} is not strictly ascending"
                    );
                }
                prev = x;
                x = self.nodes[x].next[lvl];
                count += 1;
            }
            assert_eq!(self.nodes[TAIL].prev[lvl], prev, "tail prev link at level {lvl}");
            if lvl == 0 {
                assert_eq!(count, self.len, "level 0 must hold every entry");
            }
            if lvl >= self.level {
                assert_eq!(count, 0, "level {lvl} above active level is populated");
            }
        }
        if self.level > 1 {
            assert_ne!(self.nodes[HEAD].next[self.level - 1], TAIL, "active level not shrunk");
        }
    }
}

/// Double-ended iterator over a [`SkipList`].
pub struct Iter<'a, K, V, C> {
    list: &'a SkipList<K, V, C>,
    front: usize,
    back: usize,
    remaining: usize,
}

impl<'a, K, V, C: Comparator<K>> Iterator for Iter<'a, K, V, C> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let id = self.front;
        self.front = self.list.nodes[id].next[0];
        self.remaining -= 1;
        Some(self.list.entry(id).as_pair())
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V, C: Comparator<K>> DoubleEndedIterator for Iter<'_, K, V, C> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let id = self.back;
        self.back = self.list.nodes[id].prev[0];
        self.remaining -= 1;
        Some(self.list.entry(id).as_pair())
    }
}

impl<K, V, C: Comparator<K>> ExactSizeIterator for Iter<'_, K, V, C> {}

impl<'a, K, V, C: Comparator<K>> IntoIterator for &'a SkipList<K, V, C> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V, C>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Cursor over a [`SkipList`] that supports removing the entry it last
/// yielded.
///
/// Removing never disturbs the node the cursor will visit next, so the walk
/// continues from where it was.
pub struct CursorMut<'a, K, V, C> {
    list: &'a mut SkipList<K, V, C>,
    direction: Direction,
    upcoming: usize,
    yielded: Option<usize>,
}

impl<K, V, C: Comparator<K>> CursorMut<'_, K, V, C> {
    /// Advance and return the next entry, or `None` at the end.
    pub fn next(&mut self) -> Option<(&K, &mut V)> {
        let id = self.upcoming;
        if id == HEAD || id == TAIL {
            self.yielded = None;
            return None;
        }
        self.upcoming = match self.direction {
            Direction::Forward => self.list.nodes[id].next[0],
            Direction::Reverse => self.list.nodes[id].prev[0],
        };
        self.yielded = Some(id);
        Some(self.list.entry_mut(id).pair_mut())
    }

    /// Remove the entry returned by the last call to [`next`](Self::next).
    ///
    /// Returns `None` if nothing was yielded or it was already removed.
    pub fn remove(&mut self) -> Option<Entry<K, V>> {
        let id = self.yielded.take()?;
        Some(self.list.unlink(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comparator::ReverseOrder;
    use proptest::prelude::*;
    use std::collections::BTreeMap;

    fn seeded() -> SkipList<i32, String> {
        SkipList::with_seed(8, NaturalOrder, 42)
    }

    #[test]
    fn test_skiplist_add_and_get() {
        let mut list = seeded();
        assert!(list.add(3, "three".into()));
        assert!(list.add(1, "one".into()));
        assert!(list.add(2, "two".into()));
        list.check_invariants();

        assert_eq!(list.len(), 3);
        assert_eq!(list.get(&2).map(String::as_str), Some("two"));
        assert_eq!(list.get(&4), None);
        assert!(list.contains_key(&1));
    }

    #[test]
    fn test_skiplist_overwrite() {
        let mut list = seeded();
        assert!(list.add(7, "a".into()));
        assert!(!list.add(7, "b".into()));
        assert_eq!(list.len(), 1);
        assert_eq!(list.insert(7, "c".into()), Some("b".to_string()));
        assert_eq!(list.get(&7).map(String::as_str), Some("c"));
    }

    #[test]
    fn test_skiplist_first_last() {
        let mut list = seeded();
        assert_eq!(list.first(), None);
        assert_eq!(list.remove_last(), None);
        for k in [5, 9, 1, 7] {
            list.add(k, k.to_string());
        }
        assert_eq!(list.first().map(|(k, _)| *k), Some(1));
        assert_eq!(list.last().map(|(k, _)| *k), Some(9));

        assert_eq!(list.remove_first().map(|e| *e.key()), Some(1));
        assert_eq!(list.remove_last().map(|e| *e.key()), Some(9));
        list.check_invariants();
        let keys: Vec<i32> = list.iter().map(|(k, _)| *k).collect();
        assert_eq!(keys, vec![5, 7]);
    }

    #[test]
    fn test_skiplist_remove_shrinks_level() {
        let mut list = seeded();
        for k in 0..200 {
            list.add(k, String::new());
        }
        assert!(list.level() > 1);
        for k in 0..200 {
            assert_eq!(list.remove(&k), Some(String::new()));
            list.check_invariants();
        }
        assert!(list.is_empty());
        assert_eq!(list.level(), 1);
        assert_eq!(list.remove(&0), None);
    }

    #[test]
    fn test_skiplist_reverse_iteration() {
        let mut list: SkipList<u32, ()> = SkipList::with_seed(4, NaturalOrder, 1);
        for k in [4, 2, 8, 6] {
            list.add(k, ());
        }
        let keys: Vec<u32> = list.iter().rev().map(|(k, _)| *k).collect();
        assert_eq!(keys, vec![8, 6, 4, 2]);

        let mut iter = list.iter();
        assert_eq!(iter.next().map(|(k, _)| *k), Some(2));
        assert_eq!(iter.next_back().map(|(k, _)| *k), Some(8));
        assert_eq!(iter.len(), 2);
        assert_eq!(iter.next().map(|(k, _)| *k), Some(4));
        assert_eq!(iter.next_back().map(|(k, _)| *k), Some(6));
        assert_eq!(iter.next(), None);
    }

    #[test]
    fn test_skiplist_custom_comparator() {
        let mut list = SkipList::with_seed(6, ReverseOrder(NaturalOrder), 9);
        for k in [1, 3, 2] {
            list.add(k, ());
        }
        let keys: Vec<i32> = list.iter().map(|(k, _)| *k).collect();
        assert_eq!(keys, vec![3, 2, 1]);
    }

    #[test]
    fn test_skiplist_cursor_remove_forward() {
        let mut list = seeded();
        for k in 0..20 {
            list.add(k, k.to_string());
        }
        let mut cursor = list.cursor(Direction::Forward);
        let mut seen = Vec::new();
        while let Some((k, v)) = cursor.next() {
            let k = *k;
            v.push('!');
            seen.push(k);
            if k % 2 == 0 {
                assert_eq!(cursor.remove().map(|e| *e.key()), Some(k));
                assert!(cursor.remove().is_none());
            }
        }
        assert_eq!(seen, (0..20).collect::<Vec<_>>());
        list.check_invariants();
        let keys: Vec<i32> = list.iter().map(|(k, _)| *k).collect();
        assert_eq!(keys, (0..20).filter(|k| k % 2 == 1).collect::<Vec<_>>());
        assert_eq!(list.get(&3).map(String::as_str), Some("3!"));
    }

    #[test]
    fn test_skiplist_cursor_remove_reverse() {
        let mut list = seeded();
        for k in 0..10 {
            list.add(k, String::new());
        }
        let mut cursor = list.cursor(Direction::Reverse);
        let mut seen = Vec::new();
        while let Some((k, _)) = cursor.next() {
            seen.push(*k);
            cursor.remove();
        }
        assert_eq!(seen, (0..10).rev().collect::<Vec<_>>());
        assert!(list.is_empty());
        list.check_invariants();
    }

    #[test]
    fn test_skiplist_clear_and_reuse() {
        let mut list = seeded();
        for k in 0..50 {
            list.add(k, String::new());
        }
        list.clear();
        list.check_invariants();
        assert!(list.is_empty());
        list.add(1, "x".into());
        assert_eq!(list.first().map(|(k, _)| *k), Some(1));
    }

    #[test]
    fn test_skiplist_max_level_clamped() {
        let list: SkipList<i32, ()> = SkipList::with_max_level(0, NaturalOrder);
        assert_eq!(list.max_level(), 1);
        let list: SkipList<i32, ()> = SkipList::with_max_level(1000, NaturalOrder);
        assert_eq!(list.max_level(), MAX_LEVEL_LIMIT);
    }

    proptest! {
        #[test]
        fn prop_matches_btreemap(ops in prop::collection::vec((any::<bool>(), 0u16..300), 0..600), seed in any::<u64>()) {
            let mut list = SkipList::with_seed(12, NaturalOrder, seed);
            let mut model = BTreeMap::new();
            for (i, (is_insert, key)) in ops.into_iter().enumerate() {
                if is_insert {
                    prop_assert_eq!(list.insert(key, i), model.insert(key, i));
                } else {
                    prop_assert_eq!(list.remove(&key), model.remove(&key));
                }
                prop_assert_eq!(list.len(), model.len());
            }
            list.check_invariants();
            let forward: Vec<(u16, usize)> = list.iter().map(|(k, v)| (*k, *v)).collect();
            let expected: Vec<(u16, usize)> = model.iter().map(|(k, v)| (*k, *v)).collect();
            prop_assert_eq!(&forward, &expected);
            let reverse: Vec<(u16, usize)> = list.iter().rev().map(|(k, v)| (*k, *v)).collect();
            let expected_rev: Vec<(u16, usize)> = model.iter().rev().map(|(k, v)| (*k, *v)).collect();
            prop_assert_eq!(reverse, expected_rev);
        }
    }
}

//! Array-backed binary heap.
//!
//! The element at the top is the minimum with respect to the heap's
//! comparator. Wrap the comparator in [`ReverseOrder`](crate::ReverseOrder)
//! for a max-heap.
//!
//! # Layout
//!
//! `elements[0..len)` is a complete binary tree in breadth-first order:
//! the children of `i` are `2i + 1` and `2i + 2`, and no child compares
//! less than its parent.

use crate::comparator::{Comparator, NaturalOrder};

/// Binary heap ordered by a [`Comparator`].
#[derive(Debug, Clone)]
pub struct Heap<E, C = NaturalOrder> {
    elements: Vec<E>,
    comparator: C,
}

impl<E: Ord> Heap<E, NaturalOrder> {
    /// Create an empty min-heap using `E`'s natural ordering.
    #[must_use]
    pub const fn new_natural() -> Self {
        Self::new(NaturalOrder)
    }
}

impl<E, C: Default> Default for Heap<E, C> {
    fn default() -> Self {
        Self {
            elements: Vec::new(),
            comparator: C::default(),
        }
    }
}

impl<E, C> Heap<E, C> {
    /// Create an empty heap ordered by `comparator`.
    #[must_use]
    pub const fn new(comparator: C) -> Self {
        Self {
            elements: Vec::new(),
            comparator,
        }
    }

    /// Create an empty heap with room for `capacity` elements.
    #[must_use]
    pub fn with_capacity(capacity: usize, comparator: C) -> Self {
        Self {
            elements: Vec::with_capacity(capacity),
            comparator,
        }
    }

    /// Number of elements in the heap.
    #[must_use]
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Whether the heap is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Remove every element.
    pub fn clear(&mut self) {
        self.elements.clear();
    }

    /// The comparator ordering this heap.
    #[must_use]
    pub const fn comparator(&self) -> &C {
        &self.comparator
    }

    /// The smallest element, if any.
    #[must_use]
    pub fn peek(&self) -> Option<&E> {
        self.elements.first()
    }

    /// Elements in heap layout order (not sorted).
    #[must_use]
    pub fn as_slice(&self) -> &[E] {
        &self.elements
    }
}

impl<E, C: Comparator<E>> Heap<E, C> {
    /// Insert an element.
    pub fn add(&mut self, element: E) {
        self.elements.push(element);
        let last = self.elements.len() - 1;
        self.sift_up(last);
    }

    /// Remove and return the smallest element.
    pub fn poll(&mut self) -> Option<E> {
        if self.elements.is_empty() {
            return None;
        }
        Some(self.remove_at(0))
    }

    /// Remove the first element (in layout order) equal to `element`.
    ///
    /// This is a linear scan.
    pub fn remove(&mut self, element: &E) -> Option<E>
    where
        E: PartialEq,
    {
        let index = self.elements.iter().position(|e| e == element)?;
        Some(self.remove_at(index))
    }

    /// Drain the heap into a vector sorted by the comparator.
    #[must_use]
    pub fn into_sorted_vec(mut self) -> Vec<E> {
        let mut sorted = Vec::with_capacity(self.elements.len());
        while let Some(element) = self.poll() {
            sorted.push(element);
        }
        sorted
    }

    /// Iterate in comparator order without disturbing this heap.
    ///
    /// The iterator pops from a private copy of the elements.
    #[must_use]
    pub fn iter(&self) -> Iter<E, C>
    where
        E: Clone,
        C: Clone,
    {
        Iter {
            snapshot: self.clone(),
        }
    }

    /// Remove the element at `index`.
    ///
    /// The tail element moves into the vacated slot. It may be out of place
    /// in either direction, so it is sifted down and, if it did not move,
    /// sifted up.
    fn remove_at(&mut self, index: usize) -> E {
        debug_assert!(index < self.elements.len(), "heap index out of range");
        let last = self.elements.len() - 1;
        let removed = self.elements.swap_remove(index);
        if index < last {
            let settled = self.sift_down(index);
            if settled == index {
                self.sift_up(index);
            }
        }
        removed
    }

    fn sift_up(&mut self, mut index: usize) -> usize {
        while index > 0 {
            let parent = (index - 1) / 2;
            if self
                .comparator
                .compare(&self.elements[index], &self.elements[parent])
                .is_lt()
            {
                self.elements.swap(index, parent);
                index = parent;
            } else {
                break;
            }
        }
        index
    }

    fn sift_down(&mut self, mut index: usize) -> usize {
        let len = self.elements.len();
        loop {
            let left = 2 * index + 1;
            if left >= len {
                break;
            }
            let right = left + 1;
            let smallest = if right < len
                && self
                    .comparator
                    .compare(&self.elements[right], &self.elements[left])
                    .is_lt()
            {
                right
            } else {
                left
            };
            if self
                .comparator
                .compare(&self.elements[smallest], &self.elements[index])
                .is_lt()
            {
                self.elements.swap(index, smallest);
                index = smallest;
            } else {
                break;
            }
        }
        index
    }

    #[cfg(test)]
    pub(crate) fn check_invariants(&self) {
        for i in 1..self.elements.len() {
            let parent = (i - 1) / 2;
            assert!(
                !self
                    .comparator
                    .compare(&self.elements[i], &self.elements[parent])
                    .is_lt(),
                "heap property violated at index {i}"
            );
        }
    }
}

impl<E, C: Comparator<E>> Extend<E> for Heap<E, C> {
    fn extend<I: IntoIterator<Item = E>>(&mut self, iter: I) {
        for element in iter {
            self.add(element);
        }
    }
}

impl<E: Ord> FromIterator<E> for Heap<E, NaturalOrder> {
    fn from_iter<I: IntoIterator<Item = E>>(iter: I) -> Self {
        let mut heap = Self::new_natural();
        heap.extend(iter);
        heap
    }
}

impl<E, C: Comparator<E>> IntoIterator for Heap<E, C> {
    type Item = E;
    type IntoIter = Iter<E, C>;

    fn into_iter(self) -> Self::IntoIter {
        Iter { snapshot: self }
    }
}

/// Iterator yielding heap elements in comparator order.
#[derive(Debug)]
pub struct Iter<E, C> {
    snapshot: Heap<E, C>,
}

impl<E, C: Comparator<E>> Iterator for Iter<E, C> {
    type Item = E;

    fn next(&mut self) -> Option<Self::Item> {
        self.snapshot.poll()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let len = self.snapshot.len();
        (len, Some(len))
    }
}

impl<E, C: Comparator<E>> ExactSizeIterator for Iter<E, C> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comparator::{ReverseOrder, from_fn};
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn test_heap_empty() {
        let mut heap: Heap<i32> = Heap::new_natural();
        assert!(heap.is_empty());
        assert_eq!(heap.peek(), None);
        assert_eq!(heap.poll(), None);
        assert_eq!(heap.remove(&1), None);
    }

    #[test]
    fn test_heap_poll_order() {
        let mut heap = Heap::new_natural();
        for v in [5, 3, 8, 1, 9, 2, 7] {
            heap.add(v);
            heap.check_invariants();
        }
        assert_eq!(heap.len(), 7);
        assert_eq!(heap.peek(), Some(&1));

        let mut out = Vec::new();
        while let Some(v) = heap.poll() {
            heap.check_invariants();
            out.push(v);
        }
        assert_eq!(out, vec![1, 2, 3, 5, 7, 8, 9]);
    }

    #[test]
    fn test_heap_max_order() {
        let heap: Heap<u32, _> = {
            let mut h = Heap::new(ReverseOrder(NaturalOrder));
            h.extend([4, 10, 1, 7]);
            h
        };
        assert_eq!(heap.peek(), Some(&10));
        assert_eq!(heap.into_sorted_vec(), vec![10, 7, 4, 1]);
    }

    #[test]
    fn test_heap_custom_comparator() {
        let mut heap = Heap::new(from_fn(|a: &(u32, &str), b: &(u32, &str)| a.0.cmp(&b.0)));
        heap.add((3, "c"));
        heap.add((1, "a"));
        heap.add((2, "b"));
        assert_eq!(heap.poll(), Some((1, "a")));
        assert_eq!(heap.poll(), Some((2, "b")));
    }

    #[test]
    fn test_heap_remove_requires_sift_up() {
        // Layout: 1 / 10 2 / 11 12 3 4. Removing 11 moves 4 under 10,
        // which then has to climb.
        let mut heap = Heap::new_natural();
        heap.extend([1, 10, 2, 11, 12, 3, 4]);
        assert_eq!(heap.as_slice(), &[1, 10, 2, 11, 12, 3, 4]);

        assert_eq!(heap.remove(&11), Some(11));
        heap.check_invariants();
        assert_eq!(heap.into_sorted_vec(), vec![1, 2, 3, 4, 10, 12]);
    }

    #[test]
    fn test_heap_remove_requires_sift_down() {
        let mut heap = Heap::new_natural();
        heap.extend([1, 2, 3, 4, 5, 6, 7]);
        assert_eq!(heap.remove(&2), Some(2));
        heap.check_invariants();
        assert_eq!(heap.remove(&1), Some(1));
        heap.check_invariants();
        assert_eq!(heap.into_sorted_vec(), vec![3, 4, 5, 6, 7]);
    }

    #[test]
    fn test_heap_remove_first_duplicate_only() {
        let mut heap: Heap<i32> = [3, 3, 3, 1].into_iter().collect();
        assert_eq!(heap.remove(&3), Some(3));
        assert_eq!(heap.len(), 3);
        assert_eq!(heap.into_sorted_vec(), vec![1, 3, 3]);
    }

    #[test]
    fn test_heap_iter_leaves_heap_untouched() {
        let heap: Heap<i32> = [9, 4, 6, 1].into_iter().collect();
        let seen: Vec<i32> = heap.iter().collect();
        assert_eq!(seen, vec![1, 4, 6, 9]);
        assert_eq!(heap.len(), 4);
        assert_eq!(heap.peek(), Some(&1));
        assert_eq!(heap.iter().len(), 4);
    }

    #[test]
    fn test_heap_randomized_against_sorted_vec() {
        let mut rng = StdRng::seed_from_u64(0x5eed);
        let mut heap = Heap::new_natural();
        let mut model: Vec<u16> = Vec::new();

        for _ in 0..5000 {
            match rng.random_range(0..10) {
                0..=5 => {
                    let v = rng.random_range(0..500);
                    heap.add(v);
                    model.push(v);
                }
                6 | 7 => {
                    let got = heap.poll();
                    let expected = model.iter().copied().min();
                    if let Some(min) = expected {
                        let pos = model.iter().position(|v| *v == min).unwrap();
                        model.swap_remove(pos);
                    }
                    assert_eq!(got, expected);
                }
                _ => {
                    let v = rng.random_range(0..500);
                    let got = heap.remove(&v);
                    let pos = model.iter().position(|x| *x == v);
                    if let Some(pos) = pos {
                        model.swap_remove(pos);
                    }
                    assert_eq!(got.is_some(), pos.is_some());
                }
            }
            heap.check_invariants();
            assert_eq!(heap.peek().copied(), model.iter().copied().min());
        }
    }

    proptest! {
        #[test]
        fn prop_peek_is_minimum(values in prop::collection::vec(any::<i64>(), 0..200), removals in prop::collection::vec(any::<prop::sample::Index>(), 0..50)) {
            let mut heap: Heap<i64> = values.iter().copied().collect();
            let mut model = values.clone();
            for idx in removals {
                if model.is_empty() {
                    break;
                }
                let target = model[idx.index(model.len())];
                prop_assert_eq!(heap.remove(&target), Some(target));
                let pos = model.iter().position(|v| *v == target).unwrap();
                model.swap_remove(pos);
                heap.check_invariants();
                prop_assert_eq!(heap.peek().copied(), model.iter().copied().min());
            }
            model.sort_unstable();
            prop_assert_eq!(heap.into_sorted_vec(), model);
        }
    }
}

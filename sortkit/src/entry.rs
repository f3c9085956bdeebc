//! Key/value pair stored by the ordered maps.

use std::cmp::Ordering;

use crate::comparator::Comparator;

/// A key with its associated value.
///
/// The key is fixed at construction; only the value can change. Equality and
/// hashing use both fields. Ordering is by key only and goes through a
/// [`Comparator`], see [`Entry::cmp_by_key`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Entry<K, V> {
    key: K,
    value: V,
}

impl<K, V> Entry<K, V> {
    /// Create a new entry.
    #[must_use]
    pub const fn new(key: K, value: V) -> Self {
        Self { key, value }
    }

    /// Get the key.
    #[must_use]
    pub const fn key(&self) -> &K {
        &self.key
    }

    /// Get the value.
    #[must_use]
    pub const fn value(&self) -> &V {
        &self.value
    }

    /// Get mutable access to the value.
    pub const fn value_mut(&mut self) -> &mut V {
        &mut self.value
    }

    /// Replace the value, returning the previous one.
    pub fn set_value(&mut self, value: V) -> V {
        std::mem::replace(&mut self.value, value)
    }

    /// Split into key and value.
    #[must_use]
    pub fn into_parts(self) -> (K, V) {
        (self.key, self.value)
    }

    /// Borrow as a `(key, value)` tuple.
    #[must_use]
    pub const fn as_pair(&self) -> (&K, &V) {
        (&self.key, &self.value)
    }

    /// Borrow the key with mutable access to the value.
    pub const fn pair_mut(&mut self) -> (&K, &mut V) {
        (&self.key, &mut self.value)
    }

    /// Compare two entries by key.
    pub fn cmp_by_key<C: Comparator<K>>(&self, other: &Self, comparator: &C) -> Ordering {
        comparator.compare(&self.key, &other.key)
    }
}

impl<K, V> From<(K, V)> for Entry<K, V> {
    fn from((key, value): (K, V)) -> Self {
        Self::new(key, value)
    }
}

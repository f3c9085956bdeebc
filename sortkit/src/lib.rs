//! Ordered collections and an external merge sorter.
//!
//! Components, leaf-first:
//!
//! - [`Entry`]: immutable key with a mutable value.
//! - [`Heap`]: array-backed binary heap ordered by a [`Comparator`].
//! - [`SkipList`]: probabilistic ordered map with live cursors.
//! - [`BTree`]: B+-tree whose entries live in a doubly-linked leaf chain.
//! - [`ExternalSorter`]: bounded in-memory buffer that spills sorted runs to
//!   disk and merges them back with a [`Heap`] of run readers.
//!
//! None of the structures are internally synchronized. Share them across
//! threads only behind external locking.
//!
//! # Usage
//!
//! ```
//! use sortkit::{BTree, NaturalOrder};
//!
//! let mut tree = BTree::new(3, NaturalOrder);
//! for key in [5, 1, 9, 3, 7, 2, 8] {
//!     tree.add(key, key * 10);
//! }
//! tree.remove(&5);
//!
//! let keys: Vec<i32> = tree.iter().map(|(k, _)| *k).collect();
//! assert_eq!(keys, vec![1, 2, 3, 7, 8, 9]);
//! ```

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

pub mod btree;
pub mod comparator;
pub mod config;
pub mod entry;
pub mod heap;
#[cfg(test)]
mod simulation;
pub mod skiplist;
pub mod sorter;

pub use btree::{BTree, BTreeError};
pub use comparator::{Comparator, FnComparator, NaturalOrder, ReverseOrder, from_fn};
pub use config::{ConfigError, SorterConfig};
pub use entry::Entry;
pub use heap::Heap;
pub use skiplist::SkipList;
pub use sorter::{
    BytesCodec, CodecError, ExternalSorter, IntCodec, RecordCodec, SorterError, SorterState,
    Utf8Codec,
};

/// Traversal direction for cursors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Ascending key order.
    Forward,
    /// Descending key order.
    Reverse,
}

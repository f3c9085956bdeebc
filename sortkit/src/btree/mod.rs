//! B+-tree index.
//!
//! An in-memory B+-tree keyed through a [`Comparator`](crate::Comparator).
//!
//! # Layout
//!
//! - Internal nodes hold `(max_key, child)` index entries, one per child
//! - Leaf nodes hold the entries and are linked in both directions
//!
//! Nodes live in an arena and refer to each other by id, so parent and
//! sibling links carry no ownership.
//!
//! # Usage
//!
//! ```
//! use sortkit::btree::BTree;
//!
//! let mut tree = BTree::new_natural(4);
//! for k in [30, 10, 20] {
//!     tree.add(k, k.to_string());
//! }
//! assert_eq!(tree.search(&20).map(String::as_str), Some("20"));
//!
//! let keys: Vec<i32> = tree.search_range(&15, &30)?.into_iter().map(|(k, _)| *k).collect();
//! assert_eq!(keys, vec![20, 30]);
//! # Ok::<(), sortkit::BTreeError>(())
//! ```

mod node;
mod tree;

pub use tree::{BTree, BTreeError, CursorMut, DEFAULT_ORDER, Iter, MAX_ORDER, MIN_ORDER, Range};

//! Three-way comparison used by every ordered structure in this crate.
//!
//! Structures take their comparator by value at construction. Natural
//! ordering is not implied by the element type; it is chosen explicitly with
//! [`NaturalOrder`].

use std::cmp::Ordering;

/// A total order over `T`.
///
/// Implementations must be consistent: `compare(a, b) == Less` iff
/// `compare(b, a) == Greater`, and `Equal` must be transitive.
pub trait Comparator<T: ?Sized> {
    /// Compare two values.
    fn compare(&self, a: &T, b: &T) -> Ordering;
}

/// Ordering given by the type's [`Ord`] implementation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NaturalOrder;

impl<T: Ord + ?Sized> Comparator<T> for NaturalOrder {
    #[inline]
    fn compare(&self, a: &T, b: &T) -> Ordering {
        a.cmp(b)
    }
}

/// Inverts another comparator. `ReverseOrder(NaturalOrder)` turns a
/// min-heap into a max-heap.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReverseOrder<C>(pub C);

impl<T: ?Sized, C: Comparator<T>> Comparator<T> for ReverseOrder<C> {
    #[inline]
    fn compare(&self, a: &T, b: &T) -> Ordering {
        self.0.compare(b, a)
    }
}

/// Comparator backed by a closure.
#[derive(Clone, Copy)]
pub struct FnComparator<F>(pub F);

impl<T: ?Sized, F> Comparator<T> for FnComparator<F>
where
    F: Fn(&T, &T) -> Ordering,
{
    #[inline]
    fn compare(&self, a: &T, b: &T) -> Ordering {
        (self.0)(a, b)
    }
}

impl<F> std::fmt::Debug for FnComparator<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("FnComparator")
    }
}

/// Wrap a closure as a [`Comparator`].
///
/// ```
/// use sortkit::{Comparator, from_fn};
///
/// let by_len = from_fn(|a: &String, b: &String| a.len().cmp(&b.len()));
/// assert!(by_len.compare(&"zz".to_string(), &"abc".to_string()).is_lt());
/// ```
pub const fn from_fn<T: ?Sized, F>(f: F) -> FnComparator<F>
where
    F: Fn(&T, &T) -> Ordering,
{
    FnComparator(f)
}

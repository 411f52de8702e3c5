use std::cmp::Ordering;

/// A strict total order over `K`.
///
/// Only the sign of the comparison matters to the tree.
pub trait Comparator<K: ?Sized> {
    fn compare(&self, a: &K, b: &K) -> Ordering;
}

/// Orders keys by their [`Ord`] implementation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct NaturalOrder;

impl<K: Ord + ?Sized> Comparator<K> for NaturalOrder {
    #[inline]
    fn compare(&self, a: &K, b: &K) -> Ordering {
        a.cmp(b)
    }
}

impl<K: ?Sized, F> Comparator<K> for F
where
    F: Fn(&K, &K) -> Ordering,
{
    #[inline]
    fn compare(&self, a: &K, b: &K) -> Ordering {
        self(a, b)
    }
}

/// Adapts a three-way comparison returning an integer.
///
/// Any negative result means "less" and any positive result means "greater",
/// whatever its magnitude.
#[derive(Debug, Clone, Copy, Default)]
pub struct SignComparator<F>(pub F);

impl<K: ?Sized, F> Comparator<K> for SignComparator<F>
where
    F: Fn(&K, &K) -> i32,
{
    #[inline]
    fn compare(&self, a: &K, b: &K) -> Ordering {
        (self.0)(a, b).cmp(&0)
    }
}

/// Inverts another comparator.
#[derive(Debug, Clone, Copy, Default)]
pub struct Reverse<C>(pub C);

impl<K: ?Sized, C: Comparator<K>> Comparator<K> for Reverse<C> {
    #[inline]
    fn compare(&self, a: &K, b: &K) -> Ordering {
        self.0.compare(b, a)
    }
}

//! src/value_iter.rs
//!
//! `ValueIter<T>`: a lazy, single-pass sequence with chained transformation.
//!
//! Iterating a `ValueIter<T>` yields `Result<T>`. Errors travel in-band: an
//! `Err` produced upstream passes through every later `apply` untouched, and a
//! mapper failure is yielded at the pull that triggered it.
//!
//! Single-pass is enforced by ownership: `apply` and `apply_parallel` take the
//! parent by value, so a consumed `ValueIter` cannot be iterated again.

use anyhow::Result;
use std::fmt;
use std::ops::Shr;

use crate::mapper::Mapper;

/// A lazy, possibly infinite sequence of `T`.
///
/// ```
/// use value_pipe::{mapper, ValueIter};
///
/// let v = ValueIter::new(1..4) >> mapper::from_fn(|x: i32| x + 1) >> mapper::from_fn(|x: i32| x * 2);
/// assert_eq!(v.collect::<anyhow::Result<Vec<_>>>().unwrap(), vec![4, 6, 8]);
/// ```
pub struct ValueIter<'a, T> {
    inner: Box<dyn Iterator<Item = Result<T>> + Send + 'a>,
    known_len: Option<usize>,
}

impl<'a, T: 'a> ValueIter<'a, T> {
    /// Wraps any enumerable source.
    ///
    /// The length is remembered when the source reports an exact `size_hint`
    /// (e.g. ranges and vectors); it drives the default worker count of
    /// `apply_parallel`.
    pub fn new<I>(source: I) -> Self
    where
        I: IntoIterator<Item = T>,
        I::IntoIter: Send + 'a,
    {
        let iter = source.into_iter();
        let known_len = exact_len(iter.size_hint());
        Self {
            inner: Box::new(iter.map(Ok)),
            known_len,
        }
    }

    /// Wraps a source whose elements may already be failures.
    pub fn from_results<I>(source: I) -> Self
    where
        I: IntoIterator<Item = Result<T>>,
        I::IntoIter: Send + 'a,
    {
        let iter = source.into_iter();
        let known_len = exact_len(iter.size_hint());
        Self {
            inner: Box::new(iter),
            known_len,
        }
    }

    pub(crate) fn from_boxed(inner: Box<dyn Iterator<Item = Result<T>> + Send + 'a>) -> Self {
        Self {
            inner,
            known_len: None,
        }
    }

    /// Exact number of elements, if the source exposed it and nothing could
    /// have dropped elements since.
    pub fn known_len(&self) -> Option<usize> {
        self.known_len
    }

    /// Lazily applies `m` to every element.
    ///
    /// Each pull on the result pulls one element from `self`; elements the
    /// mapper drops produce nothing and the next element is pulled instead.
    pub fn apply<M>(self, mut m: M) -> ValueIter<'a, M::Output>
    where
        M: Mapper<T> + 'a,
        M::Output: 'a,
    {
        let inner = self.inner.filter_map(move |item| match item {
            Ok(x) => m.apply(x).transpose(),
            Err(e) => Some(Err(e)),
        });
        ValueIter::from_boxed(Box::new(inner))
    }
}

fn exact_len((lower, upper): (usize, Option<usize>)) -> Option<usize> {
    match upper {
        Some(upper) if upper == lower => Some(upper),
        _ => None,
    }
}

impl<T> Iterator for ValueIter<'_, T> {
    type Item = Result<T>;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<'a, T: 'a, M> Shr<M> for ValueIter<'a, T>
where
    M: Mapper<T> + 'a,
    M::Output: 'a,
{
    type Output = ValueIter<'a, M::Output>;

    fn shr(self, m: M) -> Self::Output {
        self.apply(m)
    }
}

impl<T> fmt::Debug for ValueIter<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValueIter")
            .field("known_len", &self.known_len)
            .finish_non_exhaustive()
    }
}

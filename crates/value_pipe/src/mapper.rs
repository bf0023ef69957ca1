//! src/mapper.rs
//!
//! Defines the `Mapper` trait: the per-element step applied by `ValueIter::apply`
//! and by the workers of the parallel engine.
//!
//! A mapper returns a three-way outcome for every input:
//! - `Ok(Some(out))`: emit `out`
//! - `Ok(None)`: drop the element (no output, one upstream pull consumed)
//! - `Err(e)`: the mapper failed
//!
//! Because the drop signal lives in the outer `Option`, a mapper whose output is
//! itself optional can still emit a "null" value: `Ok(Some(None))` produces
//! `None` downstream while `Ok(None)` drops the element.

use anyhow::{Context, Result};
use std::marker::PhantomData;

/// A stateful, possibly failing transformation of one element.
///
/// `apply` takes `&mut self`, so a mapper may keep (and replace) its own state
/// between calls, e.g. reload a model after a failure. In the parallel engine
/// every worker owns its mapper exclusively; no mapper is ever shared between
/// threads.
///
/// Closures of the form `FnMut(I) -> Result<Option<O>>` implement `Mapper`
/// directly. For plain functions use [`from_fn`], [`filter_map`] or [`try_map`].
pub trait Mapper<I>: Send {
    /// Type of the elements produced.
    type Output;

    /// Maps one input. See the module docs for the meaning of the outcome.
    fn apply(&mut self, input: I) -> Result<Option<Self::Output>>;

    /// Runs `next` on every element this mapper emits.
    ///
    /// A drop in `self` short-circuits `next`.
    #[inline]
    fn then<N>(self, next: N) -> Chain<Self, N, Self::Output>
    where
        Self: Sized,
        N: Mapper<Self::Output>,
    {
        Chain::new(self, next)
    }
}

impl<I, O, F> Mapper<I> for F
where
    F: FnMut(I) -> Result<Option<O>> + Send,
{
    type Output = O;

    #[inline]
    fn apply(&mut self, input: I) -> Result<Option<O>> {
        self(input)
    }
}

/// Mapper built from an infallible function that never drops.
#[derive(Debug, Clone)]
pub struct FromFn<F>(F);

/// Wraps `f` so that every input produces exactly one output.
pub fn from_fn<F>(f: F) -> FromFn<F> {
    FromFn(f)
}

impl<I, O, F> Mapper<I> for FromFn<F>
where
    F: FnMut(I) -> O + Send,
{
    type Output = O;

    #[inline]
    fn apply(&mut self, input: I) -> Result<Option<O>> {
        Ok(Some((self.0)(input)))
    }
}

/// Mapper built from an infallible function that may drop elements.
#[derive(Debug, Clone)]
pub struct FilterMapFn<F>(F);

/// Wraps `f`; returning `None` drops the element.
pub fn filter_map<F>(f: F) -> FilterMapFn<F> {
    FilterMapFn(f)
}

impl<I, O, F> Mapper<I> for FilterMapFn<F>
where
    F: FnMut(I) -> Option<O> + Send,
{
    type Output = O;

    #[inline]
    fn apply(&mut self, input: I) -> Result<Option<O>> {
        Ok((self.0)(input))
    }
}

/// Mapper built from a fallible function that never drops.
#[derive(Debug, Clone)]
pub struct TryMapFn<F>(F);

/// Wraps `f`; an `Err` is reported as a mapper failure.
pub fn try_map<F>(f: F) -> TryMapFn<F> {
    TryMapFn(f)
}

impl<I, O, F> Mapper<I> for TryMapFn<F>
where
    F: FnMut(I) -> Result<O> + Send,
{
    type Output = O;

    #[inline]
    fn apply(&mut self, input: I) -> Result<Option<O>> {
        (self.0)(input).map(Some)
    }
}

/// Two mappers run back to back (`A` then `B`).
/// - `PhantomData<M>` pins the intermediate type.
#[derive(Debug)]
pub struct Chain<A, B, M> {
    first: A,
    second: B,
    _marker: PhantomData<fn() -> M>,
}

impl<A, B, M> Chain<A, B, M> {
    /// Creates a new chain. [`Mapper::then`] is usually more convenient.
    pub fn new(first: A, second: B) -> Self {
        Self {
            first,
            second,
            _marker: PhantomData,
        }
    }
}

impl<I, M, A, B> Mapper<I> for Chain<A, B, M>
where
    A: Mapper<I, Output = M>,
    B: Mapper<M>,
{
    type Output = B::Output;

    fn apply(&mut self, input: I) -> Result<Option<B::Output>> {
        let mid = match self.first.apply(input).with_context(|| {
            format!(
                "Mapper chain failed in first stage: {}",
                std::any::type_name::<A>()
            )
        })? {
            Some(mid) => mid,
            None => return Ok(None),
        };

        self.second.apply(mid).with_context(|| {
            format!(
                "Mapper chain failed in second stage: {}",
                std::any::type_name::<B>()
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    struct ToUpper;
    impl Mapper<String> for ToUpper {
        type Output = String;
        fn apply(&mut self, input: String) -> Result<Option<String>> {
            Ok(Some(input.to_uppercase()))
        }
    }

    struct SkipShort;
    impl Mapper<String> for SkipShort {
        type Output = usize;
        fn apply(&mut self, input: String) -> Result<Option<usize>> {
            Ok((input.len() > 3).then_some(input.len()))
        }
    }

    #[test]
    fn test_closure_is_a_mapper() -> Result<()> {
        let mut m = |x: i32| anyhow::Ok(if x % 2 == 0 { None } else { Some(x * 10) });
        assert_eq!(m.apply(3)?, Some(30));
        assert_eq!(m.apply(4)?, None);
        Ok(())
    }

    #[test]
    fn test_adapters() -> Result<()> {
        assert_eq!(from_fn(|x: i32| x + 1).apply(1)?, Some(2));
        assert_eq!(filter_map(|x: i32| (x > 0).then_some(x)).apply(-1)?, None);
        assert_eq!(try_map(|x: i32| anyhow::Ok(x * 2)).apply(4)?, Some(8));
        assert!(try_map(|_: i32| -> Result<i32> { Err(anyhow!("nope")) })
            .apply(4)
            .is_err());
        Ok(())
    }

    #[test]
    fn test_optional_output_is_not_a_drop() -> Result<()> {
        let mut m = from_fn(|x: i32| if x == 0 { None } else { Some(x) });
        assert_eq!(m.apply(0)?, Some(None));
        Ok(())
    }

    #[test]
    fn test_chain_using_then() -> Result<()> {
        let mut chain = ToUpper.then(SkipShort);
        assert_eq!(chain.apply("hello".to_string())?, Some(5));
        assert_eq!(chain.apply("hi".to_string())?, None);
        Ok(())
    }

    #[test]
    fn test_chain_short_circuits_on_drop() -> Result<()> {
        let mut calls = 0;
        let second = |s: String| {
            calls += 1;
            anyhow::Ok(Some(s))
        };
        let mut chain: Chain<_, _, String> =
            Chain::new(filter_map(|s: String| (!s.is_empty()).then_some(s)), second);
        assert_eq!(chain.apply(String::new())?, None);
        drop(chain);
        assert_eq!(calls, 0);
        Ok(())
    }

    #[test]
    fn test_chain_error_context() {
        struct Fail;
        impl Mapper<String> for Fail {
            type Output = String;
            fn apply(&mut self, _: String) -> Result<Option<String>> {
                Err(anyhow!("Test error"))
            }
        }

        let mut chain: Chain<_, _, String> = Chain::new(ToUpper, Fail);
        let err = chain.apply("test".to_string()).unwrap_err();
        let msg = err.to_string();

        assert!(msg.contains("Mapper chain failed in second stage"));
        assert!(msg.contains("Fail"));
        assert_eq!(err.root_cause().to_string(), "Test error");
    }
}

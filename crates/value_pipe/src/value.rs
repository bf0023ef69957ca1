//! src/value.rs
//!
//! `Value<T>`: an eager container for exactly one value.

use anyhow::Result;
use std::ops::Shr;

/// Wraps a single value and exposes chained transformation.
///
/// A `Value` is never mutated in place: every transformation consumes it and
/// returns a new `Value`.
///
/// ```
/// use value_pipe::Value;
///
/// let v = Value::new(4) >> (|x: i32| x + 1) >> (|x: i32| x * 2);
/// assert_eq!(v.into_inner(), 10);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Value<T> {
    value: T,
}

impl<T> Value<T> {
    pub fn new(value: T) -> Self {
        Self { value }
    }

    pub fn get(&self) -> &T {
        &self.value
    }

    pub fn into_inner(self) -> T {
        self.value
    }

    /// Applies `m` to the wrapped value. A panic in `m` unwinds through the caller.
    pub fn apply<U, F>(self, m: F) -> Value<U>
    where
        F: FnOnce(T) -> U,
    {
        Value::new(m(self.value))
    }

    /// Applies a fallible `m`; its error is returned as-is.
    pub fn try_apply<U, F>(self, m: F) -> Result<Value<U>>
    where
        F: FnOnce(T) -> Result<U>,
    {
        m(self.value).map(Value::new)
    }
}

impl<T> From<T> for Value<T> {
    fn from(value: T) -> Self {
        Self::new(value)
    }
}

impl<T, U, F> Shr<F> for Value<T>
where
    F: FnOnce(T) -> U,
{
    type Output = Value<U>;

    fn shr(self, m: F) -> Value<U> {
        self.apply(m)
    }
}

//! Pluggable value equality for assertions
//!
//! Whether a value is compared as a whole or element by element is decided by
//! picking the comparer, not by inspecting the value at run time.

use serde::Serialize;
use std::fmt;
use std::marker::PhantomData;
use thiserror::Error;

/// Raised by a comparer that could not decide; surfaced to the caller as is
#[derive(Debug, Error)]
#[error("{message}")]
pub struct ComparerError {
    message: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl ComparerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

impl From<serde_json::Error> for ComparerError {
    fn from(error: serde_json::Error) -> Self {
        Self::with_source(format!("could not serialize value for comparison: {error}"), error)
    }
}

/// Decides whether an expected and an actual value are equal
pub trait ValueComparer<T: ?Sized> {
    fn equals(&self, expected: &T, actual: &T) -> Result<bool, ComparerError>;
}

impl<T: ?Sized, C: ValueComparer<T> + ?Sized> ValueComparer<T> for &C {
    fn equals(&self, expected: &T, actual: &T) -> Result<bool, ComparerError> {
        (**self).equals(expected, actual)
    }
}

/// `PartialEq`, the default
#[derive(Debug, Clone, Copy, Default)]
pub struct StructuralEq;

impl<T: PartialEq + ?Sized> ValueComparer<T> for StructuralEq {
    fn equals(&self, expected: &T, actual: &T) -> Result<bool, ComparerError> {
        Ok(expected == actual)
    }
}

/// Compare collections element by element, in order, with an inner comparer
pub struct ElementWise<I, C = StructuralEq> {
    inner: C,
    _element: PhantomData<fn(&I)>,
}

impl<I, C> ElementWise<I, C> {
    pub fn new(inner: C) -> Self {
        Self {
            inner,
            _element: PhantomData,
        }
    }
}

impl<I> ElementWise<I, StructuralEq> {
    pub fn structural() -> Self {
        Self::new(StructuralEq)
    }
}

impl<I, C: fmt::Debug> fmt::Debug for ElementWise<I, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ElementWise").field(&self.inner).finish()
    }
}

impl<T, I, C> ValueComparer<T> for ElementWise<I, C>
where
    T: ?Sized,
    for<'a> &'a T: IntoIterator<Item = &'a I>,
    C: ValueComparer<I>,
{
    fn equals(&self, expected: &T, actual: &T) -> Result<bool, ComparerError> {
        let mut expected = expected.into_iter();
        let mut actual = actual.into_iter();

        loop {
            match (expected.next(), actual.next()) {
                (None, None) => return Ok(true),
                (Some(expected), Some(actual)) => {
                    if !self.inner.equals(expected, actual)? {
                        return Ok(false);
                    }
                }
                _ => return Ok(false),
            }
        }
    }
}

/// Deep equality through the values' serialized form
///
/// For types that are serializable but don't implement `PartialEq`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SerializedEq;

impl<T: Serialize + ?Sized> ValueComparer<T> for SerializedEq {
    fn equals(&self, expected: &T, actual: &T) -> Result<bool, ComparerError> {
        Ok(serde_json::to_value(expected)? == serde_json::to_value(actual)?)
    }
}

/// Wrap a closure as a comparer
pub struct FnComparer<F>(F);

impl<F> FnComparer<F> {
    pub fn new(compare: F) -> Self {
        Self(compare)
    }
}

impl<F> fmt::Debug for FnComparer<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FnComparer")
    }
}

impl<T: ?Sized, F: Fn(&T, &T) -> bool> ValueComparer<T> for FnComparer<F> {
    fn equals(&self, expected: &T, actual: &T) -> Result<bool, ComparerError> {
        Ok((self.0)(expected, actual))
    }
}

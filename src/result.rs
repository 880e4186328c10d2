//! Chaining helpers on top of [`Result`](crate::Result)
//!
//! Every accessor on a request returns `Result<T>`, which is the standard
//! library `Result` specialized to [`LazyreqError`]. Chaining uses the usual
//! combinators: `and_then` short-circuits on the first error, and `unwrap`
//! stays an explicit, opt-in abort for call sites where failure is a bug.
//! This module adds the two shapes the standard library does not have.

use crate::error::LazyreqError;

/// Extra combinators for `Result<T, LazyreqError>`.
pub trait ResultExt<T> {
    /// Split into a value and an optional error without panicking.
    ///
    /// On error the value is `T::default()`.
    fn unpack(self) -> (T, Option<LazyreqError>)
    where
        T: Default;

    /// Re-derive a successful value, leaving an error untouched.
    fn or_else_ok<F>(self, f: F) -> Result<T, LazyreqError>
    where
        F: FnOnce(T) -> Result<T, LazyreqError>;
}

impl<T> ResultExt<T> for Result<T, LazyreqError> {
    fn unpack(self) -> (T, Option<LazyreqError>)
    where
        T: Default,
    {
        match self {
            Ok(value) => (value, None),
            Err(err) => (T::default(), Some(err)),
        }
    }

    fn or_else_ok<F>(self, f: F) -> Result<T, LazyreqError>
    where
        F: FnOnce(T) -> Result<T, LazyreqError>,
    {
        match self {
            Ok(value) => f(value),
            Err(err) => Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::ResultExt;
    use crate::error::{LazyreqError, Result};

    fn failing() -> Result<u16> {
        Err(LazyreqError::Config("bad option".to_string()))
    }

    #[test]
    fn and_then_short_circuits_on_error() {
        let mut called = false;
        let out: Result<String> = failing().and_then(|code| {
            called = true;
            Ok(code.to_string())
        });
        assert!(!called);
        assert!(matches!(out, Err(LazyreqError::Config(_))));
    }

    #[test]
    fn unpack_yields_default_on_error() {
        let (value, err) = failing().unpack();
        assert_eq!(value, 0);
        assert!(err.is_some());

        let (value, err) = Ok::<_, LazyreqError>(201u16).unpack();
        assert_eq!(value, 201);
        assert!(err.is_none());
    }

    #[test]
    fn or_else_ok_only_runs_on_success() {
        let doubled = Ok::<_, LazyreqError>(2u16).or_else_ok(|v| Ok(v * 2));
        assert_eq!(doubled.unwrap_or(0), 4);

        let untouched = failing().or_else_ok(|_| Ok(7));
        assert_eq!(untouched.unwrap_or(0), 0);
    }

    #[test]
    #[should_panic(expected = "bad option")]
    fn unwrap_aborts_with_the_error() {
        failing().unwrap();
    }
}

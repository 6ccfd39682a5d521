//! Aggregation of errors from independent operations.

use std::fmt;

use crate::{Error, ErrorKind};

/// An ordered, flat collection of errors reported as a single failure.
///
/// An empty `CompoundError` is valid and means "no errors so far". Merging
/// one compound error into another appends its contents; compound errors are
/// never nested. Not meant for concurrent mutation.
#[derive(Default)]
pub struct CompoundError {
    errors: Vec<Error>,
}

impl CompoundError {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one error.
    pub fn push(&mut self, err: impl Into<Error>) {
        self.errors.push(err.into());
    }

    /// Append every error in order.
    ///
    /// Passing another `CompoundError` flattens its contents into this one.
    pub fn accumulate<I>(&mut self, errs: I)
    where
        I: IntoIterator<Item = Error>,
    {
        self.errors.extend(errs);
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn errors(&self) -> &[Error] {
        &self.errors
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Error> {
        self.errors.iter()
    }

    /// Convert into a single [`Error`] of kind `LoadFailed` carrying the
    /// joined messages.
    pub fn into_error(self) -> Error {
        let count = self.errors.len();
        Error::new(ErrorKind::LoadFailed, self.to_string())
            .with_context("errors", count.to_string())
    }

    /// `Ok(value)` when empty, otherwise `Err(self)`.
    pub fn into_result<T>(self, value: T) -> Result<T, CompoundError> {
        if self.has_errors() {
            Err(self)
        } else {
            Ok(value)
        }
    }
}

impl From<Error> for CompoundError {
    fn from(err: Error) -> Self {
        Self { errors: vec![err] }
    }
}

impl From<CompoundError> for Error {
    fn from(err: CompoundError) -> Self {
        err.into_error()
    }
}

impl Extend<Error> for CompoundError {
    fn extend<T: IntoIterator<Item = Error>>(&mut self, iter: T) {
        self.accumulate(iter);
    }
}

impl FromIterator<Error> for CompoundError {
    fn from_iter<T: IntoIterator<Item = Error>>(iter: T) -> Self {
        Self {
            errors: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for CompoundError {
    type Item = Error;
    type IntoIter = std::vec::IntoIter<Error>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.into_iter()
    }
}

impl<'a> IntoIterator for &'a CompoundError {
    type Item = &'a Error;
    type IntoIter = std::slice::Iter<'a, Error>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.iter()
    }
}

/// Newline-joined messages, in accumulation order.
impl fmt::Display for CompoundError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, err) in self.errors.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", err)?;
        }
        Ok(())
    }
}

impl fmt::Debug for CompoundError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.errors.iter()).finish()
    }
}

impl std::error::Error for CompoundError {}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_empty_has_no_errors() {
        let ce = CompoundError::new();
        assert!(!ce.has_errors());
        assert!(ce.is_empty());
        assert_eq!(ce.to_string(), "");
        assert!(ce.into_result(()).is_ok());
    }

    #[test]
    fn test_messages_joined_in_order() {
        let mut ce = CompoundError::new();
        ce.push(Error::unexpected("error1"));
        ce.push(Error::unexpected("error2"));

        assert!(ce.has_errors());
        assert_eq!(ce.to_string(), "Unexpected => error1\nUnexpected => error2");
    }

    #[test]
    fn test_accumulate_flattens_compound() {
        let mut inner = CompoundError::new();
        inner.push(Error::unexpected("b"));
        inner.push(Error::unexpected("c"));

        let mut outer = CompoundError::new();
        outer.push(Error::unexpected("a"));
        outer.accumulate(inner);
        outer.push(Error::unexpected("d"));

        let messages: Vec<&str> = outer.iter().map(|e| e.message()).collect();
        assert_eq!(messages, vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_into_error() {
        let ce: CompoundError = vec![Error::unexpected("x"), Error::unexpected("y")]
            .into_iter()
            .collect();
        let err = ce.into_error();

        assert_eq!(err.kind(), ErrorKind::LoadFailed);
        assert_eq!(err.message(), "Unexpected => x\nUnexpected => y");
        assert_eq!(err.context_value("errors"), Some("2"));
    }
}

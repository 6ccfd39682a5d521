//! [`Error`]: kind, message, operation and context of a failure.

use std::fmt;

use crate::ErrorKind;

/// Error shared by every promgraph crate.
pub struct Error {
    kind: ErrorKind,
    message: String,
    operation: &'static str,
    context: Vec<(&'static str, String)>,
    source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
}

impl Error {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            operation: "",
            context: Vec::new(),
            source: None,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Operation that produced the error, empty when unset.
    pub fn operation(&self) -> &'static str {
        self.operation
    }

    /// Context pairs in insertion order.
    pub fn context(&self) -> &[(&'static str, String)] {
        &self.context
    }

    /// Look up a context value by key.
    pub fn context_value(&self, key: &str) -> Option<&str> {
        self.context
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn source_ref(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        self.source.as_ref().map(|e| e.as_ref())
    }

    /// Set the operation. A previously set operation is kept in context
    /// under `called`.
    pub fn with_operation(mut self, operation: &'static str) -> Self {
        if !self.operation.is_empty() {
            self.context.push(("called", self.operation.to_string()));
        }
        self.operation = operation;
        self
    }

    pub fn with_context(mut self, key: &'static str, value: impl Into<String>) -> Self {
        self.context.push((key, value.into()));
        self
    }

    /// Attach the underlying error. Setting it twice is a bug and asserts in
    /// debug builds.
    pub fn set_source<E>(mut self, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        debug_assert!(self.source.is_none(), "source error already set");
        self.source = Some(Box::new(source));
        self
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;

        if !self.operation.is_empty() {
            write!(f, " at {}", self.operation)?;
        }

        if !self.context.is_empty() {
            write!(f, ", context {{ ")?;
            for (i, (key, value)) in self.context.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}: {}", key, value)?;
            }
            write!(f, " }}")?;
        }

        if !self.message.is_empty() {
            write!(f, " => {}", self.message)?;
        }

        Ok(())
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = f.debug_struct("Error");
        out.field("kind", &self.kind);
        if !self.operation.is_empty() {
            out.field("operation", &self.operation);
        }
        out.field("message", &self.message);
        if !self.context.is_empty() {
            out.field("context", &self.context);
        }
        if let Some(source) = &self.source {
            out.field("source", source);
        }
        out.finish()
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        let kind = match err.kind() {
            std::io::ErrorKind::NotFound => ErrorKind::FileNotFound,
            std::io::ErrorKind::PermissionDenied => ErrorKind::PermissionDenied,
            _ => ErrorKind::IoFailed,
        };
        Error::new(kind, err.to_string())
            .with_operation("io")
            .set_source(err)
    }
}

impl From<String> for Error {
    fn from(msg: String) -> Self {
        Error::unexpected(msg)
    }
}

impl From<&str> for Error {
    fn from(msg: &str) -> Self {
        Error::unexpected(msg)
    }
}

impl Error {
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unexpected, message)
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidArgument, message)
    }

    /// A query expression that does not follow the grammar.
    pub fn parse_failed(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ParseFailed, message)
    }

    /// A malformed token inside a query expression.
    pub fn syntax_error(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::SyntaxError, message)
    }

    /// A rule file that is not well-formed YAML or has unknown fields.
    pub fn deserialization_failed(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::DeserializationFailed, message)
    }

    /// A decoded rule that breaks a rule file constraint.
    pub fn validation_failed(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ValidationFailed, message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = Error::new(ErrorKind::ParseFailed, "unexpected token");
        assert_eq!(err.kind(), ErrorKind::ParseFailed);
        assert_eq!(err.message(), "unexpected token");
        assert_eq!(err.operation(), "");
    }

    #[test]
    fn test_error_with_context() {
        let err = Error::new(ErrorKind::ValidationFailed, "invalid name")
            .with_operation("rules::validate")
            .with_context("file", "rules.yml")
            .with_context("group", "node");

        assert_eq!(err.operation(), "rules::validate");
        assert_eq!(err.context().len(), 2);
        assert_eq!(err.context()[0], ("file", "rules.yml".to_string()));
        assert_eq!(err.context_value("group"), Some("node"));
        assert_eq!(err.context_value("rule"), None);
    }

    #[test]
    fn test_operation_chaining() {
        let err = Error::new(ErrorKind::ParseFailed, "failed")
            .with_operation("promql::parse")
            .with_operation("graph::build");

        assert_eq!(err.operation(), "graph::build");
        assert_eq!(err.context().len(), 1);
        assert_eq!(err.context()[0], ("called", "promql::parse".to_string()));
    }

    #[test]
    fn test_display() {
        let err = Error::new(ErrorKind::ParseFailed, "unexpected end of input")
            .with_operation("promql::parse")
            .with_context("rule", "job:up:sum");

        assert_eq!(
            err.to_string(),
            "ParseFailed at promql::parse, context { rule: job:up:sum } => unexpected end of input"
        );
    }

    #[test]
    fn test_display_without_operation() {
        let err = Error::unexpected("boom");
        assert_eq!(err.to_string(), "Unexpected => boom");
    }

    #[test]
    fn test_io_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let err: Error = io_err.into();

        assert_eq!(err.kind(), ErrorKind::FileNotFound);
        assert_eq!(err.operation(), "io");
        assert!(err.source_ref().is_some());
    }

    #[test]
    fn test_convenience_constructors() {
        assert_eq!(Error::invalid_argument("x").kind(), ErrorKind::InvalidArgument);
        assert_eq!(Error::parse_failed("x").kind(), ErrorKind::ParseFailed);
        assert_eq!(Error::syntax_error("x").kind(), ErrorKind::SyntaxError);
        assert_eq!(
            Error::deserialization_failed("x").kind(),
            ErrorKind::DeserializationFailed
        );
        assert_eq!(Error::validation_failed("x").kind(), ErrorKind::ValidationFailed);
    }

    #[test]
    fn test_debug_lists_fields() {
        let err = Error::validation_failed("bad").with_context("file", "a.yml");
        let debug = format!("{err:?}");
        assert!(debug.starts_with("Error { kind: ValidationFailed"), "{debug}");
        assert!(debug.contains("\"a.yml\""), "{debug}");
    }
}

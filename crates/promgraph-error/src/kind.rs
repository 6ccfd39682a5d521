//! Error kinds for promgraph operations

use strum_macros::{Display, IntoStaticStr};

/// The kind of error that occurred.
///
/// Callers match on `ErrorKind` to decide how to report a failure; the
/// message and context carry the details.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoStaticStr, Display)]
#[non_exhaustive]
pub enum ErrorKind {
    // =========================================================================
    // General errors
    // =========================================================================
    /// An unexpected error occurred - catch-all for unhandled cases
    Unexpected,

    /// Invalid argument passed on the command line or to a function
    InvalidArgument,

    // =========================================================================
    // Parse errors
    // =========================================================================
    /// Failed to parse a query expression
    ParseFailed,

    /// Invalid token or malformed literal in a query expression
    SyntaxError,

    /// A rule file could not be decoded
    DeserializationFailed,

    // =========================================================================
    // Rule errors
    // =========================================================================
    /// A decoded rule file violates the rule file format
    ValidationFailed,

    /// One or more rule files failed to load
    LoadFailed,

    // =========================================================================
    // File/IO errors
    // =========================================================================
    /// File not found
    FileNotFound,

    /// Permission denied
    PermissionDenied,

    /// IO operation failed
    IoFailed,
}

impl ErrorKind {
    /// Returns the error kind as a static string
    pub fn as_str(&self) -> &'static str {
        (*self).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kind_display() {
        assert_eq!(ErrorKind::ParseFailed.to_string(), "ParseFailed");
        assert_eq!(ErrorKind::LoadFailed.as_str(), "LoadFailed");
    }
}

//! # promgraph-error
//!
//! Unified error handling for promgraph.
//!
//! - **ErrorKind**: what went wrong (e.g. `ParseFailed`, `ValidationFailed`)
//! - **Error context**: key/value pairs locating the cause (file, group, rule)
//! - **Error source**: wraps underlying errors without leaking raw types
//! - **CompoundError**: a flat, ordered list of errors collected from
//!   independent operations and reported as one failure
//!
//! ## Usage
//!
//! ```rust
//! use promgraph_error::{CompoundError, Error, ErrorKind};
//!
//! let mut errors = CompoundError::new();
//! errors.accumulate([
//!     Error::new(ErrorKind::ValidationFailed, "group name must not be empty")
//!         .with_operation("rules::validate")
//!         .with_context("file", "bad.yml"),
//! ]);
//! assert!(errors.has_errors());
//! ```

mod compound;
mod error;
mod kind;

pub use compound::CompoundError;
pub use error::Error;
pub use kind::ErrorKind;

/// Result type alias using promgraph Error
pub type Result<T> = std::result::Result<T, Error>;

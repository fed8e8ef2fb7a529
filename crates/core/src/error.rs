//! Error types for docsim
//!
//! This module defines all error types used throughout the system.
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.
//!
//! The variants follow four classes of failure:
//! - configuration errors, raised before any work begins
//! - invariant violations (out-of-order ids, malformed records), which abort
//!   the current operation
//! - resource exhaustion in the dense index
//! - I/O failures, carrying the file and operation that failed

use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::types::DocId;

/// Result type alias for docsim operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for docsim
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error on a named file
    #[error("I/O error on '{path}' while {op}: {source}")]
    Io {
        /// File the operation was working on
        path: PathBuf,
        /// Operation being performed (e.g. "reading key table")
        op: &'static str,
        /// Underlying error
        #[source]
        source: io::Error,
    },

    /// I/O error on a stream with no file name attached
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),

    /// Configuration rejected before any work started
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Internal invariant violated (caller or data-corruption bug)
    #[error("Invariant violated: {0}")]
    InvariantViolation(String),

    /// Document ids presented out of ascending order
    #[error("Document id {id} inserted after {last}: ids must be non-decreasing")]
    OutOfOrder {
        /// Id being inserted
        id: DocId,
        /// Last id already recorded
        last: DocId,
    },

    /// Malformed record in a text index or posting list
    #[error("Malformed record at line {line}: {reason}")]
    Malformed {
        /// 1-based line number (0 when not line oriented)
        line: usize,
        /// What was wrong
        reason: String,
    },

    /// Index growth would exceed what the tier addressing can represent
    #[error("Capacity exhausted: {0}")]
    CapacityExhausted(String),
}

impl Error {
    /// I/O error with file context
    pub fn io(path: impl AsRef<Path>, op: &'static str, source: io::Error) -> Self {
        Error::Io {
            path: path.as_ref().to_path_buf(),
            op,
            source,
        }
    }

    /// Malformed record error
    pub fn malformed(line: usize, reason: impl Into<String>) -> Self {
        Error::Malformed {
            line,
            reason: reason.into(),
        }
    }

    /// Invariant violation error
    pub fn invariant(msg: impl Into<String>) -> Self {
        Error::InvariantViolation(msg.into())
    }

    /// Configuration error
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Error::InvalidConfig(msg.into())
    }

    /// Whether this error leaves the process in a state that cannot serve
    /// further requests.
    ///
    /// I/O failures are not fatal for a long-running server: the request is
    /// rejected and the loaded index stays in service.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Error::Io { .. } | Error::IoError(_))
    }
}

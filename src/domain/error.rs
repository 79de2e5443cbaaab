//! Error types for Tracelens.
//!
//! This module defines the centralized error type [`TracelensError`] and a type alias
//! [`Result`] for convenient error handling throughout the crate. All errors are
//! implemented using the `thiserror` crate for automatic `Error` trait implementation.
//!
//! The pure transforms have very few failure modes: decoding a TraceQL query can hit
//! a syntax error, and the trace transformer never fails at all. Most variants exist
//! for the surfaces around them (configuration, CLI input, attachments).

use thiserror::Error;

/// The main error type for Tracelens operations.
///
/// # Examples
///
/// ```
/// use tracelens::TracelensError;
///
/// let err = TracelensError::Query {
///     offset: 4,
///     message: "expected `}`".to_string(),
/// };
/// assert_eq!(err.to_string(), "TraceQL syntax error at offset 4: expected `}`");
/// ```
#[derive(Debug, Error)]
pub enum TracelensError {
    /// The TraceQL query could not be tokenized or parsed.
    ///
    /// `offset` is the byte offset into the query where the problem was detected.
    #[error("TraceQL syntax error at offset {offset}: {message}")]
    Query {
        /// Byte offset of the offending input.
        offset: usize,
        /// Description of what was expected or found.
        message: String,
    },

    /// JSON input or output failed to (de)serialize.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Filesystem or I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration is invalid or could not be read.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A console link could not be built from the given URL parameters.
    #[error("Link error: {0}")]
    Link(String),

    /// A serialized trace exceeds the size accepted by the AI assistant.
    #[error("Trace attachment is {size} bytes, maximum is {max} bytes")]
    AttachmentTooLarge {
        /// Size of the serialized attachment in bytes.
        size: usize,
        /// Configured maximum in bytes.
        max: usize,
    },
}

impl TracelensError {
    /// Shorthand for a [`TracelensError::Query`] error.
    pub(crate) fn query(offset: usize, message: impl Into<String>) -> Self {
        Self::Query {
            offset,
            message: message.into(),
        }
    }
}

/// A specialized `Result` type for Tracelens operations.
///
/// This is a type alias for `std::result::Result<T, TracelensError>` that simplifies
/// function signatures throughout the codebase.
pub type Result<T> = std::result::Result<T, TracelensError>;

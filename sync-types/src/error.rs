//! Error types for clicker-sync payloads.

use thiserror::Error;

/// Errors that can occur while decoding a payload.
///
/// Callers recover from these locally; they are never surfaced to the user.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// The payload value was not a JSON object.
    #[error("payload is not an object")]
    NotAnObject,

    /// A required field was absent.
    #[error("missing field: {0}")]
    MissingField(&'static str),

    /// A field was present but had the wrong type or value.
    #[error("invalid field {field}: {reason}")]
    InvalidField {
        /// Name of the offending field.
        field: &'static str,
        /// What was wrong with it.
        reason: String,
    },
}

//! Error types for range compression and index rewriting.

use thiserror::Error;

/// Errors that can occur while encoding coordinates or rewriting an index.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum KerchunkError {
    /// A chunk buffer has the wrong size or is not a valid numeric array.
    #[error("malformed buffer: {0}")]
    MalformedBuffer(String),

    /// A key required by the rewrite is absent from the reference mapping.
    #[error("missing required key: {0}")]
    MissingKey(String),

    /// Only grib2 products are enumerated.
    #[error("unsupported format: {0} (only 'grib2' is supported)")]
    UnsupportedFormat(String),

    /// A sequence cannot be represented as a range.
    #[error("invalid sequence: {0}")]
    InvalidSequence(String),

    /// A `.zarray` schema string could not be patched.
    #[error("malformed schema for {key}: {reason}")]
    MalformedSchema { key: String, reason: String },

    /// A filter id declared in a schema has no registered implementation.
    #[error("unsupported filter: {0}")]
    UnsupportedFilter(String),

    /// Configuration error.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// JSON (de)serialization of a mapping failed.
    #[error("json error: {0}")]
    Json(String),
}

impl KerchunkError {
    /// Create a MalformedBuffer error.
    pub fn malformed_buffer(msg: impl Into<String>) -> Self {
        Self::MalformedBuffer(msg.into())
    }

    /// Create a MissingKey error.
    pub fn missing_key(key: impl Into<String>) -> Self {
        Self::MissingKey(key.into())
    }

    /// Create an InvalidSequence error.
    pub fn invalid_sequence(msg: impl Into<String>) -> Self {
        Self::InvalidSequence(msg.into())
    }

    /// Create a MalformedSchema error.
    pub fn malformed_schema(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedSchema {
            key: key.into(),
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for KerchunkError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string())
    }
}

impl From<base64::DecodeError> for KerchunkError {
    fn from(err: base64::DecodeError) -> Self {
        Self::MalformedBuffer(format!("invalid base64 payload: {}", err))
    }
}

/// Result type for kerchunk operations.
pub type Result<T> = std::result::Result<T, KerchunkError>;

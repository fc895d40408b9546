use std::fmt;

use kvb_marshal::{MarshalError, MarshalFormat};

/// Errors returned by store operations.
///
/// "Not found" is never an error: reads of absent keys succeed with `None`.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The key is empty.
    #[error("invalid key: {0}")]
    InvalidKey(String),

    /// The value to store is nil.
    #[error("invalid value: {0}")]
    InvalidValue(String),

    /// The store's format has no registered marshaller.
    #[error("unsupported marshal format: {0}")]
    UnsupportedFormat(String),

    /// Encoding the value failed.
    #[error("failed to marshal value as {format}: {message}")]
    Marshal {
        format: MarshalFormat,
        message: String,
    },

    /// Decoding a stored record failed. The record itself is left intact.
    #[error("failed to unmarshal {format} record: {message}")]
    Unmarshal {
        format: MarshalFormat,
        message: String,
    },

    /// The storage medium failed.
    #[error("{backend} backend error: {message}")]
    Backend {
        backend: &'static str,
        message: String,
    },

    /// The store has been closed.
    #[error("store is closed")]
    Closed,
}

impl StoreError {
    /// Wrap a failure reported by a backend's storage medium.
    pub fn backend(backend: &'static str, err: impl fmt::Display) -> Self {
        Self::Backend {
            backend,
            message: err.to_string(),
        }
    }

    /// Returns `true` for key and value precondition failures.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::InvalidKey(_) | Self::InvalidValue(_))
    }

    /// Returns `true` if the operation was issued after `close`.
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Closed)
    }
}

impl From<MarshalError> for StoreError {
    fn from(err: MarshalError) -> Self {
        match err {
            MarshalError::InvalidKey(msg) => Self::InvalidKey(msg),
            MarshalError::InvalidValue(msg) => Self::InvalidValue(msg),
            MarshalError::UnsupportedFormat(msg) => Self::UnsupportedFormat(msg),
            MarshalError::Marshal { format, message } => Self::Marshal { format, message },
            MarshalError::Unmarshal { format, message } => Self::Unmarshal { format, message },
        }
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

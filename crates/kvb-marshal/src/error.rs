//! Error types for marshalling and validation.

use thiserror::Error;

use crate::format::MarshalFormat;

/// Errors raised while validating inputs or converting values to and from
/// encoded records.
#[derive(Debug, Error)]
pub enum MarshalError {
    /// The key is not acceptable (currently: empty).
    #[error("invalid key: {0}")]
    InvalidKey(String),

    /// The value is nil and cannot be stored.
    #[error("invalid value: {0}")]
    InvalidValue(String),

    /// No marshaller is registered for the format, or the format name or
    /// code is not recognised.
    #[error("unsupported marshal format: {0}")]
    UnsupportedFormat(String),

    /// Encoding a value failed.
    #[error("failed to marshal value as {format}: {message}")]
    Marshal {
        format: MarshalFormat,
        message: String,
    },

    /// Decoding a record failed (malformed bytes or incompatible type).
    #[error("failed to unmarshal {format} record: {message}")]
    Unmarshal {
        format: MarshalFormat,
        message: String,
    },
}

impl MarshalError {
    /// Returns `true` for key and value precondition failures.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::InvalidKey(_) | Self::InvalidValue(_))
    }
}

/// Result alias for marshal operations.
pub type Result<T> = std::result::Result<T, MarshalError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_format() {
        let err = MarshalError::Unmarshal {
            format: MarshalFormat::Bincode,
            message: "unexpected end of file".into(),
        };
        let text = err.to_string();
        assert!(text.contains("bincode"));
        assert!(text.contains("unexpected end of file"));
    }

    #[test]
    fn validation_classification() {
        assert!(MarshalError::InvalidKey("empty".into()).is_validation());
        assert!(MarshalError::InvalidValue("nil".into()).is_validation());
        assert!(!MarshalError::UnsupportedFormat("xml".into()).is_validation());
    }
}

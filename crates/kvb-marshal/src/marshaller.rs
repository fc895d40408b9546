//! Marshalling strategies.
//!
//! Built-in formats encode the caller's type directly through serde. Custom
//! formats plug in through [`ValueMarshaller`], which works on a
//! `serde_json::Value` document so that a trait object can serve any value
//! type.

use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::{MarshalError, Result};
use crate::format::MarshalFormat;

/// Boxed error returned by custom marshallers.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Application-supplied format, registered under [`MarshalFormat::Custom`].
///
/// Implementations must be self-describing: whatever `marshal` produces,
/// `unmarshal` must turn back into an equal document.
pub trait ValueMarshaller: Send + Sync {
    /// Encode a document. `key` is the record's key, for formats that embed
    /// it or want it in error messages.
    fn marshal(&self, key: &str, value: &Value) -> std::result::Result<Vec<u8>, BoxError>;

    /// Decode a record produced by [`ValueMarshaller::marshal`].
    fn unmarshal(&self, data: &[u8]) -> std::result::Result<Value, BoxError>;
}

/// A marshalling strategy held by the registry.
#[derive(Clone)]
pub enum Marshaller {
    /// `serde_json` text.
    Json,
    /// `bincode` binary.
    Bincode,
    /// Application-supplied strategy.
    Custom(Arc<dyn ValueMarshaller>),
}

impl Marshaller {
    /// Wrap a custom strategy.
    pub fn custom<M: ValueMarshaller + 'static>(marshaller: M) -> Self {
        Self::Custom(Arc::new(marshaller))
    }

    /// Encode `value`. `format` is only used to label errors.
    pub fn encode<T>(&self, format: &MarshalFormat, key: &str, value: &T) -> Result<Vec<u8>>
    where
        T: Serialize + ?Sized,
    {
        let encoded = match self {
            Self::Json => serde_json::to_vec(value).map_err(|e| e.to_string()),
            Self::Bincode => bincode::serialize(value).map_err(|e| e.to_string()),
            Self::Custom(custom) => serde_json::to_value(value)
                .map_err(|e| e.to_string())
                .and_then(|doc| custom.marshal(key, &doc).map_err(|e| e.to_string())),
        };
        encoded.map_err(|message| MarshalError::Marshal {
            format: format.clone(),
            message,
        })
    }

    /// Decode `data` into a `T`.
    pub fn decode<T>(&self, format: &MarshalFormat, data: &[u8]) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let decoded = match self {
            Self::Json => serde_json::from_slice(data).map_err(|e| e.to_string()),
            Self::Bincode => bincode::deserialize(data).map_err(|e| e.to_string()),
            Self::Custom(custom) => custom
                .unmarshal(data)
                .map_err(|e| e.to_string())
                .and_then(|doc| serde_json::from_value(doc).map_err(|e| e.to_string())),
        };
        decoded.map_err(|message| MarshalError::Unmarshal {
            format: format.clone(),
            message,
        })
    }
}

impl fmt::Debug for Marshaller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json => write!(f, "Marshaller::Json"),
            Self::Bincode => write!(f, "Marshaller::Bincode"),
            Self::Custom(_) => write!(f, "Marshaller::Custom(..)"),
        }
    }
}

//! Format → marshaller registry.

use std::collections::HashMap;
use std::fmt;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::error::{MarshalError, Result};
use crate::format::MarshalFormat;
use crate::marshaller::Marshaller;
use crate::validation::check_key_and_value;

/// Maps each [`MarshalFormat`] to the [`Marshaller`] that implements it.
///
/// Lookups share a read lock and only hold it long enough to clone the
/// strategy handle; encoding and decoding run unlocked. Registration takes
/// the write lock and is visible to every later lookup through any handle
/// to the same registry.
pub struct MarshalRegistry {
    marshallers: RwLock<HashMap<MarshalFormat, Marshaller>>,
}

impl MarshalRegistry {
    /// Create a registry with no formats at all.
    pub fn new() -> Self {
        Self {
            marshallers: RwLock::new(HashMap::new()),
        }
    }

    /// Create a registry with [`MarshalFormat::Json`] and
    /// [`MarshalFormat::Bincode`] registered.
    pub fn with_builtin() -> Self {
        let registry = Self::new();
        registry.register(MarshalFormat::Json, Marshaller::Json);
        registry.register(MarshalFormat::Bincode, Marshaller::Bincode);
        registry
    }

    /// Associate `format` with `marshaller`, returning the strategy it
    /// replaces.
    pub fn register(&self, format: MarshalFormat, marshaller: Marshaller) -> Option<Marshaller> {
        debug!(%format, ?marshaller, "registering marshaller");
        self.write().insert(format, marshaller)
    }

    /// Whether a strategy is registered for `format`.
    pub fn is_registered(&self, format: &MarshalFormat) -> bool {
        self.read().contains_key(format)
    }

    /// All registered formats, sorted.
    pub fn formats(&self) -> Vec<MarshalFormat> {
        let mut formats: Vec<MarshalFormat> = self.read().keys().cloned().collect();
        formats.sort();
        formats
    }

    /// The strategy registered for `format`.
    pub fn lookup(&self, format: &MarshalFormat) -> Result<Marshaller> {
        self.read().get(format).cloned().ok_or_else(|| {
            MarshalError::UnsupportedFormat(format!("no marshaller registered for {format}"))
        })
    }

    /// Validate `key` and `value`, then encode `value` under `format`.
    pub fn marshal<T>(&self, key: &str, value: &T, format: &MarshalFormat) -> Result<Vec<u8>>
    where
        T: Serialize + ?Sized,
    {
        let marshaller = self.lookup(format)?;
        check_key_and_value(key, value)?;
        marshaller.encode(format, key, value)
    }

    /// Decode a record written under `format`.
    pub fn unmarshal<T>(&self, format: &MarshalFormat, data: &[u8]) -> Result<T>
    where
        T: DeserializeOwned,
    {
        self.lookup(format)?.decode(format, data)
    }

    // A panic elsewhere cannot leave the table half-updated (every write is a
    // single insert), so a poisoned lock is still safe to use.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<MarshalFormat, Marshaller>> {
        self.marshallers.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<MarshalFormat, Marshaller>> {
        self.marshallers.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for MarshalRegistry {
    fn default() -> Self {
        Self::with_builtin()
    }
}

impl fmt::Debug for MarshalRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MarshalRegistry")
            .field("formats", &self.formats())
            .finish()
    }
}

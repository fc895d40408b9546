use std::sync::Arc;

use crate::error::StoreResult;

/// Raw record storage behind a [`Store`](crate::Store).
///
/// A backend only ever sees validated keys and already-encoded records;
/// validation and marshalling happen in the store before any call lands
/// here. Implementations must satisfy:
/// - `write` replaces any existing record for the key.
/// - `read` returns `Ok(None)` for an absent key.
/// - `delete` of an absent key succeeds.
/// - After `close`, every operation except `close` fails with
///   [`StoreError::Closed`](crate::StoreError::Closed); `close` itself is
///   idempotent.
/// - Storage failures are propagated, never silently ignored.
pub trait Backend: Send + Sync {
    /// Short name used in logs and errors.
    fn name(&self) -> &'static str;

    /// Read the record stored under `key`.
    fn read(&self, key: &str) -> StoreResult<Option<Vec<u8>>>;

    /// Store `record` under `key`, replacing any previous record.
    fn write(&self, key: &str, record: Vec<u8>) -> StoreResult<()>;

    /// Remove the record under `key`, if any.
    fn delete(&self, key: &str) -> StoreResult<()>;

    /// Release the storage resource.
    fn close(&self) -> StoreResult<()>;
}

impl<B: Backend + ?Sized> Backend for Box<B> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn read(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        (**self).read(key)
    }

    fn write(&self, key: &str, record: Vec<u8>) -> StoreResult<()> {
        (**self).write(key, record)
    }

    fn delete(&self, key: &str) -> StoreResult<()> {
        (**self).delete(key)
    }

    fn close(&self) -> StoreResult<()> {
        (**self).close()
    }
}

impl<B: Backend + ?Sized> Backend for Arc<B> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn read(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        (**self).read(key)
    }

    fn write(&self, key: &str, record: Vec<u8>) -> StoreResult<()> {
        (**self).write(key, record)
    }

    fn delete(&self, key: &str) -> StoreResult<()> {
        (**self).delete(key)
    }

    fn close(&self) -> StoreResult<()> {
        (**self).close()
    }
}

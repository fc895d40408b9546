use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use kvb_marshal::MarshalRegistry;
use tracing::debug;

use crate::backend::Backend;
use crate::error::{StoreError, StoreResult};
use crate::options::StoreOptions;
use crate::store::Store;

const NAME: &str = "memory";

/// A [`Store`] kept entirely in process memory.
pub type InMemoryStore = Store<InMemoryBackend>;

/// In-memory, `HashMap`-based backend.
///
/// One `RwLock` guards the whole map: reads share it, writes, deletes and
/// `close` take it exclusively. Records are copied out under the shared lock
/// and decoded by the store after the guard is gone, so a slow decode never
/// blocks writers. `close` drops the map; the backend answers
/// [`StoreError::Closed`] from then on.
pub struct InMemoryBackend {
    records: RwLock<Option<HashMap<String, Vec<u8>>>>,
}

impl InMemoryBackend {
    /// Create a new empty backend.
    pub fn new() -> Self {
        Self {
            records: RwLock::new(Some(HashMap::new())),
        }
    }

    /// Number of records currently stored (zero once closed).
    pub fn len(&self) -> usize {
        self.records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map_or(0, HashMap::len)
    }

    /// Returns `true` if no records are stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns `true` once `close` has been called.
    pub fn is_closed(&self) -> bool {
        self.records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn poisoned(err: impl fmt::Display) -> StoreError {
    StoreError::backend(NAME, format!("lock poisoned: {err}"))
}

impl Backend for InMemoryBackend {
    fn name(&self) -> &'static str {
        NAME
    }

    fn read(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        let record = {
            let records = self.records.read().map_err(poisoned)?;
            records.as_ref().ok_or(StoreError::Closed)?.get(key).cloned()
        };
        Ok(record)
    }

    fn write(&self, key: &str, record: Vec<u8>) -> StoreResult<()> {
        let mut records = self.records.write().map_err(poisoned)?;
        records
            .as_mut()
            .ok_or(StoreError::Closed)?
            .insert(key.to_string(), record);
        Ok(())
    }

    fn delete(&self, key: &str) -> StoreResult<()> {
        let mut records = self.records.write().map_err(poisoned)?;
        records.as_mut().ok_or(StoreError::Closed)?.remove(key);
        Ok(())
    }

    fn close(&self) -> StoreResult<()> {
        let dropped = self.records.write().map_err(poisoned)?.take();
        // Free the records after the write guard is released.
        if let Some(records) = dropped {
            debug!(records = records.len(), "memory backend closed");
        }
        Ok(())
    }
}

impl fmt::Debug for InMemoryBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemoryBackend")
            .field("record_count", &self.len())
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl Store<InMemoryBackend> {
    /// Build a store backed by a fresh [`InMemoryBackend`].
    pub fn in_memory(options: StoreOptions, registry: Arc<MarshalRegistry>) -> StoreResult<Self> {
        Store::new(InMemoryBackend::new(), options, registry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conformance;
    use kvb_marshal::MarshalFormat;
    use std::thread;

    fn store(format: MarshalFormat) -> InMemoryStore {
        InMemoryStore::in_memory(
            StoreOptions::with_format(format),
            Arc::new(MarshalRegistry::with_builtin()),
        )
        .unwrap()
    }

    // -----------------------------------------------------------------------
    // Backend
    // -----------------------------------------------------------------------

    #[test]
    fn write_read_delete() {
        let backend = InMemoryBackend::new();
        backend.write("k", b"v1".to_vec()).unwrap();
        assert_eq!(backend.read("k").unwrap(), Some(b"v1".to_vec()));

        backend.write("k", b"v2".to_vec()).unwrap();
        assert_eq!(backend.read("k").unwrap(), Some(b"v2".to_vec()));
        assert_eq!(backend.len(), 1);

        backend.delete("k").unwrap();
        assert_eq!(backend.read("k").unwrap(), None);
        backend.delete("k").unwrap();
        assert!(backend.is_empty());
    }

    #[test]
    fn close_drops_everything() {
        let backend = InMemoryBackend::new();
        backend.write("a", vec![1]).unwrap();
        backend.write("b", vec![2]).unwrap();
        backend.close().unwrap();

        assert!(backend.is_closed());
        assert_eq!(backend.len(), 0);
        assert!(matches!(backend.read("a"), Err(StoreError::Closed)));
        assert!(matches!(backend.write("a", vec![3]), Err(StoreError::Closed)));
        assert!(matches!(backend.delete("a"), Err(StoreError::Closed)));
        backend.close().unwrap();
    }

    #[test]
    fn read_does_not_block_later_writes() {
        let backend = Arc::new(InMemoryBackend::new());
        backend.write("k", vec![0; 1024]).unwrap();
        // The record is an owned copy; writers proceed while it is held.
        let held = backend.read("k").unwrap().unwrap();
        backend.write("k", vec![1; 8]).unwrap();
        assert_eq!(held.len(), 1024);
        assert_eq!(backend.read("k").unwrap(), Some(vec![1; 8]));
    }

    #[test]
    fn poisoned_lock_is_an_error_not_a_panic() {
        let backend = Arc::new(InMemoryBackend::new());
        let poisoner = Arc::clone(&backend);
        let _ = thread::spawn(move || {
            let _guard = poisoner.records.write().unwrap();
            panic!("poison the lock");
        })
        .join();

        let err = backend.read("k").unwrap_err();
        assert!(matches!(err, StoreError::Backend { backend: "memory", .. }));
        assert!(matches!(
            backend.write("k", vec![]),
            Err(StoreError::Backend { .. })
        ));
    }

    #[test]
    fn debug_format() {
        let backend = InMemoryBackend::new();
        backend.write("x", vec![]).unwrap();
        let debug = format!("{backend:?}");
        assert!(debug.contains("InMemoryBackend"));
        assert!(debug.contains("record_count: 1"));
    }

    #[test]
    fn default_creates_empty_backend() {
        assert!(InMemoryBackend::default().is_empty());
    }

    // -----------------------------------------------------------------------
    // Conformance
    // -----------------------------------------------------------------------

    #[test]
    fn conformance_json() {
        conformance::run_all(|| store(MarshalFormat::Json));
    }

    #[test]
    fn conformance_bincode() {
        conformance::run_all(|| store(MarshalFormat::Bincode));
    }

    #[test]
    fn concurrent_interactions() {
        conformance::concurrent_interactions(&store(MarshalFormat::Json), 1000);
    }

    #[test]
    fn concurrent_interactions_bincode() {
        conformance::concurrent_interactions(&store(MarshalFormat::Bincode), 200);
    }
}

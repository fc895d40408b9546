//! Sharded concurrent-map backend for kvbridge.
//!
//! [`SyncMapBackend`] keeps records in a [`DashMap`], which locks per shard
//! instead of over the whole map. Writers to different shards never wait on
//! each other, at the cost of the strict whole-map ordering the
//! [`InMemoryBackend`](kvb_store::InMemoryBackend) offers.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use kvb_store::{Backend, MarshalRegistry, Store, StoreError, StoreOptions, StoreResult};
use tracing::debug;

const NAME: &str = "syncmap";

/// A [`Store`] backed by a [`SyncMapBackend`].
pub type SyncMapStore = Store<SyncMapBackend>;

/// Build a store over a fresh [`SyncMapBackend`].
pub fn new_store(options: StoreOptions, registry: Arc<MarshalRegistry>) -> StoreResult<SyncMapStore> {
    Store::new(SyncMapBackend::new(), options, registry)
}

/// In-memory backend on a sharded concurrent map.
///
/// `close` marks the backend closed and clears the map; every later
/// operation answers [`StoreError::Closed`]. A write racing with `close` may
/// land after the clear, but it can never be read back.
#[derive(Default)]
pub struct SyncMapBackend {
    records: DashMap<String, Vec<u8>>,
    closed: AtomicBool,
}

impl SyncMapBackend {
    /// Create a new empty backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records currently stored.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns `true` if no records are stored.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Returns `true` once `close` has been called.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn ensure_open(&self) -> StoreResult<()> {
        if self.is_closed() {
            return Err(StoreError::Closed);
        }
        Ok(())
    }
}

impl Backend for SyncMapBackend {
    fn name(&self) -> &'static str {
        NAME
    }

    fn read(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        self.ensure_open()?;
        // The shard guard lives only for this expression.
        Ok(self.records.get(key).map(|record| record.value().clone()))
    }

    fn write(&self, key: &str, record: Vec<u8>) -> StoreResult<()> {
        self.ensure_open()?;
        self.records.insert(key.to_string(), record);
        Ok(())
    }

    fn delete(&self, key: &str) -> StoreResult<()> {
        self.ensure_open()?;
        self.records.remove(key);
        Ok(())
    }

    fn close(&self) -> StoreResult<()> {
        if !self.closed.swap(true, Ordering::AcqRel) {
            debug!(records = self.records.len(), "syncmap backend closed");
            self.records.clear();
        }
        Ok(())
    }
}

impl fmt::Debug for SyncMapBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncMapBackend")
            .field("record_count", &self.len())
            .field("closed", &self.is_closed())
            .finish()
    }
}

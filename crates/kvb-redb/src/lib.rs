//! Embedded file backend for kvbridge, built on [redb].
//!
//! Records live in a single redb table inside one database file. Each `write`
//! and `delete` commits its own write transaction, so a call that returned
//! `Ok` survives a crash and is visible to a reopened database.
//!
//! ```no_run
//! use std::sync::Arc;
//! use kvb_redb::{RedbBackend, RedbOptions};
//! use kvb_store::{MarshalRegistry, Store, StoreOptions};
//!
//! let backend = RedbBackend::open(&RedbOptions::new("/var/lib/app/kv.redb")).unwrap();
//! let store = Store::new(
//!     backend,
//!     StoreOptions::default(),
//!     Arc::new(MarshalRegistry::with_builtin()),
//! )
//! .unwrap();
//! store.set("foo", "bar").unwrap();
//! ```

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use kvb_store::{Backend, StoreError, StoreResult};
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use serde::{Deserialize, Serialize};
use tracing::debug;

const NAME: &str = "redb";

/// Table used when none is configured.
pub const DEFAULT_TABLE: &str = "kvbridge";

/// Database file used when none is configured.
pub const DEFAULT_PATH: &str = "kvbridge.redb";

/// A store backed by a [`RedbBackend`].
pub type RedbStore = kvb_store::Store<RedbBackend>;

/// Location of the database file and the table inside it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RedbOptions {
    /// Database file; parent directories are created on open.
    pub path: PathBuf,
    /// Table holding the records.
    pub table: String,
}

impl RedbOptions {
    /// Options for the database at `path`, using [`DEFAULT_TABLE`].
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    /// Use `table` instead of [`DEFAULT_TABLE`].
    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = table.into();
        self
    }
}

impl Default for RedbOptions {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_PATH),
            table: DEFAULT_TABLE.to_string(),
        }
    }
}

fn redb_err(err: impl fmt::Display) -> StoreError {
    StoreError::backend(NAME, err)
}

/// redb-backed record storage.
///
/// The database handle sits behind a `RwLock<Option<_>>`: operations share
/// the lock (redb serializes write transactions itself), `close` takes it
/// exclusively and drops the handle, after which every operation answers
/// [`StoreError::Closed`].
pub struct RedbBackend {
    db: RwLock<Option<Database>>,
    path: PathBuf,
    table: String,
}

impl RedbBackend {
    /// Open or create the database described by `options`, making sure the
    /// records table exists.
    pub fn open(options: &RedbOptions) -> StoreResult<Self> {
        let path = options.path.as_path();
        if options.table.is_empty() {
            return Err(StoreError::backend(NAME, "table name must not be empty"));
        }

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                StoreError::backend(
                    NAME,
                    format!("failed to create directory {}: {e}", parent.display()),
                )
            })?;
        }

        let db = Database::create(path).map_err(|e| {
            StoreError::backend(NAME, format!("failed to open {}: {e}", path.display()))
        })?;

        // Create the table up front so reads on a new file find it.
        let txn = db.begin_write().map_err(redb_err)?;
        txn.open_table(Self::definition(&options.table))
            .map_err(redb_err)?;
        txn.commit().map_err(redb_err)?;

        debug!(path = %path.display(), table = %options.table, "redb backend opened");
        Ok(Self {
            db: RwLock::new(Some(db)),
            path: path.to_path_buf(),
            table: options.table.clone(),
        })
    }

    /// Path of the database file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Name of the records table.
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Returns `true` once `close` has been called.
    pub fn is_closed(&self) -> bool {
        self.db
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }

    fn definition(table: &str) -> TableDefinition<'_, &'static str, &'static [u8]> {
        TableDefinition::new(table)
    }

    /// Run `f` against the open database while holding the shared lock.
    fn with_db<T>(&self, f: impl FnOnce(&Database) -> StoreResult<T>) -> StoreResult<T> {
        let guard = self
            .db
            .read()
            .map_err(|e| redb_err(format!("lock poisoned: {e}")))?;
        let db = guard.as_ref().ok_or(StoreError::Closed)?;
        f(db)
    }
}

impl Backend for RedbBackend {
    fn name(&self) -> &'static str {
        NAME
    }

    fn read(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        self.with_db(|db| {
            let txn = db.begin_read().map_err(redb_err)?;
            let table = txn
                .open_table(Self::definition(&self.table))
                .map_err(redb_err)?;
            let record = table.get(key).map_err(redb_err)?;
            Ok(record.map(|guard| guard.value().to_vec()))
        })
    }

    fn write(&self, key: &str, record: Vec<u8>) -> StoreResult<()> {
        self.with_db(|db| {
            let txn = db.begin_write().map_err(redb_err)?;
            {
                let mut table = txn
                    .open_table(Self::definition(&self.table))
                    .map_err(redb_err)?;
                table.insert(key, record.as_slice()).map_err(redb_err)?;
            }
            txn.commit().map_err(redb_err)
        })
    }

    fn delete(&self, key: &str) -> StoreResult<()> {
        self.with_db(|db| {
            let txn = db.begin_write().map_err(redb_err)?;
            {
                let mut table = txn
                    .open_table(Self::definition(&self.table))
                    .map_err(redb_err)?;
                table.remove(key).map_err(redb_err)?;
            }
            txn.commit().map_err(redb_err)
        })
    }

    fn close(&self) -> StoreResult<()> {
        let db = self
            .db
            .write()
            .map_err(|e| redb_err(format!("lock poisoned: {e}")))?
            .take();
        if db.is_some() {
            debug!(path = %self.path.display(), "redb backend closed");
        }
        Ok(())
    }
}

impl fmt::Debug for RedbBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedbBackend")
            .field("path", &self.path)
            .field("table", &self.table)
            .field("closed", &self.is_closed())
            .finish()
    }
}

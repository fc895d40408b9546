//! kvbridge: one key-value store API over interchangeable backends.
//!
//! Pick a backend and a marshal format, build a [`Store`], then `set`, `get`
//! and `delete` typed values. The backend only ever stores encoded records.
//!
//! # Backends
//!
//! | Kind | Type | Storage |
//! |------|------|---------|
//! | `memory` | [`InMemoryBackend`] | `HashMap` behind one `RwLock` |
//! | `syncmap` | [`SyncMapBackend`] | sharded `DashMap` |
//! | `redb` | [`RedbBackend`] | embedded redb database file |
//!
//! # Quick start
//!
//! ```
//! use std::sync::Arc;
//! use kvb::prelude::*;
//!
//! let registry = Arc::new(MarshalRegistry::with_builtin());
//! let config = StoreConfig::from_toml_str(r#"
//!     [options]
//!     marshal_format = "bincode"
//!
//!     [backend]
//!     kind = "syncmap"
//! "#).unwrap();
//!
//! let store = kvb::open(&config, registry).unwrap();
//! store.set("foo", "bar").unwrap();
//! assert_eq!(store.get::<String>("foo").unwrap().as_deref(), Some("bar"));
//! assert_eq!(store.get::<String>("missing").unwrap(), None);
//! store.close().unwrap();
//! ```

pub mod config;

use std::sync::Arc;

use tracing::info;

pub use config::{BackendConfig, ConfigError, ConfigResult, StoreConfig};
pub use kvb_marshal::{
    check_key, check_key_and_value, BoxError, MarshalError, MarshalFormat, MarshalRegistry,
    Marshaller, ValueMarshaller,
};
pub use kvb_redb::{RedbBackend, RedbOptions};
pub use kvb_store::{Backend, InMemoryBackend, Store, StoreError, StoreOptions, StoreResult};
pub use kvb_syncmap::SyncMapBackend;

/// A store whose backend was chosen at runtime.
pub type DynStore = Store<Box<dyn Backend>>;

/// Open the store described by `config`, resolving its format through
/// `registry`.
///
/// The format is checked before the backend is opened, so a bad format
/// never creates a database file.
pub fn open(config: &StoreConfig, registry: Arc<MarshalRegistry>) -> StoreResult<DynStore> {
    let format = &config.options.marshal_format;
    if !registry.is_registered(format) {
        return Err(StoreError::UnsupportedFormat(format!(
            "no marshaller registered for {format}"
        )));
    }

    let backend: Box<dyn Backend> = match &config.backend {
        BackendConfig::Memory => Box::new(InMemoryBackend::new()),
        BackendConfig::SyncMap => Box::new(SyncMapBackend::new()),
        BackendConfig::Redb(options) => Box::new(RedbBackend::open(options)?),
    };
    info!(backend = backend.name(), %format, "opening store");
    Store::new(backend, config.options.clone(), registry)
}

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::config::{BackendConfig, StoreConfig};
    pub use crate::DynStore;
    pub use kvb_marshal::{MarshalFormat, MarshalRegistry, Marshaller, ValueMarshaller};
    pub use kvb_store::{Backend, Store, StoreError, StoreOptions, StoreResult};
}

//! Uniform key-value store contract for kvbridge.
//!
//! A [`Store`] pairs one [`Backend`] with one marshal format. Callers work
//! with typed values; backends only ever see validated keys and encoded
//! records.
//!
//! # Contract
//!
//! - `set(key, value)` validates, marshals, then replaces the record.
//! - `get(key)` returns `Ok(None)` when nothing is stored: absence is not an
//!   error. Decode failures are errors and never disturb the record.
//! - `delete(key)` succeeds whether or not the key exists.
//! - `close()` releases the backend; later operations fail with
//!   [`StoreError::Closed`] and a second `close` is a no-op.
//! - Empty keys fail with [`StoreError::InvalidKey`] and nil values with
//!   [`StoreError::InvalidValue`] before any I/O.
//!
//! # Backends
//!
//! - [`InMemoryBackend`] -- `HashMap` behind a single `RwLock`, the reference
//!   implementation of the locking discipline
//!
//! Other crates in the workspace provide a sharded concurrent map and an
//! embedded file backend. New backends should pass every check in
//! [`conformance`] (feature `testutil`).

pub mod backend;
#[cfg(any(test, feature = "testutil"))]
pub mod conformance;
pub mod error;
pub mod memory;
pub mod options;
pub mod store;

pub use backend::Backend;
pub use error::{StoreError, StoreResult};
pub use memory::{InMemoryBackend, InMemoryStore};
pub use options::StoreOptions;
pub use store::Store;

// Re-exported so backend crates and callers need only one import.
pub use kvb_marshal::{MarshalFormat, MarshalRegistry, Marshaller, ValueMarshaller};

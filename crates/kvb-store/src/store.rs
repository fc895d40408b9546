use std::fmt;
use std::sync::Arc;

use kvb_marshal::{check_key, MarshalFormat, MarshalRegistry};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, trace};

use crate::backend::Backend;
use crate::error::{StoreError, StoreResult};
use crate::options::StoreOptions;

/// A key-value store: one backend plus one marshal format.
///
/// Every operation validates its inputs first, then marshals or unmarshals,
/// then calls into the backend. Encoding and decoding never happen while a
/// backend holds a lock.
///
/// ```
/// use std::sync::Arc;
/// use kvb_marshal::{MarshalFormat, MarshalRegistry};
/// use kvb_store::{InMemoryBackend, Store, StoreOptions};
///
/// let registry = Arc::new(MarshalRegistry::with_builtin());
/// let options = StoreOptions::with_format(MarshalFormat::Bincode);
/// let store = Store::new(InMemoryBackend::new(), options, registry).unwrap();
///
/// store.set("foo", "bar").unwrap();
/// let value: Option<String> = store.get("foo").unwrap();
/// assert_eq!(value.as_deref(), Some("bar"));
/// ```
pub struct Store<B> {
    backend: B,
    format: MarshalFormat,
    registry: Arc<MarshalRegistry>,
}

impl<B: Backend> Store<B> {
    /// Build a store over `backend`.
    ///
    /// Fails with [`StoreError::UnsupportedFormat`] if `registry` has no
    /// marshaller for the requested format.
    pub fn new(
        backend: B,
        options: StoreOptions,
        registry: Arc<MarshalRegistry>,
    ) -> StoreResult<Self> {
        let format = options.marshal_format;
        if !registry.is_registered(&format) {
            return Err(StoreError::UnsupportedFormat(format!(
                "no marshaller registered for {format}"
            )));
        }
        debug!(backend = backend.name(), %format, "store opened");
        Ok(Self {
            backend,
            format,
            registry,
        })
    }

    /// Store `value` under `key`, replacing any previous value.
    pub fn set<T>(&self, key: &str, value: &T) -> StoreResult<()>
    where
        T: Serialize + ?Sized,
    {
        let record = self.registry.marshal(key, value, &self.format)?;
        trace!(
            backend = self.backend.name(),
            key,
            bytes = record.len(),
            "set"
        );
        self.backend.write(key, record)
    }

    /// Fetch the value under `key`.
    ///
    /// Returns `Ok(None)` if nothing is stored there. A record that cannot be
    /// decoded as `T` yields [`StoreError::Unmarshal`] and stays in place.
    pub fn get<T>(&self, key: &str) -> StoreResult<Option<T>>
    where
        T: DeserializeOwned,
    {
        check_key(key)?;
        let Some(record) = self.backend.read(key)? else {
            trace!(backend = self.backend.name(), key, "get: not found");
            return Ok(None);
        };
        trace!(
            backend = self.backend.name(),
            key,
            bytes = record.len(),
            "get"
        );
        let value = self.registry.unmarshal(&self.format, &record)?;
        Ok(Some(value))
    }

    /// Fetch the value under `key` into `out`, returning whether it was
    /// found. `out` is left untouched when the key is absent or decoding
    /// fails.
    pub fn get_into<T>(&self, key: &str, out: &mut T) -> StoreResult<bool>
    where
        T: DeserializeOwned,
    {
        match self.get(key)? {
            Some(value) => {
                *out = value;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Remove the value under `key`. Removing an absent key succeeds.
    pub fn delete(&self, key: &str) -> StoreResult<()> {
        check_key(key)?;
        trace!(backend = self.backend.name(), key, "delete");
        self.backend.delete(key)
    }

    /// Release the backend's resources. Later operations fail with
    /// [`StoreError::Closed`]; closing again is a no-op.
    pub fn close(&self) -> StoreResult<()> {
        debug!(backend = self.backend.name(), "closing store");
        self.backend.close()
    }

    /// The format every record is written and read with.
    pub fn format(&self) -> &MarshalFormat {
        &self.format
    }

    /// The underlying backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// The registry this store resolves its format through.
    pub fn registry(&self) -> &Arc<MarshalRegistry> {
        &self.registry
    }
}

impl<B: Backend> fmt::Debug for Store<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("backend", &self.backend.name())
            .field("format", &self.format)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryBackend;
    use kvb_marshal::{BoxError, Marshaller, ValueMarshaller};
    use proptest::prelude::*;
    use serde::Deserialize;
    use serde_json::Value;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
    struct Foo {
        bar: String,
    }

    fn store(format: MarshalFormat) -> Store<InMemoryBackend> {
        Store::new(
            InMemoryBackend::new(),
            StoreOptions::with_format(format),
            Arc::new(MarshalRegistry::with_builtin()),
        )
        .unwrap()
    }

    /// JSON marshaller that counts records written and read through it.
    #[derive(Clone, Default)]
    struct Counting {
        encoded: Arc<AtomicUsize>,
        decoded: Arc<AtomicUsize>,
    }

    impl ValueMarshaller for Counting {
        fn marshal(&self, _key: &str, value: &Value) -> Result<Vec<u8>, BoxError> {
            self.encoded.fetch_add(1, Ordering::SeqCst);
            Ok(serde_json::to_vec(value)?)
        }

        fn unmarshal(&self, data: &[u8]) -> Result<Value, BoxError> {
            self.decoded.fetch_add(1, Ordering::SeqCst);
            Ok(serde_json::from_slice(data)?)
        }
    }

    #[test]
    fn unregistered_format_is_rejected_at_construction() {
        let err = Store::new(
            InMemoryBackend::new(),
            StoreOptions::with_format(MarshalFormat::custom("xml")),
            Arc::new(MarshalRegistry::with_builtin()),
        )
        .unwrap_err();
        assert!(matches!(err, StoreError::UnsupportedFormat(_)));
    }

    #[test]
    fn empty_registry_rejects_default_format() {
        let err = Store::new(
            InMemoryBackend::new(),
            StoreOptions::default(),
            Arc::new(MarshalRegistry::new()),
        )
        .unwrap_err();
        assert!(matches!(err, StoreError::UnsupportedFormat(_)));
    }

    #[test]
    fn foo_bar_for_both_formats() {
        for format in [MarshalFormat::Json, MarshalFormat::Bincode] {
            let store = store(format);
            store.set("foo", "bar").unwrap();
            let mut s = String::new();
            assert!(store.get_into("foo", &mut s).unwrap());
            assert_eq!(s, "bar");
        }
    }

    #[test]
    fn records_use_the_store_format() {
        let store = store(MarshalFormat::Json);
        store.set("foo", &Foo { bar: "baz".into() }).unwrap();
        let raw = store.backend().read("foo").unwrap().unwrap();
        assert_eq!(raw, br#"{"bar":"baz"}"#);
    }

    #[test]
    fn get_into_leaves_target_alone_on_miss() {
        let store = store(MarshalFormat::Json);
        let mut foo = Foo { bar: "keep".into() };
        assert!(!store.get_into("missing", &mut foo).unwrap());
        assert_eq!(foo.bar, "keep");
    }

    #[test]
    fn format_mismatch_does_not_discard_record() {
        let registry = Arc::new(MarshalRegistry::with_builtin());
        let backend = Arc::new(InMemoryBackend::new());
        let writer = Store::new(
            Arc::clone(&backend),
            StoreOptions::with_format(MarshalFormat::Bincode),
            Arc::clone(&registry),
        )
        .unwrap();
        let reader = Store::new(
            Arc::clone(&backend),
            StoreOptions::with_format(MarshalFormat::Json),
            registry,
        )
        .unwrap();

        writer.set("foo", &Foo { bar: "baz".into() }).unwrap();
        let mut out = Foo::default();
        let err = reader.get_into("foo", &mut out).unwrap_err();
        assert!(matches!(err, StoreError::Unmarshal { .. }));
        assert_eq!(out, Foo::default());

        let still_there: Option<Foo> = writer.get("foo").unwrap();
        assert_eq!(still_there, Some(Foo { bar: "baz".into() }));
    }

    #[test]
    fn custom_format_is_used_for_both_directions() {
        let counting = Counting::default();
        let registry = Arc::new(MarshalRegistry::with_builtin());
        let format = MarshalFormat::custom("counting");
        registry.register(format.clone(), Marshaller::custom(counting.clone()));

        let store = Store::new(
            InMemoryBackend::new(),
            StoreOptions::with_format(format),
            registry,
        )
        .unwrap();
        store.set("foo", &Foo { bar: "baz".into() }).unwrap();
        let back: Option<Foo> = store.get("foo").unwrap();
        assert_eq!(back, Some(Foo { bar: "baz".into() }));
        assert_eq!(counting.encoded.load(Ordering::SeqCst), 1);
        assert_eq!(counting.decoded.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn validation_runs_before_backend() {
        let store = store(MarshalFormat::Json);
        store.close().unwrap();
        // Closed backend would answer `Closed`; validation must fire first.
        assert!(matches!(store.set("", "v"), Err(StoreError::InvalidKey(_))));
        assert!(matches!(
            store.get::<String>(""),
            Err(StoreError::InvalidKey(_))
        ));
        assert!(matches!(store.delete(""), Err(StoreError::InvalidKey(_))));
        assert!(matches!(
            store.set("k", &None::<u8>),
            Err(StoreError::InvalidValue(_))
        ));
    }

    #[test]
    fn non_finite_and_nested_none_store_under_bincode() {
        let store = store(MarshalFormat::Bincode);
        store.set("inf", &f64::INFINITY).unwrap();
        assert_eq!(store.get::<f64>("inf").unwrap(), Some(f64::INFINITY));

        store.set("nan", &f64::NAN).unwrap();
        assert!(store.get::<f64>("nan").unwrap().is_some_and(f64::is_nan));

        store.set("inner", &Some(None::<u8>)).unwrap();
        assert_eq!(
            store.get::<Option<Option<u8>>>("inner").unwrap(),
            Some(Some(None))
        );
    }

    #[test]
    fn boxed_backend() {
        let backend: Box<dyn Backend> = Box::new(InMemoryBackend::new());
        let store = Store::new(
            backend,
            StoreOptions::default(),
            Arc::new(MarshalRegistry::default()),
        )
        .unwrap();
        store.set("n", &42u64).unwrap();
        assert_eq!(store.get::<u64>("n").unwrap(), Some(42));
    }

    #[test]
    fn debug_format() {
        let debug = format!("{:?}", store(MarshalFormat::Bincode));
        assert!(debug.contains("memory"));
        assert!(debug.contains("Bincode"));
    }

    proptest! {
        #[test]
        fn any_string_round_trips(key in ".+", value in ".*", binary in any::<bool>()) {
            let format = if binary { MarshalFormat::Bincode } else { MarshalFormat::Json };
            let store = store(format);
            store.set(&key, &value).unwrap();
            let back: Option<String> = store.get(&key).unwrap();
            prop_assert_eq!(back, Some(value));
        }

        #[test]
        fn any_vec_round_trips(key in ".+", value in prop::collection::vec(any::<i64>(), 0..64)) {
            let store = store(MarshalFormat::Bincode);
            store.set(&key, &value).unwrap();
            let back: Option<Vec<i64>> = store.get(&key).unwrap();
            prop_assert_eq!(back, Some(value));
        }
    }

    #[test]
    fn store_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Store<InMemoryBackend>>();
        assert_send_sync::<Store<Box<dyn Backend>>>();
    }
}

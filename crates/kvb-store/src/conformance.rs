//! Conformance checks for [`Backend`] implementations.
//!
//! Each check drives a [`Store`] through its public API and panics on the
//! first violated expectation. Backend crates enable the `testutil` feature
//! and run the suite against a fresh store per format:
//!
//! ```ignore
//! use kvb_store::conformance;
//!
//! #[test]
//! fn conformance_json() {
//!     conformance::run_all(|| make_store(MarshalFormat::Json));
//! }
//! ```
//!
//! | Check | Contract aspect |
//! |-------|-----------------|
//! | `example_foo_bar` | `set("foo", "bar")` reads back as `"bar"` |
//! | `struct_lifecycle` | set / overwrite / delete of a struct value |
//! | `value_types` | round trip of scalar, collection and nested types |
//! | `missing_key_is_not_an_error` | absence is `Ok(None)` |
//! | `delete_is_idempotent` | deleting absent keys succeeds |
//! | `empty_key_is_rejected` | key validation on every operation |
//! | `nil_value_is_rejected` | value validation on `set` |
//! | `failed_read_keeps_record` | decode failures do not touch storage |
//! | `close_fresh_store` | `close` on a new store succeeds |
//! | `closed_store_fails_fast` | operations after `close` return `Closed` |
//! | `concurrent_interactions` | many threads, overlapping keys, no torn values |

use std::collections::{BTreeMap, HashMap};
use std::fmt::Debug;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::de::DeserializeOwned;
use kvb_marshal::MarshalFormat;
use serde::{Deserialize, Serialize};

use crate::backend::Backend;
use crate::error::StoreError;
use crate::store::Store;

/// Simple struct value used throughout the checks.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Foo {
    pub bar: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
enum Shape {
    Circle { radius: u32 },
    Square(u32),
    Empty,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
struct Nested {
    id: u64,
    tags: Vec<String>,
    parent: Option<Box<Foo>>,
    shape: Shape,
    scores: BTreeMap<String, i32>,
}

/// Run every single-threaded check, each against a fresh store from `make`.
pub fn run_all<B, F>(make: F)
where
    B: Backend,
    F: Fn() -> Store<B>,
{
    example_foo_bar(&make());
    struct_lifecycle(&make());
    value_types(&make());
    missing_key_is_not_an_error(&make());
    delete_is_idempotent(&make());
    empty_key_is_rejected(&make());
    nil_value_is_rejected(&make());
    failed_read_keeps_record(&make());
    close_fresh_store(&make());
    closed_store_fails_fast(&make());
}

/// Set `value` under `key` and assert it reads back equal, both through
/// `get` and `get_into`.
pub fn assert_round_trip<B, T>(store: &Store<B>, key: &str, value: &T)
where
    B: Backend,
    T: Serialize + DeserializeOwned + PartialEq + Debug + Default,
{
    store.set(key, value).expect("set should succeed");
    let got: Option<T> = store.get(key).expect("get should succeed");
    assert_eq!(got.as_ref(), Some(value), "round trip of {key:?}");

    let mut out = T::default();
    let found = store.get_into(key, &mut out).expect("get_into should succeed");
    assert!(found, "{key:?} should be found");
    assert_eq!(&out, value, "get_into of {key:?}");
}

/// `set("foo", "bar")` then `get("foo")` yields `"bar"`.
pub fn example_foo_bar<B: Backend>(store: &Store<B>) {
    store.set("foo", "bar").expect("set should succeed");
    let mut s = String::new();
    let found = store.get_into("foo", &mut s).expect("get should succeed");
    assert!(found);
    assert_eq!(s, "bar");
}

/// Create, read, overwrite and delete a struct value.
pub fn struct_lifecycle<B: Backend>(store: &Store<B>) {
    let created = Foo { bar: "baz".into() };
    assert_round_trip(store, "lifecycle", &created);

    let updated = Foo { bar: "qux".into() };
    assert_round_trip(store, "lifecycle", &updated);

    store.delete("lifecycle").expect("delete should succeed");
    let gone: Option<Foo> = store.get("lifecycle").expect("get after delete");
    assert_eq!(gone, None, "deleted key should be absent");
}

/// Round trip a spread of value types.
pub fn value_types<B: Backend>(store: &Store<B>) {
    assert_round_trip(store, "string", &"hello, world".to_string());
    assert_round_trip(store, "unicode", &"grüße 🌍".to_string());
    assert_round_trip(store, "empty-string", &String::new());
    assert_round_trip(store, "bool", &true);
    assert_round_trip(store, "u8", &u8::MAX);
    assert_round_trip(store, "i64", &i64::MIN);
    assert_round_trip(store, "u64", &u64::MAX);
    assert_round_trip(store, "f64", &3.5f64);
    assert_round_trip(store, "char", &'z');
    assert_round_trip(store, "bytes", &vec![0u8, 1, 2, 255]);
    assert_round_trip(store, "strings", &vec!["a".to_string(), "b".to_string()]);
    assert_round_trip(store, "tuple", &(7u16, "seven".to_string()));
    assert_round_trip(store, "some", &Some(42i32));

    // Inner `None` is content, not a nil value. Text formats collapse it to
    // an outer `None` on the way back.
    store
        .set("some-none", &Some(None::<u8>))
        .expect("Some(None) is not nil");
    let got: Option<Option<Option<u8>>> = store.get("some-none").expect("get some-none");
    assert!(got.is_some(), "some-none should be stored");

    // Non-finite floats have no JSON form; the binary format keeps them.
    if store.format() == &MarshalFormat::Bincode {
        assert_round_trip(store, "infinity", &f64::INFINITY);
        assert_round_trip(store, "nested-none", &Some(None::<u8>));
        store.set("nan", &f64::NAN).expect("NaN is not nil");
        let nan: Option<f64> = store.get("nan").expect("get nan");
        assert!(nan.is_some_and(f64::is_nan));
    }

    let mut map = HashMap::new();
    map.insert("one".to_string(), 1i32);
    map.insert("two".to_string(), 2i32);
    assert_round_trip(store, "map", &map);

    let nested = Nested {
        id: 9,
        tags: vec!["x".into(), "y".into()],
        parent: Some(Box::new(Foo { bar: "root".into() })),
        shape: Shape::Circle { radius: 4 },
        scores: BTreeMap::from([("a".to_string(), -1), ("b".to_string(), 2)]),
    };
    let got: Option<Nested> = {
        store.set("nested", &nested).expect("set nested");
        store.get("nested").expect("get nested")
    };
    assert_eq!(got, Some(nested));

    for shape in [Shape::Square(3), Shape::Empty] {
        store.set("shape", &shape).expect("set shape");
        let got: Option<Shape> = store.get("shape").expect("get shape");
        assert_eq!(got, Some(shape));
    }
}

/// Reading a key that was never written succeeds with nothing.
pub fn missing_key_is_not_an_error<B: Backend>(store: &Store<B>) {
    let got: Option<Foo> = store.get("never-written").expect("get should not error");
    assert_eq!(got, None);

    let mut out = Foo { bar: "untouched".into() };
    let found = store
        .get_into("never-written", &mut out)
        .expect("get_into should not error");
    assert!(!found);
    assert_eq!(out.bar, "untouched");
}

/// Deleting absent keys succeeds, repeatedly.
pub fn delete_is_idempotent<B: Backend>(store: &Store<B>) {
    store.delete("ghost").expect("delete of absent key");
    store.delete("ghost").expect("second delete of absent key");

    store.set("once", &1u8).expect("set");
    store.delete("once").expect("delete");
    store.delete("once").expect("delete again");
    assert_eq!(store.get::<u8>("once").expect("get"), None);
}

/// Every operation refuses an empty key.
pub fn empty_key_is_rejected<B: Backend>(store: &Store<B>) {
    let err = store.set("", "bar").expect_err("set with empty key");
    assert!(matches!(err, StoreError::InvalidKey(_)), "got {err:?}");

    let err = store.get::<String>("").expect_err("get with empty key");
    assert!(matches!(err, StoreError::InvalidKey(_)), "got {err:?}");

    let mut out = String::new();
    let err = store.get_into("", &mut out).expect_err("get_into with empty key");
    assert!(matches!(err, StoreError::InvalidKey(_)), "got {err:?}");

    let err = store.delete("").expect_err("delete with empty key");
    assert!(matches!(err, StoreError::InvalidKey(_)), "got {err:?}");
}

/// `set` refuses values without content.
pub fn nil_value_is_rejected<B: Backend>(store: &Store<B>) {
    let err = store.set("foo", &None::<Foo>).expect_err("set None");
    assert!(matches!(err, StoreError::InvalidValue(_)), "got {err:?}");

    let err = store.set("foo", &()).expect_err("set unit");
    assert!(matches!(err, StoreError::InvalidValue(_)), "got {err:?}");

    let nothing: Option<Foo> = store.get("foo").expect("get");
    assert_eq!(nothing, None, "rejected set must not write");
}

/// A record that cannot be decoded as the requested type stays readable.
pub fn failed_read_keeps_record<B: Backend>(store: &Store<B>) {
    store.set("flag", &true).expect("set");

    let mut out = Foo { bar: "untouched".into() };
    let err = store
        .get_into("flag", &mut out)
        .expect_err("bool should not decode as Foo");
    assert!(matches!(err, StoreError::Unmarshal { .. }), "got {err:?}");
    assert_eq!(out.bar, "untouched");

    let flag: Option<bool> = store.get("flag").expect("get stored flag");
    assert_eq!(flag, Some(true));
}

/// `close` on a freshly built store returns no error.
pub fn close_fresh_store<B: Backend>(store: &Store<B>) {
    store.close().expect("close should succeed");
}

/// After `close`, operations fail with `Closed` and `close` stays a no-op.
pub fn closed_store_fails_fast<B: Backend>(store: &Store<B>) {
    store.set("foo", "bar").expect("set before close");
    store.close().expect("close");

    let err = store.set("foo", "baz").expect_err("set after close");
    assert!(err.is_closed(), "got {err:?}");
    let err = store.get::<String>("foo").expect_err("get after close");
    assert!(err.is_closed(), "got {err:?}");
    let err = store.delete("foo").expect_err("delete after close");
    assert!(err.is_closed(), "got {err:?}");

    store.close().expect("second close");
}

/// Launch `workers` threads that each run randomized `set`/`get`/`delete`
/// calls on a small shared key space, then verify their own private key.
///
/// Shared-key reads must always decode to a value some worker wrote. A
/// worker's private key, written and read with no other writer, must read
/// back exactly.
pub fn concurrent_interactions<B: Backend>(store: &Store<B>, workers: usize) {
    const SHARED_KEYS: usize = 8;
    const OPS_PER_WORKER: usize = 20;

    std::thread::scope(|scope| {
        for worker in 0..workers {
            scope.spawn(move || {
                let mut rng = StdRng::seed_from_u64(worker as u64);
                for op in 0..OPS_PER_WORKER {
                    let key = format!("shared-{}", rng.gen_range(0..SHARED_KEYS));
                    match rng.gen_range(0..3) {
                        0 => {
                            let value = Foo {
                                bar: format!("worker-{worker}-op-{op}"),
                            };
                            store.set(&key, &value).expect("concurrent set");
                        }
                        1 => {
                            let got: Option<Foo> = store.get(&key).expect("concurrent get");
                            if let Some(foo) = got {
                                assert!(
                                    foo.bar.starts_with("worker-"),
                                    "torn value under {key}: {foo:?}"
                                );
                            }
                        }
                        _ => store.delete(&key).expect("concurrent delete"),
                    }
                }

                let own_key = format!("own-{worker}");
                let own = Foo {
                    bar: format!("worker-{worker}"),
                };
                store.set(&own_key, &own).expect("set own key");
                let got: Option<Foo> = store.get(&own_key).expect("get own key");
                assert_eq!(got.as_ref(), Some(&own), "own key of worker {worker}");
            });
        }
    });

    for worker in 0..workers {
        let got: Option<Foo> = store.get(&format!("own-{worker}")).expect("final get");
        assert_eq!(
            got.map(|foo| foo.bar),
            Some(format!("worker-{worker}")),
            "own key of worker {worker} after join"
        );
    }
}

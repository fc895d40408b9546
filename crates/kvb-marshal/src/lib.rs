//! Marshalling layer for kvbridge stores.
//!
//! Every store persists values as encoded records. This crate decides how a
//! value becomes a record and back again, and enforces the input rules that
//! every backend shares.
//!
//! # Formats
//!
//! - [`MarshalFormat::Json`] -- textual structured format (the default)
//! - [`MarshalFormat::Bincode`] -- compact binary format
//! - [`MarshalFormat::Custom`] -- any named format registered at startup
//!
//! # Registry
//!
//! A [`MarshalRegistry`] maps formats to [`Marshaller`] strategies. It is an
//! explicit value: build one (usually [`MarshalRegistry::with_builtin`]),
//! register extra formats, wrap it in an `Arc` and hand it to every store
//! that should share that format set.
//!
//! ```
//! use kvb_marshal::{MarshalFormat, MarshalRegistry};
//!
//! let registry = MarshalRegistry::with_builtin();
//! let bytes = registry.marshal("greeting", "hello", &MarshalFormat::Json).unwrap();
//! assert_eq!(bytes, b"\"hello\"");
//!
//! let back: String = registry.unmarshal(&MarshalFormat::Json, &bytes).unwrap();
//! assert_eq!(back, "hello");
//! ```
//!
//! # Validation
//!
//! [`check_key`] and [`check_key_and_value`] run before any encoding or I/O.
//! Keys must be non-empty; values must not be nil (`None`, `()`, unit
//! structs).

pub mod error;
pub mod format;
pub mod marshaller;
pub mod registry;
pub mod validation;

pub use error::{MarshalError, Result};
pub use format::MarshalFormat;
pub use marshaller::{BoxError, Marshaller, ValueMarshaller};
pub use registry::MarshalRegistry;
pub use validation::{check_key, check_key_and_value, is_nil};

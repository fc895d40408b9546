//! Input preconditions shared by every backend.
//!
//! These checks are pure: they never touch storage and never fully encode a
//! value.

use std::fmt;

use serde::ser::{self, Impossible, Serialize, Serializer};

use crate::error::{MarshalError, Result};

/// Reject empty keys.
pub fn check_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(MarshalError::InvalidKey("key must not be empty".into()));
    }
    Ok(())
}

/// Reject empty keys, then nil values.
pub fn check_key_and_value<T>(key: &str, value: &T) -> Result<()>
where
    T: Serialize + ?Sized,
{
    check_key(key)?;
    if is_nil(value) {
        return Err(MarshalError::InvalidValue(format!(
            "value for key {key:?} must not be nil"
        )));
    }
    Ok(())
}

/// Returns `true` when `value` has no content of its own: `None`, `()` or a
/// unit struct.
///
/// Only the outermost serialize call is inspected, so `Some(None)`, NaN and
/// infinities are values like any other. Compound values stop the probe at
/// their first call without visiting their fields.
pub fn is_nil<T>(value: &T) -> bool
where
    T: Serialize + ?Sized,
{
    value.serialize(NilProbe).unwrap_or(false)
}

/// Raised by [`NilProbe`] for values that are compound and therefore not nil.
#[derive(Debug)]
struct NotNil;

impl fmt::Display for NotNil {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("value is not nil")
    }
}

impl std::error::Error for NotNil {}

impl ser::Error for NotNil {
    fn custom<M: fmt::Display>(_msg: M) -> Self {
        NotNil
    }
}

/// Serializer answering whether the top-level value is nil.
struct NilProbe;

impl Serializer for NilProbe {
    type Ok = bool;
    type Error = NotNil;
    type SerializeSeq = Impossible<bool, NotNil>;
    type SerializeTuple = Impossible<bool, NotNil>;
    type SerializeTupleStruct = Impossible<bool, NotNil>;
    type SerializeTupleVariant = Impossible<bool, NotNil>;
    type SerializeMap = Impossible<bool, NotNil>;
    type SerializeStruct = Impossible<bool, NotNil>;
    type SerializeStructVariant = Impossible<bool, NotNil>;

    fn serialize_none(self) -> std::result::Result<bool, NotNil> {
        Ok(true)
    }

    fn serialize_unit(self) -> std::result::Result<bool, NotNil> {
        Ok(true)
    }

    fn serialize_unit_struct(self, _name: &'static str) -> std::result::Result<bool, NotNil> {
        Ok(true)
    }

    fn serialize_some<T: Serialize + ?Sized>(
        self,
        _value: &T,
    ) -> std::result::Result<bool, NotNil> {
        Ok(false)
    }

    fn serialize_bool(self, _v: bool) -> std::result::Result<bool, NotNil> {
        Ok(false)
    }

    fn serialize_i8(self, _v: i8) -> std::result::Result<bool, NotNil> {
        Ok(false)
    }

    fn serialize_i16(self, _v: i16) -> std::result::Result<bool, NotNil> {
        Ok(false)
    }

    fn serialize_i32(self, _v: i32) -> std::result::Result<bool, NotNil> {
        Ok(false)
    }

    fn serialize_i64(self, _v: i64) -> std::result::Result<bool, NotNil> {
        Ok(false)
    }

    fn serialize_i128(self, _v: i128) -> std::result::Result<bool, NotNil> {
        Ok(false)
    }

    fn serialize_u8(self, _v: u8) -> std::result::Result<bool, NotNil> {
        Ok(false)
    }

    fn serialize_u16(self, _v: u16) -> std::result::Result<bool, NotNil> {
        Ok(false)
    }

    fn serialize_u32(self, _v: u32) -> std::result::Result<bool, NotNil> {
        Ok(false)
    }

    fn serialize_u64(self, _v: u64) -> std::result::Result<bool, NotNil> {
        Ok(false)
    }

    fn serialize_u128(self, _v: u128) -> std::result::Result<bool, NotNil> {
        Ok(false)
    }

    fn serialize_f32(self, _v: f32) -> std::result::Result<bool, NotNil> {
        Ok(false)
    }

    fn serialize_f64(self, _v: f64) -> std::result::Result<bool, NotNil> {
        Ok(false)
    }

    fn serialize_char(self, _v: char) -> std::result::Result<bool, NotNil> {
        Ok(false)
    }

    fn serialize_str(self, _v: &str) -> std::result::Result<bool, NotNil> {
        Ok(false)
    }

    fn serialize_bytes(self, _v: &[u8]) -> std::result::Result<bool, NotNil> {
        Ok(false)
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
    ) -> std::result::Result<bool, NotNil> {
        Ok(false)
    }

    fn serialize_newtype_struct<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        _value: &T,
    ) -> std::result::Result<bool, NotNil> {
        Ok(false)
    }

    fn serialize_newtype_variant<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
        _value: &T,
    ) -> std::result::Result<bool, NotNil> {
        Ok(false)
    }

    fn serialize_seq(self, _len: Option<usize>) -> std::result::Result<Self::SerializeSeq, NotNil> {
        Err(NotNil)
    }

    fn serialize_tuple(self, _len: usize) -> std::result::Result<Self::SerializeTuple, NotNil> {
        Err(NotNil)
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> std::result::Result<Self::SerializeTupleStruct, NotNil> {
        Err(NotNil)
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> std::result::Result<Self::SerializeTupleVariant, NotNil> {
        Err(NotNil)
    }

    fn serialize_map(self, _len: Option<usize>) -> std::result::Result<Self::SerializeMap, NotNil> {
        Err(NotNil)
    }

    fn serialize_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> std::result::Result<Self::SerializeStruct, NotNil> {
        Err(NotNil)
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> std::result::Result<Self::SerializeStructVariant, NotNil> {
        Err(NotNil)
    }
}

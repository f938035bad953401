//! Canonical grouping and join keys.
//!
//! A `Key` is the structural identity of a `Value`: two values land in the
//! same group (or match in a join) exactly when their keys are equal.

use crate::value::Value;
use alloc::string::String;
use alloc::vec::Vec;

/// Bit pattern shared by every NaN key.
const CANONICAL_NAN: u64 = 0x7ff8_0000_0000_0000;

/// Tagged canonical key with derived structural equality and hashing.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Key {
    Null,
    Bool(bool),
    Int(i64),
    /// Non-integral float, stored as canonical bits.
    Float(u64),
    Str(String),
    /// Timestamp in milliseconds.
    Date(i64),
    Bytes(Vec<u8>),
    List(Vec<Key>),
    /// Entries sorted by name.
    Map(Vec<(String, Key)>),
    /// Composite key over several columns.
    Tuple(Vec<Key>),
}

impl Key {
    /// Builds a composite key from per-column values.
    pub fn composite(values: &[Value]) -> Key {
        if values.len() == 1 {
            Key::from(&values[0])
        } else {
            Key::Tuple(values.iter().map(Key::from).collect())
        }
    }

    /// Returns true for Null, NaN, or a composite containing either.
    ///
    /// Missing keys are ordinary groups but never match in joins.
    pub fn is_missing(&self) -> bool {
        match self {
            Key::Null => true,
            Key::Float(bits) => *bits == CANONICAL_NAN,
            Key::Tuple(parts) => parts.iter().any(Key::is_missing),
            _ => false,
        }
    }

    fn from_float(f: f64) -> Key {
        if f.is_nan() {
            Key::Float(CANONICAL_NAN)
        } else if f == 0.0 {
            // -0.0 and 0.0 are one key
            Key::Int(0)
        } else if (f - libm::trunc(f)) == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 {
            Key::Int(f as i64)
        } else {
            Key::Float(f.to_bits())
        }
    }
}

impl From<&Value> for Key {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => Key::Null,
            Value::Boolean(b) => Key::Bool(*b),
            Value::Int64(i) => Key::Int(*i),
            Value::Float64(f) => Key::from_float(*f),
            Value::String(s) => Key::Str(s.clone()),
            Value::DateTime(d) => Key::Date(*d),
            Value::Bytes(b) => Key::Bytes(b.clone()),
            Value::Array(items) => Key::List(items.iter().map(Key::from).collect()),
            Value::Object(map) => Key::Map(
                map.iter()
                    .map(|(k, v)| (k.clone(), Key::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<Value> for Key {
    fn from(value: Value) -> Self {
        Key::from(&value)
    }
}

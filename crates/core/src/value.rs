//! Value type definitions for Verba.
//!
//! This module defines the `Value` enum which represents any value that can be stored
//! in a column cell.

use alloc::collections::BTreeMap;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::cmp::Ordering;
use core::fmt;
use core::hash::{Hash, Hasher};

/// A value that can be stored in a column cell.
#[derive(Clone, Debug, Default)]
pub enum Value {
    /// Missing value
    #[default]
    Null,
    /// Boolean value
    Boolean(bool),
    /// 64-bit signed integer
    Int64(i64),
    /// 64-bit floating point
    Float64(f64),
    /// UTF-8 string
    String(String),
    /// DateTime stored as Unix timestamp in milliseconds
    DateTime(i64),
    /// Binary data
    Bytes(Vec<u8>),
    /// Ordered list of values
    Array(Vec<Value>),
    /// String-keyed map of values
    Object(BTreeMap<String, Value>),
}

impl Value {
    /// Returns true if this value is Null.
    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns true if this value takes part in aggregation.
    ///
    /// Null and NaN are both invalid; NaN is the sentinel used to make an
    /// aggregate skip a row without a second filtering pass.
    #[inline]
    pub fn is_valid(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Float64(f) => !f.is_nan(),
            _ => true,
        }
    }

    /// Returns the NaN sentinel.
    #[inline]
    pub fn nan() -> Self {
        Value::Float64(f64::NAN)
    }

    /// Returns the boolean value if this is a Boolean, None otherwise.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the i64 value if this is an Int64, None otherwise.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int64(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the f64 value if this is a Float64, None otherwise.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float64(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns a reference to the string if this is a String, None otherwise.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(v) => Some(v.as_str()),
            _ => None,
        }
    }

    /// Returns the datetime timestamp if this is a DateTime, None otherwise.
    pub fn as_datetime(&self) -> Option<i64> {
        match self {
            Value::DateTime(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns a reference to the elements if this is an Array, None otherwise.
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(v) => Some(v.as_slice()),
            _ => None,
        }
    }

    /// Numeric view of this value used by arithmetic aggregates.
    ///
    /// Booleans count as 0/1, datetimes as their timestamp and strings are
    /// parsed; anything else is NaN.
    pub fn as_number(&self) -> f64 {
        match self {
            Value::Int64(v) => *v as f64,
            Value::Float64(v) => *v,
            Value::Boolean(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            Value::DateTime(d) => *d as f64,
            Value::String(s) => s.trim().parse::<f64>().unwrap_or(f64::NAN),
            _ => f64::NAN,
        }
    }

    /// Interprets this value as a sequence: arrays yield their elements,
    /// Null yields nothing and any other value is a one-element sequence.
    pub fn to_array(&self) -> Vec<Value> {
        match self {
            Value::Null => Vec::new(),
            Value::Array(items) => items.clone(),
            other => alloc::vec![other.clone()],
        }
    }

    /// Truthiness used when a value acts as a predicate result.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Boolean(b) => *b,
            Value::Int64(i) => *i != 0,
            Value::Float64(f) => *f != 0.0 && !f.is_nan(),
            Value::String(s) => !s.is_empty(),
            _ => true,
        }
    }

    /// Returns a type ordering value for comparing different types.
    fn type_order(&self) -> u8 {
        match self {
            Value::Null => 0,
            Value::Boolean(_) => 1,
            Value::Int64(_) | Value::Float64(_) => 2,
            Value::String(_) => 3,
            Value::DateTime(_) => 4,
            Value::Bytes(_) => 5,
            Value::Array(_) => 6,
            Value::Object(_) => 7,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Int64(a), Value::Int64(b)) => a == b,
            (Value::Float64(a), Value::Float64(b)) => {
                // Handle NaN comparison
                if a.is_nan() && b.is_nan() {
                    true
                } else {
                    a == b
                }
            }
            (Value::String(a), Value::String(b)) => a == b,
            (Value::DateTime(a), Value::DateTime(b)) => a == b,
            (Value::Bytes(a), Value::Bytes(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        core::mem::discriminant(self).hash(state);
        match self {
            Value::Null => {}
            Value::Boolean(b) => b.hash(state),
            Value::Int64(i) => i.hash(state),
            Value::Float64(f) => f.to_bits().hash(state),
            Value::String(s) => s.hash(state),
            Value::DateTime(d) => d.hash(state),
            Value::Bytes(b) => b.hash(state),
            Value::Array(items) => items.hash(state),
            Value::Object(map) => {
                for (k, v) in map {
                    k.hash(state);
                    v.hash(state);
                }
            }
        }
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Value::Null, Value::Null) => Ordering::Equal,
            (Value::Null, _) => Ordering::Less,
            (_, Value::Null) => Ordering::Greater,
            (Value::Boolean(a), Value::Boolean(b)) => a.cmp(b),
            (Value::Int64(a), Value::Int64(b)) => a.cmp(b),
            // Cross-type numeric comparisons
            (Value::Int64(a), Value::Float64(b)) => {
                let a_f64 = *a as f64;
                if b.is_nan() {
                    Ordering::Less
                } else {
                    a_f64.partial_cmp(b).unwrap_or(Ordering::Equal)
                }
            }
            (Value::Float64(a), Value::Int64(b)) => {
                let b_f64 = *b as f64;
                if a.is_nan() {
                    Ordering::Greater
                } else {
                    a.partial_cmp(&b_f64).unwrap_or(Ordering::Equal)
                }
            }
            (Value::Float64(a), Value::Float64(b)) => {
                // Handle NaN: treat NaN as greater than all other values
                match (a.is_nan(), b.is_nan()) {
                    (true, true) => Ordering::Equal,
                    (true, false) => Ordering::Greater,
                    (false, true) => Ordering::Less,
                    (false, false) => a.partial_cmp(b).unwrap_or(Ordering::Equal),
                }
            }
            (Value::String(a), Value::String(b)) => a.cmp(b),
            (Value::DateTime(a), Value::DateTime(b)) => a.cmp(b),
            (Value::Bytes(a), Value::Bytes(b)) => a.cmp(b),
            (Value::Array(a), Value::Array(b)) => a.cmp(b),
            (Value::Object(a), Value::Object(b)) => a.iter().cmp(b.iter()),
            // Different types: order by type discriminant
            _ => self.type_order().cmp(&other.type_order()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Int64(i) => write!(f, "{}", i),
            Value::Float64(v) => {
                if v.is_nan() {
                    write!(f, "NaN")
                } else {
                    write!(f, "{}", v)
                }
            }
            Value::String(s) => write!(f, "{}", s),
            Value::DateTime(d) => write!(f, "{}", d),
            Value::Bytes(b) => write!(f, "{:?}", b),
            Value::Array(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{}", item)?;
                }
                Ok(())
            }
            Value::Object(_) => write!(f, "[object]"),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int64(v as i64)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int64(v)
    }
}

impl From<usize> for Value {
    fn from(v: usize) -> Self {
        Value::Int64(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float64(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::Array(v)
    }
}

impl<T> From<Option<T>> for Value
where
    T: Into<Value>,
{
    fn from(v: Option<T>) -> Self {
        match v {
            Some(val) => val.into(),
            None => Value::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::format;
    use alloc::vec;

    #[test]
    fn test_value_null() {
        let v = Value::Null;
        assert!(v.is_null());
        assert!(!v.is_valid());
    }

    #[test]
    fn test_value_validity() {
        assert!(!Value::nan().is_valid());
        assert!(Value::Float64(0.0).is_valid());
        assert!(Value::String(String::new()).is_valid());
        assert!(Value::Array(Vec::new()).is_valid());
    }

    #[test]
    fn test_value_accessors() {
        assert_eq!(Value::Boolean(true).as_bool(), Some(true));
        assert_eq!(Value::Int64(100).as_i64(), Some(100));
        assert_eq!(Value::Float64(3.5).as_f64(), Some(3.5));
        assert_eq!(Value::String("hello".into()).as_str(), Some("hello"));
        assert_eq!(Value::DateTime(1234567890).as_datetime(), Some(1234567890));
        assert_eq!(
            Value::Array(vec![Value::Int64(1)]).as_array(),
            Some(&[Value::Int64(1)][..])
        );
    }

    #[test]
    fn test_as_number() {
        assert_eq!(Value::Int64(3).as_number(), 3.0);
        assert_eq!(Value::Boolean(true).as_number(), 1.0);
        assert_eq!(Value::String(" 2.5".into()).as_number(), 2.5);
        assert!(Value::String("abc".into()).as_number().is_nan());
        assert!(Value::Null.as_number().is_nan());
    }

    #[test]
    fn test_value_equality() {
        assert_eq!(Value::Int64(42), Value::Int64(42));
        assert_ne!(Value::Int64(42), Value::Float64(42.0));
        assert_eq!(Value::nan(), Value::nan());
        assert_eq!(
            Value::Array(vec![Value::from("a")]),
            Value::Array(vec![Value::from("a")])
        );
    }

    #[test]
    fn test_value_ordering() {
        assert!(Value::Int64(1) < Value::Int64(2));
        assert!(Value::Int64(1) < Value::Float64(1.5));
        assert!(Value::String("a".into()) < Value::String("b".into()));
        assert!(Value::Null < Value::Int64(0));
        assert!(Value::Float64(1e9) < Value::nan());
    }

    #[test]
    fn test_to_array() {
        assert!(Value::Null.to_array().is_empty());
        assert_eq!(Value::Int64(1).to_array(), vec![Value::Int64(1)]);
        assert_eq!(
            Value::Array(vec![Value::Int64(1), Value::Int64(2)]).to_array().len(),
            2
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", Value::from("x")), "x");
        assert_eq!(format!("{}", Value::Int64(7)), "7");
        assert_eq!(format!("{}", Value::Float64(2.5)), "2.5");
        assert_eq!(format!("{}", Value::Null), "null");
    }

    #[test]
    fn test_value_from_impls() {
        let v: Value = 42i32.into();
        assert_eq!(v.as_i64(), Some(42));

        let v: Value = "hello".into();
        assert_eq!(v.as_str(), Some("hello"));

        let v: Value = Some(100i64).into();
        assert_eq!(v.as_i64(), Some(100));

        let v: Value = None::<i64>.into();
        assert!(v.is_null());
    }
}

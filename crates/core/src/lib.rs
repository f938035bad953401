//! Verba Core - Core value, key and column types for the Verba query engine.
//!
//! This crate provides the foundational types shared by every Verba crate:
//!
//! - `Value`: Runtime values stored in column cells
//! - `Key`: Canonical structural keys used for grouping and join lookups
//! - `BitSet`: Word-packed row membership masks
//! - `Column` / `Columns`: Shared column buffers
//! - `Error`: Error types for verb and operator setup
//!
//! # Example
//!
//! ```rust
//! use verba_core::{Column, Columns, Key, Value};
//!
//! let data = Columns::new([
//!     ("k", Column::from_iter(["a", "b"])),
//!     ("v", Column::from_iter([1i64, 2])),
//! ])
//! .unwrap();
//!
//! assert_eq!(data.num_rows(), 2);
//! assert_eq!(data.value("v", 1), Value::Int64(2));
//! assert_eq!(Key::from(&Value::Float64(2.0)), Key::from(&Value::Int64(2)));
//! ```

#![no_std]

extern crate alloc;

mod bitset;
mod column;
mod error;
mod key;
mod value;

pub use bitset::{BitSet, Ones};
pub use column::{Column, Columns};
pub use error::{Error, Result};
pub use key::Key;
pub use value::Value;

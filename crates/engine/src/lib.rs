//! Verba Engine - Columnar verb execution for the Verba query engine.
//!
//! This crate runs relational and reshaping verbs over in-memory tables:
//!
//! - `table`: Immutable table views with filter, order and group facets
//! - `expr`: Compiled expressions and operator specs handed in by callers
//! - `executor`: Aggregation, group-by, window and join engines
//! - `verbs`: Derive, filter, rollup, pivot, fold, unroll, spread, impute and friends
//! - `context`: Resource limits for combinatorial verbs
//!
//! # Example
//!
//! ```rust
//! use verba_core::{Column, Value};
//! use verba_engine::{groupby_columns, rollup, Compiled, Table};
//!
//! let table = Table::from_columns([
//!     ("k", Column::from_iter(["a", "a", "b"])),
//!     ("a", Column::from_iter([1i64, 2, 3])),
//! ])
//! .unwrap();
//!
//! let grouped = groupby_columns(&table, &["k"]).unwrap();
//! let out = rollup(&grouped, &Compiled::new().agg("sum", "sum", &["a"])).unwrap();
//! assert_eq!(out.column_values("sum").unwrap(), [Value::Int64(3), Value::Int64(3)]);
//! ```

#![no_std]

extern crate alloc;

pub mod context;
pub mod executor;
pub mod expr;
pub mod table;
pub mod verbs;

pub use context::Limits;
pub use executor::{
    antijoin, cross, groupby, groupby_columns, join, semijoin, JoinCondition, JoinOptions,
    JoinValues,
};
pub use expr::{Compiled, Field, Frame, OpSpec, TableExpr};
pub use table::{by_columns, ColumnSet, Order, Table};
pub use verbs::*;

//! Fold: columns into key/value rows.

use super::unroll::{unroll, UnrollOptions};
use crate::context::Limits;
use crate::executor::aggregate::aggregate_get;
use crate::expr::{Compiled, TableExpr};
use crate::table::Table;
use alloc::string::String;
use alloc::vec::Vec;
use verba_core::{Result, Value};

/// Options for [`fold`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FoldOptions {
    /// Output column for the folded column names.
    pub key: String,
    /// Output column for the folded values.
    pub value: String,
    pub limits: Limits,
}

impl Default for FoldOptions {
    fn default() -> Self {
        FoldOptions {
            key: String::from("key"),
            value: String::from("value"),
            limits: Limits::default(),
        }
    }
}

/// Folds the value expressions into `key` and `value` columns.
///
/// Each row becomes one row per expression; the folded columns are
/// dropped and every other column is repeated.
pub fn fold(table: &Table, values: &Compiled, options: &FoldOptions) -> Result<Table> {
    if values.is_empty() {
        return Ok(table.clone());
    }
    let names = Value::Array(values.names.iter().map(|n| Value::from(n.as_str())).collect());
    let get = aggregate_get(table, &values.ops, &values.exprs)?;

    let pairs = Compiled::new()
        .add(options.key.as_str(), TableExpr::constant(names))
        .add(
            options.value.as_str(),
            TableExpr::row(move |row, data| {
                Value::Array(get.iter().map(|g| g(row, data)).collect())
            }),
        );
    let unroll_options = UnrollOptions {
        drop: values.names.clone(),
        limits: options.limits,
        ..UnrollOptions::default()
    };
    unroll(table, &pairs, &unroll_options)
}

/// Folds named columns.
pub fn fold_columns(table: &Table, columns: &[&str], options: &FoldOptions) -> Result<Table> {
    for name in columns {
        table.data().require(name)?;
    }
    fold(table, &Compiled::columns(columns), options)
}

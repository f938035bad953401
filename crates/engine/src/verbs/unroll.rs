//! Unroll: one output row per array element.

use crate::context::Limits;
use crate::executor::aggregate::aggregate_get;
use crate::expr::Compiled;
use crate::table::{ColumnSet, Table};
use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;
use log::debug;
use verba_core::{Column, Result, Value};

/// Options for [`unroll`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UnrollOptions {
    /// Maximum number of elements taken from each row.
    pub limit: Option<usize>,
    /// Name of an optional column holding the element position.
    pub index: Option<String>,
    /// Columns to leave out of the output.
    pub drop: Vec<String>,
    pub limits: Limits,
}

enum Slot {
    Copy(Column),
    Unroll(usize),
    Index,
}

/// Unrolls array-valued expressions into rows.
///
/// Each input row yields as many rows as its longest array (capped by
/// `limit`); shorter arrays pad with `Null` and non-array values count as
/// one-element arrays. Other columns are repeated. A row whose arrays are
/// all empty yields nothing. Rows are visited in table order and the
/// result is a fresh, ungrouped table.
pub fn unroll(table: &Table, values: &Compiled, options: &UnrollOptions) -> Result<Table> {
    if values.is_empty() {
        return Ok(table.clone());
    }
    let get = aggregate_get(table, &values.ops, &values.exprs)?;
    let dropped = |name: &str| options.drop.iter().any(|d| d == name);
    let limit = options.limit.filter(|&l| l > 0).unwrap_or(usize::MAX);

    let mut layout: Vec<(String, Slot)> = Vec::new();
    for (name, col) in table.data().iter() {
        if dropped(name) {
            continue;
        }
        match values.names.iter().position(|n| n == name) {
            Some(i) => layout.push((String::from(name), Slot::Unroll(i))),
            None => layout.push((String::from(name), Slot::Copy(col.clone()))),
        }
    }
    for (i, name) in values.names.iter().enumerate() {
        if !dropped(name.as_str()) && !layout.iter().any(|(n, _)| n == name) {
            layout.push((name.clone(), Slot::Unroll(i)));
        }
    }
    if let Some(index) = &options.index {
        layout.push((index.clone(), Slot::Index));
    }

    let mut out: Vec<Vec<Value>> = vec![Vec::new(); layout.len()];
    let mut total = 0usize;
    let mut arrays: Vec<Vec<Value>> = Vec::with_capacity(get.len());
    let data = table.data();
    for row in table.indices(true) {
        arrays.clear();
        arrays.extend(get.iter().map(|g| g(row, data).to_array()));
        let maxlen = arrays.iter().map(Vec::len).max().unwrap_or(0).min(limit);
        total += maxlen;
        options.limits.check_rows("unroll", total)?;

        for ((_, slot), col) in layout.iter().zip(out.iter_mut()) {
            match slot {
                Slot::Copy(src) => col.extend((0..maxlen).map(|_| src.get(row))),
                Slot::Unroll(i) => {
                    let arr = &arrays[*i];
                    col.extend((0..maxlen).map(|k| arr.get(k).cloned().unwrap_or(Value::Null)));
                }
                Slot::Index => col.extend((0..maxlen).map(Value::from)),
            }
        }
    }
    debug!("unroll: {} rows into {} rows", table.num_rows(), total);

    let mut cols = ColumnSet::new();
    for ((name, _), values) in layout.into_iter().zip(out) {
        cols.add_values(name, values);
    }
    cols.into_table(total)
}

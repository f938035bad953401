//! Column selection and ordering.

use crate::table::{by_columns, ColumnSet, Order, Table};
use verba_core::Result;

/// Keeps the named columns, in the given order.
pub fn select(table: &Table, names: &[&str]) -> Result<Table> {
    let pairs: alloc::vec::Vec<(&str, &str)> = names.iter().map(|n| (*n, *n)).collect();
    select_as(table, &pairs)
}

/// Keeps and renames columns given as `(source, output)` pairs.
///
/// Column buffers are shared with the input; facets are kept.
pub fn select_as(table: &Table, pairs: &[(&str, &str)]) -> Result<Table> {
    let mut cols = ColumnSet::new();
    for (source, output) in pairs {
        let col = table.data().require(source)?;
        cols.add(*output, col.clone());
    }
    table.create(cols)
}

/// Orders the table by named columns.
pub fn orderby(table: &Table, keys: &[(&str, Order)]) -> Result<Table> {
    for (name, _) in keys {
        table.data().require(name)?;
    }
    Ok(table.with_order(by_columns(keys)))
}

//! Row filtering.

use super::derive::evaluate;
use crate::expr::Compiled;
use crate::table::Table;
use log::debug;
use verba_core::{BitSet, Result, Value};

/// Keeps rows for which every predicate expression is truthy.
///
/// Predicates may reference group aggregates and window operators. The
/// result keeps the table's order; groups with no surviving rows are
/// dropped.
pub fn filter(table: &Table, predicate: &Compiled) -> Result<Table> {
    let values = evaluate(table, predicate)?;
    let mut bits = BitSet::new(table.total_rows());
    table.scan(false, |row, _| {
        if values.iter().all(|col| col[row].is_truthy()) {
            bits.set(row);
        }
    });
    debug!("filter: kept {} of {} rows", bits.count(), table.num_rows());
    Ok(table.with_filter(bits))
}

/// Keeps rows whose column value equals `value`.
pub fn filter_eq(table: &Table, column: &str, value: Value) -> Result<Table> {
    let col = table.data().require(column)?;
    let mut bits = BitSet::new(table.total_rows());
    table.scan(false, |row, _| {
        if col.get_ref(row) == Some(&value) {
            bits.set(row);
        }
    });
    Ok(table.with_filter(bits))
}

//! Aggregation to one row per group.

use crate::executor::aggregate::{aggregate, IndexLookup, OpValues};
use crate::expr::{Compiled, TableExpr};
use crate::table::{ColumnSet, Table};
use alloc::vec::Vec;
use log::debug;
use verba_core::{Error, Result, Value};
use verba_ops::registry;

/// Writes the group key columns of `table`, one row per group.
pub(crate) fn group_output(cols: &mut ColumnSet, table: &Table) {
    if let Some(groups) = table.groups() {
        let data = table.data();
        for (name, get) in groups.names.iter().zip(&groups.get) {
            let values: Vec<Value> = groups.rows.iter().map(|&row| get(row, data)).collect();
            cols.add_values(name.as_str(), values);
        }
    }
}

/// Output column of an expression evaluated once per group.
///
/// Direct operator references are copied out of the results.
pub(crate) fn group_values(
    expr: &TableExpr,
    values: &OpValues,
    table: &Table,
    size: usize,
) -> Vec<Value> {
    match expr.field() {
        Some(id) => values.column(id).to_vec(),
        None => {
            let lookup = IndexLookup(values);
            (0..size)
                .map(|index| expr.eval(index, table.data(), &lookup))
                .collect()
        }
    }
}

/// Rejects window operators where only aggregates are allowed.
pub(crate) fn check_aggregates(exprs: &Compiled, verb: &str) -> Result<()> {
    for op in &exprs.ops {
        if registry::is_window_only(&op.name) {
            return Err(Error::operator_misuse(
                &op.name,
                alloc::format!("window functions are not allowed in {}", verb),
            ));
        }
        if op.frame.map_or(false, |f| f.is_bounded()) {
            return Err(Error::operator_misuse(
                &op.name,
                alloc::format!("window frames are not allowed in {}", verb),
            ));
        }
    }
    Ok(())
}

/// Aggregates the table to one row per group.
///
/// The result holds the group key columns followed by the expression
/// outputs and is neither grouped, filtered nor ordered.
pub fn rollup(table: &Table, exprs: &Compiled) -> Result<Table> {
    check_aggregates(exprs, "rollup")?;
    let values = aggregate(table, &exprs.ops)?;
    let size = table.groups().map_or(1, |g| g.size);
    debug!("rollup: {} outputs over {} groups", exprs.len(), size);

    let mut cols = ColumnSet::new();
    group_output(&mut cols, table);
    for (name, expr) in exprs.names.iter().zip(&exprs.exprs) {
        cols.add_values(name.as_str(), group_values(expr, &values, table, size));
    }
    cols.into_table(size)
}

/// Counts rows per group into a column named `name`, `count` by default.
pub fn count(table: &Table, name: Option<&str>) -> Result<Table> {
    let exprs = Compiled::new().agg(name.unwrap_or("count"), "count", &[]);
    rollup(table, &exprs)
}

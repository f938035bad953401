//! Lookup: pull right-table columns into the left table by key.

use crate::executor::join::{build, row_key, JoinCondition};
use crate::table::{ColumnSet, Table};
use alloc::vec;
use alloc::vec::Vec;
use log::debug;
use verba_core::{Error, Result, Value};

/// Adds `values` columns from `right` to `left`, matched on key equality.
///
/// When several right rows share a key the last one in scan order wins.
/// Unmatched left rows, and rows with a missing key, get `Null`. The left
/// table keeps its filter, order and groups.
pub fn lookup(left: &Table, right: &Table, on: &JoinCondition, values: &[&str]) -> Result<Table> {
    let (lk, rk) = match on {
        JoinCondition::Keys { left, right } => (left, right),
        JoinCondition::Predicate(_) => {
            return Err(Error::invalid_operation("lookup requires a key condition"))
        }
    };
    on.validate(left, right)?;
    let sources = values
        .iter()
        .map(|name| right.data().require(name))
        .collect::<Result<Vec<_>>>()?;

    let index = build(right, rk);
    let mut matched = vec![None; left.total_rows()];
    let mut buf = Vec::with_capacity(lk.len());
    let mut hits = 0usize;
    left.scan(false, |row, data| {
        if let Some(key) = row_key(lk, row, data, &mut buf) {
            matched[row] = index.get(&key).and_then(|rows| rows.last().copied());
            hits += usize::from(matched[row].is_some());
        }
    });
    debug!("lookup: matched {} of {} rows", hits, left.num_rows());

    let mut cols = ColumnSet::from_table(left);
    for (name, src) in values.iter().zip(sources) {
        let out: Vec<Value> = matched
            .iter()
            .map(|m| m.map_or(Value::Null, |r| src.get(r)))
            .collect();
        cols.add_values(*name, out);
    }
    left.create(cols)
}

//! Dedupe: keep the first row of each distinct key.

use crate::expr::RowFn;
use crate::table::Table;
use alloc::vec::Vec;
use hashbrown::HashSet;
use log::debug;
use verba_core::{BitSet, Key, Result, Value};

/// Filters the table down to the first row, in table order, of each
/// distinct combination of `columns` (all columns when `None`).
pub fn dedupe(table: &Table, columns: Option<&[&str]>) -> Result<Table> {
    let get: Vec<RowFn> = match columns {
        Some(names) => names.iter().map(|n| table.getter(n)).collect::<Result<_>>()?,
        None => table
            .column_names()
            .iter()
            .map(|n| table.getter(n))
            .collect::<Result<_>>()?,
    };

    let mut seen: HashSet<Key> = HashSet::with_capacity(table.num_rows());
    let mut bits = BitSet::new(table.total_rows());
    let mut buf: Vec<Value> = Vec::with_capacity(get.len());
    table.scan(true, |row, data| {
        buf.clear();
        buf.extend(get.iter().map(|g| g(row, data)));
        if seen.insert(Key::composite(&buf)) {
            bits.set(row);
        }
    });
    debug!("dedupe: kept {} of {} rows", bits.count(), table.num_rows());
    Ok(table.with_filter(bits))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Order;
    use crate::verbs::orderby;
    use verba_core::{Column, Error};

    fn table() -> Table {
        Table::from_columns([
            ("k", Column::from_iter(["a", "b", "a", "b"])),
            ("v", Column::from_iter([1i64, 2, 1, 3])),
        ])
        .unwrap()
    }

    #[test]
    fn test_dedupe_all_columns() {
        let out = dedupe(&table(), None).unwrap();
        assert_eq!(out.indices(false), [0, 1, 3]);
    }

    #[test]
    fn test_dedupe_by_key_respects_order() {
        let out = dedupe(&table(), Some(&["k"])).unwrap();
        assert_eq!(out.indices(false), [0, 1]);

        let desc = orderby(&table(), &[("v", Order::Desc)]).unwrap();
        let out = dedupe(&desc, Some(&["k"])).unwrap();
        assert_eq!(out.indices(true), [3, 0]);
        assert!(matches!(
            dedupe(&table(), Some(&["zz"])),
            Err(Error::ColumnNotFound { .. })
        ));
    }
}

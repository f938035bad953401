//! Group-by engine.

use crate::executor::aggregate::aggregate_get;
use crate::expr::{Compiled, RowFn};
use crate::table::Table;
use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;
use core::fmt;
use hashbrown::HashMap;
use log::debug;
use verba_core::{Columns, Key, Result, Value};

/// Dense group assignment.
///
/// `keys[row]` is the group id of `row` for rows passing the table filter
/// (other rows hold an arbitrary id). Ids are assigned in the order
/// distinct keys were first seen and `rows[id]` is that first row.
#[derive(Clone)]
pub struct GroupBySpec {
    pub names: Vec<String>,
    pub get: Vec<RowFn>,
    pub rows: Vec<usize>,
    pub size: usize,
    pub keys: Vec<u32>,
}

impl GroupBySpec {
    /// Group id of a row.
    #[inline]
    pub fn group_of(&self, row: usize) -> usize {
        self.keys[row] as usize
    }

    /// Key values of group `id`, read from its exemplar row.
    pub fn key_values(&self, id: usize, data: &Columns) -> Vec<Value> {
        let row = self.rows[id];
        self.get.iter().map(|get| get(row, data)).collect()
    }
}

impl fmt::Debug for GroupBySpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GroupBySpec")
            .field("names", &self.names)
            .field("size", &self.size)
            .field("rows", &self.rows)
            .finish()
    }
}

/// Assigns group ids to every row passing the table filter.
pub fn create_groups(table: &Table, names: Vec<String>, get: Vec<RowFn>) -> GroupBySpec {
    let mut keys = vec![0u32; table.total_rows()];
    let mut index: HashMap<Key, u32> = HashMap::new();
    let mut rows = Vec::new();
    let mut values = Vec::with_capacity(get.len());

    table.scan(false, |row, data| {
        values.clear();
        values.extend(get.iter().map(|g| g(row, data)));
        let key = Key::composite(&values);
        let next = index.len() as u32;
        let id = *index.entry(key).or_insert_with(|| {
            rows.push(row);
            next
        });
        keys[row] = id;
    });

    let size = rows.len();
    debug!("groupby {:?}: {} rows into {} groups", names, table.num_rows(), size);
    GroupBySpec {
        names,
        get,
        rows,
        size,
        keys,
    }
}

/// Groups a table by compiled key expressions, replacing any prior grouping.
///
/// Key expressions may reference aggregates, which are computed over the
/// incoming groups.
pub fn groupby(table: &Table, keys: &Compiled) -> Result<Table> {
    let get = aggregate_get(table, &keys.ops, &keys.exprs)?;
    let spec = create_groups(table, keys.names.clone(), get);
    Ok(table.with_groups(spec))
}

/// Groups by plain column names.
pub fn groupby_columns(table: &Table, names: &[&str]) -> Result<Table> {
    for name in names {
        table.data().require(name)?;
    }
    groupby(table, &Compiled::columns(names))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::TableExpr;
    use verba_core::{BitSet, Column, Error};

    fn table() -> Table {
        Table::from_columns([
            ("k", Column::from_iter(["b", "a", "b", "c", "a"])),
            ("n", Column::from_iter([1.0f64, 1.0, 2.0, f64::NAN, f64::NAN])),
        ])
        .unwrap()
    }

    #[test]
    fn test_first_seen_order() {
        let t = groupby_columns(&table(), &["k"]).unwrap();
        let g = t.groups().unwrap();
        assert_eq!(g.size, 3);
        assert_eq!(g.keys, [0, 1, 0, 2, 1]);
        assert_eq!(g.rows, [0, 1, 3]);
        assert_eq!(g.key_values(1, t.data()), [Value::from("a")]);
    }

    #[test]
    fn test_nan_keys_group_together() {
        let t = groupby_columns(&table(), &["n"]).unwrap();
        let g = t.groups().unwrap();
        assert_eq!(g.size, 3);
        assert_eq!(g.keys[3], g.keys[4]);
    }

    #[test]
    fn test_filtered_rows_skipped() {
        let t = table().with_filter(BitSet::from_indices(5, [1, 3]));
        let g = groupby_columns(&t, &["k"]).unwrap();
        let spec = g.groups().unwrap();
        assert_eq!(spec.size, 2);
        assert_eq!(spec.rows, [1, 3]);
    }

    #[test]
    fn test_computed_key() {
        let keys = Compiled::new().add(
            "even",
            TableExpr::row(|row, _| Value::Boolean(row % 2 == 0)),
        );
        let t = groupby(&table(), &keys).unwrap();
        assert_eq!(t.groups().unwrap().size, 2);
    }

    #[test]
    fn test_missing_column() {
        assert!(matches!(
            groupby_columns(&table(), &["zz"]),
            Err(Error::ColumnNotFound { .. })
        ));
    }
}

//! Spread: array elements into columns.

use crate::executor::aggregate::aggregate_get;
use crate::expr::{Compiled, RowFn};
use crate::table::{ColumnSet, Table};
use alloc::format;
use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;
use verba_core::{Result, Value};

/// Options for [`spread`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SpreadOptions {
    /// Output names, used only when a single expression is spread.
    pub names: Vec<String>,
    /// Remove the source column.
    pub drop: bool,
    /// Maximum number of output columns per expression; defaults to the
    /// number of `names`, or unbounded without names.
    pub limit: Option<usize>,
}

impl Default for SpreadOptions {
    fn default() -> Self {
        SpreadOptions {
            names: Vec::new(),
            drop: true,
            limit: None,
        }
    }
}

fn spread_cols(table: &Table, get: &RowFn, limit: usize) -> Vec<Vec<Value>> {
    let nrows = table.total_rows();
    let mut columns: Vec<Vec<Value>> = Vec::new();
    table.scan(false, |row, data| {
        let values = get(row, data).to_array();
        let n = values.len().min(limit);
        while columns.len() < n {
            columns.push(vec![Value::Null; nrows]);
        }
        for (col, v) in columns.iter_mut().zip(values.into_iter().take(n)) {
            col[row] = v;
        }
    });
    columns
}

/// Spreads array-valued expressions across new columns.
///
/// Element `i` of the array lands in column `name_{i+1}` (or the `i`-th
/// configured name); rows with shorter arrays hold `Null`. Generated
/// columns take the place of a source column of the same name, or are
/// appended. The table keeps its filter, order and groups.
pub fn spread(table: &Table, values: &Compiled, options: &SpreadOptions) -> Result<Table> {
    if values.is_empty() {
        return Ok(table.clone());
    }
    let names: &[String] = if values.len() == 1 { &options.names } else { &[] };
    let limit = match options.limit {
        Some(l) => l.max(1),
        None if !names.is_empty() => names.len(),
        None => usize::MAX,
    };
    let get = aggregate_get(table, &values.ops, &values.exprs)?;

    let mut cols = ColumnSet::new();
    let add = |cols: &mut ColumnSet, index: usize, name: &str| {
        for (i, col) in spread_cols(table, &get[index], limit).into_iter().enumerate() {
            let out = names.get(i).cloned().unwrap_or_else(|| format!("{}_{}", name, i + 1));
            cols.add_values(out, col);
        }
    };

    let mut pending: Vec<bool> = vec![true; values.len()];
    for (name, col) in table.data().iter() {
        match values.names.iter().position(|n| n == name) {
            Some(i) if pending[i] => {
                if !options.drop {
                    cols.add(name, col.clone());
                }
                add(&mut cols, i, name);
                pending[i] = false;
            }
            _ => {
                cols.add(name, col.clone());
            }
        }
    }
    for (i, name) in values.names.iter().enumerate() {
        if pending[i] {
            add(&mut cols, i, name.as_str());
        }
    }
    table.create(cols)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::TableExpr;
    use verba_core::{BitSet, Column};

    fn arr(vals: &[i64]) -> Value {
        Value::Array(vals.iter().map(|&v| Value::Int64(v)).collect())
    }

    fn table() -> Table {
        Table::from_columns([
            ("a", Column::from(vec![arr(&[1, 2]), arr(&[3]), arr(&[4, 5, 6])])),
            ("z", Column::from_iter([0i64, 0, 0])),
        ])
        .unwrap()
    }

    #[test]
    fn test_spread_in_place() {
        let out = spread(&table(), &Compiled::columns(&["a"]), &SpreadOptions::default()).unwrap();
        assert_eq!(out.column_names(), ["a_1", "a_2", "a_3", "z"]);
        assert_eq!(out.get("a_2", 1), Value::Null);
        assert_eq!(out.get("a_3", 2), Value::Int64(6));
    }

    #[test]
    fn test_names_limit_and_keep() {
        let opts = SpreadOptions {
            names: vec![String::from("x"), String::from("y")],
            drop: false,
            limit: None,
        };
        let out = spread(&table(), &Compiled::columns(&["a"]), &opts).unwrap();
        assert_eq!(out.column_names(), ["a", "x", "y", "z"]);
        assert_eq!(out.get("y", 2), Value::Int64(5));
    }

    #[test]
    fn test_computed_expression_appended_and_facets_kept() {
        let t = table().with_filter(BitSet::from_indices(3, [0, 2]));
        let c = Compiled::new().add(
            "p",
            TableExpr::row(|row, data| Value::Array(vec![data.value("z", row), Value::from(row)])),
        );
        let out = spread(&t, &c, &SpreadOptions::default()).unwrap();
        assert_eq!(out.column_names(), ["a", "z", "p_1", "p_2"]);
        assert_eq!(out.num_rows(), 2);
        assert_eq!(out.get("p_2", 1), Value::Null);
        assert_eq!(out.get("p_2", 2), Value::Int64(2));
    }
}

//! Derived columns.

use crate::executor::aggregate::{aggregate, OpValues};
use crate::executor::groupby::GroupBySpec;
use crate::executor::window::window;
use crate::expr::{Compiled, OpLookup, OpSpec};
use crate::table::{ColumnSet, Table};
use alloc::vec;
use alloc::vec::Vec;
use log::debug;
use verba_core::{Result, Value};

/// Options for [`derive`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DeriveOptions {
    /// Output only the derived columns.
    pub drop: bool,
}

/// Results of windowed operators for the current row, group aggregates
/// for the row's group.
struct DeriveLookup<'a> {
    window: &'a OpValues,
    groups: &'a OpValues,
    spec: Option<&'a GroupBySpec>,
    windowed: &'a [bool],
}

impl OpLookup for DeriveLookup<'_> {
    fn op(&self, id: usize, row: usize) -> Value {
        if self.windowed.get(id).copied().unwrap_or(false) {
            self.window.get(id, 0)
        } else {
            let index = self.spec.map_or(0, |g| g.group_of(row));
            self.groups.get(id, index)
        }
    }
}

/// Evaluates every expression for each row passing the filter.
///
/// Returns one full-length vector per expression; filtered-out rows hold
/// `Null`.
pub(crate) fn evaluate(table: &Table, exprs: &Compiled) -> Result<Vec<Vec<Value>>> {
    let (win_ops, agg_ops): (Vec<OpSpec>, Vec<OpSpec>) =
        exprs.ops.iter().cloned().partition(OpSpec::is_windowed);

    let width = exprs.ops.iter().map(|op| op.id + 1).max().unwrap_or(0);
    let mut windowed = vec![false; width];
    for op in &win_ops {
        windowed[op.id] = true;
    }

    let groups = if agg_ops.is_empty() {
        OpValues::default()
    } else {
        aggregate(table, &agg_ops)?
    };

    let nrows = table.total_rows();
    let mut out: Vec<Vec<Value>> = exprs.exprs.iter().map(|_| vec![Value::Null; nrows]).collect();
    let spec = table.groups();

    if win_ops.is_empty() {
        let empty = OpValues::default();
        let lookup = DeriveLookup {
            window: &empty,
            groups: &groups,
            spec,
            windowed: &windowed,
        };
        table.scan(false, |row, data| {
            for (col, expr) in out.iter_mut().zip(&exprs.exprs) {
                col[row] = expr.eval(row, data, &lookup);
            }
        });
    } else {
        debug!(
            "derive: {} windowed and {} group operators",
            win_ops.len(),
            agg_ops.len()
        );
        window(table, &win_ops, |row, data, values| {
            let lookup = DeriveLookup {
                window: values,
                groups: &groups,
                spec,
                windowed: &windowed,
            };
            for (col, expr) in out.iter_mut().zip(&exprs.exprs) {
                col[row] = expr.eval(row, data, &lookup);
            }
        })?;
    }
    Ok(out)
}

/// Adds or replaces columns computed from row expressions, group
/// aggregates and window operators.
///
/// Existing columns keep their position when overwritten; new columns are
/// appended. The table keeps its filter, order and groups.
pub fn derive(table: &Table, exprs: &Compiled, options: &DeriveOptions) -> Result<Table> {
    let values = evaluate(table, exprs)?;
    let mut cols = if options.drop {
        ColumnSet::new()
    } else {
        ColumnSet::from_table(table)
    };
    for (name, col) in exprs.names.iter().zip(values) {
        cols.add_values(name.as_str(), col);
    }
    table.create(cols)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::groupby::groupby_columns;
    use crate::expr::{Field, Frame, TableExpr};
    use crate::table::{by_columns, Order};
    use verba_core::{BitSet, Column};

    fn table() -> Table {
        Table::from_columns([
            ("k", Column::from_iter(["a", "b", "a", "b"])),
            ("v", Column::from_iter([1i64, 2, 3, 4])),
        ])
        .unwrap()
    }

    fn ints(vals: &[i64]) -> Vec<Value> {
        vals.iter().map(|&v| Value::Int64(v)).collect()
    }

    #[test]
    fn test_row_expression() {
        let c = Compiled::new().add(
            "w",
            TableExpr::row(|row, data| Value::from(data.value("v", row).as_number() * 2.0)),
        );
        let t = derive(&table(), &c, &DeriveOptions::default()).unwrap();
        assert_eq!(t.column_names(), ["k", "v", "w"]);
        assert_eq!(t.get("w", 3), Value::Float64(8.0));
    }

    #[test]
    fn test_overwrite_keeps_position_and_drop() {
        let c = Compiled::new().add("k", TableExpr::constant(Value::from("z")));
        let t = derive(&table(), &c, &DeriveOptions::default()).unwrap();
        assert_eq!(t.column_names(), ["k", "v"]);
        assert_eq!(t.get("k", 0), Value::from("z"));

        let t = derive(&table(), &c, &DeriveOptions { drop: true }).unwrap();
        assert_eq!(t.column_names(), ["k"]);
    }

    #[test]
    fn test_group_aggregate_broadcast() {
        let t = groupby_columns(&table(), &["k"]).unwrap();
        let c = Compiled::new().agg("total", "sum", &["v"]);
        let out = derive(&t, &c, &DeriveOptions::default()).unwrap();
        assert!(out.is_grouped());
        assert_eq!(out.column_values("total").unwrap(), ints(&[4, 6, 4, 6]));
    }

    #[test]
    fn test_window_and_group_mix() {
        let t = groupby_columns(&table(), &["k"])
            .unwrap()
            .with_order(by_columns(&[("v", Order::Desc)]));
        let mut c = Compiled::new();
        let rn = c.add_op(OpSpec::new("row_number", Vec::new()));
        let total = c.add_op(OpSpec::new("sum", alloc::vec![Field::column("v")]));
        let c = c.add(
            "x",
            TableExpr::new(move |row, _, ops| {
                Value::from(ops.op(rn, row).as_number() * 100.0 + ops.op(total, row).as_number())
            }),
        );
        let out = derive(&t, &c, &DeriveOptions::default()).unwrap();
        let x: Vec<f64> = (0..4).map(|r| out.get("x", r).as_number()).collect();
        assert_eq!(x, [204.0, 206.0, 104.0, 106.0]);
    }

    #[test]
    fn test_filtered_rows_are_null() {
        let t = table().with_filter(BitSet::from_indices(4, [1, 2]));
        let c = Compiled::new().window(
            "cum",
            "sum",
            &["v"],
            Vec::new(),
            Some(Frame::new(None, Some(0))),
            false,
        );
        let out = derive(&t, &c, &DeriveOptions::default()).unwrap();
        assert_eq!(out.get("cum", 0), Value::Null);
        assert_eq!(out.get("cum", 1), Value::Int64(2));
        assert_eq!(out.get("cum", 2), Value::Int64(5));
        assert_eq!(out.num_rows(), 2);
    }
}

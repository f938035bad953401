//! Pivot: one output column per distinct key value.

use super::rollup::{check_aggregates, group_output, group_values};
use crate::executor::aggregate::{aggregate, aggregate_get, OpValues};
use crate::expr::{Compiled, Field, OpSpec, RowFn};
use crate::table::{ColumnSet, Table};
use alloc::format;
use alloc::rc::Rc;
use alloc::string::{String, ToString};
use alloc::vec;
use alloc::vec::Vec;
use log::debug;
use verba_core::{Columns, Key, Result, Value};

/// Options for [`pivot`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PivotOptions {
    /// Maximum number of key values to pivot on.
    pub limit: Option<usize>,
    /// Sort key values before applying the limit.
    pub sort: bool,
    /// Separator joining multiple key expressions into one key.
    pub key_separator: String,
    /// Separator between value name and key in output names.
    pub value_separator: String,
}

impl Default for PivotOptions {
    fn default() -> Self {
        PivotOptions {
            limit: None,
            sort: true,
            key_separator: String::from("_"),
            value_separator: String::from("_"),
        }
    }
}

/// Per-row key values plus the distinct keys to pivot on.
fn pivot_keys(table: &Table, on: &Compiled, options: &PivotOptions) -> Result<(Vec<Value>, Rc<Vec<Value>>)> {
    let get = aggregate_get(table, &on.ops, &on.exprs)?;
    let key: RowFn = if get.len() == 1 {
        get[0].clone()
    } else {
        let sep = options.key_separator.clone();
        Rc::new(move |row, data: &Columns| {
            let parts: Vec<String> = get.iter().map(|g| g(row, data).to_string()).collect();
            Value::String(parts.join(sep.as_str()))
        })
    };

    let mut kcol = vec![Value::Null; table.total_rows()];
    table.scan(false, |row, data| kcol[row] = key(row, data));
    let kcol = Rc::new(kcol);

    let distinct = {
        let kcol = kcol.clone();
        Compiled::new().agg_fields(
            "keys",
            "array_agg_distinct",
            vec![Field::new("pivot_key", move |row, _| kcol[row].clone())],
            Vec::new(),
        )
    };
    let uniq = aggregate(&table.ungroup(), &distinct.ops)?.get(0, 0);
    let mut keys = uniq.to_array();
    if options.sort {
        keys.sort();
    }
    if let Some(limit) = options.limit {
        keys.truncate(limit);
    }
    Ok((keys, kcol))
}

/// Rewrites operators so rows whose key differs from `key` are skipped.
///
/// Masked fields yield NaN, which aggregates ignore; `count` has no field
/// and becomes a sum over a 0/1 indicator. Rows match by [`Key`], the same
/// equivalence used to collect the distinct keys.
fn masked_ops(ops: &[OpSpec], key: &Value, row_keys: &Rc<Vec<Key>>) -> Vec<OpSpec> {
    let target = Key::from(key);
    ops.iter()
        .map(|op| {
            let mut op = op.clone();
            if op.name == "count" {
                let (k, row_keys) = (target.clone(), row_keys.clone());
                op.name = String::from("sum");
                op.fields = vec![Field::new(format!("{}:1", key), move |row, _| {
                    Value::Int64(i64::from(row_keys[row] == k))
                })];
            } else {
                op.fields = op
                    .fields
                    .iter()
                    .map(|f| {
                        let (k, row_keys, f2) = (target.clone(), row_keys.clone(), f.clone());
                        Field::new(format!("{}:{}", key, f.key()), move |row, data| {
                            if row_keys[row] == k {
                                f2.eval(row, data)
                            } else {
                                Value::nan()
                            }
                        })
                    })
                    .collect();
            }
            op
        })
        .collect()
}

/// Pivots `values` aggregates into one column per distinct `on` key.
///
/// Output holds the group key columns, then for each value expression one
/// column per key, named by the key (or `name{sep}key` when there is more
/// than one value expression). Groups with no rows for a key get Null,
/// except `count`, which gives 0.
pub fn pivot(table: &Table, on: &Compiled, values: &Compiled, options: &PivotOptions) -> Result<Table> {
    check_aggregates(on, "pivot")?;
    check_aggregates(values, "pivot")?;
    let (keys, kcol) = pivot_keys(table, on, options)?;
    let row_keys: Rc<Vec<Key>> = Rc::new(kcol.iter().map(Key::from).collect());
    debug!("pivot: {} keys, {} value columns", keys.len(), values.len());

    let results: Vec<OpValues> = keys
        .iter()
        .map(|k| aggregate(table, &masked_ops(&values.ops, k, &row_keys)))
        .collect::<Result<_>>()?;

    let size = table.groups().map_or(1, |g| g.size);
    let vsep = &options.value_separator;
    let n = values.len();
    let mut cols = ColumnSet::new();
    group_output(&mut cols, table);
    for (name, expr) in values.names.iter().zip(&values.exprs) {
        for (key, result) in keys.iter().zip(&results) {
            let out = if n > 1 {
                format!("{}{}{}", name, vsep, key)
            } else {
                key.to_string()
            };
            cols.add_values(out, group_values(expr, result, table, size));
        }
    }
    cols.into_table(size)
}

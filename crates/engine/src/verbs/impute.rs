//! Impute and fulfill: fill missing values and missing key combinations.

use crate::context::Limits;
use crate::executor::aggregate::{aggregate, aggregate_get};
use crate::executor::groupby::GroupBySpec;
use crate::expr::{Compiled, RowFn};
use crate::table::{ColumnSet, Table};
use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;
use hashbrown::HashSet;
use log::debug;
use verba_core::{Key, Result, Value};

/// Options for [`impute`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ImputeOptions {
    /// Columns whose distinct values are crossed with the existing groups
    /// before imputing.
    pub expand: Vec<String>,
    pub limits: Limits,
}

/// Replaces invalid values (`Null`, NaN) of named columns.
///
/// `values` maps each target column to an expression, which may use group
/// aggregates. With `expand` set, missing key combinations are added
/// first, so new rows are imputed too.
pub fn impute(table: &Table, values: &Compiled, options: &ImputeOptions) -> Result<Table> {
    for name in &values.names {
        table.data().require(name)?;
    }
    let table = if options.expand.is_empty() {
        table.clone()
    } else {
        let keys: Vec<&str> = options.expand.iter().map(String::as_str).collect();
        expand(table, &keys, &options.limits, "impute")?
    };
    impute_invalid(&table, values)
}

/// Adds rows for every missing combination of the existing groups and the
/// distinct values of the `expand` columns.
///
/// Key columns of new rows hold the combination; other columns are `Null`.
pub fn fulfill(table: &Table, expand_columns: &[&str], limits: &Limits) -> Result<Table> {
    if expand_columns.is_empty() {
        return Ok(table.clone());
    }
    expand(table, expand_columns, limits, "fulfill")
}

fn impute_invalid(table: &Table, values: &Compiled) -> Result<Table> {
    if values.is_empty() {
        return Ok(table.clone());
    }
    let gets = aggregate_get(table, &values.ops, &values.exprs)?;
    let mut cols = ColumnSet::from_table(table);
    for (name, get) in values.names.iter().zip(&gets) {
        let src = table.data().require(name)?;
        let mut out: Vec<Value> = src.as_slice().to_vec();
        table.scan(false, |row, data| {
            if !out[row].is_valid() {
                out[row] = get(row, data);
            }
        });
        cols.add_values(name.as_str(), out);
    }
    table.create(cols)
}

fn expand(table: &Table, keys: &[&str], limits: &Limits, operation: &str) -> Result<Table> {
    let getters: Vec<RowFn> = keys.iter().map(|k| table.getter(k)).collect::<Result<_>>()?;

    // distinct values come from the whole table, not per group
    let distinct = Compiled::distinct_values(keys);
    let uniq = aggregate(&table.ungroup(), &distinct.ops)?;
    let arrays: Vec<Vec<Value>> = (0..keys.len()).map(|i| uniq.get(i, 0).to_array()).collect();

    let groups = table.groups();
    let total = arrays
        .iter()
        .fold(groups.map_or(1, |g| g.size), |p, a| p.saturating_mul(a.len()));
    limits.check_expand(operation, total)?;
    debug!(
        "{}: enumerating {} combinations over {} rows",
        operation,
        total,
        table.num_rows()
    );

    let key_names: Vec<String> = groups
        .map(|g| g.names.clone())
        .unwrap_or_default()
        .into_iter()
        .chain(keys.iter().map(|k| String::from(*k)))
        .collect();
    let key_get: Vec<RowFn> = groups
        .map(|g| g.get.clone())
        .unwrap_or_default()
        .into_iter()
        .chain(getters)
        .collect();

    let mut present: HashSet<Key> = HashSet::new();
    let names: Vec<String> = table.column_names().to_vec();
    let mut out: Vec<Vec<Value>> = vec![Vec::new(); names.len()];
    let mut group_keys: Vec<u32> = Vec::new();
    let mut vec_buf: Vec<Value> = Vec::with_capacity(key_get.len());
    table.scan(false, |row, data| {
        vec_buf.clear();
        vec_buf.extend(key_get.iter().map(|g| g(row, data)));
        present.insert(Key::composite(&vec_buf));
        for (col, name) in out.iter_mut().zip(&names) {
            col.push(data.value(name, row));
        }
        if let Some(g) = groups {
            group_keys.push(g.keys[row]);
        }
    });

    // output column -> position in the key vector
    let slots: Vec<Option<usize>> = names
        .iter()
        .map(|n| key_names.iter().position(|k| k == n))
        .collect();
    let mut added = 0usize;
    if total > 0 {
        enumerate(table, groups, &arrays, |vec, group| {
            if !present.contains(&Key::composite(vec)) {
                for (col, slot) in out.iter_mut().zip(&slots) {
                    col.push(slot.map_or(Value::Null, |i| vec[i].clone()));
                }
                if groups.is_some() {
                    group_keys.push(group as u32);
                }
                added += 1;
            }
        });
    }
    debug!("{}: added {} rows", operation, added);

    let nrows = out.first().map_or(table.num_rows() + added, Vec::len);
    let mut cols = ColumnSet::new();
    for (name, col) in names.into_iter().zip(out) {
        cols.add_values(name, col);
    }
    if let Some(g) = groups {
        cols.groupby(Rc::new(GroupBySpec {
            names: g.names.clone(),
            get: g.get.clone(),
            rows: first_rows(&group_keys, g.size),
            size: g.size,
            keys: group_keys,
        }));
    }
    cols.into_table(nrows)
}

fn first_rows(keys: &[u32], size: usize) -> Vec<usize> {
    let mut rows = vec![usize::MAX; size];
    for (row, &k) in keys.iter().enumerate() {
        let slot = &mut rows[k as usize];
        if *slot == usize::MAX {
            *slot = row;
        }
    }
    rows
}

/// Visits every combination of group and per-column value, odometer style
/// with the last column varying fastest.
fn enumerate<F>(table: &Table, groups: Option<&GroupBySpec>, arrays: &[Vec<Value>], mut visit: F)
where
    F: FnMut(&[Value], usize),
{
    let offset = groups.map_or(0, |g| g.get.len());
    let ngroups = groups.map_or(1, |g| g.size);
    let data = table.data();
    let mut vec: Vec<Value> = vec![Value::Null; offset + arrays.len()];
    let mut idx = vec![0usize; arrays.len()];

    for group in 0..ngroups {
        if let Some(g) = groups {
            let row = g.rows[group];
            for (i, get) in g.get.iter().enumerate() {
                vec[i] = get(row, data);
            }
        }
        for (j, a) in arrays.iter().enumerate() {
            idx[j] = 0;
            vec[offset + j] = a[0].clone();
        }
        loop {
            visit(&vec, group);
            match advance(&mut idx, arrays) {
                Some(from) => {
                    for j in from..arrays.len() {
                        vec[offset + j] = arrays[j][idx[j]].clone();
                    }
                }
                None => break,
            }
        }
    }
}

/// Steps the odometer; returns the first changed position, or `None` once
/// every combination has been visited.
fn advance(idx: &mut [usize], arrays: &[Vec<Value>]) -> Option<usize> {
    for j in (0..idx.len()).rev() {
        idx[j] += 1;
        if idx[j] < arrays[j].len() {
            return Some(j);
        }
        idx[j] = 0;
    }
    None
}

//! Reducer engine.
//!
//! Operators reading the same input fields share one `FieldReducer`, so each
//! field is evaluated once per row no matter how many aggregates consume it.
//! Reducers accumulate into one cell per group and write results into an
//! `OpValues` table indexed by operator id and group.

use crate::expr::{Field, NoOps, OpLookup, OpSpec, RowFn, TableExpr};
use crate::executor::groupby::GroupBySpec;
use crate::table::Table;
use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;
use hashbrown::HashMap;
use log::debug;
use verba_core::{Columns, Error, Result, Value};
use verba_ops::{registry, AggState, AggregateFn, Registers};

/// Operator results, one column per operator id and one cell per group.
#[derive(Clone, Debug, Default)]
pub struct OpValues {
    cols: Vec<Vec<Value>>,
}

impl OpValues {
    pub fn new(width: usize, size: usize) -> Self {
        OpValues {
            cols: vec![vec![Value::Null; size]; width],
        }
    }

    pub fn width(&self) -> usize {
        self.cols.len()
    }

    #[inline]
    pub fn get(&self, id: usize, index: usize) -> Value {
        self.cols
            .get(id)
            .and_then(|c| c.get(index))
            .cloned()
            .unwrap_or(Value::Null)
    }

    #[inline]
    pub fn set(&mut self, id: usize, index: usize, value: Value) {
        if let Some(cell) = self.cols.get_mut(id).and_then(|c| c.get_mut(index)) {
            *cell = value;
        }
    }

    pub fn column(&self, id: usize) -> &[Value] {
        self.cols.get(id).map_or(&[], |c| c.as_slice())
    }

    pub fn take_column(&mut self, id: usize) -> Vec<Value> {
        self.cols
            .get_mut(id)
            .map(core::mem::take)
            .unwrap_or_default()
    }
}

/// Incremental accumulator contract.
pub trait Reducer {
    type Cell;

    /// Operator ids this reducer writes.
    fn outputs(&self) -> &[usize];

    fn init(&self) -> Self::Cell;

    fn add(&self, cell: &mut Self::Cell, row: usize, data: &Columns);

    fn rem(&self, cell: &mut Self::Cell, row: usize, data: &Columns);

    /// Writes results for `index`; returns the number of values written.
    fn write(&self, cell: &mut Self::Cell, out: &mut OpValues, index: usize) -> usize;
}

/// Reducer for aggregates that read the same fields.
pub struct FieldReducer {
    fields: Vec<Field>,
    regs: Registers,
    ops: Vec<(usize, AggregateFn)>,
    outputs: Vec<usize>,
}

impl FieldReducer {
    fn new(fields: Vec<Field>) -> Self {
        FieldReducer {
            fields,
            regs: Registers::empty(),
            ops: Vec::new(),
            outputs: Vec::new(),
        }
    }

    fn push(&mut self, id: usize, op: AggregateFn, stream: bool) {
        self.regs.extend(op.requires(stream));
        self.ops.push((id, op));
        self.outputs.push(id);
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    #[inline]
    fn apply(&self, cell: &mut AggState, row: usize, data: &Columns, add: bool) {
        let mut step = |values: &[Value]| {
            if add {
                cell.add(values)
            } else {
                cell.rem(values)
            }
        };
        match self.fields.as_slice() {
            [] => step(&[]),
            [a] => step(&[a.eval(row, data)]),
            [a, b] => step(&[a.eval(row, data), b.eval(row, data)]),
            // rejected when the reducer is built
            _ => {}
        }
    }
}

impl Reducer for FieldReducer {
    type Cell = AggState;

    fn outputs(&self) -> &[usize] {
        &self.outputs
    }

    fn init(&self) -> AggState {
        AggState::new(self.regs)
    }

    fn add(&self, cell: &mut AggState, row: usize, data: &Columns) {
        self.apply(cell, row, data, true);
    }

    fn rem(&self, cell: &mut AggState, row: usize, data: &Columns) {
        self.apply(cell, row, data, false);
    }

    fn write(&self, cell: &mut AggState, out: &mut OpValues, index: usize) -> usize {
        for (id, op) in &self.ops {
            out.set(*id, index, op.value(cell));
        }
        self.ops.len()
    }
}

/// Validates aggregate operators and fuses them by input fields.
///
/// With `stream` set every operator must support removal.
pub fn reducers(ops: &[OpSpec], stream: bool) -> Result<Vec<FieldReducer>> {
    let mut out: Vec<FieldReducer> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for spec in ops {
        let def = registry::require(&spec.name)?;
        if spec.fields.len() > 2 {
            return Err(Error::field_arity(&spec.name, def.fields, spec.fields.len()));
        }
        let op = registry::create_aggregate(&spec.name, &spec.params)?;
        if op.arity() != spec.fields.len() {
            return Err(Error::field_arity(&spec.name, op.arity(), spec.fields.len()));
        }
        if stream && !op.removable() {
            return Err(Error::not_removable(&spec.name));
        }
        let slot = *index.entry(spec.field_key()).or_insert_with(|| {
            out.push(FieldReducer::new(spec.fields.clone()));
            out.len() - 1
        });
        out[slot].push(spec.id, op, stream);
    }
    Ok(out)
}

/// Accumulates every row of the table into a single cell.
pub fn reduce_flat<R: Reducer>(table: &Table, reducer: &R, out: &mut OpValues) {
    let mut cell = reducer.init();
    table.scan(false, |row, data| reducer.add(&mut cell, row, data));
    reducer.write(&mut cell, out, 0);
}

/// Accumulates rows into one cell per group.
pub fn reduce_groups<R: Reducer>(
    table: &Table,
    reducer: &R,
    groups: &GroupBySpec,
    out: &mut OpValues,
) {
    let mut cells: Vec<R::Cell> = (0..groups.size).map(|_| reducer.init()).collect();
    table.scan(false, |row, data| {
        reducer.add(&mut cells[groups.group_of(row)], row, data)
    });
    for (index, cell) in cells.iter_mut().enumerate() {
        reducer.write(cell, out, index);
    }
}

/// Computes aggregate operators, one value per group.
///
/// Every reducer runs over the same table in turn; an ungrouped table is a
/// single group, which still yields initial values when no rows pass.
pub fn aggregate(table: &Table, ops: &[OpSpec]) -> Result<OpValues> {
    let reducers = reducers(ops, false)?;
    let width = ops.iter().map(|op| op.id + 1).max().unwrap_or(0);
    let size = table.groups().map_or(1, |g| g.size);
    let mut out = OpValues::new(width, size);
    aggregate_into(table, &reducers, &mut out);
    debug!(
        "aggregate: {} ops in {} reducers over {} rows, {} groups",
        ops.len(),
        reducers.len(),
        table.num_rows(),
        size
    );
    Ok(out)
}

pub(crate) fn aggregate_into(table: &Table, reducers: &[FieldReducer], out: &mut OpValues) {
    for reducer in reducers {
        match table.groups() {
            Some(groups) => reduce_groups(table, reducer, groups, out),
            None => reduce_flat(table, reducer, out),
        }
    }
}

/// Resolves operator results through the group of a table row.
pub struct GroupLookup<'a> {
    pub values: &'a OpValues,
    pub groups: Option<&'a GroupBySpec>,
}

impl OpLookup for GroupLookup<'_> {
    #[inline]
    fn op(&self, id: usize, row: usize) -> Value {
        let index = self.groups.map_or(0, |g| g.group_of(row));
        self.values.get(id, index)
    }
}

/// Resolves operator results by group index.
pub struct IndexLookup<'a>(pub &'a OpValues);

impl OpLookup for IndexLookup<'_> {
    #[inline]
    fn op(&self, id: usize, index: usize) -> Value {
        self.0.get(id, index)
    }
}

/// Turns expressions over aggregates into plain row accessors.
///
/// Aggregates are computed once over the table's groups; each accessor looks
/// results up through the row's group.
pub fn aggregate_get(table: &Table, ops: &[OpSpec], exprs: &[TableExpr]) -> Result<Vec<RowFn>> {
    if ops.is_empty() {
        return Ok(exprs
            .iter()
            .map(|expr| {
                let expr = expr.clone();
                Rc::new(move |row, data: &Columns| expr.eval(row, data, &NoOps)) as RowFn
            })
            .collect());
    }

    let values = Rc::new(aggregate(table, ops)?);
    let groups = table.shared_groups();
    Ok(exprs
        .iter()
        .map(|expr| {
            let expr = expr.clone();
            let values = values.clone();
            let groups = groups.clone();
            Rc::new(move |row, data: &Columns| {
                let lookup = GroupLookup {
                    values: &values,
                    groups: groups.as_deref(),
                };
                expr.eval(row, data, &lookup)
            }) as RowFn
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::groupby::groupby_columns;
    use crate::expr::Compiled;
    use verba_core::{BitSet, Column};

    fn table() -> Table {
        Table::from_columns([
            ("k", Column::from_iter(["a", "a", "b"])),
            ("a", Column::from_iter([1i64, 2, 3])),
            ("b", Column::from(vec![Value::Null, Value::Int64(5), Value::Int64(7)])),
        ])
        .unwrap()
    }

    #[test]
    fn test_fuses_by_field() {
        let c = Compiled::new()
            .agg("s", "sum", &["a"])
            .agg("m", "max", &["a"])
            .agg("n", "count", &[])
            .agg("sb", "sum", &["b"]);
        let rs = reducers(&c.ops, false).unwrap();
        assert_eq!(rs.len(), 3);
        assert_eq!(rs[0].outputs(), [0, 1]);
        assert_eq!(rs[1].outputs(), [2]);
        assert_eq!(rs[2].outputs(), [3]);
    }

    #[test]
    fn test_flat_aggregate() {
        let c = Compiled::new()
            .agg("s", "sum", &["a"])
            .agg("v", "valid", &["b"])
            .agg("mb", "mean", &["b"]);
        let out = aggregate(&table(), &c.ops).unwrap();
        assert_eq!(out.get(0, 0), Value::Int64(6));
        assert_eq!(out.get(1, 0), Value::Int64(2));
        assert_eq!(out.get(2, 0), Value::Float64(6.0));
    }

    #[test]
    fn test_grouped_aggregate() {
        let t = groupby_columns(&table(), &["k"]).unwrap();
        let c = Compiled::new().agg("s", "sum", &["a"]).agg("n", "count", &[]);
        let out = aggregate(&t, &c.ops).unwrap();
        assert_eq!(out.column(0), [Value::Int64(3), Value::Int64(3)]);
        assert_eq!(out.column(1), [Value::Int64(2), Value::Int64(1)]);
    }

    #[test]
    fn test_empty_table_writes_initial_values() {
        let t = table().with_filter(BitSet::new(3));
        let c = Compiled::new().agg("n", "count", &[]).agg("s", "sum", &["a"]);
        let out = aggregate(&t, &c.ops).unwrap();
        assert_eq!(out.get(0, 0), Value::Int64(0));
        assert_eq!(out.get(1, 0), Value::Null);
    }

    #[test]
    fn test_setup_errors() {
        let window = Compiled::new().agg("r", "rank", &[]);
        assert!(matches!(
            aggregate(&table(), &window.ops),
            Err(Error::OperatorMisuse { .. })
        ));

        let unknown = Compiled::new().agg("x", "nope", &["a"]);
        assert!(matches!(
            aggregate(&table(), &unknown.ops),
            Err(Error::OperatorNotFound { .. })
        ));

        let wide = Compiled::new().agg("x", "sum", &["a", "b", "k"]);
        assert!(matches!(
            aggregate(&table(), &wide.ops),
            Err(Error::FieldArity { .. })
        ));

        let any = Compiled::new().agg("x", "any", &["a"]);
        assert!(matches!(
            reducers(&any.ops, true),
            Err(Error::NotRemovable { .. })
        ));
        assert!(reducers(&any.ops, false).is_ok());
    }

    #[test]
    fn test_aggregate_get_broadcasts() {
        let t = groupby_columns(&table(), &["k"]).unwrap();
        let mut c = Compiled::new();
        let id = c.add_op(OpSpec::new("sum", vec![Field::column("a")]));
        let c = c.add(
            "share",
            TableExpr::new(move |row, data, ops| {
                Value::Float64(data.value("a", row).as_number() / ops.op(id, row).as_number())
            }),
        );
        let get = aggregate_get(&t, &c.ops, &c.exprs).unwrap();
        assert_eq!(get[0](1, t.data()), Value::Float64(2.0 / 3.0));
        assert_eq!(get[0](2, t.data()), Value::Float64(1.0));
    }
}

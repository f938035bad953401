//! Join engine.
//!
//! Key conditions run as hash joins, arbitrary predicates as loop joins.
//! Both record matched row pairs plus per-side hit bitmaps, which drive the
//! outer-join emission of unmatched rows.

mod hash;
mod nested;
mod semi;

pub use semi::{antijoin, semijoin};
pub(crate) use hash::{build, row_key};

use crate::context::Limits;
use crate::expr::Field;
use crate::table::{ColumnSet, Table};
use alloc::format;
use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;
use log::debug;
use verba_core::{BitSet, Columns, Error, Result, Value};

/// Output cell of a joined row. Either side is `None` for outer rows.
pub type JoinFn = Rc<dyn Fn(Option<usize>, &Columns, Option<usize>, &Columns) -> Value>;

/// Two-row join predicate.
pub type JoinPredicate = Rc<dyn Fn(usize, &Columns, usize, &Columns) -> bool>;

#[derive(Clone, Debug)]
enum Source {
    Left(String),
    Right(String),
    Expr,
}

/// Output columns of a join.
#[derive(Clone, Default)]
pub struct JoinValues {
    names: Vec<String>,
    exprs: Vec<JoinFn>,
    sources: Vec<Source>,
}

impl JoinValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every left column followed by every right column; names present on
    /// both sides get `_1` and `_2` suffixes.
    pub fn all(left: &Table, right: &Table) -> Self {
        let lnames = left.column_names();
        let rnames = right.column_names();
        let mut values = Self::new();
        for name in lnames {
            if rnames.contains(name) {
                values = values.left_as(name, &format!("{}_1", name));
            } else {
                values = values.left(name);
            }
        }
        for name in rnames {
            if lnames.contains(name) {
                values = values.right_as(name, &format!("{}_2", name));
            } else {
                values = values.right(name);
            }
        }
        values
    }

    pub fn left(self, name: &str) -> Self {
        self.left_as(name, name)
    }

    pub fn left_as(mut self, name: &str, output: &str) -> Self {
        let col = String::from(name);
        self.sources.push(Source::Left(col.clone()));
        self.names.push(String::from(output));
        self.exprs.push(Rc::new(move |l, ld: &Columns, _r, _rd: &Columns| {
            l.map_or(Value::Null, |l| ld.value(&col, l))
        }));
        self
    }

    pub fn right(self, name: &str) -> Self {
        self.right_as(name, name)
    }

    pub fn right_as(mut self, name: &str, output: &str) -> Self {
        let col = String::from(name);
        self.sources.push(Source::Right(col.clone()));
        self.names.push(String::from(output));
        self.exprs.push(Rc::new(move |_l, _ld: &Columns, r, rd: &Columns| {
            r.map_or(Value::Null, |r| rd.value(&col, r))
        }));
        self
    }

    /// Adds a computed output column.
    pub fn add(
        mut self,
        name: &str,
        f: impl Fn(Option<usize>, &Columns, Option<usize>, &Columns) -> Value + 'static,
    ) -> Self {
        self.sources.push(Source::Expr);
        self.names.push(String::from(name));
        self.exprs.push(Rc::new(f));
        self
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    fn validate(&self, left: &Table, right: &Table) -> Result<()> {
        for source in &self.sources {
            match source {
                Source::Left(name) => {
                    left.data().require(name)?;
                }
                Source::Right(name) => {
                    right.data().require(name)?;
                }
                Source::Expr => {}
            }
        }
        Ok(())
    }
}

impl fmt::Debug for JoinValues {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JoinValues")
            .field("names", &self.names)
            .field("sources", &self.sources)
            .finish()
    }
}

/// How rows of the two tables match.
#[derive(Clone)]
pub enum JoinCondition {
    /// Equality of composite keys; missing keys never match.
    Keys { left: Vec<Field>, right: Vec<Field> },
    /// Arbitrary predicate over a left and a right row.
    Predicate(JoinPredicate),
}

impl JoinCondition {
    /// Key condition over computed fields.
    pub fn keys(left: Vec<Field>, right: Vec<Field>) -> Result<Self> {
        if left.len() != right.len() {
            return Err(Error::key_arity(left.len(), right.len()));
        }
        Ok(JoinCondition::Keys { left, right })
    }

    /// Key condition over named columns.
    pub fn columns(left: &[&str], right: &[&str]) -> Result<Self> {
        Self::keys(
            left.iter().map(|c| Field::column(*c)).collect(),
            right.iter().map(|c| Field::column(*c)).collect(),
        )
    }

    /// Key condition on columns sharing names across both tables.
    pub fn on(names: &[&str]) -> Self {
        let fields: Vec<Field> = names.iter().map(|c| Field::column(*c)).collect();
        JoinCondition::Keys {
            left: fields.clone(),
            right: fields,
        }
    }

    pub fn predicate(f: impl Fn(usize, &Columns, usize, &Columns) -> bool + 'static) -> Self {
        JoinCondition::Predicate(Rc::new(f))
    }

    pub(crate) fn validate(&self, left: &Table, right: &Table) -> Result<()> {
        if let JoinCondition::Keys { left: lk, right: rk } = self {
            if lk.len() != rk.len() {
                return Err(Error::key_arity(lk.len(), rk.len()));
            }
            for name in lk.iter().filter_map(Field::column_name) {
                left.data().require(name)?;
            }
            for name in rk.iter().filter_map(Field::column_name) {
                right.data().require(name)?;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for JoinCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JoinCondition::Keys { left, right } => f
                .debug_struct("Keys")
                .field("left", left)
                .field("right", right)
                .finish(),
            JoinCondition::Predicate(_) => f.write_str("Predicate"),
        }
    }
}

/// Join options: which unmatched rows to keep, plus resource limits.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct JoinOptions {
    /// Keep unmatched left rows.
    pub left: bool,
    /// Keep unmatched right rows.
    pub right: bool,
    pub limits: Limits,
}

impl JoinOptions {
    pub fn inner() -> Self {
        Self::default()
    }

    pub fn left() -> Self {
        JoinOptions {
            left: true,
            ..Self::default()
        }
    }

    pub fn right() -> Self {
        JoinOptions {
            right: true,
            ..Self::default()
        }
    }

    pub fn full() -> Self {
        JoinOptions {
            left: true,
            right: true,
            ..Self::default()
        }
    }

    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }
}

/// Row pairs emitted by a join.
pub(crate) struct Pairs {
    left: Vec<Option<usize>>,
    right: Vec<Option<usize>>,
    limit: Option<usize>,
    operation: &'static str,
}

impl Pairs {
    pub(crate) fn new(operation: &'static str, limits: &Limits) -> Self {
        Pairs {
            left: Vec::new(),
            right: Vec::new(),
            limit: limits.max_rows,
            operation,
        }
    }

    #[inline]
    pub(crate) fn push(&mut self, l: Option<usize>, r: Option<usize>) -> Result<()> {
        if let Some(limit) = self.limit {
            if self.left.len() >= limit {
                return Err(Error::row_limit(self.operation, limit, self.left.len() + 1));
            }
        }
        self.left.push(l);
        self.right.push(r);
        Ok(())
    }

    pub(crate) fn len(&self) -> usize {
        self.left.len()
    }
}

/// Per-side bitmaps of rows that found at least one match.
pub(crate) struct Hits {
    pub left: BitSet,
    pub right: BitSet,
}

impl Hits {
    pub(crate) fn new(left: &Table, right: &Table) -> Self {
        Hits {
            left: BitSet::new(left.total_rows()),
            right: BitSet::new(right.total_rows()),
        }
    }
}

/// Joins two tables.
///
/// Matched rows come first in scan order, then unmatched left rows, then
/// unmatched right rows as requested by `options`.
pub fn join(
    left: &Table,
    right: &Table,
    on: &JoinCondition,
    values: &JoinValues,
    options: &JoinOptions,
) -> Result<Table> {
    on.validate(left, right)?;
    values.validate(left, right)?;

    let mut pairs = Pairs::new("join", &options.limits);
    let mut hits = Hits::new(left, right);
    match on {
        JoinCondition::Keys { left: lk, right: rk } => {
            hash::hash_join(left, right, lk, rk, &mut pairs, &mut hits)?
        }
        JoinCondition::Predicate(pred) => nested::loop_join(
            left,
            right,
            pred.as_ref(),
            "join",
            &options.limits,
            &mut pairs,
            &mut hits,
        )?,
    }

    let matched = pairs.len();
    if options.left {
        for row in left.indices(true) {
            if !hits.left.get(row) {
                pairs.push(Some(row), None)?;
            }
        }
    }
    if options.right {
        for row in right.indices(true) {
            if !hits.right.get(row) {
                pairs.push(None, Some(row))?;
            }
        }
    }
    debug!(
        "join: {} matched rows, {} outer rows",
        matched,
        pairs.len() - matched
    );

    materialize(left, right, values, &pairs)
}

/// Cartesian product of two tables.
///
/// With `values` unset every column of both tables is output.
pub fn cross(
    left: &Table,
    right: &Table,
    values: Option<&JoinValues>,
    limits: &Limits,
) -> Result<Table> {
    let all;
    let values = match values {
        Some(v) => v,
        None => {
            all = JoinValues::all(left, right);
            &all
        }
    };
    values.validate(left, right)?;

    let mut pairs = Pairs::new("cross", limits);
    let mut hits = Hits::new(left, right);
    nested::loop_join(
        left,
        right,
        &|_, _, _, _| true,
        "cross",
        limits,
        &mut pairs,
        &mut hits,
    )?;
    materialize(left, right, values, &pairs)
}

fn materialize(left: &Table, right: &Table, values: &JoinValues, pairs: &Pairs) -> Result<Table> {
    let (ld, rd) = (left.data(), right.data());
    let mut cols = ColumnSet::new();
    for (name, expr) in values.names.iter().zip(&values.exprs) {
        let col: Vec<Value> = pairs
            .left
            .iter()
            .zip(&pairs.right)
            .map(|(&l, &r)| expr(l, ld, r, rd))
            .collect();
        cols.add_values(name.as_str(), col);
    }
    cols.into_table(pairs.len())
}

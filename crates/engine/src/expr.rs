//! Compiled operation input consumed by every verb.
//!
//! Expressions arrive already compiled into closures: `Field` accessors feed
//! operators, `TableExpr`s produce output cells, and `OpSpec`s describe the
//! aggregate and window operators the expressions may reference by id.

use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;
use verba_core::{Columns, Value};
use verba_ops::registry;

/// Per-row accessor.
pub type RowFn = Rc<dyn Fn(usize, &Columns) -> Value>;

/// Per-row expression with access to operator results.
pub type ExprFn = Rc<dyn Fn(usize, &Columns, &dyn OpLookup) -> Value>;

/// Resolves operator results for the row (or group) being evaluated.
pub trait OpLookup {
    fn op(&self, id: usize, row: usize) -> Value;
}

/// Lookup for contexts without operators.
pub struct NoOps;

impl OpLookup for NoOps {
    fn op(&self, _id: usize, _row: usize) -> Value {
        Value::Null
    }
}

/// Input field of an operator.
///
/// `key` identifies the field textually; operators whose fields share keys
/// are fused into one reducer.
#[derive(Clone)]
pub struct Field {
    key: String,
    column: Option<String>,
    get: RowFn,
}

impl Field {
    /// A field reading a column.
    pub fn column(name: impl Into<String>) -> Self {
        let name = name.into();
        let col = name.clone();
        Field {
            key: name.clone(),
            column: Some(name),
            get: Rc::new(move |row, data: &Columns| data.value(&col, row)),
        }
    }

    /// A field computed by an arbitrary accessor.
    pub fn new(key: impl Into<String>, get: impl Fn(usize, &Columns) -> Value + 'static) -> Self {
        Field {
            key: key.into(),
            column: None,
            get: Rc::new(get),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Column this field reads directly, if any.
    pub fn column_name(&self) -> Option<&str> {
        self.column.as_deref()
    }

    #[inline]
    pub fn eval(&self, row: usize, data: &Columns) -> Value {
        (self.get)(row, data)
    }

    pub fn getter(&self) -> RowFn {
        self.get.clone()
    }
}

impl fmt::Debug for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Field").field(&self.key).finish()
    }
}

/// Output expression.
#[derive(Clone)]
pub struct TableExpr {
    get: ExprFn,
    field: Option<usize>,
    column: Option<String>,
}

impl TableExpr {
    /// An expression that may consult operator results.
    pub fn new(get: impl Fn(usize, &Columns, &dyn OpLookup) -> Value + 'static) -> Self {
        TableExpr {
            get: Rc::new(get),
            field: None,
            column: None,
        }
    }

    /// A plain row expression.
    pub fn row(get: impl Fn(usize, &Columns) -> Value + 'static) -> Self {
        Self::new(move |row, data, _ops| get(row, data))
    }

    /// A direct column reference.
    pub fn column(name: impl Into<String>) -> Self {
        let name = name.into();
        let col = name.clone();
        TableExpr {
            get: Rc::new(move |row, data: &Columns, _ops: &dyn OpLookup| data.value(&col, row)),
            field: None,
            column: Some(name),
        }
    }

    /// A direct reference to the result of operator `id`.
    pub fn op(id: usize) -> Self {
        TableExpr {
            get: Rc::new(move |row, _data: &Columns, ops: &dyn OpLookup| ops.op(id, row)),
            field: Some(id),
            column: None,
        }
    }

    /// A constant.
    pub fn constant(value: Value) -> Self {
        Self::new(move |_, _, _| value.clone())
    }

    /// Operator id when this expression passes an operator result through.
    pub fn field(&self) -> Option<usize> {
        self.field
    }

    /// Column name when this expression is a plain column reference.
    pub fn column_name(&self) -> Option<&str> {
        self.column.as_deref()
    }

    #[inline]
    pub fn eval(&self, row: usize, data: &Columns, ops: &dyn OpLookup) -> Value {
        (self.get)(row, data, ops)
    }
}

impl fmt::Debug for TableExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TableExpr")
            .field("field", &self.field)
            .field("column", &self.column)
            .finish()
    }
}

/// Window frame offsets relative to the current row.
///
/// `None` is unbounded in that direction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Frame {
    pub preceding: Option<usize>,
    pub following: Option<usize>,
}

impl Frame {
    /// Builds a frame from signed offsets, taking magnitudes.
    pub fn new(f0: Option<i64>, f1: Option<i64>) -> Self {
        Frame {
            preceding: f0.map(|v| v.unsigned_abs() as usize),
            following: f1.map(|v| v.unsigned_abs() as usize),
        }
    }

    pub fn unbounded() -> Self {
        Frame::default()
    }

    /// True if either side is bounded.
    pub fn is_bounded(&self) -> bool {
        self.preceding.is_some() || self.following.is_some()
    }

    /// True if rows ever leave the frame.
    pub fn is_sliding(&self) -> bool {
        self.preceding.is_some()
    }
}

/// Operator descriptor.
#[derive(Clone, Debug)]
pub struct OpSpec {
    pub id: usize,
    pub name: String,
    pub fields: Vec<Field>,
    pub params: Vec<Value>,
    pub frame: Option<Frame>,
    pub peers: bool,
}

impl OpSpec {
    pub fn new(name: impl Into<String>, fields: Vec<Field>) -> Self {
        OpSpec {
            id: 0,
            name: name.into(),
            fields,
            params: Vec::new(),
            frame: None,
            peers: false,
        }
    }

    pub fn with_params(mut self, params: Vec<Value>) -> Self {
        self.params = params;
        self
    }

    pub fn with_frame(mut self, frame: Frame) -> Self {
        self.frame = Some(frame);
        self
    }

    pub fn with_peers(mut self, peers: bool) -> Self {
        self.peers = peers;
        self
    }

    /// Window functions and aggregates over a bounded frame run in the
    /// window engine; everything else is a plain group aggregate.
    pub fn is_windowed(&self) -> bool {
        registry::is_window_only(&self.name) || self.frame.map_or(false, |f| f.is_bounded())
    }

    /// Textual key of the operator's input fields.
    pub fn field_key(&self) -> String {
        self.fields
            .iter()
            .map(Field::key)
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// Compiled `{names, exprs, ops}` descriptor.
#[derive(Clone, Debug, Default)]
pub struct Compiled {
    pub names: Vec<String>,
    pub exprs: Vec<TableExpr>,
    pub ops: Vec<OpSpec>,
}

impl Compiled {
    pub fn new() -> Self {
        Self::default()
    }

    /// Column references, output under their own names.
    pub fn columns(names: &[&str]) -> Self {
        names.iter().fold(Self::new(), |c, name| c.column(name))
    }

    /// `array_agg_distinct` over each named column.
    pub fn distinct_values(names: &[&str]) -> Self {
        names.iter().fold(Self::new(), |c, name| {
            c.agg_fields(name, "array_agg_distinct", alloc::vec![Field::column(*name)], Vec::new())
        })
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Adds an output expression.
    pub fn add(mut self, name: impl Into<String>, expr: TableExpr) -> Self {
        self.names.push(name.into());
        self.exprs.push(expr);
        self
    }

    /// Adds a column reference output.
    pub fn column(self, name: &str) -> Self {
        self.add(name, TableExpr::column(name))
    }

    /// Registers an operator and returns its id.
    pub fn add_op(&mut self, mut spec: OpSpec) -> usize {
        let id = self.ops.len();
        spec.id = id;
        self.ops.push(spec);
        id
    }

    /// Adds an operator whose result is output directly.
    pub fn op(mut self, name: impl Into<String>, spec: OpSpec) -> Self {
        let id = self.add_op(spec);
        self.add(name, TableExpr::op(id))
    }

    /// Adds an aggregate over named columns.
    pub fn agg(self, name: &str, op: &str, columns: &[&str]) -> Self {
        let fields = columns.iter().map(|c| Field::column(*c)).collect();
        self.op(name, OpSpec::new(op, fields))
    }

    /// Adds an operator over arbitrary fields with parameters.
    pub fn agg_fields(
        self,
        name: &str,
        op: &str,
        fields: Vec<Field>,
        params: Vec<Value>,
    ) -> Self {
        self.op(name, OpSpec::new(op, fields).with_params(params))
    }

    /// Adds a framed operator over named columns.
    pub fn window(
        self,
        name: &str,
        op: &str,
        columns: &[&str],
        params: Vec<Value>,
        frame: Option<Frame>,
        peers: bool,
    ) -> Self {
        let fields = columns.iter().map(|c| Field::column(*c)).collect();
        let mut spec = OpSpec::new(op, fields).with_params(params).with_peers(peers);
        spec.frame = frame;
        self.op(name, spec)
    }
}

//! Column buffers and the named column collection backing a table.

use crate::error::{Error, Result};
use crate::value::Value;
use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec::Vec;
use hashbrown::HashMap;

/// An immutable, cheaply clonable column buffer.
#[derive(Clone, Debug, PartialEq)]
pub struct Column(Rc<[Value]>);

impl Column {
    /// Creates a column from owned values.
    pub fn new(values: Vec<Value>) -> Self {
        Column(values.into())
    }

    /// Number of cells.
    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the cell at `row`, or Null past the end.
    #[inline]
    pub fn get(&self, row: usize) -> Value {
        self.0.get(row).cloned().unwrap_or(Value::Null)
    }

    /// Borrowing accessor.
    #[inline]
    pub fn get_ref(&self, row: usize) -> Option<&Value> {
        self.0.get(row)
    }

    pub fn iter(&self) -> core::slice::Iter<'_, Value> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[Value] {
        &self.0
    }

    /// Returns true if both columns share the same buffer.
    pub fn ptr_eq(&self, other: &Column) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl From<Vec<Value>> for Column {
    fn from(values: Vec<Value>) -> Self {
        Column::new(values)
    }
}

impl<T: Into<Value>> FromIterator<T> for Column {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Column::new(iter.into_iter().map(Into::into).collect())
    }
}

/// Ordered collection of equal-length named columns.
#[derive(Clone, Debug, Default)]
pub struct Columns {
    names: Vec<String>,
    lookup: HashMap<String, usize>,
    columns: Vec<Column>,
    num_rows: usize,
}

impl Columns {
    /// Builds a column collection, checking that every column has the same length.
    ///
    /// A later column with an already seen name replaces the earlier one in place.
    pub fn new<S: Into<String>>(pairs: impl IntoIterator<Item = (S, Column)>) -> Result<Self> {
        let mut out = Columns::default();
        let mut first = true;
        for (name, column) in pairs {
            let name = name.into();
            if first {
                out.num_rows = column.len();
                first = false;
            } else if column.len() != out.num_rows {
                return Err(Error::length_mismatch(name, out.num_rows, column.len()));
            }
            out.insert(name, column);
        }
        Ok(out)
    }

    /// Creates a column collection with a fixed row count and no columns.
    pub fn with_rows(num_rows: usize) -> Self {
        Columns {
            num_rows,
            ..Default::default()
        }
    }

    fn insert(&mut self, name: String, column: Column) {
        match self.lookup.get(&name) {
            Some(&idx) => self.columns[idx] = column,
            None => {
                self.lookup.insert(name.clone(), self.columns.len());
                self.names.push(name);
                self.columns.push(column);
            }
        }
    }

    /// Number of rows in every column.
    #[inline]
    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    /// Number of columns.
    #[inline]
    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    /// Column names in insertion order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Column position by name.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.lookup.get(name).copied()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.index_of(name).map(|i| &self.columns[i])
    }

    /// Column by name, failing with `ColumnNotFound`.
    pub fn require(&self, name: &str) -> Result<&Column> {
        self.column(name)
            .ok_or_else(|| Error::column_not_found(name))
    }

    pub fn column_at(&self, index: usize) -> Option<&Column> {
        self.columns.get(index)
    }

    /// Cell value; Null for an unknown column or out-of-range row.
    #[inline]
    pub fn value(&self, name: &str, row: usize) -> Value {
        match self.column(name) {
            Some(col) => col.get(row),
            None => Value::Null,
        }
    }

    /// Iterates `(name, column)` pairs in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Column)> {
        self.names
            .iter()
            .map(String::as_str)
            .zip(self.columns.iter())
    }
}

//! Builder for the columns of a derived table.

use super::Table;
use crate::executor::groupby::GroupBySpec;
use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec::Vec;
use verba_core::{Column, Columns, Error, Result, Value};

/// Ordered set of named columns under construction.
///
/// Adding a name that already exists replaces the column in place, so
/// overwritten columns keep their position.
#[derive(Clone, Debug, Default)]
pub struct ColumnSet {
    names: Vec<String>,
    columns: Vec<Column>,
    groups: Option<Rc<GroupBySpec>>,
}

impl ColumnSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from every column of `table`, sharing the buffers.
    pub fn from_table(table: &Table) -> Self {
        let mut set = Self::new();
        for (name, col) in table.data().iter() {
            set.add(name, col.clone());
        }
        set
    }

    pub fn add(&mut self, name: impl Into<String>, column: Column) -> &mut Self {
        let name = name.into();
        match self.names.iter().position(|n| *n == name) {
            Some(i) => self.columns[i] = column,
            None => {
                self.names.push(name);
                self.columns.push(column);
            }
        }
        self
    }

    pub fn add_values(&mut self, name: impl Into<String>, values: Vec<Value>) -> &mut Self {
        self.add(name, Column::new(values))
    }

    pub fn has(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    pub fn remove(&mut self, name: &str) -> &mut Self {
        if let Some(i) = self.names.iter().position(|n| n == name) {
            self.names.remove(i);
            self.columns.remove(i);
        }
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

    /// Attaches a group-by spec to the resulting table.
    pub fn groupby(&mut self, groups: Rc<GroupBySpec>) -> &mut Self {
        self.groups = Some(groups);
        self
    }

    /// Validates column lengths and returns the column data.
    ///
    /// With `rows` given every column must have exactly that many values and
    /// an empty set still reports that row count.
    pub(crate) fn finish(
        self,
        rows: Option<usize>,
    ) -> Result<(Columns, Option<Rc<GroupBySpec>>)> {
        if let Some(n) = rows {
            for (name, col) in self.names.iter().zip(&self.columns) {
                if col.len() != n {
                    return Err(Error::length_mismatch(name.clone(), n, col.len()));
                }
            }
        }
        let columns = if self.names.is_empty() {
            Columns::with_rows(rows.unwrap_or(0))
        } else {
            Columns::new(self.names.into_iter().zip(self.columns))?
        };
        Ok((columns, self.groups))
    }

    /// Builds a fresh table without filter or order.
    pub fn into_table(self, rows: usize) -> Result<Table> {
        let (columns, groups) = self.finish(Some(rows))?;
        let table = Table::new(columns);
        Ok(match groups {
            Some(g) => Table {
                groups: Some(g),
                ..table
            },
            None => table,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_replaces_in_place() {
        let mut set = ColumnSet::new();
        set.add("a", Column::from_iter([1i64]))
            .add("b", Column::from_iter([2i64]))
            .add("a", Column::from_iter([3i64]));
        assert_eq!(set.names(), ["a", "b"]);
        let t = set.into_table(1).unwrap();
        assert_eq!(t.get("a", 0), Value::Int64(3));
    }

    #[test]
    fn test_remove_and_has() {
        let mut set = ColumnSet::new();
        set.add_values("a", alloc::vec![Value::Null]);
        assert!(set.has("a"));
        set.remove("a");
        assert!(set.is_empty());
        let t = set.into_table(4).unwrap();
        assert_eq!(t.num_rows(), 4);
        assert_eq!(t.num_cols(), 0);
    }

    #[test]
    fn test_length_checked() {
        let mut set = ColumnSet::new();
        set.add("a", Column::from_iter([1i64, 2]));
        assert!(matches!(
            set.into_table(3),
            Err(Error::LengthMismatch { .. })
        ));
    }
}

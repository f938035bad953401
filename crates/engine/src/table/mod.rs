//! Table views over shared column data.
//!
//! A `Table` is an immutable handle over reference-counted columns plus three
//! optional facets: a row filter, an order comparator and a group-by spec.
//! Verbs build new views; facets they do not touch are shared by reference.

mod column_set;
mod order;
mod regroup;

pub use column_set::ColumnSet;
pub use order::{by_columns, by_fields, Order};

use crate::executor::groupby::GroupBySpec;
use crate::expr::RowFn;
use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;
use core::cmp::Ordering;
use core::fmt;
use verba_core::{BitSet, Column, Columns, Result, Value};

/// Row comparator consulted lazily wherever iteration must respect order.
pub type Comparator = Rc<dyn Fn(usize, usize, &Columns) -> Ordering>;

/// Immutable table view.
#[derive(Clone)]
pub struct Table {
    data: Rc<Columns>,
    filter: Option<Rc<BitSet>>,
    order: Option<Comparator>,
    groups: Option<Rc<GroupBySpec>>,
}

impl Table {
    /// Creates an unfiltered, unordered, ungrouped table.
    pub fn new(data: Columns) -> Self {
        Table {
            data: Rc::new(data),
            filter: None,
            order: None,
            groups: None,
        }
    }

    /// Creates a table from named columns of equal length.
    pub fn from_columns<S: Into<String>>(
        pairs: impl IntoIterator<Item = (S, Column)>,
    ) -> Result<Self> {
        Ok(Self::new(Columns::new(pairs)?))
    }

    /// Backing column data, including filtered-out rows.
    pub fn data(&self) -> &Columns {
        &self.data
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.data.column(name)
    }

    pub fn column_names(&self) -> &[String] {
        self.data.names()
    }

    pub fn num_cols(&self) -> usize {
        self.data.num_columns()
    }

    /// Number of rows passing the filter.
    pub fn num_rows(&self) -> usize {
        match &self.filter {
            Some(f) => f.count(),
            None => self.data.num_rows(),
        }
    }

    /// Number of rows in the backing columns.
    pub fn total_rows(&self) -> usize {
        self.data.num_rows()
    }

    pub fn is_filtered(&self) -> bool {
        self.filter.is_some()
    }

    pub fn is_ordered(&self) -> bool {
        self.order.is_some()
    }

    pub fn is_grouped(&self) -> bool {
        self.groups.is_some()
    }

    /// Row filter, if any.
    pub fn mask(&self) -> Option<&BitSet> {
        self.filter.as_deref()
    }

    pub fn comparator(&self) -> Option<&Comparator> {
        self.order.as_ref()
    }

    pub fn groups(&self) -> Option<&GroupBySpec> {
        self.groups.as_deref()
    }

    pub(crate) fn shared_groups(&self) -> Option<Rc<GroupBySpec>> {
        self.groups.clone()
    }

    /// Cell value of the backing data.
    pub fn get(&self, name: &str, row: usize) -> Value {
        self.data.value(name, row)
    }

    /// Accessor for a named column, failing if the column is missing.
    pub fn getter(&self, name: &str) -> Result<RowFn> {
        self.data.require(name)?;
        let name = String::from(name);
        Ok(Rc::new(move |row, data: &Columns| data.value(&name, row)))
    }

    /// Visits every row passing the filter.
    ///
    /// Rows come in ascending index order, or in comparator order when
    /// `ordered` is set and an order is attached.
    pub fn scan<F: FnMut(usize, &Columns)>(&self, ordered: bool, mut visit: F) {
        let data = &*self.data;
        if ordered && self.order.is_some() {
            for row in self.indices(true) {
                visit(row, data);
            }
            return;
        }
        match &self.filter {
            Some(filter) => filter.scan(|row| visit(row, data)),
            None => (0..data.num_rows()).for_each(|row| visit(row, data)),
        }
    }

    /// Indices of rows passing the filter, sorted by the comparator if
    /// requested. Sorting is stable, so ties keep index order.
    pub fn indices(&self, ordered: bool) -> Vec<usize> {
        let mut idx: Vec<usize> = match &self.filter {
            Some(filter) => filter.iter().collect(),
            None => (0..self.data.num_rows()).collect(),
        };
        if ordered {
            if let Some(compare) = &self.order {
                let data = &*self.data;
                idx.sort_by(|&a, &b| compare(a, b, data));
            }
        }
        idx
    }

    /// Row indices per group, in group id order.
    ///
    /// An ungrouped table is a single partition.
    pub fn partitions(&self, ordered: bool) -> Vec<Vec<usize>> {
        let groups = match &self.groups {
            Some(g) => g,
            None => return vec![self.indices(ordered)],
        };
        let mut parts: Vec<Vec<usize>> = vec![Vec::new(); groups.size];
        self.scan(false, |row, _| parts[groups.keys[row] as usize].push(row));
        if ordered {
            if let Some(compare) = &self.order {
                let data = &*self.data;
                for part in &mut parts {
                    part.sort_by(|&a, &b| compare(a, b, data));
                }
            }
        }
        parts
    }

    /// Returns a view with a new filter; groups are compacted to the groups
    /// that still have rows.
    pub fn with_filter(&self, filter: BitSet) -> Table {
        let groups = self
            .groups
            .as_ref()
            .map(|g| regroup::regroup(g, &filter));
        Table {
            data: self.data.clone(),
            filter: Some(Rc::new(filter)),
            order: self.order.clone(),
            groups,
        }
    }

    /// Returns a view ordered by `compare`.
    pub fn with_order(&self, compare: Comparator) -> Table {
        Table {
            order: Some(compare),
            ..self.clone()
        }
    }

    /// Returns a view without ordering.
    pub fn unorder(&self) -> Table {
        Table {
            order: None,
            ..self.clone()
        }
    }

    /// Returns a view grouped by `groups`.
    pub fn with_groups(&self, groups: GroupBySpec) -> Table {
        Table {
            groups: Some(Rc::new(groups)),
            ..self.clone()
        }
    }

    /// Returns a view without grouping.
    pub fn ungroup(&self) -> Table {
        Table {
            groups: None,
            ..self.clone()
        }
    }

    /// Materializes filtered and ordered rows (or the given indices) into
    /// dense columns. Filter and order are dropped; groups are re-indexed.
    pub fn reify(&self, indices: Option<&[usize]>) -> Result<Table> {
        if indices.is_none() && !self.is_ordered() {
            match &self.filter {
                None => return Ok(self.clone()),
                Some(f) if f.count() == self.total_rows() => {
                    return Ok(Table {
                        filter: None,
                        ..self.clone()
                    });
                }
                _ => {}
            }
        }

        let owned;
        let rows: &[usize] = match indices {
            Some(idx) => idx,
            None => {
                owned = self.indices(true);
                &owned
            }
        };

        let data = &*self.data;
        let pairs = data.iter().map(|(name, col)| {
            let values: Vec<Value> = rows.iter().map(|&r| col.get(r)).collect();
            (String::from(name), Column::new(values))
        });
        let mut columns = Columns::new(pairs)?;
        if columns.num_columns() == 0 {
            columns = Columns::with_rows(rows.len());
        }

        let groups = self
            .groups
            .as_ref()
            .map(|g| Rc::new(regroup::reindex(g, rows)));

        Ok(Table {
            data: Rc::new(columns),
            filter: None,
            order: None,
            groups,
        })
    }

    /// Creates a view over new column data, keeping this view's facets.
    ///
    /// The column set's group-by spec, if any, replaces the current one.
    /// Fails with `LengthMismatch` if the columns do not cover every backing
    /// row.
    pub fn create(&self, cols: ColumnSet) -> Result<Table> {
        let (columns, groups) = cols.finish(Some(self.total_rows()))?;
        Ok(Table {
            data: Rc::new(columns),
            filter: self.filter.clone(),
            order: self.order.clone(),
            groups: groups.or_else(|| self.groups.clone()),
        })
    }

    /// Values of a column for rows passing the filter, in scan order.
    pub fn column_values(&self, name: &str) -> Result<Vec<Value>> {
        let col = self.data.require(name)?;
        Ok(self.indices(true).into_iter().map(|r| col.get(r)).collect())
    }
}

impl fmt::Debug for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Table")
            .field("columns", &self.data.names())
            .field("num_rows", &self.num_rows())
            .field("total_rows", &self.total_rows())
            .field("ordered", &self.is_ordered())
            .field("groups", &self.groups.as_ref().map(|g| g.size))
            .finish()
    }
}

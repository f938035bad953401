//! Sort orders and row comparators.

use super::Comparator;
use crate::expr::RowFn;
use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec::Vec;
use core::cmp::Ordering;
use verba_core::Columns;

/// Sort direction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Order {
    /// Ascending order (smallest first)
    Asc,
    /// Descending order (largest first)
    Desc,
}

impl Order {
    /// Applies this order to a comparison result.
    #[inline]
    pub fn apply(&self, ord: Ordering) -> Ordering {
        match self {
            Order::Asc => ord,
            Order::Desc => ord.reverse(),
        }
    }
}

/// Lexicographic comparator over named columns.
///
/// Values compare by `Value`'s total order: nulls sort first ascending,
/// NaN after every number.
pub fn by_columns(keys: &[(&str, Order)]) -> Comparator {
    let keys: Vec<(String, Order)> = keys
        .iter()
        .map(|(name, order)| (String::from(*name), *order))
        .collect();
    Rc::new(move |a, b, data: &Columns| {
        for (name, order) in &keys {
            let col = match data.column(name) {
                Some(col) => col,
                None => continue,
            };
            let ord = match (col.get_ref(a), col.get_ref(b)) {
                (Some(x), Some(y)) => x.cmp(y),
                _ => Ordering::Equal,
            };
            if ord != Ordering::Equal {
                return order.apply(ord);
            }
        }
        Ordering::Equal
    })
}

/// Lexicographic comparator over computed keys.
pub fn by_fields(keys: Vec<(RowFn, Order)>) -> Comparator {
    Rc::new(move |a, b, data: &Columns| {
        for (get, order) in &keys {
            let ord = get(a, data).cmp(&get(b, data));
            if ord != Ordering::Equal {
                return order.apply(ord);
            }
        }
        Ordering::Equal
    })
}

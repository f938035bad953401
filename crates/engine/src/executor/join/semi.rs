//! Semi-join and anti-join filters.

use super::hash::{build, row_key};
use super::JoinCondition;
use crate::context::Limits;
use crate::table::Table;
use alloc::vec::Vec;
use log::debug;
use verba_core::{BitSet, Result};

/// Marks left rows with at least one match on the right.
fn matches(left: &Table, right: &Table, on: &JoinCondition, limits: &Limits) -> Result<BitSet> {
    on.validate(left, right)?;
    let mut bits = BitSet::new(left.total_rows());
    match on {
        JoinCondition::Keys { left: lk, right: rk } => {
            let index = build(right, rk);
            let mut buf = Vec::with_capacity(lk.len());
            left.scan(false, |row, data| {
                if let Some(key) = row_key(lk, row, data, &mut buf) {
                    if index.contains_key(&key) {
                        bits.set(row);
                    }
                }
            });
        }
        JoinCondition::Predicate(pred) => {
            let rrows = right.indices(false);
            limits.check_pairs("semijoin", left.num_rows().saturating_mul(rrows.len()))?;
            let rd = right.data();
            left.scan(false, |row, data| {
                if rrows.iter().any(|&r| pred(row, data, r, rd)) {
                    bits.set(row);
                }
            });
        }
    }
    Ok(bits)
}

/// Keeps left rows that match at least one right row.
pub fn semijoin(left: &Table, right: &Table, on: &JoinCondition, limits: &Limits) -> Result<Table> {
    let bits = matches(left, right, on, limits)?;
    debug!("semijoin: kept {} of {} rows", bits.count(), left.num_rows());
    Ok(left.with_filter(bits))
}

/// Keeps left rows that match no right row.
pub fn antijoin(left: &Table, right: &Table, on: &JoinCondition, limits: &Limits) -> Result<Table> {
    let hit = matches(left, right, on, limits)?;
    let mut bits = hit.not();
    if let Some(mask) = left.mask() {
        bits = bits.and(mask);
    }
    debug!("antijoin: kept {} of {} rows", bits.count(), left.num_rows());
    Ok(left.with_filter(bits))
}

#[cfg(test)]
mod tests {
    use super::*;
    use verba_core::{Column, Error, Value};

    fn left() -> Table {
        Table::from_columns([("k", Column::from_iter([1i64, 2, 3, 4]))]).unwrap()
    }

    fn right() -> Table {
        Table::from_columns([(
            "k",
            Column::from(alloc::vec![Value::Int64(2), Value::Null, Value::Float64(4.0)]),
        )])
        .unwrap()
    }

    #[test]
    fn test_semi_and_anti_partition_rows() {
        let l = left().with_filter(BitSet::from_indices(4, [0, 1, 3]));
        let on = JoinCondition::on(&["k"]);
        let semi = semijoin(&l, &right(), &on, &Limits::unbounded()).unwrap();
        let anti = antijoin(&l, &right(), &on, &Limits::unbounded()).unwrap();
        assert_eq!(semi.indices(false), [1, 3]);
        assert_eq!(anti.indices(false), [0]);
    }

    #[test]
    fn test_predicate_semijoin() {
        let on = JoinCondition::predicate(|a, ld, b, rd| {
            ld.value("k", a).as_number() < rd.value("k", b).as_number()
        });
        let semi = semijoin(&left(), &right(), &on, &Limits::unbounded()).unwrap();
        assert_eq!(semi.indices(false), [0, 1, 2]);
        assert!(matches!(
            semijoin(&left(), &right(), &on, &Limits::unbounded().with_max_pairs(3)),
            Err(Error::RowLimit { .. })
        ));
    }
}

//! Hash join.

use super::{Hits, Pairs};
use crate::expr::Field;
use crate::table::Table;
use alloc::vec::Vec;
use hashbrown::HashMap;
use log::debug;
use verba_core::{Columns, Key, Result, Value};

/// Composite key of a row, or `None` if any part is missing.
#[inline]
pub(crate) fn row_key(fields: &[Field], row: usize, data: &Columns, buf: &mut Vec<Value>) -> Option<Key> {
    buf.clear();
    buf.extend(fields.iter().map(|f| f.eval(row, data)));
    let key = Key::composite(buf.as_slice());
    (!key.is_missing()).then_some(key)
}

/// Hash table from key to matching rows, in scan order.
pub(crate) fn build(table: &Table, fields: &[Field]) -> HashMap<Key, Vec<usize>> {
    let mut index: HashMap<Key, Vec<usize>> = HashMap::with_capacity(table.num_rows());
    let mut buf = Vec::with_capacity(fields.len());
    table.scan(true, |row, data| {
        if let Some(key) = row_key(fields, row, data, &mut buf) {
            index.entry(key).or_default().push(row);
        }
    });
    index
}

/// Equi-join on composite keys.
///
/// The side with fewer rows is hashed and the other side is scanned, so
/// matches come out grouped by the scanned side's rows.
pub(super) fn hash_join(
    left: &Table,
    right: &Table,
    lkeys: &[Field],
    rkeys: &[Field],
    pairs: &mut Pairs,
    hits: &mut Hits,
) -> Result<()> {
    let hash_right = left.num_rows() >= right.num_rows();
    let (hashed, scanned, hkeys, skeys) = if hash_right {
        (right, left, rkeys, lkeys)
    } else {
        (left, right, lkeys, rkeys)
    };
    debug!(
        "hash join: hashing {} side ({} rows), scanning {} rows",
        if hash_right { "right" } else { "left" },
        hashed.num_rows(),
        scanned.num_rows()
    );

    let index = build(hashed, hkeys);
    let data = scanned.data();
    let mut buf = Vec::with_capacity(skeys.len());
    for row in scanned.indices(true) {
        let matches = match row_key(skeys, row, data, &mut buf).and_then(|k| index.get(&k)) {
            Some(m) => m,
            None => continue,
        };
        for &other in matches {
            let (l, r) = if hash_right { (row, other) } else { (other, row) };
            pairs.push(Some(l), Some(r))?;
            hits.left.set(l);
            hits.right.set(r);
        }
    }
    Ok(())
}

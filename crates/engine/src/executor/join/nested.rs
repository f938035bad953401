//! Nested loop join.

use super::{Hits, Pairs};
use crate::context::Limits;
use crate::table::Table;
use log::debug;
use verba_core::{Columns, Result};

/// Evaluates `pred` for every left/right row pair.
///
/// The pair count is checked against `limits.max_pairs` before any row is
/// visited.
pub(super) fn loop_join(
    left: &Table,
    right: &Table,
    pred: &dyn Fn(usize, &Columns, usize, &Columns) -> bool,
    operation: &str,
    limits: &Limits,
    pairs: &mut Pairs,
    hits: &mut Hits,
) -> Result<()> {
    let lrows = left.indices(true);
    let rrows = right.indices(true);
    limits.check_pairs(operation, lrows.len().saturating_mul(rrows.len()))?;
    debug!(
        "{}: loop over {} x {} rows",
        operation,
        lrows.len(),
        rrows.len()
    );

    let (ld, rd) = (left.data(), right.data());
    for &l in &lrows {
        for &r in &rrows {
            if pred(l, ld, r, rd) {
                pairs.push(Some(l), Some(r))?;
                hits.left.set(l);
                hits.right.set(r);
            }
        }
    }
    Ok(())
}

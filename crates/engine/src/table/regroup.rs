//! Group re-indexing after filtering or materialization.

use crate::executor::groupby::GroupBySpec;
use alloc::rc::Rc;
use alloc::vec;
use alloc::vec::Vec;
use verba_core::BitSet;

const GONE: u32 = u32::MAX;

/// Adapts `groups` to a new row filter.
///
/// If every group keeps at least one row the spec is shared unchanged.
/// Otherwise ids are compacted, preserving the relative order of the
/// surviving groups.
pub(crate) fn regroup(groups: &Rc<GroupBySpec>, filter: &BitSet) -> Rc<GroupBySpec> {
    let mut alive = BitSet::new(groups.size);
    filter.scan(|row| alive.set(groups.keys[row] as usize));
    if alive.count() == groups.size {
        return groups.clone();
    }

    let remap = remap(&alive, groups.size);
    let keys = groups
        .keys
        .iter()
        .map(|&k| match remap[k as usize] {
            GONE => 0,
            id => id,
        })
        .collect();
    let rows = alive.iter().map(|g| groups.rows[g]).collect();

    Rc::new(GroupBySpec {
        names: groups.names.clone(),
        get: groups.get.clone(),
        rows,
        size: alive.count(),
        keys,
    })
}

/// Builds the spec for a materialized table whose row `i` is old row
/// `indices[i]`.
///
/// Exemplars move to each group's first position in the new data.
pub(crate) fn reindex(groups: &GroupBySpec, indices: &[usize]) -> GroupBySpec {
    let mut alive = BitSet::new(groups.size);
    for &row in indices {
        alive.set(groups.keys[row] as usize);
    }
    let remap = remap(&alive, groups.size);
    let size = alive.count();

    let mut rows = vec![usize::MAX; size];
    let keys: Vec<u32> = indices
        .iter()
        .enumerate()
        .map(|(i, &row)| {
            let id = remap[groups.keys[row] as usize];
            if rows[id as usize] == usize::MAX {
                rows[id as usize] = i;
            }
            id
        })
        .collect();

    GroupBySpec {
        names: groups.names.clone(),
        get: groups.get.clone(),
        rows,
        size,
        keys,
    }
}

fn remap(alive: &BitSet, size: usize) -> Vec<u32> {
    let mut remap = vec![GONE; size];
    for (new, old) in alive.iter().enumerate() {
        remap[old] = new as u32;
    }
    remap
}

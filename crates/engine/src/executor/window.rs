//! Window engine.
//!
//! Each partition is walked in order while a `FrameCursor` per distinct
//! frame tracks the rows in scope. Aggregates only see the delta between
//! consecutive frames; window functions are evaluated per row against a
//! read-only view of the partition.

use crate::executor::aggregate::{reducers, FieldReducer, OpValues, Reducer};
use crate::expr::{Field, Frame, OpSpec};
use crate::table::Table;
use alloc::vec::Vec;
use core::cmp::Ordering;
use log::{debug, trace};
use verba_core::{Columns, Error, Result, Value};
use verba_ops::{registry, AggState, FrameView, WindowOp};

/// Frame bounds over a partition of peer-numbered rows.
#[derive(Clone, Copy, Debug)]
pub struct FrameCursor {
    frame: Frame,
    peers: bool,
    /// Inclusive start of the current frame.
    pub i0: usize,
    /// Exclusive end of the current frame.
    pub i1: usize,
}

impl FrameCursor {
    pub fn new(frame: Frame, peers: bool) -> Self {
        FrameCursor {
            frame,
            peers,
            i0: 0,
            i1: 0,
        }
    }

    pub fn reset(&mut self) {
        self.i0 = 0;
        self.i1 = 0;
    }

    /// Moves the frame to partition ordinal `idx` and returns its bounds.
    ///
    /// With peer adjustment the bounds widen so that no run of equal peer
    /// ids is split.
    pub fn step(&mut self, idx: usize, peer_ids: &[usize]) -> (usize, usize) {
        let n = peer_ids.len();
        let mut i0 = self.frame.preceding.map_or(0, |p| idx.saturating_sub(p));
        let mut i1 = self
            .frame
            .following
            .map_or(n, |f| n.min(idx.saturating_add(f).saturating_add(1)));

        if self.peers && n > 0 {
            if i0 < n {
                let p0 = peer_ids[i0];
                i0 = peer_ids.partition_point(|&p| p < p0);
            }
            if i1 > 0 {
                let p1 = peer_ids[i1 - 1];
                i1 = peer_ids.partition_point(|&p| p <= p1);
            }
        }

        self.i0 = i0;
        self.i1 = i1;
        (i0, i1)
    }
}

/// Peer ids for the rows of one partition.
///
/// Consecutive rows equal under the comparator share an id; without an
/// order every row is its own peer.
pub fn peer_ids(table: &Table, rows: &[usize]) -> Vec<usize> {
    match table.comparator() {
        Some(compare) => {
            let data = table.data();
            let mut id = 0;
            rows.iter()
                .enumerate()
                .map(|(i, &row)| {
                    if i > 0 && compare(rows[i - 1], row, data) != Ordering::Equal {
                        id += 1;
                    }
                    id
                })
                .collect()
        }
        None => (0..rows.len()).collect(),
    }
}

struct Slot {
    id: usize,
    op: WindowOp,
    field: Option<Field>,
}

/// Operators sharing one frame definition.
struct FrameGroup {
    cursor: FrameCursor,
    reducers: Vec<FieldReducer>,
    cells: Vec<AggState>,
    slots: Vec<Slot>,
}

impl FrameGroup {
    fn start(&mut self) {
        self.cursor.reset();
        self.cells = self.reducers.iter().map(|r| r.init()).collect();
        for slot in &mut self.slots {
            slot.op.init();
        }
    }

    fn step(
        &mut self,
        idx: usize,
        rows: &[usize],
        peers: &[usize],
        data: &Columns,
        out: &mut OpValues,
    ) {
        let (p0, p1) = (self.cursor.i0, self.cursor.i1);
        let (i0, i1) = self.cursor.step(idx, peers);

        if !self.reducers.is_empty() {
            // rows that entered on an earlier step and have now left
            for &row in &rows[p0..i0.min(p1).max(p0)] {
                for (r, cell) in self.reducers.iter().zip(&mut self.cells) {
                    r.rem(cell, row, data);
                }
            }
            for &row in &rows[p1.max(i0).min(i1)..i1] {
                for (r, cell) in self.reducers.iter().zip(&mut self.cells) {
                    r.add(cell, row, data);
                }
            }
            for (r, cell) in self.reducers.iter().zip(&mut self.cells) {
                r.write(cell, out, 0);
            }
        }

        for slot in &mut self.slots {
            let view = Cursor {
                index: idx,
                i0,
                i1,
                rows,
                peers,
                field: slot.field.as_ref(),
                data,
            };
            let value = slot.op.value(&view);
            out.set(slot.id, 0, value);
        }
    }
}

struct Cursor<'a> {
    index: usize,
    i0: usize,
    i1: usize,
    rows: &'a [usize],
    peers: &'a [usize],
    field: Option<&'a Field>,
    data: &'a Columns,
}

impl FrameView for Cursor<'_> {
    fn index(&self) -> usize {
        self.index
    }

    fn size(&self) -> usize {
        self.rows.len()
    }

    fn i0(&self) -> usize {
        self.i0
    }

    fn i1(&self) -> usize {
        self.i1
    }

    fn is_peer(&self, i: usize) -> bool {
        i > 0 && i < self.peers.len() && self.peers[i] == self.peers[i - 1]
    }

    fn value(&self, i: usize) -> Value {
        match (self.field, self.rows.get(i)) {
            (Some(field), Some(&row)) => field.eval(row, self.data),
            _ => Value::Null,
        }
    }
}

/// Validates window operators and sorts them into frame groups.
fn frame_groups(ops: &[OpSpec]) -> Result<Vec<FrameGroup>> {
    let mut keys: Vec<(Frame, bool)> = Vec::new();
    let mut aggs: Vec<Vec<OpSpec>> = Vec::new();
    let mut slots: Vec<Vec<Slot>> = Vec::new();

    for spec in ops {
        let key = (spec.frame.unwrap_or_default(), spec.peers);
        let at = match keys.iter().position(|k| *k == key) {
            Some(at) => at,
            None => {
                keys.push(key);
                aggs.push(Vec::new());
                slots.push(Vec::new());
                keys.len() - 1
            }
        };

        if registry::is_window_only(&spec.name) {
            let func = registry::create_window(&spec.name, &spec.params)?;
            if func.arity() != spec.fields.len() {
                return Err(Error::field_arity(&spec.name, func.arity(), spec.fields.len()));
            }
            slots[at].push(Slot {
                id: spec.id,
                op: WindowOp::new(func),
                field: spec.fields.first().cloned(),
            });
        } else {
            aggs[at].push(spec.clone());
        }
    }

    let mut groups = Vec::with_capacity(keys.len());
    for (((frame, peers), aggs), slots) in keys.into_iter().zip(aggs).zip(slots) {
        groups.push(FrameGroup {
            cursor: FrameCursor::new(frame, peers),
            reducers: reducers(&aggs, frame.is_sliding())?,
            cells: Vec::new(),
            slots,
        });
    }
    Ok(groups)
}

/// Runs windowed operators over every partition of the table.
///
/// `emit` is called once per row passing the filter, in partition order,
/// with the operator results for that row stored at index 0 of the
/// provided values. Setup errors are raised before any row is visited.
pub fn window<F>(table: &Table, ops: &[OpSpec], mut emit: F) -> Result<()>
where
    F: FnMut(usize, &Columns, &OpValues),
{
    let mut groups = frame_groups(ops)?;
    let width = ops.iter().map(|op| op.id + 1).max().unwrap_or(0);
    let mut out = OpValues::new(width, 1);
    let data = table.data();
    let parts = table.partitions(true);

    debug!(
        "window: {} ops in {} frames over {} partitions",
        ops.len(),
        groups.len(),
        parts.len()
    );

    for (g, rows) in parts.iter().enumerate() {
        if rows.is_empty() {
            continue;
        }
        trace!("window partition {}: {} rows", g, rows.len());
        let peers = peer_ids(table, rows);
        for group in &mut groups {
            group.start();
        }
        for (idx, &row) in rows.iter().enumerate() {
            for group in &mut groups {
                group.step(idx, rows, &peers, data, &mut out);
            }
            emit(row, data, &out);
        }
    }
    Ok(())
}

//! Window functions.
//!
//! Window functions are evaluated once per row against a `FrameView` of the
//! current partition; unlike aggregates they never see add/remove deltas.

use verba_core::Value;

/// Read-only view of a partition positioned at one row.
///
/// All positions are ordinals within the partition, not table row indices.
pub trait FrameView {
    /// Ordinal of the current row.
    fn index(&self) -> usize;
    /// Number of rows in the partition.
    fn size(&self) -> usize;
    /// Inclusive start of the current frame.
    fn i0(&self) -> usize;
    /// Exclusive end of the current frame.
    fn i1(&self) -> usize;
    /// True if row `i` ties with row `i - 1` under the partition order.
    fn is_peer(&self, i: usize) -> bool;
    /// Value of the operator's field at ordinal `i`.
    fn value(&self, i: usize) -> Value;
}

/// An instantiated window function.
#[derive(Clone, Debug, PartialEq)]
pub enum WindowFn {
    RowNumber,
    Rank,
    AvgRank,
    DenseRank,
    PercentRank,
    CumeDist,
    Ntile(usize),
    Lag { offset: usize, default: Value },
    Lead { offset: usize, default: Value },
    FirstValue,
    LastValue,
    NthValue(usize),
    FillDown(Value),
    FillUp(Value),
}

impl WindowFn {
    pub fn name(&self) -> &'static str {
        match self {
            WindowFn::RowNumber => "row_number",
            WindowFn::Rank => "rank",
            WindowFn::AvgRank => "avg_rank",
            WindowFn::DenseRank => "dense_rank",
            WindowFn::PercentRank => "percent_rank",
            WindowFn::CumeDist => "cume_dist",
            WindowFn::Ntile(_) => "ntile",
            WindowFn::Lag { .. } => "lag",
            WindowFn::Lead { .. } => "lead",
            WindowFn::FirstValue => "first_value",
            WindowFn::LastValue => "last_value",
            WindowFn::NthValue(_) => "nth_value",
            WindowFn::FillDown(_) => "fill_down",
            WindowFn::FillUp(_) => "fill_up",
        }
    }

    /// Number of input fields the function reads.
    pub fn arity(&self) -> usize {
        match self {
            WindowFn::RowNumber
            | WindowFn::Rank
            | WindowFn::AvgRank
            | WindowFn::DenseRank
            | WindowFn::PercentRank
            | WindowFn::CumeDist
            | WindowFn::Ntile(_) => 0,
            _ => 1,
        }
    }
}

/// A window function together with its per-partition scratch state.
#[derive(Clone, Debug)]
pub struct WindowOp {
    func: WindowFn,
    rank: usize,
    mark: usize,
    avg: f64,
    carry: Value,
}

impl WindowOp {
    pub fn new(func: WindowFn) -> Self {
        let mut op = Self {
            func,
            rank: 0,
            mark: 0,
            avg: 0.0,
            carry: Value::Null,
        };
        op.init();
        op
    }

    pub fn func(&self) -> &WindowFn {
        &self.func
    }

    /// Resets scratch state at the start of a partition.
    pub fn init(&mut self) {
        self.rank = 1;
        self.mark = 0;
        self.avg = 0.0;
        self.carry = match &self.func {
            WindowFn::FillDown(d) | WindowFn::FillUp(d) => d.clone(),
            _ => Value::Null,
        };
    }

    /// Evaluates the function at the view's current row.
    ///
    /// Rows must be visited in increasing ordinal order within a partition.
    pub fn value(&mut self, w: &dyn FrameView) -> Value {
        let i = w.index();
        let size = w.size();
        match &self.func {
            WindowFn::RowNumber => Value::from(i + 1),
            WindowFn::Rank => Value::from(rank_at(&mut self.rank, w)),
            WindowFn::AvgRank => {
                if i >= self.mark {
                    let mut j = i + 1;
                    let mut total = i;
                    while j < size && w.is_peer(j) {
                        total += j;
                        j += 1;
                    }
                    self.mark = j;
                    self.avg = total as f64 / (j - i) as f64;
                }
                Value::Float64(self.avg + 1.0)
            }
            WindowFn::DenseRank => {
                if i > 0 && !w.is_peer(i) {
                    self.rank += 1;
                }
                Value::from(self.rank)
            }
            WindowFn::PercentRank => {
                let rank = rank_at(&mut self.rank, w);
                if size > 1 {
                    Value::Float64((rank - 1) as f64 / (size - 1) as f64)
                } else {
                    Value::Float64(0.0)
                }
            }
            WindowFn::CumeDist => {
                if self.mark <= i {
                    let mut j = i + 1;
                    while j < size && w.is_peer(j) {
                        j += 1;
                    }
                    self.mark = j;
                }
                Value::Float64(self.mark as f64 / size as f64)
            }
            WindowFn::Ntile(num) => Value::from(num * i / size + 1),
            WindowFn::Lag { offset, default } => {
                if i >= *offset {
                    w.value(i - offset)
                } else {
                    default.clone()
                }
            }
            WindowFn::Lead { offset, default } => match i.checked_add(*offset).filter(|&k| k < size) {
                Some(k) => w.value(k),
                None => default.clone(),
            },
            WindowFn::FirstValue => {
                if w.i0() < w.i1() {
                    w.value(w.i0())
                } else {
                    Value::Null
                }
            }
            WindowFn::LastValue => {
                if w.i0() < w.i1() {
                    w.value(w.i1() - 1)
                } else {
                    Value::Null
                }
            }
            WindowFn::NthValue(nth) => {
                let k = w.i0() + (nth - 1);
                if k < w.i1() {
                    w.value(k)
                } else {
                    Value::Null
                }
            }
            WindowFn::FillDown(_) => {
                let v = w.value(i);
                if v.is_valid() {
                    self.carry = v.clone();
                    v
                } else {
                    self.carry.clone()
                }
            }
            WindowFn::FillUp(default) => {
                let v = w.value(i);
                if v.is_valid() {
                    return v;
                }
                // `mark` is one past the ordinal the carried value came from
                if i >= self.mark {
                    let found = (i + 1..size).find(|&k| w.value(k).is_valid());
                    match found {
                        Some(k) => {
                            self.carry = w.value(k);
                            self.mark = k + 1;
                        }
                        None => {
                            self.carry = default.clone();
                            self.mark = size;
                        }
                    }
                }
                self.carry.clone()
            }
        }
    }
}

/// Standard rank: ties share the ordinal of their first row.
fn rank_at(rank: &mut usize, w: &dyn FrameView) -> usize {
    let i = w.index();
    if i > 0 && !w.is_peer(i) {
        *rank = i + 1;
    }
    *rank
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;
    use alloc::vec::Vec;

    /// A whole-partition frame over fixed values and peer ids.
    struct Fixed {
        values: Vec<Value>,
        peers: Vec<usize>,
        index: usize,
        i0: usize,
        i1: usize,
    }

    impl Fixed {
        fn new(values: Vec<Value>, peers: Vec<usize>) -> Self {
            let n = values.len();
            Self {
                values,
                peers,
                index: 0,
                i0: 0,
                i1: n,
            }
        }
    }

    impl FrameView for Fixed {
        fn index(&self) -> usize {
            self.index
        }
        fn size(&self) -> usize {
            self.values.len()
        }
        fn i0(&self) -> usize {
            self.i0
        }
        fn i1(&self) -> usize {
            self.i1
        }
        fn is_peer(&self, i: usize) -> bool {
            i > 0 && self.peers[i] == self.peers[i - 1]
        }
        fn value(&self, i: usize) -> Value {
            self.values[i].clone()
        }
    }

    fn eval(func: WindowFn, frame: &mut Fixed) -> Vec<Value> {
        let mut op = WindowOp::new(func);
        (0..frame.size())
            .map(|i| {
                frame.index = i;
                op.value(&*frame)
            })
            .collect()
    }

    fn ints(vals: &[i64]) -> Vec<Value> {
        vals.iter().map(|&v| Value::Int64(v)).collect()
    }

    fn floats(vals: &[f64]) -> Vec<Value> {
        vals.iter().map(|&v| Value::Float64(v)).collect()
    }

    #[test]
    fn test_ranks_with_ties() {
        let mut f = Fixed::new(ints(&[10, 20, 20, 30]), vec![0, 1, 1, 2]);
        assert_eq!(eval(WindowFn::RowNumber, &mut f), ints(&[1, 2, 3, 4]));
        assert_eq!(eval(WindowFn::Rank, &mut f), ints(&[1, 2, 2, 4]));
        assert_eq!(eval(WindowFn::DenseRank, &mut f), ints(&[1, 2, 2, 3]));
        assert_eq!(
            eval(WindowFn::AvgRank, &mut f),
            floats(&[1.0, 2.5, 2.5, 4.0])
        );
        assert_eq!(
            eval(WindowFn::CumeDist, &mut f),
            floats(&[0.25, 0.75, 0.75, 1.0])
        );
        assert_eq!(
            eval(WindowFn::PercentRank, &mut f),
            floats(&[0.0, 1.0 / 3.0, 1.0 / 3.0, 1.0])
        );
    }

    #[test]
    fn test_ntile() {
        let mut f = Fixed::new(ints(&[1, 2, 3, 4, 5]), vec![0, 1, 2, 3, 4]);
        assert_eq!(eval(WindowFn::Ntile(2), &mut f), ints(&[1, 1, 1, 2, 2]));
    }

    #[test]
    fn test_lag_lead() {
        let mut f = Fixed::new(ints(&[1, 2, 3]), vec![0, 1, 2]);
        let lag = WindowFn::Lag {
            offset: 1,
            default: Value::Int64(0),
        };
        let lead = WindowFn::Lead {
            offset: 2,
            default: Value::Null,
        };
        assert_eq!(eval(lag, &mut f), ints(&[0, 1, 2]));
        assert_eq!(
            eval(lead, &mut f),
            vec![Value::Int64(3), Value::Null, Value::Null]
        );
    }

    #[test]
    fn test_lead_with_huge_offset() {
        let mut f = Fixed::new(ints(&[1, 2]), vec![0, 1]);
        let lead = WindowFn::Lead {
            offset: usize::MAX,
            default: Value::Int64(-1),
        };
        assert_eq!(eval(lead, &mut f), ints(&[-1, -1]));
    }

    #[test]
    fn test_frame_values() {
        let mut f = Fixed::new(ints(&[7, 8, 9]), vec![0, 1, 2]);
        f.i0 = 1;
        f.i1 = 3;
        assert_eq!(eval(WindowFn::FirstValue, &mut f), ints(&[8, 8, 8]));
        assert_eq!(eval(WindowFn::LastValue, &mut f), ints(&[9, 9, 9]));
        assert_eq!(eval(WindowFn::NthValue(2), &mut f), ints(&[9, 9, 9]));
        assert_eq!(
            eval(WindowFn::NthValue(3), &mut f),
            vec![Value::Null, Value::Null, Value::Null]
        );
    }

    #[test]
    fn test_fill() {
        let values = vec![Value::Null, Value::Int64(1), Value::Null, Value::Int64(3), Value::Null];
        let mut f = Fixed::new(values, vec![0, 1, 2, 3, 4]);
        assert_eq!(
            eval(WindowFn::FillDown(Value::Int64(0)), &mut f),
            ints(&[0, 1, 1, 3, 3])
        );
        assert_eq!(
            eval(WindowFn::FillUp(Value::Int64(9)), &mut f),
            ints(&[1, 1, 3, 3, 9])
        );
    }
}

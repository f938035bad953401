//! Aggregate operators.
//!
//! An aggregate never touches rows directly: the field reducer feeds field
//! values into a shared `AggState`, and each aggregate reads its result out
//! of the registers it declared.

use crate::state::{object_from_pairs, AggState, Register};
use verba_core::Value;

/// An instantiated aggregate operator.
#[derive(Clone, Debug, PartialEq)]
pub enum AggregateFn {
    Count,
    Valid,
    Invalid,
    Distinct,
    ArrayAgg,
    ArrayAggDistinct,
    ObjectAgg,
    Any,
    Mode,
    Sum,
    Product,
    Mean,
    Min,
    Max,
    Median,
    Quantile(f64),
    Variance,
    VarianceP,
    Stdev,
    StdevP,
    Covariance,
    CovarianceP,
    Corr,
}

impl AggregateFn {
    /// Operator name.
    pub fn name(&self) -> &'static str {
        match self {
            AggregateFn::Count => "count",
            AggregateFn::Valid => "valid",
            AggregateFn::Invalid => "invalid",
            AggregateFn::Distinct => "distinct",
            AggregateFn::ArrayAgg => "array_agg",
            AggregateFn::ArrayAggDistinct => "array_agg_distinct",
            AggregateFn::ObjectAgg => "object_agg",
            AggregateFn::Any => "any",
            AggregateFn::Mode => "mode",
            AggregateFn::Sum => "sum",
            AggregateFn::Product => "product",
            AggregateFn::Mean => "mean",
            AggregateFn::Min => "min",
            AggregateFn::Max => "max",
            AggregateFn::Median => "median",
            AggregateFn::Quantile(_) => "quantile",
            AggregateFn::Variance => "variance",
            AggregateFn::VarianceP => "variancep",
            AggregateFn::Stdev => "stdev",
            AggregateFn::StdevP => "stdevp",
            AggregateFn::Covariance => "covariance",
            AggregateFn::CovarianceP => "covariancep",
            AggregateFn::Corr => "corr",
        }
    }

    /// Number of input fields the operator reads.
    pub fn arity(&self) -> usize {
        match self {
            AggregateFn::Count => 0,
            AggregateFn::ObjectAgg
            | AggregateFn::Covariance
            | AggregateFn::CovarianceP
            | AggregateFn::Corr => 2,
            _ => 1,
        }
    }

    /// Whether the operator stays correct when rows are removed.
    pub fn removable(&self) -> bool {
        !matches!(self, AggregateFn::Any)
    }

    /// Registers the operator reads.
    ///
    /// `stream` is set for sliding frames, where extremes need the retained
    /// value list to recover from removals.
    pub fn requires(&self, stream: bool) -> &'static [Register] {
        match self {
            AggregateFn::Count | AggregateFn::Valid | AggregateFn::Invalid => &[],
            AggregateFn::Distinct | AggregateFn::ArrayAggDistinct | AggregateFn::Mode => {
                &[Register::Distinct]
            }
            AggregateFn::ArrayAgg
            | AggregateFn::ObjectAgg
            | AggregateFn::Median
            | AggregateFn::Quantile(_) => &[Register::List],
            AggregateFn::Any => &[Register::Any],
            AggregateFn::Sum => &[Register::Sum],
            AggregateFn::Product => &[Register::Product],
            AggregateFn::Mean
            | AggregateFn::Variance
            | AggregateFn::VarianceP
            | AggregateFn::Stdev
            | AggregateFn::StdevP => &[Register::Moments],
            AggregateFn::Covariance | AggregateFn::CovarianceP | AggregateFn::Corr => {
                &[Register::CoMoments]
            }
            AggregateFn::Min if stream => &[Register::Min, Register::List],
            AggregateFn::Min => &[Register::Min],
            AggregateFn::Max if stream => &[Register::Max, Register::List],
            AggregateFn::Max => &[Register::Max],
        }
    }

    /// Reads the operator result out of a cell.
    ///
    /// Value-producing aggregates yield Null when no valid input was seen.
    pub fn value(&self, state: &mut AggState) -> Value {
        let valid = state.valid;
        if valid == 0 && self.needs_input() {
            return Value::Null;
        }
        match self {
            AggregateFn::Count => Value::from(state.count),
            AggregateFn::Valid => Value::from(valid),
            AggregateFn::Invalid => Value::from(state.count - valid),
            AggregateFn::Distinct => {
                // invalid values count as one extra distinct value
                let extra = usize::from(valid != state.count);
                let n = state.distinct.as_ref().map_or(0, |d| d.count());
                Value::from(n + extra)
            }
            AggregateFn::ArrayAgg => state
                .list
                .as_ref()
                .map_or(Value::Null, |l| Value::Array(l.values().to_vec())),
            AggregateFn::ArrayAggDistinct => state
                .distinct
                .as_ref()
                .map_or(Value::Null, |d| Value::Array(d.values())),
            AggregateFn::ObjectAgg => state
                .list
                .as_ref()
                .map_or(Value::Null, object_from_pairs),
            AggregateFn::Any => state.any.clone().unwrap_or(Value::Null),
            AggregateFn::Mode => state
                .distinct
                .as_ref()
                .map_or(Value::Null, |d| d.mode()),
            AggregateFn::Sum => state.sum.as_ref().map_or(Value::Null, |s| s.value()),
            AggregateFn::Product => state.product.map_or(Value::Null, Value::Float64),
            AggregateFn::Mean => state
                .moments
                .as_ref()
                .map_or(Value::Null, |m| Value::Float64(m.mean)),
            AggregateFn::Min => {
                state.refresh();
                state.min.as_ref().map_or(Value::Null, |e| e.value())
            }
            AggregateFn::Max => {
                state.refresh();
                state.max.as_ref().map_or(Value::Null, |e| e.value())
            }
            AggregateFn::Median => quantile(state, 0.5),
            AggregateFn::Quantile(p) => quantile(state, *p),
            AggregateFn::Variance => deviation(state, 1, false),
            AggregateFn::VarianceP => deviation(state, 0, false),
            AggregateFn::Stdev => deviation(state, 1, true),
            AggregateFn::StdevP => deviation(state, 0, true),
            AggregateFn::Covariance => covariance(state, 1),
            AggregateFn::CovarianceP => covariance(state, 0),
            AggregateFn::Corr => match &state.comoments {
                Some(c) if valid > 1 => {
                    Value::Float64(c.cov / (libm::sqrt(c.dev_x) * libm::sqrt(c.dev_y)))
                }
                _ => Value::Null,
            },
        }
    }

    fn needs_input(&self) -> bool {
        !matches!(
            self,
            AggregateFn::Count | AggregateFn::Valid | AggregateFn::Invalid | AggregateFn::Distinct
        )
    }
}

fn quantile(state: &mut AggState, p: f64) -> Value {
    match &mut state.list {
        Some(list) => list.quantile(p),
        None => Value::Null,
    }
}

/// Sample (`ddof = 1`) or population (`ddof = 0`) variance, optionally rooted.
fn deviation(state: &AggState, ddof: usize, root: bool) -> Value {
    match &state.moments {
        Some(m) if state.valid > 1 => {
            let var = m.dev / (state.valid - ddof) as f64;
            Value::Float64(if root { libm::sqrt(var) } else { var })
        }
        _ => Value::Null,
    }
}

fn covariance(state: &AggState, ddof: usize) -> Value {
    match &state.comoments {
        Some(c) if state.valid > 1 => Value::Float64(c.cov / (state.valid - ddof) as f64),
        _ => Value::Null,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Registers;
    use alloc::vec;
    use alloc::vec::Vec;

    fn cell(ops: &[AggregateFn], stream: bool) -> AggState {
        let mut regs = Registers::empty();
        for op in ops {
            regs.extend(op.requires(stream));
        }
        AggState::new(regs)
    }

    fn approx(v: Value, expected: f64) {
        match v {
            Value::Float64(f) => assert!((f - expected).abs() < 1e-9, "{} != {}", f, expected),
            other => panic!("expected float, got {:?}", other),
        }
    }

    fn run(op: AggregateFn, values: &[Value]) -> Value {
        let mut s = cell(&[op.clone()], false);
        for v in values {
            s.add(core::slice::from_ref(v));
        }
        op.value(&mut s)
    }

    #[test]
    fn test_empty_input_yields_null() {
        let nans = [Value::nan(), Value::nan()];
        assert_eq!(run(AggregateFn::Sum, &nans), Value::Null);
        assert_eq!(run(AggregateFn::Mean, &nans), Value::Null);
        assert_eq!(run(AggregateFn::Min, &nans), Value::Null);
        assert_eq!(run(AggregateFn::Valid, &nans), Value::Int64(0));
        assert_eq!(run(AggregateFn::Invalid, &nans), Value::Int64(2));
    }

    #[test]
    fn test_basic_aggregates() {
        let vals: Vec<Value> = [4i64, 2, 8, 2].iter().map(|&v| Value::Int64(v)).collect();
        assert_eq!(run(AggregateFn::Sum, &vals), Value::Int64(16));
        approx(run(AggregateFn::Mean, &vals), 4.0);
        assert_eq!(run(AggregateFn::Min, &vals), Value::Int64(2));
        assert_eq!(run(AggregateFn::Max, &vals), Value::Int64(8));
        assert_eq!(run(AggregateFn::Median, &vals), Value::Float64(3.0));
        assert_eq!(run(AggregateFn::Mode, &vals), Value::Int64(2));
        assert_eq!(run(AggregateFn::Product, &vals), Value::Float64(128.0));
        assert_eq!(run(AggregateFn::Any, &vals), Value::Int64(4));
        approx(run(AggregateFn::VarianceP, &vals), 6.0);
        approx(run(AggregateFn::Variance, &vals), 8.0);
    }

    #[test]
    fn test_distinct_counts_invalid_once() {
        let vals = vec![
            Value::from("a"),
            Value::Null,
            Value::from("a"),
            Value::Null,
            Value::from("b"),
        ];
        assert_eq!(run(AggregateFn::Distinct, &vals), Value::Int64(3));
        assert_eq!(
            run(AggregateFn::ArrayAggDistinct, &vals),
            Value::Array(vec![Value::from("a"), Value::from("b")])
        );
    }

    #[test]
    fn test_shared_registers() {
        let ops = [AggregateFn::Mean, AggregateFn::Stdev, AggregateFn::Count];
        let mut s = cell(&ops, false);
        for v in [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0] {
            s.add(&[Value::Float64(v)]);
        }
        approx(ops[0].value(&mut s), 5.0);
        assert_eq!(ops[2].value(&mut s), Value::Int64(8));
        approx(ops[1].value(&mut s), 2.138089935299395);
    }

    #[test]
    fn test_corr_and_covariance() {
        let ops = [AggregateFn::Corr, AggregateFn::Covariance];
        let mut s = cell(&ops, false);
        for (x, y) in [(1.0, 2.0), (2.0, 4.0), (3.0, 6.0)] {
            s.add(&[Value::Float64(x), Value::Float64(y)]);
        }
        approx(ops[0].value(&mut s), 1.0);
        approx(ops[1].value(&mut s), 2.0);
    }

    #[test]
    fn test_streaming_max() {
        let op = AggregateFn::Max;
        let mut s = cell(&[op.clone()], true);
        for v in [1i64, 9, 3] {
            s.add(&[Value::Int64(v)]);
        }
        s.rem(&[Value::Int64(1)]);
        assert_eq!(op.value(&mut s), Value::Int64(9));
        s.rem(&[Value::Int64(9)]);
        assert_eq!(op.value(&mut s), Value::Int64(3));
    }

    #[test]
    fn test_requirements() {
        assert!(AggregateFn::Min.requires(true).contains(&Register::List));
        assert!(!AggregateFn::Min.requires(false).contains(&Register::List));
        assert!(!AggregateFn::Any.removable());
        assert_eq!(AggregateFn::Corr.arity(), 2);
        assert_eq!(AggregateFn::Count.arity(), 0);
    }
}

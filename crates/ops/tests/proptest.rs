//! Property-based tests for verba-ops accumulators.
//!
//! Removing the oldest rows from a streaming cell must leave it in the same
//! observable state as a fresh cell fed only the remaining rows.

use proptest::prelude::*;
use verba_core::Value;
use verba_ops::{registry, AggState, AggregateFn, Registers};

fn cell(op: &AggregateFn, stream: bool) -> AggState {
    let mut regs = Registers::empty();
    regs.extend(op.requires(stream));
    AggState::new(regs)
}

fn to_value(v: Option<i64>) -> Value {
    v.map_or(Value::Null, Value::Int64)
}

fn values_strategy() -> impl Strategy<Value = Vec<Option<i64>>> {
    prop::collection::vec(prop::option::weighted(0.85, -100i64..100), 1..40)
}

fn assert_same(name: &str, got: Value, want: Value) -> Result<(), TestCaseError> {
    match (&got, &want) {
        (Value::Float64(a), Value::Float64(b)) => {
            prop_assert!((a - b).abs() < 1e-6, "{}: {} != {}", name, a, b);
        }
        _ => prop_assert_eq!(got, want, "{}", name),
    }
    Ok(())
}

proptest! {
    /// Property: streaming add/remove matches recomputation from scratch.
    #[test]
    fn removal_matches_fresh_cell(values in values_strategy(), drop in 0usize..40) {
        let drop = drop.min(values.len());
        for name in ["count", "valid", "sum", "min", "max", "mean", "distinct", "variance", "median"] {
            let op = registry::create_aggregate(name, &[]).unwrap();
            let arity = op.arity();
            let fields = |v: Option<i64>| if arity == 0 { Vec::new() } else { vec![to_value(v)] };

            let mut streamed = cell(&op, true);
            for &v in &values {
                streamed.add(&fields(v));
            }
            for &v in &values[..drop] {
                streamed.rem(&fields(v));
            }

            let mut fresh = cell(&op, false);
            for &v in &values[drop..] {
                fresh.add(&fields(v));
            }
            assert_same(name, op.value(&mut streamed), op.value(&mut fresh))?;
        }
    }

    /// Property: sum of integers stays an exact integer.
    #[test]
    fn integer_sum_is_exact(values in prop::collection::vec(-1_000_000i64..1_000_000, 0..50)) {
        let op = registry::create_aggregate("sum", &[]).unwrap();
        let mut state = cell(&op, false);
        for &v in &values {
            state.add(&[Value::Int64(v)]);
        }
        let expected = if values.is_empty() {
            Value::Null
        } else {
            Value::Int64(values.iter().sum())
        };
        prop_assert_eq!(op.value(&mut state), expected);
    }

    /// Property: every registered aggregate is classified as an aggregate.
    #[test]
    fn window_only_names_are_not_aggregates(name in prop::sample::select(vec![
        "rank", "row_number", "dense_rank", "lag", "lead", "ntile", "sum", "mean", "max",
    ])) {
        prop_assert_ne!(registry::is_window_only(name), registry::is_aggregate(name));
    }
}

//! Operator registry.
//!
//! Maps operator names to their kind and instantiates them from parameters.
//! Verbs consult the kind before scanning so that a window function in an
//! aggregate-only context fails at setup.

use crate::aggregate::AggregateFn;
use crate::window::WindowFn;
use verba_core::{Error, Result, Value};

/// Operator classification.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OpKind {
    /// Usable in rollups, pivots and (optionally framed) windows.
    Aggregate,
    /// Only usable in windowed derivations.
    Window,
}

/// Static operator descriptor.
#[derive(Clone, Copy, Debug)]
pub struct OpDef {
    pub name: &'static str,
    pub kind: OpKind,
    /// Number of input fields.
    pub fields: usize,
    /// Maximum number of parameters.
    pub params: usize,
}

const fn agg(name: &'static str, fields: usize, params: usize) -> OpDef {
    OpDef {
        name,
        kind: OpKind::Aggregate,
        fields,
        params,
    }
}

const fn win(name: &'static str, fields: usize, params: usize) -> OpDef {
    OpDef {
        name,
        kind: OpKind::Window,
        fields,
        params,
    }
}

static OPS: &[OpDef] = &[
    agg("count", 0, 0),
    agg("valid", 1, 0),
    agg("invalid", 1, 0),
    agg("distinct", 1, 0),
    agg("array_agg", 1, 0),
    agg("array_agg_distinct", 1, 0),
    agg("object_agg", 2, 0),
    agg("any", 1, 0),
    agg("mode", 1, 0),
    agg("sum", 1, 0),
    agg("product", 1, 0),
    agg("mean", 1, 0),
    agg("average", 1, 0),
    agg("min", 1, 0),
    agg("max", 1, 0),
    agg("median", 1, 0),
    agg("quantile", 1, 1),
    agg("variance", 1, 0),
    agg("variancep", 1, 0),
    agg("stdev", 1, 0),
    agg("stdevp", 1, 0),
    agg("covariance", 2, 0),
    agg("covariancep", 2, 0),
    agg("corr", 2, 0),
    win("row_number", 0, 0),
    win("rank", 0, 0),
    win("avg_rank", 0, 0),
    win("dense_rank", 0, 0),
    win("percent_rank", 0, 0),
    win("cume_dist", 0, 0),
    win("ntile", 0, 1),
    win("lag", 1, 2),
    win("lead", 1, 2),
    win("first_value", 1, 0),
    win("last_value", 1, 0),
    win("nth_value", 1, 1),
    win("fill_down", 1, 1),
    win("fill_up", 1, 1),
];

/// Looks up an operator descriptor by name.
pub fn lookup(name: &str) -> Option<&'static OpDef> {
    OPS.iter().find(|def| def.name == name)
}

/// Looks up an operator, failing with `OperatorNotFound`.
pub fn require(name: &str) -> Result<&'static OpDef> {
    lookup(name).ok_or_else(|| Error::operator_not_found(name))
}

/// True if the named operator is a window function.
pub fn is_window_only(name: &str) -> bool {
    matches!(lookup(name), Some(def) if def.kind == OpKind::Window)
}

/// True if the named operator is an aggregate.
pub fn is_aggregate(name: &str) -> bool {
    matches!(lookup(name), Some(def) if def.kind == OpKind::Aggregate)
}

/// Instantiates an aggregate operator.
pub fn create_aggregate(name: &str, params: &[Value]) -> Result<AggregateFn> {
    let def = require(name)?;
    if def.kind != OpKind::Aggregate {
        return Err(Error::operator_misuse(
            name,
            "window function used where an aggregate is required",
        ));
    }
    check_params(def, params)?;
    let op = match name {
        "count" => AggregateFn::Count,
        "valid" => AggregateFn::Valid,
        "invalid" => AggregateFn::Invalid,
        "distinct" => AggregateFn::Distinct,
        "array_agg" => AggregateFn::ArrayAgg,
        "array_agg_distinct" => AggregateFn::ArrayAggDistinct,
        "object_agg" => AggregateFn::ObjectAgg,
        "any" => AggregateFn::Any,
        "mode" => AggregateFn::Mode,
        "sum" => AggregateFn::Sum,
        "product" => AggregateFn::Product,
        "mean" | "average" => AggregateFn::Mean,
        "min" => AggregateFn::Min,
        "max" => AggregateFn::Max,
        "median" => AggregateFn::Median,
        "quantile" => {
            let p = params.first().map_or(f64::NAN, Value::as_number);
            if !(0.0..=1.0).contains(&p) {
                return Err(Error::invalid_parameter(
                    name,
                    "probability must be between 0 and 1",
                ));
            }
            AggregateFn::Quantile(p)
        }
        "variance" => AggregateFn::Variance,
        "variancep" => AggregateFn::VarianceP,
        "stdev" => AggregateFn::Stdev,
        "stdevp" => AggregateFn::StdevP,
        "covariance" => AggregateFn::Covariance,
        "covariancep" => AggregateFn::CovarianceP,
        "corr" => AggregateFn::Corr,
        _ => return Err(Error::operator_not_found(name)),
    };
    Ok(op)
}

/// Instantiates a window function.
pub fn create_window(name: &str, params: &[Value]) -> Result<WindowFn> {
    let def = require(name)?;
    if def.kind != OpKind::Window {
        return Err(Error::operator_misuse(name, "not a window function"));
    }
    check_params(def, params)?;
    let default = || params.get(1).cloned().unwrap_or(Value::Null);
    let op = match name {
        "row_number" => WindowFn::RowNumber,
        "rank" => WindowFn::Rank,
        "avg_rank" => WindowFn::AvgRank,
        "dense_rank" => WindowFn::DenseRank,
        "percent_rank" => WindowFn::PercentRank,
        "cume_dist" => WindowFn::CumeDist,
        "ntile" => WindowFn::Ntile(positive(name, params.first())?),
        "lag" => WindowFn::Lag {
            offset: offset(name, params.first())?,
            default: default(),
        },
        "lead" => WindowFn::Lead {
            offset: offset(name, params.first())?,
            default: default(),
        },
        "first_value" => WindowFn::FirstValue,
        "last_value" => WindowFn::LastValue,
        "nth_value" => WindowFn::NthValue(positive(name, params.first())?),
        "fill_down" => WindowFn::FillDown(params.first().cloned().unwrap_or(Value::Null)),
        "fill_up" => WindowFn::FillUp(params.first().cloned().unwrap_or(Value::Null)),
        _ => return Err(Error::operator_not_found(name)),
    };
    Ok(op)
}

fn check_params(def: &OpDef, params: &[Value]) -> Result<()> {
    if params.len() > def.params {
        return Err(Error::invalid_parameter(
            def.name,
            "too many parameters",
        ));
    }
    Ok(())
}

/// A required integer parameter greater than zero.
fn positive(name: &str, param: Option<&Value>) -> Result<usize> {
    let n = param.map_or(f64::NAN, Value::as_number);
    if n >= 1.0 && (n - libm::trunc(n)) == 0.0 {
        Ok(n as usize)
    } else {
        Err(Error::invalid_parameter(
            name,
            "expected an integer greater than zero",
        ))
    }
}

/// An optional non-negative row offset, defaulting to 1.
fn offset(name: &str, param: Option<&Value>) -> Result<usize> {
    match param {
        None | Some(Value::Null) => Ok(1),
        Some(v) => {
            let n = v.as_number();
            if n >= 0.0 && (n - libm::trunc(n)) == 0.0 {
                Ok(n as usize)
            } else {
                Err(Error::invalid_parameter(name, "offset must be a non-negative integer"))
            }
        }
    }
}

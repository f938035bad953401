//! Table verbs.
//!
//! Each verb takes a table view plus compiled expressions and returns a new
//! view. Verbs that only add columns or change facets keep the input's
//! filter, order and groups; reshaping verbs return fresh tables.

mod dedupe;
mod derive;
mod filter;
mod fold;
mod impute;
mod lookup;
mod pivot;
mod rollup;
mod select;
mod spread;
mod unroll;

pub use dedupe::dedupe;
pub use derive::{derive, DeriveOptions};
pub use filter::{filter, filter_eq};
pub use fold::{fold, fold_columns, FoldOptions};
pub use impute::{fulfill, impute, ImputeOptions};
pub use lookup::lookup;
pub use pivot::{pivot, PivotOptions};
pub use rollup::{count, rollup};
pub use select::{orderby, select, select_as};
pub use spread::{spread, SpreadOptions};
pub use unroll::{unroll, UnrollOptions};

//! Execution engines shared by the verbs.

pub mod aggregate;
pub mod groupby;
pub mod join;
pub mod window;

pub use aggregate::{aggregate, aggregate_get, FieldReducer, OpValues, Reducer};
pub use groupby::{create_groups, groupby, groupby_columns, GroupBySpec};
pub use join::{antijoin, cross, join, semijoin, JoinCondition, JoinOptions, JoinValues};
pub use window::{peer_ids, window, FrameCursor};

//! Verba Ops - Aggregate and window operator library for Verba.
//!
//! This crate supplies the operator math driven by the engine's reducers:
//!
//! - `state`: Shared accumulator registers (`AggState`) with add/remove support
//! - `aggregate`: Aggregate operators reading results out of those registers
//! - `window`: Window functions evaluated against a `FrameView`
//! - `registry`: Name lookup, kind classification and instantiation
//!
//! # Example
//!
//! ```rust
//! use verba_core::Value;
//! use verba_ops::{registry, AggState, Registers};
//!
//! let op = registry::create_aggregate("sum", &[]).unwrap();
//! let mut regs = Registers::empty();
//! regs.extend(op.requires(false));
//!
//! let mut state = AggState::new(regs);
//! state.add(&[Value::Int64(2)]);
//! state.add(&[Value::Int64(3)]);
//! assert_eq!(op.value(&mut state), Value::Int64(5));
//! ```

#![no_std]

extern crate alloc;

pub mod aggregate;
pub mod registry;
pub mod state;
pub mod window;

pub use aggregate::AggregateFn;
pub use registry::{OpDef, OpKind};
pub use state::{AggState, DistinctMap, Register, Registers, ValueList};
pub use window::{FrameView, WindowFn, WindowOp};

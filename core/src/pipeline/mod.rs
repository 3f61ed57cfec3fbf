// core/src/pipeline/mod.rs

//! A small asynchronous step runner.
//!
//! Each settlement operation is declared as an ordered list of named steps.
//! Handlers receive a shared [`ContextData`] and return [`PipelineControl`]
//! to continue or halt; a step can be skipped by a condition evaluated on the
//! context just before it runs.

pub mod context_data;
pub mod control;
pub mod definition;
pub mod execution;
pub mod hooks;
pub mod step;

pub use context_data::ContextData;
pub use control::{PipelineControl, PipelineResult};
pub use definition::{Handler, Pipeline};
pub use step::{SkipCondition, StepDef};

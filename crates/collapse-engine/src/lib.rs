//! Column task model and the main-thread destruction engine.
#![forbid(unsafe_code)]

mod engine;
mod task;

pub use engine::{ColumnStep, DestructionEngine, EngineSnapshot, RingPlan};
pub use task::ColumnTask;

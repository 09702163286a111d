//! Step execution

pub mod engine;
pub mod executor;
pub mod fsops;
pub mod package;

pub use engine::{EventHandler, ExecutionEngine, ExecutionEvent};
pub use executor::{StepExecutor, StepRunner};

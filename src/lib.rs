//! ext-builder - builds, deploys and packages an EspoCRM extension

pub mod cli;
pub mod collaborator;
pub mod core;
pub mod execution;

// Re-export commonly used types
pub use collaborator::{Collaborators, LocalCollaborators, ProcessCommand};
pub use core::{BuildError, CommandName, ExecutionStatus, MacroCommand, RunContext, StepKind, StepState};
pub use execution::{ExecutionEngine, ExecutionEvent, StepExecutor, StepRunner};

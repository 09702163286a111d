//! Core domain models
//!
//! Commands, steps, the run context and the configuration they read.

pub mod command;
pub mod config;
pub mod context;
pub mod error;
pub mod lock;
pub mod state;
pub mod step;

pub use command::*;
pub use context::*;
pub use error::*;
pub use state::*;
pub use step::*;

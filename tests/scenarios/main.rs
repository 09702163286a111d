//! Scenario-based tests for ext-builder

#[path = "../helpers.rs"]
mod helpers;

mod best_effort;
mod copy_file;
mod fetch;
mod flag_priority;
mod packaging;
mod step_commands;

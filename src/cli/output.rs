//! CLI output formatting

use crate::{
    core::{ExecutionStatus, MacroCommand, StepState},
    execution::ExecutionEvent,
};
use console::Emoji;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

// Re-export style
pub use console::style;

// Emojis for output
pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "✓ ");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "✗ ");
pub static SPINNER: Emoji<'_, '_> = Emoji("⏳ ", "~ ");
pub static INFO: Emoji<'_, '_> = Emoji("ℹ️  ", "i ");
pub static WARN: Emoji<'_, '_> = Emoji("⚠️  ", "! ");
pub static ROCKET: Emoji<'_, '_> = Emoji("🚀 ", "> ");

/// Create a progress bar over `total` steps
pub fn create_progress_bar(total: usize) -> ProgressBar {
    let progress = ProgressBar::new(total as u64);
    let style = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#>-");
    progress.set_style(style);
    progress.enable_steady_tick(Duration::from_millis(100));
    progress
}

/// Format a step state for display
pub fn format_step_state(state: &StepState) -> String {
    match state {
        StepState::Pending => style("PENDING").dim().to_string(),
        StepState::Running { .. } => style("RUNNING").yellow().to_string(),
        StepState::Completed { .. } => style("COMPLETED").green().to_string(),
        StepState::Failed { .. } => style("FAILED").red().to_string(),
        StepState::Suppressed { .. } => style("FAILED (ignored)").yellow().to_string(),
        StepState::Skipped { .. } => style("SKIPPED").dim().to_string(),
    }
}

/// Format an execution status for display
pub fn format_status(status: ExecutionStatus) -> String {
    match status {
        ExecutionStatus::Pending => style("PENDING").dim().to_string(),
        ExecutionStatus::Running => style("RUNNING").yellow().to_string(),
        ExecutionStatus::Completed => style("COMPLETED").green().to_string(),
        ExecutionStatus::Failed => style("FAILED").red().to_string(),
    }
}

pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs < 60 {
        format!("{}.{}s", secs, duration.subsec_millis() / 100)
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}

/// Header line followed by one line per step with its final state
pub fn format_summary(command: &MacroCommand) -> String {
    let header = format!(
        "{} --{}: {}/{} steps ran, {:.0}% finished",
        INFO,
        style(command.name).bold(),
        command.invoked_steps().len(),
        command.steps.len(),
        command.state.progress() * 100.0
    );

    std::iter::once(header)
        .chain(
            command
                .steps
                .iter()
                .map(|step| format!("  {:<28} {}", step.name(), format_step_state(&step.state))),
        )
        .collect::<Vec<_>>()
        .join("\n")
}

/// Format an execution event for display
pub fn format_execution_event(event: &ExecutionEvent) -> String {
    match event {
        ExecutionEvent::RunStarted { run_id, command, steps } => format!(
            "{} Running --{} ({}) [{}]",
            ROCKET,
            style(command).bold(),
            style(&run_id.to_string()[..8]).dim(),
            style(steps.join(", ")).dim()
        ),
        ExecutionEvent::StepStarted { step, index, total } => format!(
            "{} [{}/{}] {}",
            SPINNER,
            index,
            total,
            style(step).cyan()
        ),
        ExecutionEvent::StepCompleted { step, elapsed_ms } => format!(
            "{} {} {}",
            CHECK,
            style(step).green(),
            style(format_duration(Duration::from_millis(*elapsed_ms as u64))).dim()
        ),
        ExecutionEvent::StepFailed { step, error } => {
            format!("{} {}: {}", CROSS, style(step).red(), style(error).dim())
        }
        ExecutionEvent::StepFailureSuppressed { step, error } => format!(
            "{} {} failed, continuing: {}",
            WARN,
            style(step).yellow(),
            style(error).dim()
        ),
        ExecutionEvent::RunFinished { run_id, status } => {
            let status_str = match status {
                ExecutionStatus::Completed => format!("{} completed", style("successfully").green()),
                ExecutionStatus::Failed => style("failed").red().to_string(),
                other => format_status(*other),
            };
            format!(
                "{} Run ({}) {}",
                INFO,
                style(&run_id.to_string()[..8]).dim(),
                status_str
            )
        }
    }
}

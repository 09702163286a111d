//! Terminal reporter for runs
//!
//! `TerminalReporter` receives both engine events and the output lines of
//! the tools each step launches:
//!
//! - Step headers with progress indicators: `[1/3] fetch`
//! - Horizontal separators between steps
//! - Tool output echoed line by line in verbose mode, otherwise shown as
//!   the message of a progress bar over the step list
//!
//! # Example
//!
//! ```no_run
//! use ext_builder::cli::terminal_output::TerminalReporter;
//! use ext_builder::collaborator::{OutputStream, ProcessOutputCallback};
//!
//! let reporter = TerminalReporter::new(true);
//! reporter.on_line(OutputStream::Stdout, "Installing dependencies");
//! ```

use crate::{
    cli::output::{create_progress_bar, format_execution_event},
    collaborator::{OutputStream, ProcessOutputCallback},
    execution::ExecutionEvent,
};
use console::style;
use indicatif::ProgressBar;
use std::io::{self, Write};
use std::sync::Mutex;

/// Longest tool output line shown as the progress bar message
const MESSAGE_WIDTH: usize = 60;

#[derive(Debug)]
pub struct TerminalReporter {
    verbose: bool,
    progress: Mutex<Option<ProgressBar>>,
}

impl TerminalReporter {
    pub fn new(verbose: bool) -> Self {
        Self {
            verbose,
            progress: Mutex::new(None),
        }
    }

    /// Print a step header
    ///
    /// Format: `[N/M] step-name`
    fn print_step_header(&self, index: usize, total: usize, name: &str) {
        self.println(&format!(
            "\n[{}/{}] {}",
            style(index).cyan(),
            style(total).dim(),
            style(name).bold()
        ));
    }

    /// A horizontal rule spanning the terminal width
    fn print_separator(&self) {
        let width = term_size::dimensions_stdout().map(|(w, _)| w).unwrap_or(80);
        self.println(&style("─".repeat(width)).dim().to_string());
    }

    /// Print above the progress bar when one is active
    fn println(&self, line: &str) {
        match self.progress.lock().ok().and_then(|p| p.clone()) {
            Some(progress) => progress.println(line),
            None => {
                println!("{}", line);
                let _ = io::stdout().flush();
            }
        }
    }

    fn with_progress(&self, f: impl FnOnce(&ProgressBar)) {
        if let Ok(guard) = self.progress.lock() {
            if let Some(progress) = guard.as_ref() {
                f(progress);
            }
        }
    }

    /// Render one engine event
    pub fn on_execution_event(&self, event: &ExecutionEvent) {
        match event {
            ExecutionEvent::RunStarted { steps, .. } => {
                self.println(&format_execution_event(event));
                if !self.verbose {
                    if let Ok(mut guard) = self.progress.lock() {
                        *guard = Some(create_progress_bar(steps.len()));
                    }
                }
            }
            ExecutionEvent::StepStarted { step, index, total } => {
                if self.verbose {
                    self.print_separator();
                    self.print_step_header(*index, *total, step.name());
                }
                self.with_progress(|p| p.set_message(step.name()));
            }
            ExecutionEvent::StepCompleted { .. } | ExecutionEvent::StepFailureSuppressed { .. } => {
                self.println(&format_execution_event(event));
                self.with_progress(|p| p.inc(1));
            }
            ExecutionEvent::StepFailed { .. } => {
                self.println(&format_execution_event(event));
            }
            ExecutionEvent::RunFinished { .. } => {
                if let Ok(mut guard) = self.progress.lock() {
                    if let Some(progress) = guard.take() {
                        progress.finish_and_clear();
                    }
                }
                println!("{}", format_execution_event(event));
            }
        }
    }
}

impl ProcessOutputCallback for TerminalReporter {
    fn on_line(&self, stream: OutputStream, line: &str) {
        if self.verbose {
            match stream {
                OutputStream::Stdout => println!("{}", line),
                OutputStream::Stderr => eprintln!("{}", style(line).dim()),
            }
            return;
        }

        let trimmed = line.trim();
        if !trimmed.is_empty() {
            let message: String = trimmed.chars().take(MESSAGE_WIDTH).collect();
            self.with_progress(|p| p.set_message(message));
        }
    }
}

//! Live output of external processes
//!
//! Child process output is read line by line while the process runs and
//! each line is handed to a [`ProcessOutputCallback`], so long-running tools
//! (composer, npm, the PHP installer) show progress instead of going quiet
//! until they exit.
//!
//! # Example
//!
//! ```
//! use ext_builder::collaborator::{OutputStream, ProcessOutputCallback};
//!
//! struct Printer;
//!
//! impl ProcessOutputCallback for Printer {
//!     fn on_line(&self, stream: OutputStream, line: &str) {
//!         match stream {
//!             OutputStream::Stdout => println!("{}", line),
//!             OutputStream::Stderr => eprintln!("{}", line),
//!         }
//!     }
//! }
//! ```

/// Which pipe a line came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputStream {
    Stdout,
    Stderr,
}

/// Callback for process output lines
///
/// This trait is object-safe and can be shared as `Arc<dyn ProcessOutputCallback>`.
pub trait ProcessOutputCallback: Send + Sync {
    /// Called once per line, without the trailing newline
    fn on_line(&self, stream: OutputStream, line: &str);
}

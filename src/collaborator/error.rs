//! Collaborator error types

use std::path::PathBuf;
use thiserror::Error;

/// Failure of an external tool, download or archive operation
#[derive(Debug, Error)]
pub enum CollaboratorError {
    #[error("Failed to start `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{command}` exited with {}: {stderr}", exit_code_label(.code))]
    ProcessFailed {
        command: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("Download of {url} failed: {message}")]
    Http { url: String, message: String },

    #[error("Archive error in {path}: {source}")]
    Zip {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("{context} {path}: {source}")]
    Io {
        context: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CollaboratorError {
    pub fn io(context: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CollaboratorError::Io {
            context,
            path: path.into(),
            source,
        }
    }
}

fn exit_code_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("code {}", code),
        None => "a signal".to_string(),
    }
}

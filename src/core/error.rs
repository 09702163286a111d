//! Error taxonomy and exit codes

use crate::collaborator::CollaboratorError;
use std::path::PathBuf;
use thiserror::Error;

/// Why a step action failed
#[derive(Debug, Error)]
pub enum StepError {
    #[error(transparent)]
    Collaborator(#[from] CollaboratorError),

    #[error("{action} {path}: {source}")]
    Filesystem {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Missing required input: {0}")]
    MissingInput(String),

    #[error("Failed to encode package manifest: {0}")]
    Manifest(#[from] serde_json::Error),

    #[error(transparent)]
    Configuration(#[from] ConfigError),
}

impl StepError {
    pub fn fs(action: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StepError::Filesystem {
            action,
            path: path.into(),
            source,
        }
    }
}

/// Malformed or missing configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Repository URL must be a GitHub https URL, got '{0}'")]
    UnsupportedRepository(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Top-level failure of a dispatch
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    #[error(transparent)]
    Configuration(#[from] ConfigError),

    #[error("Step '{step}' failed: {source}")]
    StepExecution {
        step: String,
        #[source]
        source: StepError,
    },

    #[error("Another build is running in {path} (remove the lock file if it is stale)")]
    LockHeld { path: PathBuf },

    #[error("Failed to create lock file {path}: {source}")]
    Lock {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl BuildError {
    /// Process exit status for this failure class
    pub fn exit_code(&self) -> i32 {
        match self {
            BuildError::UnknownCommand(_) => 1,
            BuildError::Configuration(_) => 2,
            BuildError::StepExecution { .. } => 3,
            BuildError::LockHeld { .. } | BuildError::Lock { .. } => 4,
        }
    }

    /// Name of the failing step, for step execution failures
    pub fn failed_step(&self) -> Option<&str> {
        match self {
            BuildError::StepExecution { step, .. } => Some(step),
            _ => None,
        }
    }
}

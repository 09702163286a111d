//! External collaborators the steps delegate to
//!
//! Everything that touches the network, spawns a tool or reads/writes a zip
//! goes through [`Collaborators`], so step logic can be exercised with fakes.

pub mod archive;
pub mod error;
pub mod process;
pub mod streaming;

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub use archive::ArchiveClient;
pub use error::CollaboratorError;
pub use process::{ProcessCommand, ProcessOutput, ProcessRunner};
pub use streaming::{OutputStream, ProcessOutputCallback};

/// Narrow command interface to the outside world
#[async_trait]
pub trait Collaborators: Send + Sync {
    /// Download `url` to `dest` and return the local path
    async fn fetch_archive(&self, url: &str, dest: &Path) -> Result<PathBuf, CollaboratorError>;

    /// Unpack the zip at `archive` into `dest`
    async fn extract_archive(&self, archive: &Path, dest: &Path) -> Result<(), CollaboratorError>;

    /// Run an external process to completion; non-zero exit is an error
    async fn run_process(&self, command: &ProcessCommand) -> Result<ProcessOutput, CollaboratorError>;

    /// Zip `source_dir` into the package file `dest`
    async fn write_archive(&self, source_dir: &Path, dest: &Path) -> Result<PathBuf, CollaboratorError>;
}

/// Real collaborators: local processes, HTTP downloads, zip files on disk
#[derive(Debug, Clone, Default)]
pub struct LocalCollaborators {
    process: ProcessRunner,
    archive: ArchiveClient,
}

impl LocalCollaborators {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stream child process output to `callback`
    pub fn with_output(mut self, callback: Arc<dyn ProcessOutputCallback>) -> Self {
        self.process = self.process.with_callback(callback);
        self
    }
}

#[async_trait]
impl Collaborators for LocalCollaborators {
    async fn fetch_archive(&self, url: &str, dest: &Path) -> Result<PathBuf, CollaboratorError> {
        self.archive.download(url, dest).await
    }

    async fn extract_archive(&self, archive: &Path, dest: &Path) -> Result<(), CollaboratorError> {
        self.archive.extract(archive, dest).await
    }

    async fn run_process(&self, command: &ProcessCommand) -> Result<ProcessOutput, CollaboratorError> {
        self.process.run(command).await
    }

    async fn write_archive(&self, source_dir: &Path, dest: &Path) -> Result<PathBuf, CollaboratorError> {
        self.archive.pack(source_dir, dest).await
    }
}

#[async_trait]
impl<T: Collaborators + ?Sized> Collaborators for Arc<T> {
    async fn fetch_archive(&self, url: &str, dest: &Path) -> Result<PathBuf, CollaboratorError> {
        (**self).fetch_archive(url, dest).await
    }

    async fn extract_archive(&self, archive: &Path, dest: &Path) -> Result<(), CollaboratorError> {
        (**self).extract_archive(archive, dest).await
    }

    async fn run_process(&self, command: &ProcessCommand) -> Result<ProcessOutput, CollaboratorError> {
        (**self).run_process(command).await
    }

    async fn write_archive(&self, source_dir: &Path, dest: &Path) -> Result<PathBuf, CollaboratorError> {
        (**self).write_archive(source_dir, dest).await
    }
}

//! Workspace lock guarding against concurrent runs in one directory

use crate::core::error::BuildError;
use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;

pub const LOCK_FILE: &str = ".ext-builder.lock";

/// Held for the duration of a run; the lock file is removed on drop
#[derive(Debug)]
pub struct WorkspaceLock {
    path: PathBuf,
}

impl WorkspaceLock {
    pub fn acquire(working_dir: &Path, run_id: Uuid) -> Result<Self, BuildError> {
        let path = working_dir.join(LOCK_FILE);

        let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(BuildError::LockHeld { path });
            }
            Err(source) => return Err(BuildError::Lock { path, source }),
        };

        // Contents are informational only
        let _ = writeln!(file, "run={} pid={}", run_id, std::process::id());
        debug!("Acquired workspace lock {}", path.display());

        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for WorkspaceLock {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            warn!("Failed to remove lock file {}: {}", self.path.display(), e);
        }
    }
}

//! Filesystem mutations performed by steps

use crate::core::StepError;
use std::path::Path;
use tracing::debug;

/// Delete `dir` with everything in it and recreate it empty
pub fn reset_dir(dir: &Path) -> Result<(), StepError> {
    remove_dir_if_exists(dir)?;
    std::fs::create_dir_all(dir).map_err(|e| StepError::fs("Failed to create", dir, e))
}

/// Delete `dir` recursively; a missing directory is not an error
pub fn remove_dir_if_exists(dir: &Path) -> Result<bool, StepError> {
    match std::fs::remove_dir_all(dir) {
        Ok(()) => {
            debug!("Removed {}", dir.display());
            Ok(true)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(StepError::fs("Failed to remove", dir, e)),
    }
}

/// Copy the contents of `src` into `dst`, overwriting files that exist in
/// both and leaving files only present in `dst` alone. Returns the number
/// of files copied.
pub fn copy_dir_contents(src: &Path, dst: &Path) -> Result<usize, StepError> {
    std::fs::create_dir_all(dst).map_err(|e| StepError::fs("Failed to create", dst, e))?;

    let mut copied = 0;
    let entries = std::fs::read_dir(src).map_err(|e| StepError::fs("Failed to read", src, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| StepError::fs("Failed to read", src, e))?;
        let path = entry.path();
        let target = dst.join(entry.file_name());
        let file_type = entry
            .file_type()
            .map_err(|e| StepError::fs("Failed to stat", &path, e))?;

        if file_type.is_dir() {
            copied += copy_dir_contents(&path, &target)?;
        } else {
            copy_file(&path, &target)?;
            copied += 1;
        }
    }

    Ok(copied)
}

/// Copy one file, creating the target's parent directories
pub fn copy_file(src: &Path, dst: &Path) -> Result<(), StepError> {
    if let Some(parent) = dst.parent() {
        std::fs::create_dir_all(parent).map_err(|e| StepError::fs("Failed to create", parent, e))?;
    }
    std::fs::copy(src, dst).map_err(|e| StepError::fs("Failed to copy", src, e))?;
    Ok(())
}

//! Archive download, extraction and packaging

use crate::collaborator::CollaboratorError;
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Component, Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// Downloads and (un)packs zip archives
#[derive(Debug, Clone, Default)]
pub struct ArchiveClient {
    http: reqwest::Client,
}

impl ArchiveClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Download `url` to `dest`.
    ///
    /// The body is streamed to `<dest>.part` and renamed into place, so an
    /// interrupted download never leaves a truncated archive at `dest`.
    pub async fn download(&self, url: &str, dest: &Path) -> Result<PathBuf, CollaboratorError> {
        info!("Downloading {}", url);

        let http_error = |e: reqwest::Error| CollaboratorError::Http {
            url: url.to_string(),
            message: e.to_string(),
        };

        let mut response = self
            .http
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(http_error)?;

        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| CollaboratorError::io("Failed to create", parent, e))?;
        }

        let partial = partial_path(dest);
        let mut file = tokio::fs::File::create(&partial)
            .await
            .map_err(|e| CollaboratorError::io("Failed to create", &partial, e))?;

        let mut written: u64 = 0;
        while let Some(chunk) = response.chunk().await.map_err(http_error)? {
            file.write_all(&chunk)
                .await
                .map_err(|e| CollaboratorError::io("Failed to write", &partial, e))?;
            written += chunk.len() as u64;
        }
        file.flush()
            .await
            .map_err(|e| CollaboratorError::io("Failed to write", &partial, e))?;
        drop(file);

        tokio::fs::rename(&partial, dest)
            .await
            .map_err(|e| CollaboratorError::io("Failed to move download to", dest, e))?;

        debug!("Downloaded {} bytes to {}", written, dest.display());
        Ok(dest.to_path_buf())
    }

    /// Extract `archive` into `dest` on a blocking worker thread
    pub async fn extract(&self, archive: &Path, dest: &Path) -> Result<(), CollaboratorError> {
        let archive = archive.to_path_buf();
        let dest = dest.to_path_buf();
        tokio::task::spawn_blocking(move || extract_zip(&archive, &dest))
            .await
            .map_err(|e| CollaboratorError::Internal(format!("extract task failed: {}", e)))?
    }

    /// Zip the contents of `source_dir` into `dest`
    pub async fn pack(&self, source_dir: &Path, dest: &Path) -> Result<PathBuf, CollaboratorError> {
        let source_dir = source_dir.to_path_buf();
        let dest = dest.to_path_buf();
        tokio::task::spawn_blocking(move || write_zip(&source_dir, &dest).map(|_| dest))
            .await
            .map_err(|e| CollaboratorError::Internal(format!("pack task failed: {}", e)))?
    }
}

fn partial_path(dest: &Path) -> PathBuf {
    let mut name = dest.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".part");
    dest.with_file_name(name)
}

/// Extract a zip archive into `dest`.
///
/// GitHub branch archives wrap everything in one `<repo>-<branch>/`
/// directory; when all entries share a single top-level directory it is
/// stripped so the tree lands directly in `dest`.
pub fn extract_zip(archive: &Path, dest: &Path) -> Result<(), CollaboratorError> {
    let zip_error = |source| CollaboratorError::Zip {
        path: archive.to_path_buf(),
        source,
    };

    let file = File::open(archive).map_err(|e| CollaboratorError::io("Failed to open", archive, e))?;
    let mut zip = ZipArchive::new(file).map_err(zip_error)?;

    let root = single_root_dir(&mut zip).map_err(zip_error)?;
    debug!(
        "Extracting {} ({} entries, root {:?})",
        archive.display(),
        zip.len(),
        root
    );

    for i in 0..zip.len() {
        let mut entry = zip.by_index(i).map_err(zip_error)?;

        // Skip entries escaping the destination
        let Some(name) = entry.enclosed_name().map(Path::to_path_buf) else {
            continue;
        };
        let relative = match &root {
            Some(root) => match name.strip_prefix(root) {
                Ok(rest) => rest.to_path_buf(),
                Err(_) => continue,
            },
            None => name,
        };
        if relative.as_os_str().is_empty() {
            continue;
        }

        let target = dest.join(&relative);
        if entry.is_dir() {
            std::fs::create_dir_all(&target)
                .map_err(|e| CollaboratorError::io("Failed to create", &target, e))?;
            continue;
        }

        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| CollaboratorError::io("Failed to create", parent, e))?;
        }
        let mut out =
            File::create(&target).map_err(|e| CollaboratorError::io("Failed to create", &target, e))?;
        std::io::copy(&mut entry, &mut out)
            .map_err(|e| CollaboratorError::io("Failed to write", &target, e))?;

        #[cfg(unix)]
        if let Some(mode) = entry.unix_mode() {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&target, std::fs::Permissions::from_mode(mode))
                .map_err(|e| CollaboratorError::io("Failed to set permissions on", &target, e))?;
        }
    }

    Ok(())
}

/// The directory every entry lives under, if there is exactly one
fn single_root_dir<R: Read + std::io::Seek>(
    zip: &mut ZipArchive<R>,
) -> Result<Option<PathBuf>, zip::result::ZipError> {
    let mut root: Option<PathBuf> = None;

    for i in 0..zip.len() {
        let entry = zip.by_index(i)?;
        let Some(name) = entry.enclosed_name() else {
            continue;
        };
        let mut components = name.components();
        let first = match components.next() {
            Some(Component::Normal(first)) => PathBuf::from(first),
            _ => continue,
        };
        // A file at the top level means there is no wrapping directory
        if components.next().is_none() && !entry.is_dir() {
            return Ok(None);
        }
        match &root {
            Some(existing) if *existing != first => return Ok(None),
            Some(_) => {}
            None => root = Some(first),
        }
    }

    Ok(root)
}

/// Write every file under `source_dir` into a new zip at `dest`.
///
/// Entries are added in sorted order so identical trees give identical
/// entry lists.
pub fn write_zip(source_dir: &Path, dest: &Path) -> Result<(), CollaboratorError> {
    let zip_error = |source| CollaboratorError::Zip {
        path: dest.to_path_buf(),
        source,
    };

    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent).map_err(|e| CollaboratorError::io("Failed to create", parent, e))?;
    }
    let file = File::create(dest).map_err(|e| CollaboratorError::io("Failed to create", dest, e))?;
    let mut zip = ZipWriter::new(file);
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

    let mut entries = Vec::new();
    collect_entries(source_dir, source_dir, &mut entries)?;

    for (path, is_dir) in entries {
        let relative = path
            .strip_prefix(source_dir)
            .map_err(|e| CollaboratorError::Internal(e.to_string()))?;
        let name = zip_entry_name(relative);

        if is_dir {
            zip.add_directory(format!("{}/", name), options).map_err(zip_error)?;
            continue;
        }

        zip.start_file(name, options).map_err(zip_error)?;
        let mut input = File::open(&path).map_err(|e| CollaboratorError::io("Failed to open", &path, e))?;
        let mut buffer = Vec::new();
        input
            .read_to_end(&mut buffer)
            .map_err(|e| CollaboratorError::io("Failed to read", &path, e))?;
        zip.write_all(&buffer)
            .map_err(|e| CollaboratorError::io("Failed to write", dest, e))?;
    }

    zip.finish().map_err(zip_error)?;
    Ok(())
}

fn collect_entries(
    root: &Path,
    dir: &Path,
    entries: &mut Vec<(PathBuf, bool)>,
) -> Result<(), CollaboratorError> {
    let mut children: Vec<PathBuf> = std::fs::read_dir(dir)
        .map_err(|e| CollaboratorError::io("Failed to read", dir, e))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .collect();
    children.sort();

    for child in children {
        if child.is_dir() {
            entries.push((child.clone(), true));
            collect_entries(root, &child, entries)?;
        } else {
            entries.push((child, false));
        }
    }

    Ok(())
}

/// Zip entry names always use forward slashes
fn zip_entry_name(relative: &Path) -> String {
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

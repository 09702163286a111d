//! Run context - per-invocation parameters shared read-only by all steps

use crate::core::config::{BuildConfig, ExtensionManifest, EXTENSION_FILE};
use crate::core::error::ConfigError;
use std::path::PathBuf;
use std::sync::Arc;
use uuid::Uuid;

/// Parameters of one invocation
///
/// Built once before dispatch and never mutated afterwards.
#[derive(Debug, Clone)]
pub struct RunContext {
    /// Identifier attached to log lines of this run
    pub run_id: Uuid,

    /// Upstream branch to fetch
    pub branch: String,

    /// Use `archive/archive-<branch>.zip` instead of downloading
    pub use_local_archive: bool,

    /// Root of the extension project
    pub working_dir: PathBuf,

    /// File argument of `--copy-file`
    pub file: Option<PathBuf>,

    pub config: Arc<BuildConfig>,
}

impl RunContext {
    /// Create a context with the branch defaulted from configuration
    pub fn new(working_dir: impl Into<PathBuf>, config: BuildConfig) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            branch: config.espocrm.branch.clone(),
            use_local_archive: false,
            working_dir: working_dir.into(),
            file: None,
            config: Arc::new(config),
        }
    }

    pub fn with_branch(mut self, branch: Option<String>) -> Self {
        if let Some(branch) = branch.filter(|b| !b.trim().is_empty()) {
            self.branch = branch;
        }
        self
    }

    pub fn with_local_archive(mut self, local: bool) -> Self {
        self.use_local_archive = local;
        self
    }

    pub fn with_file(mut self, file: Option<PathBuf>) -> Self {
        self.file = file;
        self
    }

    /// Installation target
    pub fn site_dir(&self) -> PathBuf {
        self.working_dir.join("site")
    }

    pub fn archive_dir(&self) -> PathBuf {
        self.working_dir.join("archive")
    }

    /// Branch-keyed local archive cache; `/` in the branch becomes `-`
    pub fn archive_path(&self) -> PathBuf {
        self.archive_dir()
            .join(format!("archive-{}.zip", self.branch.replace('/', "-")))
    }

    /// Source tree copied into `site/`
    pub fn src_files_dir(&self) -> PathBuf {
        self.working_dir.join("src").join("files")
    }

    pub fn src_scripts_dir(&self) -> PathBuf {
        self.working_dir.join("src").join("scripts")
    }

    pub fn build_dir(&self) -> PathBuf {
        self.working_dir.join("build")
    }

    /// Pre-built extensions installed after the site itself
    pub fn extensions_dir(&self) -> PathBuf {
        self.working_dir.join("extensions")
    }

    pub fn php_scripts_dir(&self) -> PathBuf {
        self.working_dir.join("php_scripts")
    }

    pub fn tests_dir(&self) -> PathBuf {
        self.working_dir.join("tests")
    }

    /// Read `extension.json` from the working directory
    pub fn extension(&self) -> Result<ExtensionManifest, ConfigError> {
        ExtensionManifest::from_file(&self.working_dir.join(EXTENSION_FILE))
    }
}

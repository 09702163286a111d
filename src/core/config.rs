//! Build configuration loaded from `config-default.json` / `config.json`
//! and the extension description in `extension.json`

use crate::core::error::ConfigError;
use heck::ToKebabCase;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

pub const DEFAULT_CONFIG_FILE: &str = "config-default.json";
pub const LOCAL_CONFIG_FILE: &str = "config.json";
pub const EXTENSION_FILE: &str = "extension.json";

/// Top-level build configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BuildConfig {
    /// Upstream CRM source
    pub espocrm: UpstreamConfig,

    /// Target database used by the installer and `--db-reset`
    pub database: DatabaseConfig,

    /// Installer parameters
    pub install: InstallConfig,

    /// External tool executables
    pub tools: ToolsConfig,

    /// Commands run inside `site/` after extraction
    pub fetch: FetchConfig,

    /// Frontend build commands run while packaging
    pub frontend: FrontendConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UpstreamConfig {
    pub repository: String,
    pub branch: String,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            repository: "https://github.com/espocrm/espocrm.git".to_string(),
            branch: "master".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: Option<u16>,
    pub dbname: String,
    pub user: String,
    pub password: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: None,
            dbname: "espocrm".to_string(),
            user: "root".to_string(),
            password: String::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InstallConfig {
    pub site_url: String,
    pub language: String,
    pub admin_username: String,
    pub admin_password: String,
    /// Owner applied to `site/` after install; `set-owner` is a no-op without it
    pub default_owner: Option<String>,
    pub default_group: Option<String>,
}

impl Default for InstallConfig {
    fn default() -> Self {
        Self {
            site_url: "http://localhost/site".to_string(),
            language: "en_US".to_string(),
            admin_username: "admin".to_string(),
            admin_password: "1".to_string(),
            default_owner: None,
            default_group: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ToolsConfig {
    pub php: String,
    pub composer: String,
    pub mysql: String,
    pub chown: String,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            php: "php".to_string(),
            composer: "composer".to_string(),
            mysql: "mysql".to_string(),
            chown: "chown".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FetchConfig {
    pub build_commands: Vec<String>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            build_commands: vec!["npm ci".to_string(), "npx grunt internal".to_string()],
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FrontendConfig {
    pub commands: Vec<String>,
}

fn github_repository() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^https://github\.com/([A-Za-z0-9_.-]+)/([A-Za-z0-9_.-]+?)(?:\.git)?/?$")
            .expect("static regex")
    })
}

impl BuildConfig {
    /// Load defaults from `config-default.json` and overlay `config.json`
    /// (or `override_path` when given) from the working directory.
    pub fn load(working_dir: &Path, override_path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut merged = Value::Object(Default::default());

        let defaults = working_dir.join(DEFAULT_CONFIG_FILE);
        if defaults.exists() {
            merge_values(&mut merged, read_value(&defaults)?);
        }

        match override_path {
            Some(path) => merge_values(&mut merged, read_value(path)?),
            None => {
                let local = working_dir.join(LOCAL_CONFIG_FILE);
                if local.exists() {
                    merge_values(&mut merged, read_value(&local)?);
                }
            }
        }

        let config: BuildConfig =
            serde_json::from_value(merged).map_err(|e| ConfigError::Parse {
                path: working_dir.join(LOCAL_CONFIG_FILE),
                message: e.to_string(),
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a single JSON document (mainly for tests)
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: BuildConfig = serde_json::from_str(json).map_err(|e| ConfigError::Parse {
            path: PathBuf::from("<inline>"),
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_branch(&self.espocrm.branch)?;
        self.repository_slug()?;
        Ok(())
    }

    /// `(owner, repo)` of the upstream GitHub repository
    pub fn repository_slug(&self) -> Result<(String, String), ConfigError> {
        let caps = github_repository()
            .captures(&self.espocrm.repository)
            .ok_or_else(|| ConfigError::UnsupportedRepository(self.espocrm.repository.clone()))?;
        Ok((caps[1].to_string(), caps[2].to_string()))
    }

    /// Download URL of the branch archive
    pub fn archive_url(&self, branch: &str) -> Result<String, ConfigError> {
        let (owner, repo) = self.repository_slug()?;
        Ok(format!(
            "https://github.com/{}/{}/archive/refs/heads/{}.zip",
            owner, repo, branch
        ))
    }
}

/// Check that `branch` is usable in the archive URL and the cache file name.
///
/// Slash-separated names like `release/8.4` are fine; empty segments, `..`,
/// backslashes and whitespace are not.
pub fn validate_branch(branch: &str) -> Result<(), ConfigError> {
    if branch.is_empty() {
        return Err(ConfigError::Invalid("branch must not be empty".to_string()));
    }
    let bad_char = branch.chars().any(|c| c == '\\' || c.is_whitespace() || c.is_control());
    let bad_segment = branch.split('/').any(|segment| segment.is_empty() || segment == "." || segment == "..");
    if bad_char || bad_segment {
        return Err(ConfigError::Invalid(format!("invalid branch name '{}'", branch)));
    }
    Ok(())
}

fn read_value(path: &Path) -> Result<Value, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let is_yaml = matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    );
    let parsed = if is_yaml {
        serde_yaml::from_str::<Value>(&content).map_err(|e| e.to_string())
    } else {
        serde_json::from_str::<Value>(&content).map_err(|e| e.to_string())
    };

    parsed.map_err(|message| ConfigError::Parse {
        path: path.to_path_buf(),
        message,
    })
}

/// Recursively overlay `overlay` onto `base`; non-object values replace.
fn merge_values(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            for (key, value) in overlay_map {
                match base_map.get_mut(&key) {
                    Some(existing) => merge_values(existing, value),
                    None => {
                        base_map.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

/// Extension description from `extension.json`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtensionManifest {
    /// Human-readable extension name
    pub name: String,

    /// Module identity, e.g. `MyModule`
    pub module: String,

    pub version: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub author: String,

    #[serde(default)]
    pub acceptable_versions: Vec<String>,

    #[serde(default)]
    pub php: Vec<String>,
}

impl ExtensionManifest {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&content).map_err(|e| match e {
            ConfigError::Parse { message, .. } => ConfigError::Parse {
                path: path.to_path_buf(),
                message,
            },
            other => other,
        })
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let manifest: ExtensionManifest =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse {
                path: PathBuf::from(EXTENSION_FILE),
                message: e.to_string(),
            })?;

        if manifest.module.trim().is_empty() {
            return Err(ConfigError::Invalid("extension module must not be empty".to_string()));
        }
        if manifest.module.contains(['/', '\\', '.']) {
            return Err(ConfigError::Invalid(format!(
                "extension module '{}' must be a plain identifier",
                manifest.module
            )));
        }
        Ok(manifest)
    }

    /// Frontend module directory name, e.g. `my-module`
    pub fn module_kebab(&self) -> String {
        self.module.to_kebab_case()
    }

    /// Package file name, e.g. `my-extension-1.0.0.zip`
    pub fn package_file_name(&self) -> String {
        format!("{}-{}.zip", self.name.to_kebab_case(), self.version)
    }
}

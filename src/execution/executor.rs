//! Step executor - runs the action behind each step

use crate::{
    collaborator::{Collaborators, ProcessCommand},
    core::{RunContext, StepError, StepKind},
    execution::{fsops, package},
};
use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info};

/// Name of the temporary download inside `site/` during a non-local fetch
const DOWNLOAD_FILE: &str = "archive.zip";

/// PHP installer actions, in the order the installer expects them
const INSTALL_ACTIONS: [&str; 7] = [
    "step1",
    "settingsTest",
    "saveSettings",
    "buildDatabase",
    "createUser",
    "savePreferences",
    "finish",
];

/// Runs one step's action to completion
#[async_trait]
pub trait StepRunner: Send + Sync {
    async fn run(&self, step: StepKind, ctx: &RunContext) -> Result<(), StepError>;
}

/// Executes steps against the real project layout through `C`
pub struct StepExecutor<C> {
    collaborators: C,
}

#[async_trait]
impl<C: Collaborators> StepRunner for StepExecutor<C> {
    async fn run(&self, step: StepKind, ctx: &RunContext) -> Result<(), StepError> {
        match step {
            StepKind::UpdateArchive => self.update_archive(ctx).await,
            StepKind::DbReset => self.db_reset(ctx).await,
            StepKind::Fetch => self.fetch(ctx).await,
            StepKind::Install => self.install(ctx).await,
            StepKind::InstallExtensions => self.install_extensions(ctx).await,
            StepKind::CopyExtension => self.copy_extension(ctx),
            StepKind::CopyFile => self.copy_file(ctx),
            StepKind::BeforeInstall => self.run_php_hook(ctx, "before_install.php").await,
            StepKind::AfterInstall => self.run_php_hook(ctx, "after_install.php").await,
            StepKind::ComposerInstall => self.composer_install(ctx).await,
            StepKind::SiteComposerInstallDev => self.site_composer_install_dev(ctx).await,
            StepKind::Rebuild => self.rebuild(ctx).await,
            StepKind::SetOwner => self.set_owner(ctx).await,
            StepKind::BuildExtension => package::build_extension(&self.collaborators, ctx).await.map(|_| ()),
        }
    }
}

impl<C: Collaborators> StepExecutor<C> {
    pub fn new(collaborators: C) -> Self {
        Self { collaborators }
    }

    async fn run_tool(&self, command: ProcessCommand) -> Result<(), StepError> {
        self.collaborators.run_process(&command).await?;
        Ok(())
    }

    fn php(&self, ctx: &RunContext, cwd: &Path) -> ProcessCommand {
        ProcessCommand::new(&ctx.config.tools.php, cwd)
    }

    fn require_site(&self, ctx: &RunContext) -> Result<PathBuf, StepError> {
        let site = ctx.site_dir();
        if !site.is_dir() {
            return Err(StepError::MissingInput(format!(
                "{} does not exist (run --fetch first)",
                site.display()
            )));
        }
        Ok(site)
    }

    async fn update_archive(&self, ctx: &RunContext) -> Result<(), StepError> {
        let url = ctx.config.archive_url(&ctx.branch)?;
        let dest = ctx.archive_path();
        self.collaborators.fetch_archive(&url, &dest).await?;
        info!("Archive for branch {} saved to {}", ctx.branch, dest.display());
        Ok(())
    }

    /// Wipe `site/` and repopulate it from the branch archive
    async fn fetch(&self, ctx: &RunContext) -> Result<(), StepError> {
        let site = ctx.site_dir();
        let archive = ctx.archive_path();
        if ctx.use_local_archive && !archive.is_file() {
            return Err(StepError::MissingInput(format!(
                "local archive {} (run --update-archive first)",
                archive.display()
            )));
        }

        fsops::reset_dir(&site)?;

        if ctx.use_local_archive {
            info!("Using local archive {}", archive.display());
            self.collaborators.extract_archive(&archive, &site).await?;
        } else {
            let url = ctx.config.archive_url(&ctx.branch)?;
            let download = self
                .collaborators
                .fetch_archive(&url, &site.join(DOWNLOAD_FILE))
                .await?;
            self.collaborators.extract_archive(&download, &site).await?;
            std::fs::remove_file(&download).map_err(|e| StepError::fs("Failed to remove", &download, e))?;
        }

        for line in &ctx.config.fetch.build_commands {
            if let Some(command) = ProcessCommand::parse(line, &site) {
                self.run_tool(command).await?;
            }
        }

        Ok(())
    }

    /// Drive the PHP installer CLI through a fresh installation
    async fn install(&self, ctx: &RunContext) -> Result<(), StepError> {
        let site = self.require_site(ctx)?;
        let db = &ctx.config.database;
        let install = &ctx.config.install;

        let host = match db.port {
            Some(port) => format!("{}:{}", db.host, port),
            None => db.host.clone(),
        };
        let db_params = [
            ("hostName", host.as_str()),
            ("dbName", db.dbname.as_str()),
            ("dbUserName", db.user.as_str()),
            ("dbUserPass", db.password.as_str()),
        ];

        for action in INSTALL_ACTIONS {
            let data = match action {
                "step1" => Some(form_encode(&[("user-lang", install.language.as_str())])),
                "settingsTest" | "saveSettings" => Some(form_encode(&db_params)),
                "createUser" => Some(form_encode(&[
                    ("user-name", install.admin_username.as_str()),
                    ("user-pass", install.admin_password.as_str()),
                ])),
                "savePreferences" => Some(form_encode(&[
                    ("language", install.language.as_str()),
                    ("siteUrl", install.site_url.as_str()),
                ])),
                _ => None,
            };

            debug!("Installer action {}", action);
            let mut command = self.php(ctx, &site).args(["install/cli.php", "-a", action]);
            if let Some(data) = data {
                command = command.args(["-d".to_string(), data]);
            }
            self.run_tool(command).await?;
        }

        let merge = ctx.php_scripts_dir().join("merge_configs.php");
        if merge.is_file() {
            let command = self
                .php(ctx, &ctx.working_dir)
                .arg(merge.to_string_lossy())
                .arg(site.to_string_lossy());
            self.run_tool(command).await?;
        }

        Ok(())
    }

    async fn install_extensions(&self, ctx: &RunContext) -> Result<(), StepError> {
        let site = self.require_site(ctx)?;
        let packages = extension_packages(&ctx.extensions_dir())?;
        if packages.is_empty() {
            debug!("No pre-built extensions to install");
            return Ok(());
        }

        for package in packages {
            info!("Installing extension {}", package.display());
            let command = self
                .php(ctx, &site)
                .args(["command.php", "extension"])
                .arg(format!("--file={}", package.display()));
            self.run_tool(command).await?;
        }

        Ok(())
    }

    /// Replace the module's directories in `site/` with fresh copies
    fn copy_extension(&self, ctx: &RunContext) -> Result<(), StepError> {
        let extension = ctx.extension()?;
        let site = ctx.site_dir();
        let module = &extension.module;

        let previous = [
            site.join("custom/Espo/Modules").join(module),
            site.join("client/custom/modules").join(extension.module_kebab()),
            site.join("tests/unit/Espo/Modules").join(module),
            site.join("tests/integration/Espo/Modules").join(module),
        ];
        for dir in &previous {
            fsops::remove_dir_if_exists(dir)?;
        }

        let src = ctx.src_files_dir();
        if !src.is_dir() {
            return Err(StepError::MissingInput(format!("{} does not exist", src.display())));
        }
        let copied = fsops::copy_dir_contents(&src, &site)?;

        let tests = ctx.tests_dir();
        let test_files = if tests.is_dir() {
            fsops::copy_dir_contents(&tests, &site.join("tests"))?
        } else {
            0
        };

        info!("Copied {} source files and {} test files into {}", copied, test_files, site.display());
        Ok(())
    }

    /// Copy the single file named by `--file`
    fn copy_file(&self, ctx: &RunContext) -> Result<(), StepError> {
        let file = ctx
            .file
            .as_deref()
            .ok_or_else(|| StepError::MissingInput("--file=<path> is required with --copy-file".to_string()))?;

        let (src, dst) = copy_file_targets(ctx, file)?;
        if !src.is_file() {
            return Err(StepError::MissingInput(format!("{} is not a file", src.display())));
        }

        fsops::copy_file(&src, &dst)?;
        info!("Copied {} to {}", src.display(), dst.display());
        Ok(())
    }

    /// Run `php_scripts/<script>` against the site, if the project has one
    async fn run_php_hook(&self, ctx: &RunContext, script: &str) -> Result<(), StepError> {
        let path = ctx.php_scripts_dir().join(script);
        if !path.is_file() {
            info!("{} not found, skipping", path.display());
            return Ok(());
        }

        let site = self.require_site(ctx)?;
        let command = self
            .php(ctx, &ctx.working_dir)
            .arg(path.to_string_lossy())
            .arg(site.to_string_lossy());
        self.run_tool(command).await
    }

    /// Install the module's own composer dependencies
    async fn composer_install(&self, ctx: &RunContext) -> Result<(), StepError> {
        let extension = ctx.extension()?;
        let module_dir = ctx.site_dir().join("custom/Espo/Modules").join(&extension.module);

        if !module_dir.join("composer.json").is_file() {
            info!("No composer.json in {}, skipping", module_dir.display());
            return Ok(());
        }

        let command = ProcessCommand::new(&ctx.config.tools.composer, &module_dir)
            .args(["install", "--no-dev", "--no-interaction"]);
        self.run_tool(command).await
    }

    async fn site_composer_install_dev(&self, ctx: &RunContext) -> Result<(), StepError> {
        let site = self.require_site(ctx)?;
        let command = ProcessCommand::new(&ctx.config.tools.composer, &site)
            .args(["install", "--no-interaction"]);
        self.run_tool(command).await
    }

    async fn rebuild(&self, ctx: &RunContext) -> Result<(), StepError> {
        let site = self.require_site(ctx)?;
        let command = self.php(ctx, &site).arg("rebuild.php");
        self.run_tool(command).await
    }

    async fn set_owner(&self, ctx: &RunContext) -> Result<(), StepError> {
        let Some(owner) = ctx.config.install.default_owner.as_deref() else {
            debug!("No default owner configured");
            return Ok(());
        };
        let owner_spec = match ctx.config.install.default_group.as_deref() {
            Some(group) => format!("{}:{}", owner, group),
            None => owner.to_string(),
        };

        let command = ProcessCommand::new(&ctx.config.tools.chown, &ctx.working_dir)
            .arg("-R")
            .arg(owner_spec)
            .arg(ctx.site_dir().to_string_lossy());
        self.run_tool(command).await
    }

    /// Drop and recreate the configured database
    async fn db_reset(&self, ctx: &RunContext) -> Result<(), StepError> {
        let db = &ctx.config.database;
        if !is_plain_identifier(&db.dbname) {
            return Err(StepError::MissingInput(format!(
                "database name '{}' is not a plain identifier",
                db.dbname
            )));
        }

        let mut command = ProcessCommand::new(&ctx.config.tools.mysql, &ctx.working_dir)
            .args(["-h", db.host.as_str(), "-u", db.user.as_str()]);
        if let Some(port) = db.port {
            command = command.args(["-P".to_string(), port.to_string()]);
        }
        if !db.password.is_empty() {
            command = command.env("MYSQL_PWD", db.password.as_str());
        }
        let command = command.arg("-e").arg(format!(
            "DROP DATABASE IF EXISTS `{0}`; CREATE DATABASE `{0}`;",
            db.dbname
        ));

        self.run_tool(command).await
    }
}

/// Pre-built extension archives, sorted by name
fn extension_packages(dir: &Path) -> Result<Vec<PathBuf>, StepError> {
    let pattern = format!("{}/*.zip", glob::Pattern::escape(&dir.to_string_lossy()));
    let paths = glob::glob(&pattern)
        .map_err(|e| StepError::MissingInput(format!("Invalid extension pattern {}: {}", pattern, e)))?;

    let mut packages = Vec::new();
    for entry in paths {
        let path = entry.map_err(|e| StepError::fs("Failed to read", e.path().to_path_buf(), e.into_error()))?;
        packages.push(path);
    }
    packages.sort();
    Ok(packages)
}

/// Map a `--file` argument to its source and its place in `site/`.
///
/// `src/files/<p>` lands at `site/<p>`, `tests/<p>` at `site/tests/<p>`,
/// and any other relative path is taken from `src/files/`.
fn copy_file_targets(ctx: &RunContext, file: &Path) -> Result<(PathBuf, PathBuf), StepError> {
    let relative = if file.is_absolute() {
        file.strip_prefix(&ctx.working_dir)
            .map_err(|_| {
                StepError::MissingInput(format!("{} is outside {}", file.display(), ctx.working_dir.display()))
            })?
            .to_path_buf()
    } else {
        file.components()
            .filter(|c| !matches!(c, Component::CurDir))
            .collect()
    };

    if relative.components().any(|c| !matches!(c, Component::Normal(_))) {
        return Err(StepError::MissingInput(format!(
            "{} must stay inside the project",
            file.display()
        )));
    }

    let site = ctx.site_dir();
    if let Ok(rest) = relative.strip_prefix("src/files") {
        Ok((ctx.src_files_dir().join(rest), site.join(rest)))
    } else if relative.starts_with("tests") {
        Ok((ctx.working_dir.join(&relative), site.join(&relative)))
    } else {
        Ok((ctx.src_files_dir().join(&relative), site.join(&relative)))
    }
}

fn is_plain_identifier(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// `application/x-www-form-urlencoded` encoding of the installer's `-d` data
fn form_encode(pairs: &[(&str, &str)]) -> String {
    fn encode(value: &str) -> String {
        value
            .bytes()
            .map(|b| match b {
                b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => (b as char).to_string(),
                b' ' => "+".to_string(),
                _ => format!("%{:02X}", b),
            })
            .collect()
    }

    pairs
        .iter()
        .map(|(k, v)| format!("{}={}", encode(k), encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

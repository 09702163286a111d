//! Extension packaging - stages the sources and zips an installable package

use crate::{
    collaborator::{Collaborators, ProcessCommand},
    core::{config::ExtensionManifest, RunContext, StepError},
    execution::fsops,
};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;

/// Staged `files/` tree handed to frontend commands
pub const BUILD_DIR_ENV: &str = "EXT_BUILD_DIR";
/// Staged client directory of the module
pub const CLIENT_DIR_ENV: &str = "EXT_CLIENT_DIR";
pub const MODULE_ENV: &str = "EXT_MODULE";

/// Installer manifest written at the root of the package
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageManifest {
    pub name: String,
    pub module: String,
    pub version: String,
    pub description: String,
    pub author: String,
    pub acceptable_versions: Vec<String>,
    pub php: Vec<String>,
    pub release_date: String,
    pub skip_backup: bool,
}

impl PackageManifest {
    pub fn new(extension: &ExtensionManifest, release_date: String) -> Self {
        Self {
            name: extension.name.clone(),
            module: extension.module.clone(),
            version: extension.version.clone(),
            description: extension.description.clone(),
            author: extension.author.clone(),
            acceptable_versions: extension.acceptable_versions.clone(),
            php: extension.php.clone(),
            release_date,
            skip_backup: true,
        }
    }
}

/// Build `build/<name>-<version>.zip` and return its path
pub async fn build_extension<C: Collaborators>(collaborators: &C, ctx: &RunContext) -> Result<PathBuf, StepError> {
    let extension = ctx.extension()?;
    let build_dir = ctx.build_dir();
    let staging = build_dir.join("tmp");

    fsops::reset_dir(&staging)?;

    let src_files = ctx.src_files_dir();
    if !src_files.is_dir() {
        return Err(StepError::MissingInput(format!("{} does not exist", src_files.display())));
    }
    let staged_files = staging.join("files");
    fsops::copy_dir_contents(&src_files, &staged_files)?;

    let src_scripts = ctx.src_scripts_dir();
    if src_scripts.is_dir() {
        fsops::copy_dir_contents(&src_scripts, &staging.join("scripts"))?;
    }

    // Frontend tools rewrite the staged client sources in place
    let client_dir = staged_files
        .join("client/custom/modules")
        .join(extension.module_kebab());
    for line in &ctx.config.frontend.commands {
        if let Some(command) = ProcessCommand::parse(line, &ctx.working_dir) {
            let command = command
                .env(BUILD_DIR_ENV, staged_files.to_string_lossy())
                .env(CLIENT_DIR_ENV, client_dir.to_string_lossy())
                .env(MODULE_ENV, &extension.module);
            collaborators.run_process(&command).await?;
        }
    }

    let release_date = chrono::Local::now().format("%Y-%m-%d").to_string();
    write_manifest(&staging, &PackageManifest::new(&extension, release_date))?;

    let package = build_dir.join(extension.package_file_name());
    let package = collaborators.write_archive(&staging, &package).await?;

    fsops::remove_dir_if_exists(&staging)?;

    info!("Extension package written to {}", package.display());
    Ok(package)
}

fn write_manifest(staging: &Path, manifest: &PackageManifest) -> Result<(), StepError> {
    let path = staging.join("manifest.json");
    let json = serde_json::to_string_pretty(manifest)?;
    std::fs::write(&path, json).map_err(|e| StepError::fs("Failed to write", &path, e))
}

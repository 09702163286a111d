//! Test: Packaging - --extension produces an installable zip in build/

use crate::helpers::*;
use ext_builder::execution::package::{BUILD_DIR_ENV, CLIENT_DIR_ENV, MODULE_ENV};
use std::fs::File;
use std::sync::Arc;
use zip::ZipArchive;

fn entry_names(path: &std::path::Path) -> Vec<String> {
    let mut zip = ZipArchive::new(File::open(path).unwrap()).unwrap();
    (0..zip.len()).map(|i| zip.by_index(i).unwrap().name().to_string()).collect()
}

#[tokio::test]
async fn test_extension_package_layout() {
    let ws = Workspace::new();
    let engine = executor_engine(Arc::new(RecordingCollaborators::new()));

    let outcome = run_cli(&ws, &["--extension"], &engine).await;

    assert_eq!(outcome.exit_code(), 0);
    let package = ws.join("build/sales-pack-1.4.0.zip");
    let names = entry_names(&package);
    assert!(names.contains(&"manifest.json".to_string()));
    assert!(names.contains(&"files/custom/Espo/Modules/SalesPack/Resources/module.json".to_string()));
    assert!(names.contains(&"scripts/AfterInstall.php".to_string()));
    assert!(!ws.exists("build/tmp"));
}

#[tokio::test]
async fn test_manifest_contents() {
    let ws = Workspace::new();
    let engine = executor_engine(Arc::new(RecordingCollaborators::new()));

    run_cli(&ws, &["--extension"], &engine).await;

    let mut zip = ZipArchive::new(File::open(ws.join("build/sales-pack-1.4.0.zip")).unwrap()).unwrap();
    let manifest: serde_json::Value = serde_json::from_reader(zip.by_name("manifest.json").unwrap()).unwrap();
    assert_eq!(manifest["name"], "Sales Pack");
    assert_eq!(manifest["module"], "SalesPack");
    assert_eq!(manifest["version"], "1.4.0");
    assert_eq!(manifest["acceptableVersions"][0], ">=8.0.0");
    assert_eq!(manifest["php"][0], ">=8.1");
    assert_eq!(manifest["skipBackup"], true);
    assert_eq!(manifest["releaseDate"].as_str().unwrap().len(), 10);
}

#[tokio::test]
async fn test_frontend_commands_run_in_project_root() {
    let ws = Workspace::new();
    ws.write("config.json", r#"{"frontend": {"commands": ["npm run build"]}}"#);
    let collaborators = Arc::new(RecordingCollaborators::new());
    let engine = executor_engine(collaborators.clone());

    let outcome = run_cli(&ws, &["--extension"], &engine).await;

    assert_eq!(outcome.exit_code(), 0);
    let commands = collaborators.commands();
    assert_eq!(commands.len(), 1);
    assert_eq!(commands[0].to_string(), "npm run build");
    assert_eq!(commands[0].cwd, ws.path());
}

#[tokio::test]
async fn test_frontend_commands_receive_staging_paths() {
    let ws = Workspace::new();
    ws.write("config.json", r#"{"frontend": {"commands": ["npx grunt bundle"]}}"#);
    let collaborators = Arc::new(RecordingCollaborators::new());
    let engine = executor_engine(collaborators.clone());

    let outcome = run_cli(&ws, &["--extension"], &engine).await;

    assert_eq!(outcome.exit_code(), 0);
    let env = &collaborators.commands()[0].env;
    let value = |key: &str| env.iter().find(|(k, _)| k == key).map(|(_, v)| v.clone());
    assert_eq!(value(BUILD_DIR_ENV), Some(ws.join("build/tmp/files").to_string_lossy().into_owned()));
    assert_eq!(
        value(CLIENT_DIR_ENV),
        Some(
            ws.join("build/tmp/files/client/custom/modules/sales-pack")
                .to_string_lossy()
                .into_owned()
        )
    );
    assert_eq!(value(MODULE_ENV), Some("SalesPack".to_string()));
}

#[tokio::test]
async fn test_failed_frontend_build_produces_no_package() {
    let ws = Workspace::new();
    ws.write("config.json", r#"{"frontend": {"commands": ["npm run build"]}}"#);
    let engine = executor_engine(Arc::new(RecordingCollaborators::failing_program("npm")));

    let outcome = run_cli(&ws, &["--extension"], &engine).await;

    assert_eq!(outcome.exit_code(), 3);
    assert!(!ws.exists("build/sales-pack-1.4.0.zip"));
}

#[tokio::test]
async fn test_missing_extension_manifest() {
    let ws = Workspace::new();
    std::fs::remove_file(ws.join("extension.json")).unwrap();
    let engine = executor_engine(Arc::new(RecordingCollaborators::new()));

    let outcome = run_cli(&ws, &["--extension"], &engine).await;

    assert_eq!(outcome.exit_code(), 3);
    assert!(outcome.error().to_string().contains("extension.json"));
}

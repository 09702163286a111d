//! Test: Step Commands - the external tools each step launches

use crate::helpers::*;
use std::sync::Arc;

fn with_site() -> Workspace {
    let ws = Workspace::new();
    ws.write("site/index.php", "<?php");
    ws
}

#[tokio::test]
async fn test_install_drives_installer_then_extensions() {
    let ws = with_site();
    ws.write("extensions/b-ext.zip", "");
    ws.write("extensions/a-ext.zip", "");
    let collaborators = Arc::new(RecordingCollaborators::new());
    let engine = executor_engine(collaborators.clone());

    let outcome = run_cli(&ws, &["--install"], &engine).await;

    assert_eq!(outcome.exit_code(), 0);
    let commands = collaborators.commands();
    let actions: Vec<&str> = commands
        .iter()
        .filter(|c| c.args.first().map(String::as_str) == Some("install/cli.php"))
        .map(|c| c.args[2].as_str())
        .collect();
    assert_eq!(
        actions,
        vec!["step1", "settingsTest", "saveSettings", "buildDatabase", "createUser", "savePreferences", "finish"]
    );

    let extension_files: Vec<String> = commands
        .iter()
        .filter(|c| c.args.first().map(String::as_str) == Some("command.php"))
        .map(|c| c.args[2].clone())
        .collect();
    assert_eq!(
        extension_files,
        vec![
            format!("--file={}", ws.join("extensions/a-ext.zip").display()),
            format!("--file={}", ws.join("extensions/b-ext.zip").display()),
        ]
    );
    assert_eq!(commands.last().unwrap().program, "chown");
}

#[tokio::test]
async fn test_installer_receives_database_settings() {
    let ws = with_site();
    let collaborators = Arc::new(RecordingCollaborators::new());
    let engine = executor_engine(collaborators.clone());

    run_cli(&ws, &["--install"], &engine).await;

    let save_settings = collaborators
        .commands()
        .into_iter()
        .find(|c| c.args.get(2).map(String::as_str) == Some("saveSettings"))
        .unwrap();
    assert_eq!(save_settings.args[3], "-d");
    assert_eq!(
        save_settings.args[4],
        "hostName=db&dbName=espo_dev&dbUserName=espo&dbUserPass=secret"
    );
    assert_eq!(save_settings.cwd, ws.join("site"));
}

#[tokio::test]
async fn test_install_without_site_fails() {
    let ws = Workspace::new();
    let collaborators = Arc::new(RecordingCollaborators::new());
    let engine = executor_engine(collaborators.clone());

    let outcome = run_cli(&ws, &["--install"], &engine).await;

    assert_eq!(outcome.exit_code(), 3);
    assert!(collaborators.commands().is_empty());
}

#[tokio::test]
async fn test_db_reset_passes_password_through_environment() {
    let ws = Workspace::new();
    let collaborators = Arc::new(RecordingCollaborators::new());
    let engine = executor_engine(collaborators.clone());

    let outcome = run_cli(&ws, &["--db-reset"], &engine).await;

    assert_eq!(outcome.exit_code(), 0);
    let commands = collaborators.commands();
    assert_eq!(commands.len(), 1);
    let mysql = &commands[0];
    assert_eq!(mysql.program, "mysql");
    assert!(!mysql.args.iter().any(|a| a.contains("secret")));
    assert_eq!(mysql.env, vec![("MYSQL_PWD".to_string(), "secret".to_string())]);
    assert_eq!(
        mysql.args.last().unwrap(),
        "DROP DATABASE IF EXISTS `espo_dev`; CREATE DATABASE `espo_dev`;"
    );
}

#[tokio::test]
async fn test_hooks_are_skipped_without_scripts() {
    let ws = with_site();
    let collaborators = Arc::new(RecordingCollaborators::new());
    let engine = executor_engine(collaborators.clone());

    assert_eq!(run_cli(&ws, &["--before-install"], &engine).await.exit_code(), 0);
    assert_eq!(run_cli(&ws, &["--after-install"], &engine).await.exit_code(), 0);
    assert!(collaborators.commands().is_empty());
}

#[tokio::test]
async fn test_hook_script_receives_site_path() {
    let ws = with_site();
    ws.write("php_scripts/after_install.php", "<?php");
    let collaborators = Arc::new(RecordingCollaborators::new());
    let engine = executor_engine(collaborators.clone());

    run_cli(&ws, &["--after-install"], &engine).await;

    let commands = collaborators.commands();
    assert_eq!(commands.len(), 1);
    assert_eq!(commands[0].program, "php");
    assert_eq!(
        commands[0].args,
        vec![
            ws.join("php_scripts/after_install.php").to_string_lossy().into_owned(),
            ws.join("site").to_string_lossy().into_owned(),
        ]
    );
}

#[tokio::test]
async fn test_composer_install_in_module_directory() {
    let ws = with_site();
    ws.write("site/custom/Espo/Modules/SalesPack/composer.json", "{}");
    let collaborators = Arc::new(RecordingCollaborators::new());
    let engine = executor_engine(collaborators.clone());

    run_cli(&ws, &["--composer-install"], &engine).await;

    let commands = collaborators.commands();
    assert_eq!(commands.len(), 1);
    assert_eq!(commands[0].to_string(), "composer install --no-dev --no-interaction");
    assert_eq!(commands[0].cwd, ws.join("site/custom/Espo/Modules/SalesPack"));
}

#[tokio::test]
async fn test_composer_install_skipped_without_manifest() {
    let ws = with_site();
    let collaborators = Arc::new(RecordingCollaborators::new());
    let engine = executor_engine(collaborators.clone());

    assert_eq!(run_cli(&ws, &["--composer-install"], &engine).await.exit_code(), 0);
    assert!(collaborators.commands().is_empty());
}

#[tokio::test]
async fn test_prepare_test_installs_dev_dependencies() {
    let ws = Workspace::new();
    ws.write_upstream_archive("master", &[("composer.json", "{}")]);
    let collaborators = Arc::new(RecordingCollaborators::new());
    let engine = executor_engine(collaborators.clone());

    let outcome = run_cli(&ws, &["--prepare-test", "--local"], &engine).await;

    assert_eq!(outcome.exit_code(), 0);
    let commands = collaborators.commands();
    assert_eq!(commands.len(), 1);
    assert_eq!(commands[0].to_string(), "composer install --no-interaction");
    assert_eq!(commands[0].cwd, ws.join("site"));
}

#[tokio::test]
async fn test_rebuild_runs_in_site() {
    let ws = with_site();
    let collaborators = Arc::new(RecordingCollaborators::new());
    let engine = executor_engine(collaborators.clone());

    run_cli(&ws, &["--rebuild"], &engine).await;

    assert_eq!(collaborators.command_lines(), vec!["php rebuild.php"]);
}

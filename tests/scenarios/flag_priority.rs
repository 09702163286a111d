//! Test: Flag Priority - the first command in the priority table wins

use crate::helpers::*;
use ext_builder::core::select_command;
use ext_builder::{CommandName, ExecutionEngine};

#[tokio::test]
async fn test_all_beats_rebuild() {
    let ws = Workspace::new();
    let engine = ExecutionEngine::new(RecordingRunner::new());

    let outcome = run_cli(&ws, &["--rebuild", "--all"], &engine).await;

    assert_eq!(outcome.command().name, CommandName::All);
    assert_eq!(engine.runner().calls().first(), Some(&"fetch"));
    assert!(!engine.runner().calls().is_empty());
}

#[tokio::test]
async fn test_update_archive_has_highest_priority() {
    let ws = Workspace::new();
    let engine = ExecutionEngine::new(RecordingRunner::new());

    let outcome = run_cli(&ws, &["--copy", "--all", "--update-archive"], &engine).await;

    assert_eq!(outcome.command().name, CommandName::UpdateArchive);
    assert_eq!(engine.runner().calls(), vec!["update-archive"]);
}

#[test]
fn test_priority_table_pairs() {
    assert_eq!(select_command(["copy", "copy-to-end"]), Some(CommandName::CopyToEnd));
    assert_eq!(select_command(["fetch", "install"]), Some(CommandName::Install));
    assert_eq!(select_command(["composer-install", "rebuild"]), Some(CommandName::Rebuild));
    assert_eq!(select_command(["extension", "after-install"]), Some(CommandName::AfterInstall));
    assert_eq!(select_command(["--prepare-test", "--all"]), Some(CommandName::All));
    assert_eq!(select_command(Vec::<String>::new()), None);
}

#[tokio::test]
async fn test_modifiers_do_not_change_selection() {
    let ws = Workspace::new();
    let engine = ExecutionEngine::new(RecordingRunner::new());

    let outcome = run_cli(&ws, &["--local", "--branch=stable", "--copy"], &engine).await;

    assert_eq!(outcome.command().name, CommandName::Copy);
}

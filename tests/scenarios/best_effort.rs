//! Test: Best Effort - a failing set-owner never fails the run

use crate::helpers::*;
use ext_builder::{ExecutionEngine, ExecutionEvent, ExecutionStatus, StepKind};
use std::sync::{Arc, Mutex};

#[tokio::test]
async fn test_set_owner_failure_is_suppressed() {
    let ws = Workspace::new();
    let engine = ExecutionEngine::new(RecordingRunner::failing_at(&[StepKind::SetOwner]));

    let outcome = run_cli(&ws, &["--copy"], &engine).await;

    assert_eq!(outcome.exit_code(), 0);
    let command = outcome.command();
    assert_eq!(command.state.status, ExecutionStatus::Completed);
    assert_step_completed(command, StepKind::CopyExtension);
    assert_step_suppressed(command, StepKind::SetOwner);
}

#[tokio::test]
async fn test_chown_failure_reported_as_event() {
    let ws = Workspace::new();
    let collaborators = Arc::new(RecordingCollaborators::failing_program("chown"));
    let engine = executor_engine(collaborators.clone());

    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();
    engine
        .add_event_handler(move |event| sink.lock().unwrap().push(event))
        .await;

    let outcome = run_cli(&ws, &["--copy"], &engine).await;

    assert_eq!(outcome.exit_code(), 0);
    assert!(collaborators.command_lines().iter().any(|c| c.starts_with("chown -R www-data:www-data")));
    assert!(events.lock().unwrap().iter().any(|e| matches!(
        e,
        ExecutionEvent::StepFailureSuppressed { step: StepKind::SetOwner, error } if error.contains("chown")
    )));
}

#[tokio::test]
async fn test_set_owner_not_reached_after_fatal_failure() {
    let ws = Workspace::new();
    let engine = ExecutionEngine::new(RecordingRunner::failing_at(&[StepKind::InstallExtensions]));

    let outcome = run_cli(&ws, &["--install"], &engine).await;

    assert_eq!(outcome.exit_code(), 3);
    assert!(!engine.runner().calls().contains(&"set-owner"));
}

#[tokio::test]
async fn test_set_owner_without_owner_is_noop() {
    let ws = Workspace::new();
    ws.write("config.json", r#"{"install": {"defaultOwner": null}}"#);
    let collaborators = Arc::new(RecordingCollaborators::new());
    let engine = executor_engine(collaborators.clone());

    let outcome = run_cli(&ws, &["--copy"], &engine).await;

    assert_eq!(outcome.exit_code(), 0);
    assert!(collaborators.commands().is_empty());
}

//! Test: Copy File - a single file lands in site/ and nothing else changes

use crate::helpers::*;
use std::sync::Arc;

fn prepared_site() -> Workspace {
    let ws = Workspace::new();
    ws.write("site/index.php", "<?php");
    ws.write("site/custom/Espo/Modules/SalesPack/Resources/old.json", "{}");
    ws.write("site/client/custom/modules/sales-pack/old.js", "// old");
    ws
}

#[tokio::test]
async fn test_copy_file_copies_only_that_file() {
    let ws = prepared_site();
    let collaborators = Arc::new(RecordingCollaborators::new());
    let engine = executor_engine(collaborators.clone());

    let outcome = run_cli(&ws, &["--copy-file", "--file=tests/Foo.php"], &engine).await;

    assert_eq!(outcome.exit_code(), 0);
    assert_eq!(outcome.command().execution_order(), vec!["copy-file"]);
    assert_eq!(ws.read("site/tests/Foo.php"), "<?php // foo");
    assert!(ws.exists("site/custom/Espo/Modules/SalesPack/Resources/old.json"));
    assert!(ws.exists("site/client/custom/modules/sales-pack/old.js"));
    assert!(!ws.exists("site/custom/Espo/Modules/SalesPack/Resources/module.json"));
    assert!(collaborators.commands().is_empty());
}

#[tokio::test]
async fn test_copy_file_from_sources() {
    let ws = prepared_site();
    let engine = executor_engine(Arc::new(RecordingCollaborators::new()));

    let outcome = run_cli(
        &ws,
        &["--copy-file", "--file=src/files/client/custom/modules/sales-pack/src/views/deal.js"],
        &engine,
    )
    .await;

    assert_eq!(outcome.exit_code(), 0);
    assert!(ws.exists("site/client/custom/modules/sales-pack/src/views/deal.js"));
    assert!(ws.exists("site/client/custom/modules/sales-pack/old.js"));
}

#[tokio::test]
async fn test_copy_file_requires_file_argument() {
    let ws = prepared_site();
    let engine = executor_engine(Arc::new(RecordingCollaborators::new()));

    let outcome = run_cli(&ws, &["--copy-file"], &engine).await;

    assert_eq!(outcome.exit_code(), 3);
    assert!(outcome.error().to_string().contains("--file"));
}

#[tokio::test]
async fn test_copy_file_missing_source() {
    let ws = prepared_site();
    let engine = executor_engine(Arc::new(RecordingCollaborators::new()));

    let outcome = run_cli(&ws, &["--copy-file", "--file=tests/Nope.php"], &engine).await;

    assert_eq!(outcome.exit_code(), 3);
    assert!(!ws.exists("site/tests/Nope.php"));
}

#[tokio::test]
async fn test_copy_extension_replaces_module_directories() {
    let ws = prepared_site();
    let engine = executor_engine(Arc::new(RecordingCollaborators::new()));

    let outcome = run_cli(&ws, &["--copy"], &engine).await;

    assert_eq!(outcome.exit_code(), 0);
    assert!(!ws.exists("site/custom/Espo/Modules/SalesPack/Resources/old.json"));
    assert!(!ws.exists("site/client/custom/modules/sales-pack/old.js"));
    assert!(ws.exists("site/custom/Espo/Modules/SalesPack/Resources/module.json"));
    assert!(ws.exists("site/tests/unit/Espo/Modules/SalesPack/DealTest.php"));
    assert!(ws.exists("site/index.php"));
}

//! Command dispatch from parsed flags

use crate::{
    cli::Cli,
    core::{config::{validate_branch, BuildConfig}, lock::WorkspaceLock, BuildError, CommandName, MacroCommand, RunContext},
    execution::{ExecutionEngine, StepRunner},
};
use std::path::Path;
use tracing::{debug, info};

/// Build the run context for `cli` rooted at `working_dir`.
///
/// Configuration is loaded and validated here so a broken config fails the
/// run before any step starts.
pub fn build_context(cli: &Cli, working_dir: &Path) -> Result<RunContext, BuildError> {
    let override_path = cli.config.as_ref().map(|p| working_dir.join(p));
    let config = BuildConfig::load(working_dir, override_path.as_deref())?;

    let ctx = RunContext::new(working_dir, config)
        .with_branch(cli.branch.clone())
        .with_local_archive(cli.local)
        .with_file(cli.file.clone());
    validate_branch(&ctx.branch)?;

    debug!(
        "Run {} on branch {} (local archive: {})",
        ctx.run_id, ctx.branch, ctx.use_local_archive
    );
    Ok(ctx)
}

/// A command that got as far as running steps
#[derive(Debug)]
pub struct RunOutcome {
    /// Final state of every step, including skipped ones
    pub command: MacroCommand,
    pub result: Result<(), BuildError>,
}

impl RunOutcome {
    pub fn into_result(self) -> Result<MacroCommand, BuildError> {
        self.result.map(|()| self.command)
    }
}

/// Run `command` under the workspace lock.
///
/// Configuration and lock failures are returned as `Err` since no step ran;
/// a step failure is reported inside the outcome next to the step states.
pub async fn execute<R: StepRunner>(
    cli: &Cli,
    command: CommandName,
    working_dir: &Path,
    engine: &ExecutionEngine<R>,
) -> Result<RunOutcome, BuildError> {
    let ctx = build_context(cli, working_dir)?;
    let _lock = WorkspaceLock::acquire(working_dir, ctx.run_id)?;

    let mut macro_command = MacroCommand::new(command, ctx.run_id);
    info!("Running --{} in {}", command, working_dir.display());
    let result = engine.execute(&mut macro_command, &ctx).await;

    Ok(RunOutcome {
        command: macro_command,
        result,
    })
}

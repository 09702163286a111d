use anyhow::{Context, Result};
use ext_builder::cli::output::{format_summary, style, CROSS};
use ext_builder::cli::terminal_output::TerminalReporter;
use ext_builder::cli::{self, commands, Invocation};
use ext_builder::{BuildError, ExecutionEngine, LocalCollaborators, StepExecutor};
use std::sync::Arc;
use tracing::error;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> Result<()> {
    let (cli, command) = match cli::interpret(std::env::args_os()) {
        Invocation::Run { cli, command } => (cli, command),
        Invocation::Help(text) => {
            print!("{}", text);
            return Ok(());
        }
        Invocation::Reject { code, message } => {
            eprint!("{}", message);
            std::process::exit(code);
        }
    };

    // Initialize logging
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set logging subscriber")?;

    let working_dir = match &cli.working_dir {
        Some(dir) => dir.clone(),
        None => std::env::current_dir().context("Failed to determine the working directory")?,
    };

    let reporter = Arc::new(TerminalReporter::new(cli.verbose));
    let collaborators = LocalCollaborators::new().with_output(reporter.clone());
    let engine = ExecutionEngine::new(StepExecutor::new(collaborators));

    let events = reporter.clone();
    engine
        .add_event_handler(move |event| events.on_execution_event(&event))
        .await;

    let outcome = match commands::execute(&cli, command, &working_dir, &engine).await {
        Ok(outcome) => outcome,
        Err(e) => fail(e),
    };

    if outcome.command.name.is_macro() {
        println!("\n{}", format_summary(&outcome.command));
    }
    if let Err(e) = outcome.result {
        fail(e);
    }

    Ok(())
}

fn fail(e: BuildError) -> ! {
    error!("{}", e);
    eprintln!("\n{} {}", CROSS, style(&e).red());
    std::process::exit(e.exit_code());
}

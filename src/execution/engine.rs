//! Main execution engine - runs a command's steps in order

use crate::{
    core::{BuildError, CommandName, ExecutionStatus, MacroCommand, RunContext, StepKind, StepState},
    execution::StepRunner,
};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Events that can occur during a run
#[derive(Debug, Clone)]
pub enum ExecutionEvent {
    RunStarted {
        run_id: Uuid,
        command: CommandName,
        steps: Vec<&'static str>,
    },
    StepStarted {
        step: StepKind,
        /// 1-based position in the sequence
        index: usize,
        total: usize,
    },
    StepCompleted {
        step: StepKind,
        elapsed_ms: u128,
    },
    StepFailed {
        step: StepKind,
        error: String,
    },
    /// A best-effort step failed and the run continued
    StepFailureSuppressed {
        step: StepKind,
        error: String,
    },
    RunFinished {
        run_id: Uuid,
        status: ExecutionStatus,
    },
}

/// Type for event handlers
pub type EventHandler = Arc<dyn Fn(ExecutionEvent) + Send + Sync>;

/// Runs commands step by step, stopping at the first fatal failure
pub struct ExecutionEngine<R> {
    runner: Arc<R>,
    event_handlers: Arc<Mutex<Vec<EventHandler>>>,
}

impl<R: StepRunner> ExecutionEngine<R> {
    pub fn new(runner: R) -> Self {
        Self {
            runner: Arc::new(runner),
            event_handlers: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Add an event handler
    pub async fn add_event_handler<F>(&self, handler: F)
    where
        F: Fn(ExecutionEvent) + Send + Sync + 'static,
    {
        self.event_handlers.lock().await.push(Arc::new(handler));
    }

    /// Emit an event to all handlers
    async fn emit_event(&self, event: ExecutionEvent) {
        let handlers = self.event_handlers.lock().await;
        for handler in handlers.iter() {
            handler(event.clone());
        }
    }

    /// Resolve `name` and run its steps.
    ///
    /// Returns the finished command so callers can inspect step states.
    pub async fn dispatch(&self, name: &str, ctx: &RunContext) -> Result<MacroCommand, BuildError> {
        let mut command = MacroCommand::resolve(name, ctx.run_id)?;
        self.execute(&mut command, ctx).await?;
        Ok(command)
    }

    /// Run every step of `command` in order.
    ///
    /// A fatal step failure marks the rest of the sequence skipped and is
    /// returned as `StepExecution`. A best-effort failure is logged and
    /// recorded as suppressed.
    pub async fn execute(&self, command: &mut MacroCommand, ctx: &RunContext) -> Result<(), BuildError> {
        let run_id = command.state.run_id;
        let total = command.steps.len();

        info!("Starting {} ({} steps, run {})", command.name, total, run_id);
        self.emit_event(ExecutionEvent::RunStarted {
            run_id,
            command: command.name,
            steps: command.execution_order(),
        })
        .await;

        command.state.start(total);

        for index in 0..total {
            let kind = command.steps[index].kind;
            let best_effort = command.steps[index].is_best_effort();
            let started_at = chrono::Utc::now();
            command.steps[index].state = StepState::Running { started_at };

            self.emit_event(ExecutionEvent::StepStarted {
                step: kind,
                index: index + 1,
                total,
            })
            .await;

            let timer = Instant::now();
            let result = self.runner.run(kind, ctx).await;

            match result {
                Ok(()) => {
                    command.steps[index].state = StepState::Completed {
                        started_at,
                        completed_at: chrono::Utc::now(),
                    };
                    command.state.completed_steps += 1;
                    self.emit_event(ExecutionEvent::StepCompleted {
                        step: kind,
                        elapsed_ms: timer.elapsed().as_millis(),
                    })
                    .await;
                }
                Err(e) if best_effort => {
                    warn!("Step {} failed, continuing: {}", kind, e);
                    command.steps[index].state = StepState::Suppressed {
                        error: e.to_string(),
                        started_at,
                        failed_at: chrono::Utc::now(),
                    };
                    command.state.completed_steps += 1;
                    self.emit_event(ExecutionEvent::StepFailureSuppressed {
                        step: kind,
                        error: e.to_string(),
                    })
                    .await;
                }
                Err(e) => {
                    error!("Step {} failed: {}", kind, e);
                    command.steps[index].state = StepState::Failed {
                        error: e.to_string(),
                        started_at,
                        failed_at: chrono::Utc::now(),
                    };
                    command.skip_remaining(&format!("{} failed", kind));
                    command.state.fail(kind.name());

                    self.emit_event(ExecutionEvent::StepFailed {
                        step: kind,
                        error: e.to_string(),
                    })
                    .await;
                    self.emit_event(ExecutionEvent::RunFinished {
                        run_id,
                        status: ExecutionStatus::Failed,
                    })
                    .await;

                    return Err(BuildError::StepExecution {
                        step: kind.name().to_string(),
                        source: e,
                    });
                }
            }
        }

        command.state.complete();
        info!("Finished {} (run {})", command.name, run_id);
        self.emit_event(ExecutionEvent::RunFinished {
            run_id,
            status: ExecutionStatus::Completed,
        })
        .await;

        Ok(())
    }
}

//! Execution state models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Overall run status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionStatus {
    /// Run has not started
    Pending,
    /// Run is currently executing a step
    Running,
    /// Every step finished (best-effort failures included)
    Completed,
    /// A fatal step failed and the remaining steps were abandoned
    Failed,
}

/// State of a single step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StepState {
    /// Step has not been reached yet
    Pending,
    /// Step is currently running
    Running {
        started_at: DateTime<Utc>,
    },
    /// Step completed successfully
    Completed {
        started_at: DateTime<Utc>,
        completed_at: DateTime<Utc>,
    },
    /// Step failed
    Failed {
        error: String,
        started_at: DateTime<Utc>,
        failed_at: DateTime<Utc>,
    },
    /// Best-effort step failed; the failure was recorded and ignored
    Suppressed {
        error: String,
        started_at: DateTime<Utc>,
        failed_at: DateTime<Utc>,
    },
    /// Step was never started because an earlier step failed
    Skipped {
        reason: String,
    },
}

impl StepState {
    /// Check if step is in a terminal state
    pub fn is_terminal(&self) -> bool {
        !matches!(self, StepState::Pending | StepState::Running { .. })
    }

    /// Whether the step's action was actually invoked
    pub fn was_invoked(&self) -> bool {
        matches!(
            self,
            StepState::Running { .. }
                | StepState::Completed { .. }
                | StepState::Failed { .. }
                | StepState::Suppressed { .. }
        )
    }
}

/// Per-invocation run state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunState {
    /// Unique run ID
    pub run_id: Uuid,

    /// Current execution status
    pub status: ExecutionStatus,

    /// When execution started
    pub started_at: Option<DateTime<Utc>>,

    /// When execution completed/failed
    pub completed_at: Option<DateTime<Utc>>,

    /// Total number of steps
    pub total_steps: usize,

    /// Number of steps that finished (completed or suppressed)
    pub completed_steps: usize,

    /// Name of the step that aborted the run, if any
    pub failed_step: Option<String>,
}

impl RunState {
    pub fn new(run_id: Uuid) -> Self {
        Self {
            run_id,
            status: ExecutionStatus::Pending,
            started_at: None,
            completed_at: None,
            total_steps: 0,
            completed_steps: 0,
            failed_step: None,
        }
    }

    /// Mark run as started
    pub fn start(&mut self, total_steps: usize) {
        self.status = ExecutionStatus::Running;
        self.started_at = Some(Utc::now());
        self.total_steps = total_steps;
    }

    /// Mark run as completed
    pub fn complete(&mut self) {
        self.status = ExecutionStatus::Completed;
        self.completed_at = Some(Utc::now());
    }

    /// Mark run as failed at the given step
    pub fn fail(&mut self, step: &str) {
        self.status = ExecutionStatus::Failed;
        self.failed_step = Some(step.to_string());
        self.completed_at = Some(Utc::now());
    }

    /// Calculate progress (0.0 to 1.0)
    pub fn progress(&self) -> f64 {
        if self.total_steps == 0 {
            return 0.0;
        }
        self.completed_steps as f64 / self.total_steps as f64
    }
}

impl Default for RunState {
    fn default() -> Self {
        Self::new(Uuid::new_v4())
    }
}

//! Step domain model

use crate::core::state::StepState;
use std::fmt;
use std::str::FromStr;

/// Every unit of work the orchestrator knows how to run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StepKind {
    UpdateArchive,
    DbReset,
    Fetch,
    Install,
    InstallExtensions,
    CopyExtension,
    CopyFile,
    BeforeInstall,
    ComposerInstall,
    SiteComposerInstallDev,
    Rebuild,
    AfterInstall,
    SetOwner,
    BuildExtension,
}

impl StepKind {
    pub const ALL: [StepKind; 14] = [
        StepKind::UpdateArchive,
        StepKind::DbReset,
        StepKind::Fetch,
        StepKind::Install,
        StepKind::InstallExtensions,
        StepKind::CopyExtension,
        StepKind::CopyFile,
        StepKind::BeforeInstall,
        StepKind::ComposerInstall,
        StepKind::SiteComposerInstallDev,
        StepKind::Rebuild,
        StepKind::AfterInstall,
        StepKind::SetOwner,
        StepKind::BuildExtension,
    ];

    /// Stable step identifier used in logs and events
    pub fn name(&self) -> &'static str {
        match self {
            StepKind::UpdateArchive => "update-archive",
            StepKind::DbReset => "db-reset",
            StepKind::Fetch => "fetch",
            StepKind::Install => "install",
            StepKind::InstallExtensions => "install-extensions",
            StepKind::CopyExtension => "copy-extension",
            StepKind::CopyFile => "copy-file",
            StepKind::BeforeInstall => "before-install",
            StepKind::ComposerInstall => "composer-install",
            StepKind::SiteComposerInstallDev => "site-composer-install-dev",
            StepKind::Rebuild => "rebuild",
            StepKind::AfterInstall => "after-install",
            StepKind::SetOwner => "set-owner",
            StepKind::BuildExtension => "extension",
        }
    }

    /// Default failure policy of the step
    ///
    /// Ownership changes routinely fail when the tool runs unprivileged,
    /// so `set-owner` never aborts a run.
    pub fn failure_policy(&self) -> FailurePolicy {
        match self {
            StepKind::SetOwner => FailurePolicy::BestEffort,
            _ => FailurePolicy::Fatal,
        }
    }
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for StepKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StepKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| format!("Unknown step: {}", s))
    }
}

/// What happens to the run when a step's action fails
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Abort the remaining steps and fail the run
    Fatal,
    /// Log the failure and carry on
    BestEffort,
}

/// A single step in a command's sequence
#[derive(Debug, Clone)]
pub struct Step {
    pub kind: StepKind,

    pub failure_policy: FailurePolicy,

    /// Runtime state
    pub state: StepState,
}

impl Step {
    pub fn new(kind: StepKind) -> Self {
        Self {
            kind,
            failure_policy: kind.failure_policy(),
            state: StepState::Pending,
        }
    }

    pub fn name(&self) -> &'static str {
        self.kind.name()
    }

    pub fn is_best_effort(&self) -> bool {
        self.failure_policy == FailurePolicy::BestEffort
    }
}

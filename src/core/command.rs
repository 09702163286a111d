//! Command registry: flag names, their priority and their step sequences

use crate::core::{
    error::BuildError,
    state::{RunState, StepState},
    step::{Step, StepKind},
};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// A command the operator can request with a flag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandName {
    UpdateArchive,
    DbReset,
    CopyToEnd,
    All,
    PrepareTest,
    Install,
    Fetch,
    Copy,
    CopyFile,
    BeforeInstall,
    AfterInstall,
    Extension,
    Rebuild,
    ComposerInstall,
}

/// Evaluation order when several command flags are given. First match wins.
pub const PRIORITY: [CommandName; 14] = [
    CommandName::UpdateArchive,
    CommandName::DbReset,
    CommandName::CopyToEnd,
    CommandName::All,
    CommandName::PrepareTest,
    CommandName::Install,
    CommandName::Fetch,
    CommandName::Copy,
    CommandName::CopyFile,
    CommandName::BeforeInstall,
    CommandName::AfterInstall,
    CommandName::Extension,
    CommandName::Rebuild,
    CommandName::ComposerInstall,
];

impl CommandName {
    /// Flag name without the leading dashes
    pub fn as_str(&self) -> &'static str {
        match self {
            CommandName::UpdateArchive => "update-archive",
            CommandName::DbReset => "db-reset",
            CommandName::CopyToEnd => "copy-to-end",
            CommandName::All => "all",
            CommandName::PrepareTest => "prepare-test",
            CommandName::Install => "install",
            CommandName::Fetch => "fetch",
            CommandName::Copy => "copy",
            CommandName::CopyFile => "copy-file",
            CommandName::BeforeInstall => "before-install",
            CommandName::AfterInstall => "after-install",
            CommandName::Extension => "extension",
            CommandName::Rebuild => "rebuild",
            CommandName::ComposerInstall => "composer-install",
        }
    }

    /// Ordered step sequence of the command
    pub fn steps(&self) -> Vec<StepKind> {
        use StepKind::*;

        match self {
            CommandName::All => vec![
                Fetch,
                Install,
                InstallExtensions,
                CopyExtension,
                BeforeInstall,
                ComposerInstall,
                Rebuild,
                AfterInstall,
                SetOwner,
            ],
            CommandName::CopyToEnd => vec![
                CopyExtension,
                BeforeInstall,
                ComposerInstall,
                Rebuild,
                AfterInstall,
                SetOwner,
            ],
            CommandName::Install => vec![Install, InstallExtensions, SetOwner],
            CommandName::Copy => vec![CopyExtension, SetOwner],
            CommandName::PrepareTest => vec![Fetch, SiteComposerInstallDev],
            CommandName::Fetch => vec![Fetch],
            CommandName::UpdateArchive => vec![UpdateArchive],
            CommandName::DbReset => vec![DbReset],
            CommandName::CopyFile => vec![CopyFile],
            CommandName::BeforeInstall => vec![BeforeInstall],
            CommandName::AfterInstall => vec![AfterInstall],
            CommandName::Extension => vec![BuildExtension],
            CommandName::Rebuild => vec![Rebuild],
            CommandName::ComposerInstall => vec![ComposerInstall],
        }
    }

    /// Whether the command expands to more than one step
    pub fn is_macro(&self) -> bool {
        self.steps().len() > 1
    }
}

impl fmt::Display for CommandName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CommandName {
    type Err = BuildError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim_start_matches("--");
        PRIORITY
            .iter()
            .copied()
            .find(|c| c.as_str() == name)
            .ok_or_else(|| BuildError::UnknownCommand(s.to_string()))
    }
}

/// Pick the command to run from the recognized flags that were supplied.
///
/// Flags are not validated against each other: the highest-priority one
/// wins and the rest are ignored.
pub fn select_command<I, S>(flags: I) -> Option<CommandName>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let given: Vec<CommandName> = flags
        .into_iter()
        .filter_map(|f| f.as_ref().parse::<CommandName>().ok())
        .collect();

    PRIORITY.iter().copied().find(|c| given.contains(c))
}

/// A resolved command ready to run: its steps plus run state
#[derive(Debug, Clone)]
pub struct MacroCommand {
    pub name: CommandName,

    pub steps: Vec<Step>,

    pub state: RunState,
}

impl MacroCommand {
    pub fn new(name: CommandName, run_id: Uuid) -> Self {
        Self {
            name,
            steps: name.steps().into_iter().map(Step::new).collect(),
            state: RunState::new(run_id),
        }
    }

    /// Look up a command by name and expand it
    pub fn resolve(name: &str, run_id: Uuid) -> Result<Self, BuildError> {
        Ok(Self::new(name.parse()?, run_id))
    }

    pub fn step(&self, kind: StepKind) -> Option<&Step> {
        self.steps.iter().find(|s| s.kind == kind)
    }

    /// Step names in execution order
    pub fn execution_order(&self) -> Vec<&'static str> {
        self.steps.iter().map(|s| s.name()).collect()
    }

    /// Names of steps whose action was invoked, in order
    pub fn invoked_steps(&self) -> Vec<&'static str> {
        self.steps
            .iter()
            .filter(|s| s.state.was_invoked())
            .map(|s| s.name())
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.steps.iter().all(|s| s.state.is_terminal())
    }

    /// Mark every step that has not run yet as skipped
    pub fn skip_remaining(&mut self, reason: &str) {
        for step in &mut self.steps {
            if matches!(step.state, StepState::Pending) {
                step.state = StepState::Skipped {
                    reason: reason.to_string(),
                };
            }
        }
    }
}

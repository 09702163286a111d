//! Command-line interface

pub mod commands;
pub mod output;
pub mod terminal_output;

use crate::core::{select_command, CommandName};
use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use std::ffi::OsString;
use std::path::PathBuf;

/// Build and deploy an EspoCRM extension against a local instance
#[derive(Debug, Parser, Clone, Default)]
#[command(name = "ext-builder")]
#[command(version)]
#[command(about = "Builds, installs and packages an EspoCRM extension", long_about = None)]
pub struct Cli {
    /// Download the upstream branch archive into archive/
    #[arg(long, help_heading = "Commands")]
    pub update_archive: bool,

    /// Drop and recreate the configured database
    #[arg(long, help_heading = "Commands")]
    pub db_reset: bool,

    /// Copy the extension into site/ and run every step after it
    #[arg(long, help_heading = "Commands")]
    pub copy_to_end: bool,

    /// Fetch, install and deploy the extension from scratch
    #[arg(long, help_heading = "Commands")]
    pub all: bool,

    /// Fetch and install the site's dev dependencies for tests
    #[arg(long, help_heading = "Commands")]
    pub prepare_test: bool,

    /// Run the installer and install pre-built extensions
    #[arg(long, help_heading = "Commands")]
    pub install: bool,

    /// Replace site/ with a fresh copy of the upstream archive
    #[arg(long, help_heading = "Commands")]
    pub fetch: bool,

    /// Copy the extension sources into site/
    #[arg(long, help_heading = "Commands")]
    pub copy: bool,

    /// Copy the single file given with --file into site/
    #[arg(long, help_heading = "Commands")]
    pub copy_file: bool,

    /// Run php_scripts/before_install.php
    #[arg(long, help_heading = "Commands")]
    pub before_install: bool,

    /// Run php_scripts/after_install.php
    #[arg(long, help_heading = "Commands")]
    pub after_install: bool,

    /// Package the extension into build/
    #[arg(long, help_heading = "Commands")]
    pub extension: bool,

    /// Rebuild the site
    #[arg(long, help_heading = "Commands")]
    pub rebuild: bool,

    /// Install the module's composer dependencies
    #[arg(long, help_heading = "Commands")]
    pub composer_install: bool,

    /// File to copy with --copy-file
    #[arg(long, value_name = "PATH")]
    pub file: Option<PathBuf>,

    /// Upstream branch (defaults to espocrm.branch in configuration)
    #[arg(long, value_name = "NAME")]
    pub branch: Option<String>,

    /// Use the cached archive instead of downloading
    #[arg(long)]
    pub local: bool,

    /// Local configuration file replacing config.json
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Project root (defaults to the current directory)
    #[arg(long, value_name = "DIR")]
    pub working_dir: Option<PathBuf>,

    /// Enable verbose logging and show tool output
    #[arg(short, long)]
    pub verbose: bool,
}

/// What the process should do with its arguments
#[derive(Debug)]
pub enum Invocation {
    /// Run a command
    Run { cli: Cli, command: CommandName },
    /// Print help or version text and exit 0
    Help(String),
    /// Print the message to stderr and exit with `code`
    Reject { code: i32, message: String },
}

impl Cli {
    /// Names of the command flags that were given
    pub fn selected_flags(&self) -> Vec<&'static str> {
        [
            (self.update_archive, CommandName::UpdateArchive),
            (self.db_reset, CommandName::DbReset),
            (self.copy_to_end, CommandName::CopyToEnd),
            (self.all, CommandName::All),
            (self.prepare_test, CommandName::PrepareTest),
            (self.install, CommandName::Install),
            (self.fetch, CommandName::Fetch),
            (self.copy, CommandName::Copy),
            (self.copy_file, CommandName::CopyFile),
            (self.before_install, CommandName::BeforeInstall),
            (self.after_install, CommandName::AfterInstall),
            (self.extension, CommandName::Extension),
            (self.rebuild, CommandName::Rebuild),
            (self.composer_install, CommandName::ComposerInstall),
        ]
        .into_iter()
        .filter(|(set, _)| *set)
        .map(|(_, command)| command.as_str())
        .collect()
    }

    /// Highest-priority command among the given flags
    pub fn selected_command(&self) -> Option<CommandName> {
        select_command(self.selected_flags())
    }

    pub fn help_text() -> String {
        Cli::command().render_help().to_string()
    }
}

/// Turn raw arguments into an [`Invocation`].
///
/// Unknown flags are rejected with status 1. Without any command flag the
/// help text is printed.
pub fn interpret<I, T>(args: I) -> Invocation
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(e) => {
            return match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => Invocation::Help(e.to_string()),
                _ => Invocation::Reject {
                    code: 1,
                    message: e.render().to_string(),
                },
            };
        }
    };

    match cli.selected_command() {
        Some(command) => Invocation::Run { cli, command },
        None => Invocation::Help(Cli::help_text()),
    }
}

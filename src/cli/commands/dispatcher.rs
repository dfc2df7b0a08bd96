//! Command dispatching.
//!
//! This module provides the core command infrastructure:
//! - [`Command`] trait for implementing commands
//! - [`CommandResult`] for uniform result reporting
//! - [`CommandDispatcher`] for routing CLI subcommands

use std::path::{Path, PathBuf};

use crate::cli::args::{Cli, Commands};
use crate::config::{load_config, RunnerConfig};
use crate::error::Result;
use crate::ui::UserInterface;

/// Exit code when every run succeeded.
pub const EXIT_SUCCESS: i32 = 0;
/// Exit code when a run failed.
pub const EXIT_FAILURE: i32 = 1;
/// Exit code when a run hit its pass cap and none failed.
pub const EXIT_CAPPED: i32 = 3;

/// Trait for command implementations.
///
/// Each CLI subcommand implements this trait to provide its execution logic.
pub trait Command {
    /// Execute the command, reporting through `ui`.
    fn execute(&self, ui: &mut dyn UserInterface) -> Result<CommandResult>;
}

/// Result of command execution.
#[derive(Debug, PartialEq, Eq)]
pub struct CommandResult {
    /// Whether the command succeeded.
    pub success: bool,

    /// Exit code to use (0 for success, non-zero for failure).
    pub exit_code: i32,
}

impl CommandResult {
    /// Create a successful result.
    pub fn success() -> Self {
        Self {
            success: true,
            exit_code: EXIT_SUCCESS,
        }
    }

    /// Create a failure result.
    pub fn failure(exit_code: i32) -> Self {
        Self {
            success: false,
            exit_code,
        }
    }
}

/// Dispatches CLI commands to their implementations.
pub struct CommandDispatcher {
    working_dir: PathBuf,
    config_path: Option<PathBuf>,
}

impl CommandDispatcher {
    /// Create a dispatcher that resolves `./revive.yml` against `working_dir`.
    pub fn new(working_dir: PathBuf, config_path: Option<PathBuf>) -> Self {
        Self {
            working_dir,
            config_path,
        }
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    fn config(&self) -> Result<RunnerConfig> {
        load_config(self.config_path.as_deref(), &self.working_dir)
    }

    /// Dispatch and execute a command.
    pub fn dispatch(&self, cli: &Cli, ui: &mut dyn UserInterface) -> Result<CommandResult> {
        match &cli.command {
            Commands::Run(args) => {
                let cmd = super::run::RunCommand::new(args.clone(), self.config()?);
                cmd.execute(ui)
            }
            Commands::Requirements(args) => {
                let cmd = super::requirements::RequirementsCommand::new(args.clone());
                cmd.execute(ui)
            }
            Commands::Strategy(args) => {
                let cmd = super::strategy::StrategyCommand::new(args.clone(), self.config()?);
                cmd.execute(ui)
            }
            Commands::Completions(args) => {
                let cmd = super::completions::CompletionsCommand::new(args.clone());
                cmd.execute(ui)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui::MockUI;
    use clap::Parser;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn command_result_success() {
        let result = CommandResult::success();
        assert!(result.success);
        assert_eq!(result.exit_code, 0);
    }

    #[test]
    fn command_result_failure() {
        let result = CommandResult::failure(EXIT_CAPPED);
        assert!(!result.success);
        assert_eq!(result.exit_code, 3);
    }

    #[test]
    fn dispatcher_creation() {
        let dispatcher = CommandDispatcher::new(PathBuf::from("/test"), None);
        assert_eq!(dispatcher.working_dir(), Path::new("/test"));
    }

    #[test]
    fn invalid_config_fails_dispatch() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("revive.yml"), "unknown_key: 1\n").unwrap();

        let dispatcher = CommandDispatcher::new(temp.path().to_path_buf(), None);
        let cli = Cli::parse_from(["revive", "strategy", "yaml"]);
        let mut ui = MockUI::new();

        assert!(dispatcher.dispatch(&cli, &mut ui).is_err());
    }

    #[test]
    fn requirements_ignores_config() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("revive.yml"), "unknown_key: 1\n").unwrap();
        let script = temp.path().join("job.py");
        fs::write(&script, "import requests\n").unwrap();

        let dispatcher = CommandDispatcher::new(temp.path().to_path_buf(), None);
        let cli = Cli::parse_from(["revive", "requirements", script.to_str().unwrap()]);
        let mut ui = MockUI::new();

        let result = dispatcher.dispatch(&cli, &mut ui).unwrap();
        assert!(result.success);
    }
}

//! Command-line interface for revive.
//!
//! - [`args`] - Argument definitions using clap derive macros
//! - [`commands`] - Command implementations

pub mod args;
pub mod commands;

pub use args::{Cli, Commands, CompletionsArgs, RequirementsArgs, RunArgs, StrategyArgs};
pub use commands::{Command, CommandDispatcher, CommandResult};

//! Child process execution and host detection.

pub mod command;
pub mod platform;

pub use command::{
    execute_quiet, run_program, CommandOptions, CommandResult, OutputLine, ProcessExecutor,
};
pub use platform::{is_debian_family, is_elevated, HostProfile};

//! CLI command implementations.
//!
//! Each command implements the [`Command`] trait, which provides a uniform
//! interface for executing commands and reporting results. Commands are
//! routed by [`CommandDispatcher`].

pub mod completions;
pub mod dispatcher;
pub mod requirements;
pub mod run;
pub mod strategy;

pub use dispatcher::{
    Command, CommandDispatcher, CommandResult, EXIT_CAPPED, EXIT_FAILURE, EXIT_SUCCESS,
};

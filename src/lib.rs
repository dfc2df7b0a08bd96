//! revive - a self-healing script runner.
//!
//! revive runs a script, and when it dies because a module is missing,
//! installs that module (pip first, then apt when running as root) and
//! runs it again, up to a pass cap.
//!
//! # Modules
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`config`] - Configuration loading and validation
//! - [`error`] - Error types and result aliases
//! - [`install`] - Install strategies, package tables and installers
//! - [`runner`] - The retry controller, run reports and log sinks
//! - [`shell`] - Process execution and host detection
//! - [`ui`] - Terminal status output
//!
//! # Example
//!
//! ```
//! use revive::runner::{matcher_for, FailureMatcher};
//!
//! let matcher = matcher_for(None).unwrap();
//! let output = "ModuleNotFoundError: No module named 'yaml'\n";
//! assert_eq!(matcher.missing_module(output), Some("yaml".to_string()));
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod install;
pub mod runner;
pub mod shell;
pub mod ui;

pub use error::{ReviveError, Result};

//! Run records: attempts, outcome and the full report.

use crate::install::{InstallAction, UnavailableReason};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

/// One execution of the script.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutionAttempt {
    /// 1-based pass number.
    pub pass: u32,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Exit code, `None` when the process was killed by a signal.
    pub exit_code: Option<i32>,
    /// Interleaved stdout and stderr.
    pub output: String,
    /// Module named by the missing-module signature, if any.
    pub missing_module: Option<String>,
}

impl ExecutionAttempt {
    /// Whether the script exited 0.
    pub fn succeeded(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Wall-clock duration of the attempt.
    pub fn duration(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}

/// Why a run ended in failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FailureReason {
    /// The script could not be started.
    LaunchError { message: String },
    /// Non-zero exit (or signal) with no classifiable cause.
    ScriptRuntimeFailure { exit_code: Option<i32> },
    /// A missing module was found but nothing can install it.
    UnresolvableDependency {
        module: String,
        reason: UnavailableReason,
    },
    /// Every applicable installer failed for the module.
    InstallFailure { module: String },
    /// The same module was missing on two consecutive passes.
    RepeatedMissingModule { module: String },
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::LaunchError { message } => write!(f, "launch error: {}", message),
            FailureReason::ScriptRuntimeFailure {
                exit_code: Some(code),
            } => write!(f, "script exited with code {}", code),
            FailureReason::ScriptRuntimeFailure { exit_code: None } => {
                write!(f, "script was terminated by a signal")
            }
            FailureReason::UnresolvableDependency { module, reason } => {
                write!(f, "cannot install '{}': {}", module, reason)
            }
            FailureReason::InstallFailure { module } => {
                write!(f, "installing '{}' failed", module)
            }
            FailureReason::RepeatedMissingModule { module } => write!(
                f,
                "'{}' is still missing after it was installed",
                module
            ),
        }
    }
}

/// Terminal value of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunOutcome {
    Succeeded,
    Failed { reason: FailureReason },
    /// The pass cap was reached; `passes` attempts were made.
    Capped { passes: u32 },
}

impl RunOutcome {
    /// Whether the script eventually exited 0.
    pub fn is_success(&self) -> bool {
        matches!(self, RunOutcome::Succeeded)
    }

    /// Short status label for dashboards.
    pub fn label(&self) -> &'static str {
        match self {
            RunOutcome::Succeeded => "succeeded",
            RunOutcome::Failed { .. } => "failed",
            RunOutcome::Capped { .. } => "capped",
        }
    }
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunOutcome::Succeeded => write!(f, "succeeded"),
            RunOutcome::Failed { reason } => write!(f, "failed ({})", reason),
            RunOutcome::Capped { passes } => {
                write!(f, "capped after {} passes (retry budget exceeded)", passes)
            }
        }
    }
}

/// Everything one run produced.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub script: PathBuf,
    /// Actions taken before the first pass.
    pub preinstalled: Vec<InstallAction>,
    /// Attempts in pass order.
    pub attempts: Vec<ExecutionAttempt>,
    /// Actions taken between passes, in order.
    pub installs: Vec<InstallAction>,
    pub outcome: RunOutcome,
}

impl RunReport {
    /// Output of the final attempt, for status display.
    pub fn last_output(&self) -> Option<&str> {
        self.attempts.last().map(|a| a.output.as_str())
    }
}

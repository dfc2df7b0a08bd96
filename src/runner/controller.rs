//! The retry controller.
//!
//! Drives one run through the state machine
//!
//! ```text
//! RUNNING ──exit 0──────────────────────────────▶ SUCCEEDED
//!    │ exit != 0
//!    ▼
//! CLASSIFYING ──no module / disabled / repeat───▶ FAILED
//!    │ module, pass < cap          └─pass == cap─▶ CAPPED
//!    ▼
//! INSTALLING ──installed / already-satisfied────▶ RUNNING
//!    └─no strategy left─────────────────────────▶ FAILED
//! ```
//!
//! A pass only follows an install step that reported success, and a module
//! classified on two consecutive passes ends the run instead of looping.

use crate::install::{
    InstallAction, PackageInstaller, Strategy, StrategySelector, UnavailableReason,
};
use crate::runner::report::{ExecutionAttempt, FailureReason, RunOutcome, RunReport};
use crate::runner::sink::{LogSink, SinkEvent};
use crate::runner::{RunOptions, ScriptExecutor, ScriptJob};
use crate::shell::OutputLine;
use chrono::Utc;
use std::collections::HashSet;
use std::fmt;
use tracing::{debug, info, trace};

/// Controller state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunState {
    Running,
    Classifying,
    Installing { module: String },
    Succeeded,
    Failed(FailureReason),
    Capped,
}

impl RunState {
    /// Whether no further transition happens.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RunState::Succeeded | RunState::Failed(_) | RunState::Capped
        )
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunState::Running => write!(f, "RUNNING"),
            RunState::Classifying => write!(f, "CLASSIFYING"),
            RunState::Installing { .. } => write!(f, "INSTALLING"),
            RunState::Succeeded => write!(f, "SUCCEEDED"),
            RunState::Failed(_) => write!(f, "FAILED"),
            RunState::Capped => write!(f, "CAPPED"),
        }
    }
}

// Result of walking the strategy ladder for one module.
enum Remediation {
    Resolved,
    Unavailable(UnavailableReason),
}

/// Runs a script until it succeeds, fails for good, or hits the pass cap.
pub struct RetryController<'a> {
    options: &'a RunOptions,
    executor: &'a dyn ScriptExecutor,
    installer: &'a dyn PackageInstaller,
}

impl<'a> RetryController<'a> {
    pub fn new(
        options: &'a RunOptions,
        executor: &'a dyn ScriptExecutor,
        installer: &'a dyn PackageInstaller,
    ) -> Self {
        Self {
            options,
            executor,
            installer,
        }
    }

    fn selector(&self) -> StrategySelector<'_> {
        StrategySelector::new(
            self.options.host,
            self.options.pip_policy,
            self.options.allow_auto_install,
            &self.options.apt_packages,
        )
    }

    /// Run `job` to a terminal outcome, reporting progress to `sink`.
    pub fn run(&self, job: &ScriptJob, sink: &mut dyn LogSink) -> RunReport {
        sink.note(&format!("running script: {}", job.path.display()));

        let mut preinstalled = Vec::new();
        self.preinstall(job, sink, &mut preinstalled);

        let mut attempts: Vec<ExecutionAttempt> = Vec::new();
        let mut installs: Vec<InstallAction> = Vec::new();
        let mut state = RunState::Running;

        while !state.is_terminal() {
            let next = match &state {
                RunState::Running if attempts.len() as u32 >= self.options.max_passes => {
                    RunState::Capped
                }
                RunState::Running => self.execute_pass(job, sink, &mut attempts),
                RunState::Classifying => self.classify(&attempts),
                RunState::Installing { module } => {
                    match self.remediate(module, sink, &mut installs) {
                        Remediation::Resolved => RunState::Running,
                        Remediation::Unavailable(UnavailableReason::Exhausted) => {
                            RunState::Failed(FailureReason::InstallFailure {
                                module: module.clone(),
                            })
                        }
                        Remediation::Unavailable(reason) => {
                            RunState::Failed(FailureReason::UnresolvableDependency {
                                module: module.clone(),
                                reason,
                            })
                        }
                    }
                }
                RunState::Succeeded | RunState::Failed(_) | RunState::Capped => break,
            };
            debug!("{}: {} -> {}", job.path.display(), state, next);
            state = next;
        }

        let outcome = match state {
            RunState::Succeeded => RunOutcome::Succeeded,
            RunState::Failed(reason) => RunOutcome::Failed { reason },
            _ => RunOutcome::Capped {
                passes: attempts.len() as u32,
            },
        };

        if matches!(outcome, RunOutcome::Capped { .. }) {
            sink.note("max passes reached; still failing due to cascading imports");
        }
        sink.emit(SinkEvent::Outcome(&outcome));
        info!("{}: {}", job.path.display(), outcome);

        RunReport {
            script: job.path.clone(),
            preinstalled,
            attempts,
            installs,
            outcome,
        }
    }

    // RUNNING: one execution of the script.
    fn execute_pass(
        &self,
        job: &ScriptJob,
        sink: &mut dyn LogSink,
        attempts: &mut Vec<ExecutionAttempt>,
    ) -> RunState {
        let pass = attempts.len() as u32 + 1;
        sink.note(&format!("pass {}", pass));

        let started_at = Utc::now();
        let result = match self
            .executor
            .execute(job, &|line: &OutputLine| trace!("{}", line.text()))
        {
            Ok(result) => result,
            Err(e) => {
                sink.note(&e.to_string());
                return RunState::Failed(FailureReason::LaunchError {
                    message: e.to_string(),
                });
            }
        };

        // A killed process is never classified, even if the signature
        // made it into the output before the signal.
        let missing_module = if result.success || result.terminated() {
            None
        } else {
            self.options.matcher.missing_module(&result.output)
        };
        if let Some(module) = &missing_module {
            debug!("{} matched missing module '{}'", self.options.matcher.name(), module);
        }

        let attempt = ExecutionAttempt {
            pass,
            started_at,
            finished_at: Utc::now(),
            exit_code: result.exit_code,
            output: result.output,
            missing_module,
        };
        sink.emit(SinkEvent::Attempt(&attempt));
        let succeeded = attempt.succeeded();
        attempts.push(attempt);

        if succeeded {
            RunState::Succeeded
        } else {
            RunState::Classifying
        }
    }

    // CLASSIFYING: decide whether the last failure is worth an install.
    fn classify(&self, attempts: &[ExecutionAttempt]) -> RunState {
        let Some(last) = attempts.last() else {
            return RunState::Running;
        };

        let Some(module) = &last.missing_module else {
            return RunState::Failed(FailureReason::ScriptRuntimeFailure {
                exit_code: last.exit_code,
            });
        };

        let previous = attempts
            .len()
            .checked_sub(2)
            .and_then(|i| attempts[i].missing_module.as_ref());
        if previous == Some(module) {
            return RunState::Failed(FailureReason::RepeatedMissingModule {
                module: module.clone(),
            });
        }

        if !self.options.allow_auto_install {
            return RunState::Failed(FailureReason::UnresolvableDependency {
                module: module.clone(),
                reason: UnavailableReason::AutoInstallDisabled,
            });
        }

        if attempts.len() as u32 >= self.options.max_passes {
            return RunState::Capped;
        }

        RunState::Installing {
            module: module.clone(),
        }
    }

    // INSTALLING: walk the strategy ladder until one action succeeds.
    fn remediate(
        &self,
        module: &str,
        sink: &mut dyn LogSink,
        actions: &mut Vec<InstallAction>,
    ) -> Remediation {
        let selector = self.selector();
        let mut tried: Vec<InstallAction> = Vec::new();

        loop {
            let strategy = selector.select(module, &tried);
            if let Strategy::Unavailable(reason) = strategy {
                sink.note(&format!("install failed for: {} ({})", module, reason));
                return Remediation::Unavailable(reason);
            }

            let action = self.installer.install(module, &strategy);
            sink.emit(SinkEvent::Install(&action));
            actions.push(action.clone());

            if action.succeeded() {
                return Remediation::Resolved;
            }
            tried.push(action);
        }
    }

    // Best effort: failures here only mean the retry loop does more work.
    fn preinstall(
        &self,
        job: &ScriptJob,
        sink: &mut dyn LogSink,
        actions: &mut Vec<InstallAction>,
    ) {
        if job.requirements.is_empty() {
            return;
        }
        sink.note(&format!("requirements: {}", job.requirements.join(", ")));

        if !self.options.allow_auto_install {
            sink.note("auto-install disabled; skipping pre-install");
            return;
        }

        let mut seen = HashSet::new();
        let modules = job
            .requirements
            .iter()
            .map(|name| self.options.pip_aliases.import_name(name))
            .filter(|module| seen.insert(module.clone()));

        for module in modules {
            let module = module.as_str();
            if self.installer.is_importable(module) {
                debug!("pre-install: '{}' already importable", module);
                continue;
            }
            sink.note(&format!("pre-install missing: {}", module));
            if let Remediation::Unavailable(_) = self.remediate(module, sink, actions) {
                sink.note(&format!("pre-install failed for: {}", module));
            }
        }
    }
}

//! Self-healing script execution.
//!
//! [`run`] executes a script, and when it dies on a missing module, installs
//! that module and tries again. Each call is an independent sequential state
//! machine; callers may run several scripts at once on separate threads.
//!
//! Concurrent runs share the host's package state. Two runs installing into
//! the same interpreter at the same moment race at the package-manager level
//! (pip and apt take their own locks; the loser's action reports `failed`).
//!
//! # Example
//!
//! ```no_run
//! use revive::runner::{run, MemorySink, RunOptions, ScriptJob};
//!
//! let job = ScriptJob::new("/srv/scripts/scrape.py");
//! let options = RunOptions::new(50, true, false);
//! let mut sink = MemorySink::new();
//!
//! let report = run(&job, &options, &mut sink);
//! println!("{} after {} passes", report.outcome, report.attempts.len());
//! ```

pub mod controller;
pub mod patterns;
pub mod report;
pub mod sink;

pub use controller::{RetryController, RunState};
pub use patterns::{matcher_for, FailureMatcher, PythonModuleMatcher, RegexMatcher};
pub use report::{ExecutionAttempt, FailureReason, RunOutcome, RunReport};
pub use sink::{FileSink, LogSink, MemorySink, SinkEvent, StreamSink};

use crate::config::RunnerConfig;
use crate::error::Result;
use crate::install::{
    AptPackageMap, BreakSystemPackagesPolicy, PipAliasMap, Requirements, SystemInstaller,
};
use crate::shell::{CommandResult, HostProfile, OutputLine, ProcessExecutor};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// The script to run. Immutable for the duration of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptJob {
    /// Script path; identifies the job.
    pub path: PathBuf,
    /// Modules to install before the first pass.
    pub requirements: Vec<String>,
    /// Environment overrides for the script process.
    pub env: BTreeMap<String, String>,
    /// Working directory (defaults to the script's directory).
    pub cwd: Option<PathBuf>,
}

impl ScriptJob {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            requirements: Vec::new(),
            env: BTreeMap::new(),
            cwd: None,
        }
    }

    /// Create a job whose requirements are read from the script itself.
    ///
    /// An unreadable script yields a job with no requirements; the executor
    /// reports the launch problem on the first pass.
    pub fn from_script(path: impl Into<PathBuf>, scan_imports: bool) -> Self {
        let path = path.into();
        let requirements = Requirements::load(&path, scan_imports)
            .map(|r| r.all())
            .unwrap_or_default();
        Self::new(path).with_requirements(requirements)
    }

    pub fn with_requirements(mut self, requirements: Vec<String>) -> Self {
        self.requirements = requirements;
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn with_cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    /// The directory the script runs in.
    pub fn working_dir(&self) -> Option<PathBuf> {
        self.cwd.clone().or_else(|| {
            self.path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .map(Path::to_path_buf)
        })
    }
}

/// Executes one pass of a script.
pub trait ScriptExecutor {
    /// Run the script to completion. A non-zero exit is `Ok`; only a
    /// script that cannot be started is an error.
    fn execute(&self, job: &ScriptJob, on_line: &dyn Fn(&OutputLine)) -> Result<CommandResult>;
}

/// Per-run settings, resolved once before the run starts.
pub struct RunOptions {
    /// Maximum number of execution attempts.
    pub max_passes: u32,
    /// Global switch for every package-manager call.
    pub allow_auto_install: bool,
    /// Host facts; `host.elevated` is the run's privilege level.
    pub host: HostProfile,
    pub pip_policy: BreakSystemPackagesPolicy,
    pub apt_packages: AptPackageMap,
    pub pip_aliases: PipAliasMap,
    pub matcher: Box<dyn FailureMatcher>,
    /// Interpreter for the script (`None` executes it directly).
    pub interpreter: Option<String>,
    pub unbuffered: bool,
}

impl RunOptions {
    /// Options with defaults for everything but the three core switches.
    /// Other host facts are detected.
    pub fn new(max_passes: u32, allow_auto_install: bool, running_elevated: bool) -> Self {
        Self {
            max_passes,
            allow_auto_install,
            host: HostProfile::detect(Some(running_elevated)),
            pip_policy: BreakSystemPackagesPolicy::default(),
            apt_packages: AptPackageMap::new(),
            pip_aliases: PipAliasMap::new(),
            matcher: Box::new(PythonModuleMatcher),
            interpreter: Some("python3".to_string()),
            unbuffered: true,
        }
    }

    /// Resolve options from configuration, detecting the host.
    pub fn from_config(config: &RunnerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            max_passes: config.max_passes,
            allow_auto_install: config.allow_auto_install,
            host: HostProfile::detect(config.running_elevated),
            pip_policy: config.pip_policy,
            apt_packages: AptPackageMap::new()
                .with_overrides(&config.apt_packages)
                .guessing_names(config.apt_guess_names),
            pip_aliases: PipAliasMap::new().with_overrides(&config.pip_aliases),
            matcher: matcher_for(config.failure_signature.as_deref())?,
            interpreter: config.interpreter(),
            unbuffered: config.unbuffered,
        })
    }

    /// Replace the detected host profile.
    pub fn with_host(mut self, host: HostProfile) -> Self {
        self.host = host;
        self
    }

    pub fn running_elevated(&self) -> bool {
        self.host.elevated
    }

    /// Interpreter used for pip and import checks.
    pub fn python(&self) -> &str {
        self.interpreter.as_deref().unwrap_or("python3")
    }

    /// The executor these options describe.
    pub fn executor(&self) -> ProcessExecutor {
        ProcessExecutor {
            interpreter: self.interpreter.clone(),
            unbuffered: self.unbuffered,
        }
    }

    /// The installer these options describe.
    pub fn installer(&self) -> SystemInstaller {
        SystemInstaller::new(self.python(), self.host, self.pip_aliases.clone())
    }
}

/// Run `job` with the real executor and installer.
pub fn run(job: &ScriptJob, options: &RunOptions, sink: &mut dyn LogSink) -> RunReport {
    let executor = options.executor();
    let installer = options.installer();
    RetryController::new(options, &executor, &installer).run(job, sink)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn working_dir_defaults_to_parent() {
        let job = ScriptJob::new("/srv/scripts/job.py");
        assert_eq!(job.working_dir(), Some(PathBuf::from("/srv/scripts")));
    }

    #[test]
    fn bare_file_name_has_no_working_dir() {
        assert_eq!(ScriptJob::new("job.py").working_dir(), None);
    }

    #[test]
    fn explicit_cwd_wins() {
        let job = ScriptJob::new("/srv/scripts/job.py").with_cwd("/tmp");
        assert_eq!(job.working_dir(), Some(PathBuf::from("/tmp")));
    }

    #[test]
    fn from_script_missing_file_has_no_requirements() {
        let job = ScriptJob::from_script("/nonexistent/job.py", true);
        assert!(job.requirements.is_empty());
    }

    #[test]
    fn options_from_config_apply_overrides() {
        let mut config = RunnerConfig {
            max_passes: 7,
            allow_auto_install: false,
            running_elevated: Some(true),
            interpreter: String::new(),
            ..RunnerConfig::default()
        };
        config
            .apt_packages
            .insert("torch".to_string(), "python3-torch".to_string());

        let options = RunOptions::from_config(&config).unwrap();

        assert_eq!(options.max_passes, 7);
        assert!(!options.allow_auto_install);
        assert!(options.running_elevated());
        assert_eq!(options.interpreter, None);
        assert_eq!(options.python(), "python3");
        assert_eq!(
            options.apt_packages.package_for("torch"),
            Some("python3-torch".to_string())
        );
    }

    #[test]
    fn options_from_config_reject_bad_signature() {
        let config = RunnerConfig {
            failure_signature: Some("no group here".to_string()),
            ..RunnerConfig::default()
        };
        assert!(RunOptions::from_config(&config).is_err());
    }
}

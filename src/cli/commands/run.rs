//! The `revive run` command.
//!
//! Runs each script through the retry controller. Several scripts run
//! concurrently, one thread each, with independent log sinks.

use std::io;
use std::path::{Path, PathBuf};
use std::thread;

use crate::cli::args::RunArgs;
use crate::config::RunnerConfig;
use crate::error::{ReviveError, Result};
use crate::runner::{
    self, FileSink, LogSink, RunOptions, RunOutcome, RunReport, ScriptJob, StreamSink,
};
use crate::ui::UserInterface;

use super::dispatcher::{Command, CommandResult, EXIT_CAPPED, EXIT_FAILURE, EXIT_SUCCESS};

/// The run command implementation.
pub struct RunCommand {
    args: RunArgs,
    config: RunnerConfig,
}

impl RunCommand {
    /// Create a run command over an already-loaded configuration.
    pub fn new(args: RunArgs, config: RunnerConfig) -> Self {
        Self { args, config }
    }

    /// Configuration with command-line flags applied.
    pub fn effective_config(&self) -> RunnerConfig {
        let mut config = self.config.clone();
        self.args.apply_to(&mut config);
        config
    }

    fn jobs(&self, config: &RunnerConfig) -> Vec<ScriptJob> {
        self.args
            .scripts
            .iter()
            .map(|path| {
                let mut job = ScriptJob::from_script(path.clone(), config.scan_imports);
                job.env = config.env.clone();
                job
            })
            .collect()
    }

    fn sinks(&self) -> Result<Vec<Box<dyn LogSink + Send>>> {
        let count = self.args.scripts.len();
        match &self.args.log_dir {
            Some(dir) => log_paths(dir, &self.args.scripts)
                .iter()
                .map(|path| -> Result<Box<dyn LogSink + Send>> {
                    Ok(Box::new(FileSink::append_to(path)?))
                })
                .collect(),
            // Keep stdout clean for the JSON document.
            None if self.args.json => Ok((0..count)
                .map(|_| Box::new(StreamSink::new(io::stderr())) as Box<dyn LogSink + Send>)
                .collect()),
            None => Ok((0..count)
                .map(|_| Box::new(StreamSink::new(io::stdout())) as Box<dyn LogSink + Send>)
                .collect()),
        }
    }

    fn show_summary(&self, ui: &mut dyn UserInterface, reports: &[RunReport]) {
        for report in reports {
            let line = format!(
                "{}: {} ({} {}, {} {})",
                report.script.display(),
                report.outcome,
                report.attempts.len(),
                plural(report.attempts.len(), "pass", "passes"),
                report.installs.len() + report.preinstalled.len(),
                plural(
                    report.installs.len() + report.preinstalled.len(),
                    "install",
                    "installs"
                ),
            );
            match report.outcome {
                RunOutcome::Succeeded => ui.success(&line),
                RunOutcome::Capped { .. } => ui.warning(&line),
                RunOutcome::Failed { .. } => ui.error(&line),
            }
        }
    }
}

impl Command for RunCommand {
    fn execute(&self, ui: &mut dyn UserInterface) -> Result<CommandResult> {
        let config = self.effective_config();
        let options = RunOptions::from_config(&config)?;
        let jobs = self.jobs(&config);
        let sinks = self.sinks()?;

        let reports = run_all(&jobs, &options, sinks)?;

        if self.args.json {
            let json = serde_json::to_string_pretty(&reports).map_err(anyhow::Error::from)?;
            ui.raw(&json);
        } else {
            self.show_summary(ui, &reports);
        }

        Ok(match exit_code(&reports) {
            EXIT_SUCCESS => CommandResult::success(),
            code => CommandResult::failure(code),
        })
    }
}

/// Run every job on its own thread and collect the reports in job order.
pub fn run_all(
    jobs: &[ScriptJob],
    options: &RunOptions,
    sinks: Vec<Box<dyn LogSink + Send>>,
) -> Result<Vec<RunReport>> {
    thread::scope(|scope| {
        let handles: Vec<_> = jobs
            .iter()
            .zip(sinks)
            .map(|(job, mut sink)| scope.spawn(move || runner::run(job, options, sink.as_mut())))
            .collect();

        handles
            .into_iter()
            .zip(jobs)
            .map(|(handle, job)| {
                handle.join().map_err(|_| {
                    ReviveError::Other(anyhow::anyhow!(
                        "run of {} panicked",
                        job.path.display()
                    ))
                })
            })
            .collect()
    })
}

/// 0 when every run succeeded, 3 when some were capped and none failed,
/// 1 otherwise.
pub fn exit_code(reports: &[RunReport]) -> i32 {
    if reports
        .iter()
        .any(|r| matches!(r.outcome, RunOutcome::Failed { .. }))
    {
        EXIT_FAILURE
    } else if reports
        .iter()
        .any(|r| matches!(r.outcome, RunOutcome::Capped { .. }))
    {
        EXIT_CAPPED
    } else {
        EXIT_SUCCESS
    }
}

/// `<dir>/<script stem>.log`
pub fn log_path(dir: &Path, script: &Path) -> PathBuf {
    dir.join(format!("{}.log", log_stem(script)))
}

/// One log file per script argument. Scripts sharing a stem get their
/// 1-based argument position appended (`job-1.log`, `job-2.log`) so no two
/// concurrent runs append to the same file.
pub fn log_paths(dir: &Path, scripts: &[PathBuf]) -> Vec<PathBuf> {
    let stems: Vec<String> = scripts.iter().map(|s| log_stem(s)).collect();
    stems
        .iter()
        .zip(scripts)
        .enumerate()
        .map(|(i, (stem, script))| {
            if stems.iter().filter(|other| *other == stem).count() > 1 {
                dir.join(format!("{}-{}.log", stem, i + 1))
            } else {
                log_path(dir, script)
            }
        })
        .collect()
}

fn log_stem(script: &Path) -> String {
    script
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "script".to_string())
}

fn plural<'a>(n: usize, one: &'a str, many: &'a str) -> &'a str {
    if n == 1 {
        one
    } else {
        many
    }
}

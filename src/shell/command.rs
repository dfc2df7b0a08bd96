//! Child process execution with combined output capture.

use crate::error::{ReviveError, Result};
use crate::runner::{ScriptExecutor, ScriptJob};
use std::collections::HashMap;
use std::io::{BufRead, BufReader, Read};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::debug;

/// Result of executing a child process.
#[derive(Debug, Clone)]
pub struct CommandResult {
    /// Exit code (None if killed by signal).
    pub exit_code: Option<i32>,

    /// Interleaved stdout and stderr, in arrival order.
    pub output: String,

    /// Execution duration.
    pub duration: Duration,

    /// Whether the process exited with code 0.
    pub success: bool,
}

impl CommandResult {
    /// Create a success result.
    pub fn success(output: String, duration: Duration) -> Self {
        Self {
            exit_code: Some(0),
            output,
            duration,
            success: true,
        }
    }

    /// Create a failure result.
    pub fn failure(exit_code: Option<i32>, output: String, duration: Duration) -> Self {
        Self {
            exit_code,
            output,
            duration,
            success: false,
        }
    }

    /// Whether the process ended without an exit code (terminated by a signal).
    pub fn terminated(&self) -> bool {
        self.exit_code.is_none()
    }
}

/// Options for command execution.
#[derive(Debug, Clone, Default)]
pub struct CommandOptions {
    /// Working directory.
    pub cwd: Option<PathBuf>,

    /// Environment variables (merged over the inherited environment).
    pub env: HashMap<String, String>,
}

/// Output line from command execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputLine {
    Stdout(String),
    Stderr(String),
}

impl OutputLine {
    /// The line text without its stream tag.
    pub fn text(&self) -> &str {
        match self {
            OutputLine::Stdout(s) | OutputLine::Stderr(s) => s,
        }
    }
}

/// Run `program` with `args`, capturing stdout and stderr as one stream.
///
/// Each line is handed to `on_line` as it arrives. A process that cannot be
/// spawned is a [`ReviveError::Launch`]; a non-zero exit is not an error.
pub fn run_program(
    program: &str,
    args: &[String],
    options: &CommandOptions,
    on_line: &dyn Fn(&OutputLine),
) -> Result<CommandResult> {
    let start = Instant::now();

    let mut cmd = Command::new(program);
    cmd.args(args);

    if let Some(cwd) = &options.cwd {
        cmd.current_dir(cwd);
    }

    for (key, value) in &options.env {
        cmd.env(key, value);
    }

    cmd.stdin(Stdio::null());
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());

    debug!("spawning {} {}", program, args.join(" "));

    let mut child = cmd
        .spawn()
        .map_err(|e| ReviveError::launch(program, e.to_string()))?;

    let (Some(stdout), Some(stderr)) = (child.stdout.take(), child.stderr.take()) else {
        let _ = child.kill();
        return Err(ReviveError::launch(program, "output pipes unavailable"));
    };

    let (tx, rx) = mpsc::channel();
    let tx_stdout = tx.clone();
    let tx_stderr = tx;

    let stdout_handle = thread::spawn(move || {
        read_lines_lossy(stdout, |line| {
            let _ = tx_stdout.send(OutputLine::Stdout(line));
        });
    });

    let stderr_handle = thread::spawn(move || {
        read_lines_lossy(stderr, |line| {
            let _ = tx_stderr.send(OutputLine::Stderr(line));
        });
    });

    let mut output = String::new();
    for line in rx {
        on_line(&line);
        output.push_str(line.text());
        output.push('\n');
    }

    let _ = stdout_handle.join();
    let _ = stderr_handle.join();

    let status = child
        .wait()
        .map_err(|e| ReviveError::launch(program, e.to_string()))?;

    let duration = start.elapsed();

    if status.success() {
        Ok(CommandResult::success(output, duration))
    } else {
        Ok(CommandResult::failure(status.code(), output, duration))
    }
}

/// Run a program and collect output without a line callback.
pub fn execute_quiet(
    program: &str,
    args: &[String],
    options: &CommandOptions,
) -> Result<CommandResult> {
    run_program(program, args, options, &|_| {})
}

// Lines are split on '\n' and decoded lossily so a stray non-UTF-8 byte in
// script output does not end the capture early.
fn read_lines_lossy<R: Read>(source: R, mut emit: impl FnMut(String)) {
    let mut reader = BufReader::new(source);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf) {
            Ok(0) | Err(_) => break,
            Ok(_) => {
                while matches!(buf.last(), Some(b'\n' | b'\r')) {
                    buf.pop();
                }
                emit(String::from_utf8_lossy(&buf).into_owned());
            }
        }
    }
}

/// Runs scripts as child processes, optionally through an interpreter.
#[derive(Debug, Clone)]
pub struct ProcessExecutor {
    /// Interpreter to run the script with (`None` executes the script directly).
    pub interpreter: Option<String>,
    /// Set `PYTHONUNBUFFERED=1` so stdout and stderr interleave in order.
    pub unbuffered: bool,
}

impl Default for ProcessExecutor {
    fn default() -> Self {
        Self {
            interpreter: Some("python3".to_string()),
            unbuffered: true,
        }
    }
}

impl ScriptExecutor for ProcessExecutor {
    fn execute(&self, job: &ScriptJob, on_line: &dyn Fn(&OutputLine)) -> Result<CommandResult> {
        if !job.path.is_file() {
            return Err(ReviveError::launch(
                job.path.display().to_string(),
                "script not found",
            ));
        }
        // The child runs in the script's directory, so a relative path
        // would no longer resolve.
        let script = job
            .path
            .canonicalize()
            .map_err(|e| ReviveError::launch(job.path.display().to_string(), e.to_string()))?
            .display()
            .to_string();

        let mut env = HashMap::new();
        if self.unbuffered {
            env.insert("PYTHONUNBUFFERED".to_string(), "1".to_string());
        }
        env.extend(job.env.iter().map(|(k, v)| (k.clone(), v.clone())));

        let options = CommandOptions {
            cwd: job.working_dir(),
            env,
        };

        match &self.interpreter {
            Some(interpreter) => run_program(interpreter, &[script], &options, on_line),
            None => run_program(&script, &[], &options, on_line),
        }
    }
}

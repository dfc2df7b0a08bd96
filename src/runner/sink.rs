//! Log sinks that receive a run's progress as it happens.
//!
//! The dashboard tails a per-script log file, so each attempt's captured
//! text is flushed as soon as the attempt completes.

use crate::error::Result;
use crate::install::InstallAction;
use crate::runner::report::{ExecutionAttempt, RunOutcome};
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::Path;
use tracing::warn;

/// One thing worth telling the log.
#[derive(Debug, Clone, Copy)]
pub enum SinkEvent<'a> {
    /// A `[runner]` status line.
    Note(&'a str),
    /// A completed execution attempt.
    Attempt(&'a ExecutionAttempt),
    /// A completed install action.
    Install(&'a InstallAction),
    /// The terminal outcome.
    Outcome(&'a RunOutcome),
}

/// Receives run events in order.
pub trait LogSink {
    fn emit(&mut self, event: SinkEvent<'_>);

    /// Shorthand for a [`SinkEvent::Note`].
    fn note(&mut self, message: &str) {
        self.emit(SinkEvent::Note(message));
    }
}

/// Writes events as plain text to any writer.
pub struct StreamSink<W: Write> {
    writer: W,
}

impl<W: Write> StreamSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Unwrap the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer
    }

    fn write_event(&mut self, event: SinkEvent<'_>) -> std::io::Result<()> {
        match event {
            SinkEvent::Note(message) => writeln!(self.writer, "[runner] {}", message)?,
            SinkEvent::Attempt(attempt) => {
                self.writer.write_all(attempt.output.as_bytes())?;
                let status = match attempt.exit_code {
                    Some(code) => format!("exit code {}", code),
                    None => "terminated by signal".to_string(),
                };
                writeln!(
                    self.writer,
                    "[runner] pass {} finished with {} in {}ms",
                    attempt.pass,
                    status,
                    attempt.duration().num_milliseconds()
                )?;
                if let Some(module) = &attempt.missing_module {
                    writeln!(self.writer, "[runner] missing module detected: {}", module)?;
                }
            }
            SinkEvent::Install(action) => {
                if !action.output.is_empty() {
                    writeln!(self.writer, "{}", action.output.trim_end())?;
                }
                writeln!(
                    self.writer,
                    "[runner] {} install of {}: {}",
                    action.strategy,
                    action.package.as_deref().unwrap_or(&action.module),
                    action.outcome
                )?;
            }
            SinkEvent::Outcome(outcome) => writeln!(self.writer, "[runner] {}", outcome)?,
        }
        self.writer.flush()
    }
}

impl<W: Write> LogSink for StreamSink<W> {
    fn emit(&mut self, event: SinkEvent<'_>) {
        if let Err(e) = self.write_event(event) {
            warn!("Failed to write run log: {}", e);
        }
    }
}

/// A sink appending to a log file.
pub type FileSink = StreamSink<File>;

impl StreamSink<File> {
    /// Open `path` for appending, creating it and its directory if needed.
    pub fn append_to(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self::new(file))
    }
}

/// Collects events in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub notes: Vec<String>,
    pub attempts: Vec<ExecutionAttempt>,
    pub installs: Vec<InstallAction>,
    pub outcome: Option<RunOutcome>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether any note contains `text`.
    pub fn has_note(&self, text: &str) -> bool {
        self.notes.iter().any(|n| n.contains(text))
    }
}

impl LogSink for MemorySink {
    fn emit(&mut self, event: SinkEvent<'_>) {
        match event {
            SinkEvent::Note(message) => self.notes.push(message.to_string()),
            SinkEvent::Attempt(attempt) => self.attempts.push(attempt.clone()),
            SinkEvent::Install(action) => self.installs.push(action.clone()),
            SinkEvent::Outcome(outcome) => self.outcome = Some(outcome.clone()),
        }
    }
}

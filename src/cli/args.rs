//! CLI argument definitions.
//!
//! This module defines all CLI arguments using clap's derive macros.
//! The main entry point is the [`Cli`] struct.

use crate::config::RunnerConfig;
use crate::install::BreakSystemPackagesPolicy;
use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

/// revive - run scripts and install whatever they turn out to be missing.
#[derive(Debug, Parser)]
#[command(name = "revive")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to config file (overrides ./revive.yml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run scripts, installing missing modules between passes
    Run(RunArgs),

    /// Show the modules a script declares or imports
    Requirements(RequirementsArgs),

    /// Show how a module would be installed on this host
    Strategy(StrategyArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

/// Arguments for the `run` command.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct RunArgs {
    /// Scripts to run (concurrently when more than one)
    #[arg(required = true, value_name = "SCRIPT")]
    pub scripts: Vec<PathBuf>,

    /// Maximum execution attempts per script
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u32).range(1..))]
    pub max_passes: Option<u32>,

    /// Never call a package manager
    #[arg(long)]
    pub no_auto_install: bool,

    /// When to pass --break-system-packages to pip (auto, proactive, reactive)
    #[arg(long, value_name = "POLICY")]
    pub pip_policy: Option<BreakSystemPackagesPolicy>,

    /// Interpreter for the scripts ("" executes them directly)
    #[arg(long, value_name = "PROGRAM")]
    pub interpreter: Option<String>,

    /// Treat the process as elevated (enables apt)
    #[arg(long, conflicts_with = "not_elevated")]
    pub elevated: bool,

    /// Treat the process as unprivileged
    #[arg(long)]
    pub not_elevated: bool,

    /// Extra environment for the scripts
    #[arg(short = 'e', long = "env", value_name = "KEY=VALUE", value_parser = parse_key_value)]
    pub env: Vec<(String, String)>,

    /// Append each script's log to <DIR>/<script stem>.log
    #[arg(long, value_name = "DIR")]
    pub log_dir: Option<PathBuf>,

    /// Print the run reports as JSON
    #[arg(long)]
    pub json: bool,
}

impl RunArgs {
    /// Apply command-line overrides on top of the loaded configuration.
    pub fn apply_to(&self, config: &mut RunnerConfig) {
        if let Some(n) = self.max_passes {
            config.max_passes = n;
        }
        if self.no_auto_install {
            config.allow_auto_install = false;
        }
        if let Some(policy) = self.pip_policy {
            config.pip_policy = policy;
        }
        if let Some(interpreter) = &self.interpreter {
            config.interpreter = interpreter.clone();
        }
        if self.elevated {
            config.running_elevated = Some(true);
        } else if self.not_elevated {
            config.running_elevated = Some(false);
        }
        config.env.extend(self.env.iter().cloned());
    }
}

/// Arguments for the `requirements` command.
#[derive(Debug, Clone, clap::Args)]
pub struct RequirementsArgs {
    /// Script to inspect
    pub script: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `strategy` command.
#[derive(Debug, Clone, clap::Args)]
pub struct StrategyArgs {
    /// Import name, e.g. `yaml` or `google.protobuf`
    pub module: String,

    /// Treat the process as elevated (enables apt)
    #[arg(long, conflicts_with = "not_elevated")]
    pub elevated: bool,

    /// Treat the process as unprivileged
    #[arg(long)]
    pub not_elevated: bool,
}

/// Arguments for the `completions` command.
#[derive(Debug, Clone, clap::Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}

fn parse_key_value(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got '{}'", s)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_run_flags() {
        let cli = Cli::try_parse_from([
            "revive",
            "run",
            "a.py",
            "b.py",
            "--max-passes",
            "4",
            "--no-auto-install",
            "--pip-policy",
            "reactive",
            "--not-elevated",
            "-e",
            "TZ=UTC",
            "--env",
            "EMPTY=",
        ])
        .unwrap();

        let Commands::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.scripts.len(), 2);
        assert_eq!(args.max_passes, Some(4));
        assert!(args.no_auto_install);
        assert_eq!(args.pip_policy, Some(BreakSystemPackagesPolicy::Reactive));
        assert!(args.not_elevated);
        assert_eq!(
            args.env,
            vec![
                ("TZ".to_string(), "UTC".to_string()),
                ("EMPTY".to_string(), String::new())
            ]
        );
    }

    #[test]
    fn run_requires_a_script() {
        assert!(Cli::try_parse_from(["revive", "run"]).is_err());
    }

    #[test]
    fn zero_passes_is_rejected() {
        assert!(Cli::try_parse_from(["revive", "run", "a.py", "--max-passes", "0"]).is_err());
    }

    #[test]
    fn elevation_flags_conflict() {
        assert!(
            Cli::try_parse_from(["revive", "run", "a.py", "--elevated", "--not-elevated"]).is_err()
        );
    }

    #[test]
    fn env_needs_equals() {
        assert!(Cli::try_parse_from(["revive", "run", "a.py", "-e", "NOVALUE"]).is_err());
    }

    #[test]
    fn flags_override_config() {
        let mut config = RunnerConfig::default();
        let args = RunArgs {
            scripts: vec![PathBuf::from("a.py")],
            max_passes: Some(2),
            no_auto_install: true,
            interpreter: Some(String::new()),
            elevated: true,
            env: vec![("A".to_string(), "1".to_string())],
            ..RunArgs::default()
        };
        args.apply_to(&mut config);

        assert_eq!(config.max_passes, 2);
        assert!(!config.allow_auto_install);
        assert_eq!(config.interpreter(), None);
        assert_eq!(config.running_elevated, Some(true));
        assert_eq!(config.env["A"], "1");
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["revive", "strategy", "yaml", "--debug", "--no-color"])
            .unwrap();
        assert!(cli.debug);
        assert!(cli.no_color);
    }
}

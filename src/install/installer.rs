//! Package installation.
//!
//! Runs the strategy chosen by the selector as a subprocess and reports what
//! happened. This is the only code that changes the host's package state.

use crate::install::registry::{top_level, PipAliasMap};
use crate::install::strategy::{Strategy, StrategyKind};
use crate::shell::{execute_quiet, CommandOptions, CommandResult, HostProfile};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::OnceLock;
use tracing::{debug, info, warn};

/// Result of one install action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum InstallOutcome {
    /// The package manager installed something.
    Installed,
    /// The package was already present.
    AlreadySatisfied,
    /// The install did not make the module available.
    Failed,
}

impl fmt::Display for InstallOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InstallOutcome::Installed => write!(f, "installed"),
            InstallOutcome::AlreadySatisfied => write!(f, "already-satisfied"),
            InstallOutcome::Failed => write!(f, "failed"),
        }
    }
}

/// A single remediation attempt for a missing module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstallAction {
    /// Module that was missing.
    pub module: String,
    /// Strategy used.
    pub strategy: StrategyKind,
    /// Package name handed to the package manager, if one was invoked.
    pub package: Option<String>,
    /// What happened.
    pub outcome: InstallOutcome,
    /// Raw package-manager output.
    pub output: String,
}

impl InstallAction {
    /// Whether the module should now be importable.
    pub fn succeeded(&self) -> bool {
        matches!(
            self.outcome,
            InstallOutcome::Installed | InstallOutcome::AlreadySatisfied
        )
    }

    /// Whether pip refused because the OS manages the environment (PEP 668).
    pub fn rejected_by_os_policy(&self) -> bool {
        self.outcome == InstallOutcome::Failed
            && self.output.contains("externally-managed-environment")
    }

    fn failed(module: &str, strategy: StrategyKind, package: Option<String>, output: String) -> Self {
        Self {
            module: module.to_string(),
            strategy,
            package,
            outcome: InstallOutcome::Failed,
            output,
        }
    }
}

/// Installs modules and checks whether they import.
pub trait PackageInstaller {
    /// Whether `module` imports cleanly under the target interpreter.
    fn is_importable(&self, module: &str) -> bool;

    /// Carry out `strategy` for `module`.
    fn install(&self, module: &str, strategy: &Strategy) -> InstallAction;
}

/// Installs through the real `pip` and `apt-get`.
pub struct SystemInstaller {
    python: String,
    apt_get: String,
    host: HostProfile,
    pip_aliases: PipAliasMap,
    env: HashMap<String, String>,
    pip_ready: OnceLock<bool>,
}

impl SystemInstaller {
    /// Create an installer that targets `python`.
    pub fn new(python: impl Into<String>, host: HostProfile, pip_aliases: PipAliasMap) -> Self {
        Self {
            python: python.into(),
            apt_get: "apt-get".to_string(),
            host,
            pip_aliases,
            env: HashMap::new(),
            pip_ready: OnceLock::new(),
        }
    }

    /// Use a different `apt-get` binary.
    pub fn with_apt_get(mut self, apt_get: impl Into<String>) -> Self {
        self.apt_get = apt_get.into();
        self
    }

    /// Extra environment for installer subprocesses.
    pub fn with_env(mut self, env: HashMap<String, String>) -> Self {
        self.env = env;
        self
    }

    fn options(&self) -> CommandOptions {
        CommandOptions {
            cwd: None,
            env: self.env.clone(),
        }
    }

    fn python(&self, args: &[&str]) -> Option<CommandResult> {
        let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
        match execute_quiet(&self.python, &args, &self.options()) {
            Ok(result) => Some(result),
            Err(e) => {
                warn!("{}", e);
                None
            }
        }
    }

    // Bootstraps pip with ensurepip the first time it is found missing.
    fn ensure_pip(&self) -> bool {
        *self.pip_ready.get_or_init(|| {
            let has_pip = || {
                self.python(&["-m", "pip", "--version"])
                    .is_some_and(|r| r.success)
            };
            if has_pip() {
                return true;
            }
            info!("bootstrapping pip via ensurepip");
            let _ = self.python(&["-m", "ensurepip", "--upgrade"]);
            has_pip()
        })
    }

    fn pip_args(&self, package: &str, break_system_packages: bool) -> Vec<String> {
        let mut args: Vec<String> = [
            "-m",
            "pip",
            "install",
            "--disable-pip-version-check",
            "--no-input",
            "--no-cache-dir",
        ]
        .iter()
        .map(|a| a.to_string())
        .collect();
        if break_system_packages {
            args.push("--break-system-packages".to_string());
        } else if !self.host.elevated && !self.host.in_venv {
            args.push("--user".to_string());
        }
        args.push(package.to_string());
        args
    }

    fn install_pip(&self, module: &str, break_system_packages: bool) -> InstallAction {
        let kind = if break_system_packages {
            StrategyKind::PipBreakSystemPackages
        } else {
            StrategyKind::Pip
        };

        if !self.ensure_pip() {
            return InstallAction::failed(module, kind, None, "pip unavailable".to_string());
        }

        let top = top_level(module);
        let mut transcript = String::new();
        let mut last_package = None;

        for candidate in self.pip_aliases.candidates(module) {
            let args = self.pip_args(&candidate, break_system_packages);
            info!("pip cmd: {} {}", self.python, args.join(" "));
            last_package = Some(candidate.clone());

            let result = match execute_quiet(&self.python, &args, &self.options()) {
                Ok(r) => r,
                Err(e) => {
                    transcript.push_str(&e.to_string());
                    break;
                }
            };
            transcript.push_str(&result.output);

            if !result.success {
                if result.output.contains("externally-managed-environment") {
                    break;
                }
                continue;
            }

            if self.is_importable(top) {
                let outcome = if pip_already_satisfied(&result.output) {
                    InstallOutcome::AlreadySatisfied
                } else {
                    InstallOutcome::Installed
                };
                return InstallAction {
                    module: module.to_string(),
                    strategy: kind,
                    package: Some(candidate),
                    outcome,
                    output: transcript,
                };
            }
            debug!("{} installed but '{}' still does not import", candidate, top);
        }

        InstallAction::failed(module, kind, last_package, transcript)
    }

    fn apt(&self, args: &[&str]) -> Result<CommandResult, String> {
        let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
        let mut options = self.options();
        options
            .env
            .insert("DEBIAN_FRONTEND".to_string(), "noninteractive".to_string());
        execute_quiet(&self.apt_get, &args, &options).map_err(|e| e.to_string())
    }

    fn install_apt(&self, module: &str, package: &str) -> InstallAction {
        info!("apt-get install {}", package);
        let mut transcript = String::new();

        let mut result = self.apt(&["install", "-y", package]);
        if !matches!(&result, Ok(r) if r.success) {
            if let Ok(r) = &result {
                transcript.push_str(&r.output);
            }
            let _ = self.apt(&["update"]);
            result = self.apt(&["install", "-y", package]);
        }

        let result = match result {
            Ok(r) => r,
            Err(e) => {
                transcript.push_str(&e);
                return InstallAction::failed(
                    module,
                    StrategyKind::Apt,
                    Some(package.to_string()),
                    transcript,
                );
            }
        };
        transcript.push_str(&result.output);

        let outcome = if !result.success || !self.is_importable(module) {
            InstallOutcome::Failed
        } else if result.output.contains("is already the newest version") {
            InstallOutcome::AlreadySatisfied
        } else {
            InstallOutcome::Installed
        };

        InstallAction {
            module: module.to_string(),
            strategy: StrategyKind::Apt,
            package: Some(package.to_string()),
            outcome,
            output: transcript,
        }
    }
}

impl PackageInstaller for SystemInstaller {
    fn is_importable(&self, module: &str) -> bool {
        let statement = format!("import {}", top_level(module));
        self.python(&["-c", &statement]).is_some_and(|r| r.success)
    }

    fn install(&self, module: &str, strategy: &Strategy) -> InstallAction {
        match strategy {
            Strategy::Pip => self.install_pip(module, false),
            Strategy::PipBreakSystemPackages => self.install_pip(module, true),
            Strategy::Apt { package } => self.install_apt(module, package),
            Strategy::Unavailable(reason) => InstallAction::failed(
                module,
                StrategyKind::NoneAvailable,
                None,
                reason.to_string(),
            ),
        }
    }
}

// pip prints one "Requirement already satisfied" line per requirement and a
// "Successfully installed" line only when it changed something.
fn pip_already_satisfied(output: &str) -> bool {
    output.contains("Requirement already satisfied") && !output.contains("Successfully installed")
}

//! Configuration schema for revive.
//!
//! Maps to the optional `revive.yml` file. Every field has a default, so an
//! empty file (or no file) is a valid configuration.

use crate::error::{ReviveError, Result};
use crate::install::BreakSystemPackagesPolicy;
use crate::runner::RegexMatcher;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Root configuration structure for revive.yml
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunnerConfig {
    /// Maximum execution attempts per script
    pub max_passes: u32,

    /// Global switch for package installation
    pub allow_auto_install: bool,

    /// Privilege override; unset means detect from the effective uid
    #[serde(skip_serializing_if = "Option::is_none")]
    pub running_elevated: Option<bool>,

    /// Interpreter used to run scripts and pip; empty executes scripts directly
    pub interpreter: String,

    /// When to pass `--break-system-packages` to pip
    pub pip_policy: BreakSystemPackagesPolicy,

    /// Also pre-install modules found in top-level import statements
    pub scan_imports: bool,

    /// Fall back to `python3-<module>` for unmapped apt packages
    pub apt_guess_names: bool,

    /// Extra import-name to Debian package mappings
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub apt_packages: BTreeMap<String, String>,

    /// Extra import-name to PyPI distribution mappings
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub pip_aliases: BTreeMap<String, String>,

    /// Regex whose first capture group names the missing module
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_signature: Option<String>,

    /// Set PYTHONUNBUFFERED for the script
    pub unbuffered: bool,

    /// Environment passed to every script
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            max_passes: default_max_passes(),
            allow_auto_install: true,
            running_elevated: None,
            interpreter: default_interpreter(),
            pip_policy: BreakSystemPackagesPolicy::default(),
            scan_imports: true,
            apt_guess_names: false,
            apt_packages: BTreeMap::new(),
            pip_aliases: BTreeMap::new(),
            failure_signature: None,
            unbuffered: true,
            env: BTreeMap::new(),
        }
    }
}

fn default_max_passes() -> u32 {
    50
}

fn default_interpreter() -> String {
    "python3".to_string()
}

impl RunnerConfig {
    /// The interpreter to launch scripts with, `None` for direct execution.
    pub fn interpreter(&self) -> Option<String> {
        let trimmed = self.interpreter.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    }

    /// Check values serde cannot check.
    pub fn validate(&self) -> Result<()> {
        if self.max_passes < 1 {
            return Err(ReviveError::ConfigValidationError {
                message: "max_passes must be at least 1".to_string(),
            });
        }
        if let Some(signature) = &self.failure_signature {
            RegexMatcher::new(signature)?;
        }
        Ok(())
    }
}

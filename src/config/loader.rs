//! Configuration file discovery, loading and environment overrides.
//!
//! Layers, lowest priority first:
//! 1. Built-in defaults
//! 2. `--config <path>`, else `./revive.yml` when present
//! 3. `RUNNER_*` environment variables
//!
//! Command-line flags are applied on top by the CLI.

use crate::config::schema::RunnerConfig;
use crate::error::{ReviveError, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// File name looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "revive.yml";

pub const ENV_MAX_PASSES: &str = "RUNNER_MAX_PASSES";
pub const ENV_AUTO_INSTALL: &str = "RUNNER_AUTO_INSTALL";
pub const ENV_PIP_POLICY: &str = "RUNNER_PIP_POLICY";
pub const ENV_INTERPRETER: &str = "RUNNER_INTERPRETER";
pub const ENV_ELEVATED: &str = "RUNNER_ELEVATED";

/// Resolve the config file to read, if any.
///
/// An explicit path is returned as-is (and must exist when loaded);
/// otherwise `revive.yml` in `dir` is used when present.
pub fn find_config_file(explicit: Option<&Path>, dir: &Path) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    let candidate = dir.join(DEFAULT_CONFIG_FILE);
    candidate.is_file().then_some(candidate)
}

/// Load a single config file.
///
/// # Errors
///
/// Returns `ConfigNotFound` if the file doesn't exist.
/// Returns `ConfigParseError` if the YAML is invalid.
pub fn load_config_file(path: &Path) -> Result<RunnerConfig> {
    let content = fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ReviveError::ConfigNotFound {
                path: path.to_path_buf(),
            }
        } else {
            ReviveError::Io(e)
        }
    })?;

    parse_config(&content, path)
}

/// Parse YAML content into a `RunnerConfig`.
pub fn parse_config(content: &str, source_path: &Path) -> Result<RunnerConfig> {
    if content.trim().is_empty() {
        return Ok(RunnerConfig::default());
    }
    serde_yaml::from_str(content).map_err(|e| ReviveError::ConfigParseError {
        path: source_path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Load defaults, the config file and process environment overrides.
pub fn load_config(explicit: Option<&Path>, dir: &Path) -> Result<RunnerConfig> {
    let mut config = match find_config_file(explicit, dir) {
        Some(path) => {
            debug!("Loading config from {}", path.display());
            load_config_file(&path)?
        }
        None => RunnerConfig::default(),
    };
    apply_env_overrides(&mut config, |key| std::env::var(key).ok())?;
    Ok(config)
}

/// Apply `RUNNER_*` overrides read through `lookup`.
///
/// Empty values are ignored. A value that doesn't parse is an error.
pub fn apply_env_overrides<F>(config: &mut RunnerConfig, lookup: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(value) = get(ENV_MAX_PASSES) {
        config.max_passes = value.trim().parse().map_err(|_| invalid(ENV_MAX_PASSES, &value))?;
    }
    if let Some(value) = get(ENV_AUTO_INSTALL) {
        config.allow_auto_install =
            parse_bool(&value).ok_or_else(|| invalid(ENV_AUTO_INSTALL, &value))?;
    }
    if let Some(value) = get(ENV_PIP_POLICY) {
        config.pip_policy = value.parse()?;
    }
    if let Some(value) = get(ENV_INTERPRETER) {
        config.interpreter = value.trim().to_string();
    }
    if let Some(value) = get(ENV_ELEVATED) {
        config.running_elevated =
            Some(parse_bool(&value).ok_or_else(|| invalid(ENV_ELEVATED, &value))?);
    }
    Ok(())
}

/// Parse the usual spellings of a boolean switch.
pub fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn invalid(key: &str, value: &str) -> ReviveError {
    ReviveError::ConfigValidationError {
        message: format!("{} has an invalid value '{}'", key, value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::install::BreakSystemPackagesPolicy;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn finds_default_file_in_dir() {
        let temp = TempDir::new().unwrap();
        assert_eq!(find_config_file(None, temp.path()), None);

        fs::write(temp.path().join("revive.yml"), "max_passes: 3\n").unwrap();
        assert_eq!(
            find_config_file(None, temp.path()),
            Some(temp.path().join("revive.yml"))
        );
    }

    #[test]
    fn explicit_path_must_exist() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("nope.yml");
        let err = load_config(Some(&missing), temp.path()).unwrap_err();
        assert!(matches!(err, ReviveError::ConfigNotFound { .. }));
    }

    #[test]
    fn loads_file_values() {
        let temp = TempDir::new().unwrap();
        fs::write(
            temp.path().join("revive.yml"),
            "max_passes: 3\npip_policy: proactive\n",
        )
        .unwrap();

        let config = load_config_file(&temp.path().join("revive.yml")).unwrap();
        assert_eq!(config.max_passes, 3);
        assert_eq!(config.pip_policy, BreakSystemPackagesPolicy::Proactive);
    }

    #[test]
    fn empty_file_is_default() {
        let config = parse_config("\n", Path::new("revive.yml")).unwrap();
        assert_eq!(config, RunnerConfig::default());
    }

    #[test]
    fn parse_error_names_file() {
        let err = parse_config("max_passes: [", Path::new("/etc/revive.yml")).unwrap_err();
        assert!(matches!(err, ReviveError::ConfigParseError { .. }));
        assert!(err.to_string().contains("/etc/revive.yml"));
    }

    #[test]
    fn env_overrides_file() {
        let mut config = RunnerConfig {
            max_passes: 3,
            ..RunnerConfig::default()
        };
        apply_env_overrides(
            &mut config,
            lookup(&[
                ("RUNNER_MAX_PASSES", "10"),
                ("RUNNER_AUTO_INSTALL", "off"),
                ("RUNNER_PIP_POLICY", "Reactive"),
                ("RUNNER_INTERPRETER", "/usr/bin/python3.12"),
                ("RUNNER_ELEVATED", "yes"),
            ]),
        )
        .unwrap();

        assert_eq!(config.max_passes, 10);
        assert!(!config.allow_auto_install);
        assert_eq!(config.pip_policy, BreakSystemPackagesPolicy::Reactive);
        assert_eq!(config.interpreter, "/usr/bin/python3.12");
        assert_eq!(config.running_elevated, Some(true));
    }

    #[test]
    fn empty_env_values_are_ignored() {
        let mut config = RunnerConfig::default();
        apply_env_overrides(&mut config, lookup(&[("RUNNER_MAX_PASSES", "")])).unwrap();
        assert_eq!(config.max_passes, 50);
    }

    #[test]
    fn malformed_env_values_are_errors() {
        let mut config = RunnerConfig::default();
        let err =
            apply_env_overrides(&mut config, lookup(&[("RUNNER_MAX_PASSES", "many")])).unwrap_err();
        assert!(err.to_string().contains("RUNNER_MAX_PASSES"));

        let err =
            apply_env_overrides(&mut config, lookup(&[("RUNNER_AUTO_INSTALL", "maybe")]))
                .unwrap_err();
        assert!(err.to_string().contains("RUNNER_AUTO_INSTALL"));

        assert!(apply_env_overrides(&mut config, lookup(&[("RUNNER_PIP_POLICY", "always")])).is_err());
    }

    #[test]
    fn parse_bool_spellings() {
        for yes in ["1", "true", "TRUE", "yes", "on"] {
            assert_eq!(parse_bool(yes), Some(true), "{}", yes);
        }
        for no in ["0", "false", "No", "off"] {
            assert_eq!(parse_bool(no), Some(false), "{}", no);
        }
        assert_eq!(parse_bool("2"), None);
    }
}

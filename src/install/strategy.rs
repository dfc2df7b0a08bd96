//! Install strategy selection.
//!
//! Decides which package-manager action to take for a missing module, given
//! the host profile and the actions already tried for that module. The
//! selector never touches the system itself.
//!
//! Escalation order for one module:
//!
//! 1. `pip` (or `pip --break-system-packages` when the policy is proactive)
//! 2. `pip --break-system-packages`, only after pip reported the
//!    externally-managed-environment rejection
//! 3. `apt-get install python3-<pkg>`, only when elevated and mapped
//! 4. unavailable

use crate::error::ReviveError;
use crate::install::installer::InstallAction;
use crate::install::registry::AptPackageMap;
use crate::shell::HostProfile;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// When to pass `--break-system-packages` to pip.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BreakSystemPackagesPolicy {
    /// Proactive on Debian-family or externally-managed hosts outside a virtualenv.
    #[default]
    Auto,
    /// Always pass the flag.
    Proactive,
    /// Only after pip rejects the plain invocation.
    Reactive,
}

impl BreakSystemPackagesPolicy {
    /// Whether the first pip attempt should already carry the flag.
    pub fn is_proactive(self, host: &HostProfile) -> bool {
        match self {
            BreakSystemPackagesPolicy::Proactive => true,
            BreakSystemPackagesPolicy::Reactive => false,
            BreakSystemPackagesPolicy::Auto => {
                !host.in_venv && (host.debian_family || host.externally_managed)
            }
        }
    }
}

impl FromStr for BreakSystemPackagesPolicy {
    type Err = ReviveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "proactive" => Ok(Self::Proactive),
            "reactive" => Ok(Self::Reactive),
            other => Err(ReviveError::ConfigValidationError {
                message: format!(
                    "unknown pip policy '{}' (expected auto, proactive or reactive)",
                    other
                ),
            }),
        }
    }
}

impl fmt::Display for BreakSystemPackagesPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BreakSystemPackagesPolicy::Auto => write!(f, "auto"),
            BreakSystemPackagesPolicy::Proactive => write!(f, "proactive"),
            BreakSystemPackagesPolicy::Reactive => write!(f, "reactive"),
        }
    }
}

/// Why no install strategy applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum UnavailableReason {
    /// The global auto-install switch is off.
    AutoInstallDisabled,
    /// pip failed and apt needs root.
    NotElevated,
    /// pip failed and no apt package is known for the module.
    NoPackageMapping,
    /// Every applicable strategy was tried and failed.
    Exhausted,
}

impl fmt::Display for UnavailableReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnavailableReason::AutoInstallDisabled => write!(f, "auto-install disabled"),
            UnavailableReason::NotElevated => write!(f, "pip failed and apt requires root"),
            UnavailableReason::NoPackageMapping => {
                write!(f, "pip failed and no apt package is mapped")
            }
            UnavailableReason::Exhausted => write!(f, "all install strategies failed"),
        }
    }
}

/// The action the installer should take.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Strategy {
    /// `pip install <pkg>`.
    Pip,
    /// `pip install --break-system-packages <pkg>`.
    PipBreakSystemPackages,
    /// `apt-get install -y <package>`.
    Apt { package: String },
    /// Nothing applies; terminal for this module.
    Unavailable(UnavailableReason),
}

impl Strategy {
    /// The serializable tag recorded on install actions.
    pub fn kind(&self) -> StrategyKind {
        match self {
            Strategy::Pip => StrategyKind::Pip,
            Strategy::PipBreakSystemPackages => StrategyKind::PipBreakSystemPackages,
            Strategy::Apt { .. } => StrategyKind::Apt,
            Strategy::Unavailable(_) => StrategyKind::NoneAvailable,
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::Apt { package } => write!(f, "apt ({})", package),
            Strategy::Unavailable(reason) => write!(f, "none available ({})", reason),
            other => write!(f, "{}", other.kind()),
        }
    }
}

/// Strategy tag without payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum StrategyKind {
    Pip,
    PipBreakSystemPackages,
    Apt,
    NoneAvailable,
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StrategyKind::Pip => write!(f, "pip"),
            StrategyKind::PipBreakSystemPackages => write!(f, "pip-break-system-packages"),
            StrategyKind::Apt => write!(f, "apt"),
            StrategyKind::NoneAvailable => write!(f, "none-available"),
        }
    }
}

/// Chooses the next install strategy for a module.
#[derive(Debug, Clone)]
pub struct StrategySelector<'a> {
    host: HostProfile,
    policy: BreakSystemPackagesPolicy,
    allow_auto_install: bool,
    apt_packages: &'a AptPackageMap,
}

impl<'a> StrategySelector<'a> {
    /// Create a selector.
    pub fn new(
        host: HostProfile,
        policy: BreakSystemPackagesPolicy,
        allow_auto_install: bool,
        apt_packages: &'a AptPackageMap,
    ) -> Self {
        Self {
            host,
            policy,
            allow_auto_install,
            apt_packages,
        }
    }

    /// Pick the next strategy for `module`, given the failed actions already
    /// taken for it in this remediation (oldest first).
    pub fn select(&self, module: &str, tried: &[InstallAction]) -> Strategy {
        if !self.allow_auto_install {
            return Strategy::Unavailable(UnavailableReason::AutoInstallDisabled);
        }

        let used = |kind: StrategyKind| tried.iter().any(|a| a.strategy == kind);

        let Some(last) = tried.last() else {
            return if self.policy.is_proactive(&self.host) {
                Strategy::PipBreakSystemPackages
            } else {
                Strategy::Pip
            };
        };

        if last.strategy == StrategyKind::Pip
            && last.rejected_by_os_policy()
            && !used(StrategyKind::PipBreakSystemPackages)
        {
            return Strategy::PipBreakSystemPackages;
        }

        if used(StrategyKind::Apt) {
            return Strategy::Unavailable(UnavailableReason::Exhausted);
        }

        if !self.host.elevated {
            return Strategy::Unavailable(UnavailableReason::NotElevated);
        }

        match self.apt_packages.package_for(module) {
            Some(package) => Strategy::Apt { package },
            None => Strategy::Unavailable(UnavailableReason::NoPackageMapping),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::install::installer::InstallOutcome;

    fn host(elevated: bool, debian_family: bool) -> HostProfile {
        HostProfile {
            elevated,
            debian_family,
            ..Default::default()
        }
    }

    fn failed(kind: StrategyKind, output: &str) -> InstallAction {
        InstallAction {
            module: "bs4".to_string(),
            strategy: kind,
            package: None,
            outcome: InstallOutcome::Failed,
            output: output.to_string(),
        }
    }

    const REJECTION: &str = "error: externally-managed-environment\n\n\
        × This environment is externally managed";

    #[test]
    fn disabled_auto_install_is_unavailable() {
        let map = AptPackageMap::new();
        let selector =
            StrategySelector::new(host(true, true), BreakSystemPackagesPolicy::Auto, false, &map);

        assert_eq!(
            selector.select("bs4", &[]),
            Strategy::Unavailable(UnavailableReason::AutoInstallDisabled)
        );
    }

    #[test]
    fn first_choice_is_plain_pip_when_reactive() {
        let map = AptPackageMap::new();
        let selector = StrategySelector::new(
            host(false, true),
            BreakSystemPackagesPolicy::Reactive,
            true,
            &map,
        );

        assert_eq!(selector.select("bs4", &[]), Strategy::Pip);
    }

    #[test]
    fn auto_policy_is_proactive_on_debian_family() {
        let map = AptPackageMap::new();
        let selector =
            StrategySelector::new(host(false, true), BreakSystemPackagesPolicy::Auto, true, &map);

        assert_eq!(
            selector.select("bs4", &[]),
            Strategy::PipBreakSystemPackages
        );
    }

    #[test]
    fn auto_policy_is_reactive_elsewhere() {
        let map = AptPackageMap::new();
        let selector = StrategySelector::new(
            host(false, false),
            BreakSystemPackagesPolicy::Auto,
            true,
            &map,
        );

        assert_eq!(selector.select("bs4", &[]), Strategy::Pip);
    }

    #[test]
    fn auto_policy_is_reactive_inside_venv() {
        let map = AptPackageMap::new();
        let venv = HostProfile {
            debian_family: true,
            externally_managed: true,
            in_venv: true,
            ..Default::default()
        };
        let selector = StrategySelector::new(venv, BreakSystemPackagesPolicy::Auto, true, &map);

        assert_eq!(selector.select("bs4", &[]), Strategy::Pip);
    }

    #[test]
    fn rejection_escalates_to_break_system_packages() {
        let map = AptPackageMap::new();
        let selector = StrategySelector::new(
            host(false, false),
            BreakSystemPackagesPolicy::Reactive,
            true,
            &map,
        );
        let tried = vec![failed(StrategyKind::Pip, REJECTION)];

        assert_eq!(
            selector.select("bs4", &tried),
            Strategy::PipBreakSystemPackages
        );
    }

    #[test]
    fn plain_pip_failure_skips_break_flag() {
        let map = AptPackageMap::new();
        let selector = StrategySelector::new(
            host(true, false),
            BreakSystemPackagesPolicy::Reactive,
            true,
            &map,
        );
        let tried = vec![failed(
            StrategyKind::Pip,
            "ERROR: No matching distribution found for bs4",
        )];

        assert_eq!(
            selector.select("bs4", &tried),
            Strategy::Apt {
                package: "python3-bs4".to_string()
            }
        );
    }

    #[test]
    fn never_apt_when_not_elevated() {
        let map = AptPackageMap::new().guessing_names(true);
        let selector = StrategySelector::new(
            host(false, true),
            BreakSystemPackagesPolicy::Auto,
            true,
            &map,
        );
        let tried = vec![failed(StrategyKind::PipBreakSystemPackages, "boom")];

        assert_eq!(
            selector.select("bs4", &tried),
            Strategy::Unavailable(UnavailableReason::NotElevated)
        );
    }

    #[test]
    fn elevated_without_mapping_is_unavailable() {
        let map = AptPackageMap::new();
        let selector = StrategySelector::new(
            host(true, false),
            BreakSystemPackagesPolicy::Reactive,
            true,
            &map,
        );
        let tried = vec![failed(StrategyKind::Pip, "no dist")];

        assert_eq!(
            selector.select("torch", &tried),
            Strategy::Unavailable(UnavailableReason::NoPackageMapping)
        );
    }

    #[test]
    fn failed_apt_is_exhausted() {
        let map = AptPackageMap::new();
        let selector =
            StrategySelector::new(host(true, true), BreakSystemPackagesPolicy::Auto, true, &map);
        let tried = vec![
            failed(StrategyKind::PipBreakSystemPackages, "no dist"),
            failed(StrategyKind::Apt, "E: Unable to locate package"),
        ];

        assert_eq!(
            selector.select("bs4", &tried),
            Strategy::Unavailable(UnavailableReason::Exhausted)
        );
    }

    #[test]
    fn break_flag_is_tried_once() {
        let map = AptPackageMap::new();
        let selector = StrategySelector::new(
            host(false, false),
            BreakSystemPackagesPolicy::Reactive,
            true,
            &map,
        );
        let tried = vec![
            failed(StrategyKind::Pip, REJECTION),
            failed(StrategyKind::PipBreakSystemPackages, REJECTION),
        ];

        assert_eq!(
            selector.select("bs4", &tried),
            Strategy::Unavailable(UnavailableReason::NotElevated)
        );
    }

    #[test]
    fn policy_parses_case_insensitively() {
        assert_eq!(
            "Proactive".parse::<BreakSystemPackagesPolicy>().unwrap(),
            BreakSystemPackagesPolicy::Proactive
        );
        assert!("sometimes".parse::<BreakSystemPackagesPolicy>().is_err());
    }

    #[test]
    fn strategy_kind_display_matches_wire_names() {
        assert_eq!(
            Strategy::PipBreakSystemPackages.kind().to_string(),
            "pip-break-system-packages"
        );
        assert_eq!(
            Strategy::Unavailable(UnavailableReason::Exhausted)
                .kind()
                .to_string(),
            "none-available"
        );
    }
}

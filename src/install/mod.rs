//! Missing-module remediation.
//!
//! # Modules
//!
//! - [`registry`] - Import-name to package-name tables
//! - [`strategy`] - Chooses pip, pip with the system override, or apt
//! - [`installer`] - Runs the chosen package-manager action
//! - [`manifest`] - Reads modules a script declares or imports up front

pub mod installer;
pub mod manifest;
pub mod registry;
pub mod strategy;

pub use installer::{InstallAction, InstallOutcome, PackageInstaller, SystemInstaller};
pub use manifest::Requirements;
pub use registry::{top_level, AptPackageMap, PipAliasMap};
pub use strategy::{
    BreakSystemPackagesPolicy, Strategy, StrategyKind, StrategySelector, UnavailableReason,
};

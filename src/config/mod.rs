//! Configuration loading, parsing, and validation for revive.
//!
//! - Schema definition in [`schema`]
//! - File discovery, loading and environment overrides in [`loader`]
//!
//! # Example
//!
//! ```
//! use revive::config::load_config;
//! use tempfile::TempDir;
//! use std::fs;
//!
//! let temp = TempDir::new().unwrap();
//! fs::write(temp.path().join("revive.yml"), "max_passes: 5").unwrap();
//!
//! let config = load_config(None, temp.path()).unwrap();
//! config.validate().unwrap();
//! assert!(config.max_passes >= 1);
//! ```

pub mod loader;
pub mod schema;

pub use loader::{
    apply_env_overrides, find_config_file, load_config, load_config_file, parse_bool,
    parse_config, DEFAULT_CONFIG_FILE,
};
pub use schema::RunnerConfig;

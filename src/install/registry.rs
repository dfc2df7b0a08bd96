//! Module-name to package-name tables.
//!
//! Import names and distribution names drift apart (`yaml` is shipped as
//! `PyYAML` on PyPI and `python3-yaml` on Debian). Both lookups are plain
//! data so new entries never touch control flow.

use std::collections::{BTreeMap, HashMap};

/// The importable top-level package of a dotted module path.
pub fn top_level(module: &str) -> &str {
    module.split('.').next().unwrap_or(module)
}

const DEFAULT_APT_PACKAGES: &[(&str, &str)] = &[
    ("requests", "python3-requests"),
    ("bs4", "python3-bs4"),
    ("beautifulsoup4", "python3-bs4"),
    ("lxml", "python3-lxml"),
    ("yaml", "python3-yaml"),
    ("PyYAML", "python3-yaml"),
    ("dateutil", "python3-dateutil"),
    ("ujson", "python3-ujson"),
];

const DEFAULT_PIP_ALIASES: &[(&str, &str)] = &[
    ("yaml", "PyYAML"),
    ("bs4", "beautifulsoup4"),
    ("PIL", "Pillow"),
    ("cv2", "opencv-python"),
    ("sklearn", "scikit-learn"),
    ("dateutil", "python-dateutil"),
    ("dotenv", "python-dotenv"),
];

/// Maps import names to Debian package names for the apt fallback.
#[derive(Debug, Clone)]
pub struct AptPackageMap {
    packages: HashMap<String, String>,
    guess_names: bool,
}

impl AptPackageMap {
    /// Create a map with the built-in entries.
    pub fn new() -> Self {
        Self {
            packages: DEFAULT_APT_PACKAGES
                .iter()
                .map(|(m, p)| (m.to_string(), p.to_string()))
                .collect(),
            guess_names: false,
        }
    }

    /// Add or replace entries.
    pub fn with_overrides(mut self, overrides: &BTreeMap<String, String>) -> Self {
        self.packages
            .extend(overrides.iter().map(|(m, p)| (m.clone(), p.clone())));
        self
    }

    /// Fall back to `python3-<name>` for modules without an entry.
    pub fn guessing_names(mut self, guess: bool) -> Self {
        self.guess_names = guess;
        self
    }

    /// The apt package providing `module`, if one is known.
    pub fn package_for(&self, module: &str) -> Option<String> {
        let top = top_level(module);
        if let Some(pkg) = self.packages.get(top) {
            return Some(pkg.clone());
        }
        if self.guess_names {
            return Some(format!("python3-{}", top.replace('_', "-").to_lowercase()));
        }
        None
    }
}

impl Default for AptPackageMap {
    fn default() -> Self {
        Self::new()
    }
}

/// Maps import names to PyPI distribution names.
#[derive(Debug, Clone)]
pub struct PipAliasMap {
    aliases: HashMap<String, String>,
}

impl PipAliasMap {
    /// Create a map with the built-in aliases.
    pub fn new() -> Self {
        Self {
            aliases: DEFAULT_PIP_ALIASES
                .iter()
                .map(|(m, p)| (m.to_string(), p.to_string()))
                .collect(),
        }
    }

    /// Add or replace aliases.
    pub fn with_overrides(mut self, overrides: &BTreeMap<String, String>) -> Self {
        self.aliases
            .extend(overrides.iter().map(|(m, p)| (m.clone(), p.clone())));
        self
    }

    /// Distribution names to try for `module`, most likely first.
    ///
    /// The top-level name itself, then a known alias, then the
    /// underscore-to-hyphen spelling.
    pub fn candidates(&self, module: &str) -> Vec<String> {
        let top = top_level(module);
        let mut out = vec![top.to_string()];
        if let Some(alias) = self.aliases.get(top) {
            out.push(alias.clone());
        }
        if top.contains('_') {
            out.push(top.replace('_', "-"));
        }
        let mut seen = std::collections::HashSet::new();
        out.retain(|c| seen.insert(c.clone()));
        out
    }

    /// The import name for `name`, which may be a distribution name.
    ///
    /// `beautifulsoup4` maps back to `bs4`. Names without an alias are
    /// taken to be import names already.
    pub fn import_name(&self, name: &str) -> String {
        self.aliases
            .iter()
            .filter(|(_, dist)| dist.eq_ignore_ascii_case(name))
            .map(|(module, _)| module.clone())
            .min()
            .unwrap_or_else(|| top_level(name).to_string())
    }
}

impl Default for PipAliasMap {
    fn default() -> Self {
        Self::new()
    }
}

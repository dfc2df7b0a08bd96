//! Pre-declared requirements.
//!
//! A script may name its dependencies in its header:
//!
//! ```text
//! #!/usr/bin/env python3
//! # requirements: requests, beautifulsoup4 lxml
//! ```
//!
//! Those modules, plus the top-level imports found in the source, are
//! installed before the first pass so the retry loop has less to do.
//! Names are import names. A distribution name listed in the pip alias
//! table (`beautifulsoup4`, `PyYAML`) is mapped back to its import name
//! before the importability check.

use regex::Regex;
use serde::Serialize;
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::sync::LazyLock;

use crate::error::Result;

/// How many leading lines are searched for the manifest line.
pub const HEADER_LINES: usize = 40;

static RE_MANIFEST: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)requirements\s*:\s*([^\n]+)").unwrap());
static RE_SEPARATOR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[,\s]+").unwrap());
static RE_IMPORT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^[ \t]*import[ \t]+([^#\n;]+)").unwrap());
static RE_FROM_IMPORT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^[ \t]*from[ \t]+([A-Za-z_][\w.]*)[ \t]+import\b").unwrap());

// Standard-library modules never worth a pip call.
const STDLIB: &[&str] = &[
    "__future__", "abc", "argparse", "ast", "asyncio", "base64", "bisect", "calendar",
    "collections", "concurrent", "configparser", "contextlib", "copy", "csv", "ctypes",
    "dataclasses", "datetime", "decimal", "email", "enum", "fractions", "functools", "getpass",
    "glob", "gzip", "hashlib", "heapq", "html", "http", "importlib", "inspect", "io",
    "itertools", "json", "locale", "logging", "math", "multiprocessing", "operator", "os",
    "pathlib", "pickle", "platform", "pprint", "queue", "random", "re", "runpy", "secrets",
    "select", "shlex", "shutil", "signal", "smtplib", "socket", "sqlite3", "ssl", "statistics",
    "string", "struct", "subprocess", "sys", "tempfile", "textwrap", "threading", "time",
    "traceback", "typing", "unittest", "urllib", "uuid", "warnings", "xml", "zipfile",
];

/// Modules a script declares or imports.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Requirements {
    /// From the `requirements:` header line.
    pub declared: Vec<String>,
    /// Third-party top-level imports found in the source.
    pub scanned: Vec<String>,
}

impl Requirements {
    /// Read and parse `path`. The import scan runs only when `scan_imports` is set.
    pub fn load(path: &Path, scan_imports: bool) -> Result<Self> {
        let source = fs::read_to_string(path)?;
        Ok(Self::parse(&source, scan_imports))
    }

    /// Parse script source text.
    pub fn parse(source: &str, scan_imports: bool) -> Self {
        Self {
            declared: parse_requirements_header(source),
            scanned: if scan_imports {
                scan_imports_in(source)
            } else {
                Vec::new()
            },
        }
    }

    /// Declared modules first, then scanned ones, without duplicates.
    pub fn all(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.declared
            .iter()
            .chain(&self.scanned)
            .filter(|m| seen.insert(m.as_str()))
            .cloned()
            .collect()
    }

    /// Whether nothing was declared or scanned.
    pub fn is_empty(&self) -> bool {
        self.declared.is_empty() && self.scanned.is_empty()
    }
}

/// Module names from the first `requirements:` line in the script header.
pub fn parse_requirements_header(source: &str) -> Vec<String> {
    let head: String = source
        .lines()
        .take(HEADER_LINES)
        .collect::<Vec<_>>()
        .join("\n");

    let Some(caps) = RE_MANIFEST.captures(&head) else {
        return Vec::new();
    };

    RE_SEPARATOR
        .split(caps[1].trim())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Third-party top-level module names imported anywhere in `source`.
pub fn scan_imports_in(source: &str) -> Vec<String> {
    let mut names = Vec::new();

    for caps in RE_IMPORT.captures_iter(source) {
        for clause in caps[1].split(',') {
            if let Some(name) = clause.split_whitespace().next() {
                names.push(name.to_string());
            }
        }
    }
    for caps in RE_FROM_IMPORT.captures_iter(source) {
        names.push(caps[1].to_string());
    }

    let mut seen = HashSet::new();
    names
        .iter()
        .filter_map(|n| n.split('.').next())
        .filter(|n| is_identifier(n) && !STDLIB.contains(n))
        .filter(|n| seen.insert(n.to_string()))
        .map(String::from)
        .collect()
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn header_line_is_parsed() {
        let src = "#!/usr/bin/env python3\n# requirements: requests, bs4 lxml\nprint('hi')\n";
        assert_eq!(
            parse_requirements_header(src),
            vec!["requests", "bs4", "lxml"]
        );
    }

    #[test]
    fn header_is_case_insensitive() {
        let src = "# Requirements:   yaml,dateutil\n";
        assert_eq!(parse_requirements_header(src), vec!["yaml", "dateutil"]);
    }

    #[test]
    fn header_beyond_leading_block_is_ignored() {
        let mut src = "print('x')\n".repeat(HEADER_LINES);
        src.push_str("# requirements: requests\n");
        assert!(parse_requirements_header(&src).is_empty());
    }

    #[test]
    fn no_header_yields_nothing() {
        assert!(parse_requirements_header("import os\n").is_empty());
    }

    #[test]
    fn imports_are_scanned_without_stdlib() {
        let src = "import os, sys\nimport requests\nfrom bs4 import BeautifulSoup\n\
                   from collections import deque\nimport numpy as np\n";
        assert_eq!(scan_imports_in(src), vec!["requests", "numpy", "bs4"]);
    }

    #[test]
    fn dotted_and_relative_imports() {
        let src = "import google.cloud.storage\nfrom . import sibling\nfrom .pkg import x\n";
        assert_eq!(scan_imports_in(src), vec!["google"]);
    }

    #[test]
    fn indented_imports_are_found() {
        let src = "def main():\n    import yaml  # lazy\n    return yaml\n";
        assert_eq!(scan_imports_in(src), vec!["yaml"]);
    }

    #[test]
    fn all_dedups_declared_and_scanned() {
        let src = "# requirements: requests\nimport requests\nimport lxml\n";
        let reqs = Requirements::parse(src, true);
        assert_eq!(reqs.all(), vec!["requests", "lxml"]);
    }

    #[test]
    fn scan_can_be_disabled() {
        let reqs = Requirements::parse("import lxml\n", false);
        assert!(reqs.is_empty());
    }

    #[test]
    fn load_reads_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("job.py");
        fs::write(&path, "# requirements: ujson\nimport ujson\n").unwrap();

        let reqs = Requirements::load(&path, true).unwrap();

        assert_eq!(reqs.declared, vec!["ujson"]);
        assert_eq!(reqs.all(), vec!["ujson"]);
    }

    #[test]
    fn load_missing_file_errors() {
        assert!(Requirements::load(Path::new("/nonexistent/job.py"), true).is_err());
    }
}

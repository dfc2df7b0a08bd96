//! Failure signature matching.
//!
//! A failed attempt's combined output is scanned for the interpreter's
//! "module not found" signature. Matching is exact on the signature format;
//! anything else (syntax errors, runtime exceptions, permission problems) is
//! left unclassified so the controller can stop.
//!
//! [`FailureMatcher`] is the seam for other interpreters: a matcher only has
//! to turn output text into a module name.

use crate::error::{ReviveError, Result};
use regex::Regex;
use std::sync::LazyLock;

/// Extracts a missing module name from failed-run output.
pub trait FailureMatcher: Send + Sync {
    /// Matcher name (for logs).
    fn name(&self) -> &str;

    /// The missing module named by `output`, if the failure is a missing import.
    fn missing_module(&self, output: &str) -> Option<String>;
}

macro_rules! lazy_regex {
    ($name:ident, $pattern:expr) => {
        static $name: LazyLock<Regex> = LazyLock::new(|| Regex::new($pattern).unwrap());
    };
}

// Emitted for both ModuleNotFoundError and ImportError.
lazy_regex!(RE_PY_NO_MODULE, r"No module named '([^']+)'");

/// Matches CPython's `No module named '<name>'` signature.
#[derive(Debug, Default, Clone, Copy)]
pub struct PythonModuleMatcher;

impl FailureMatcher for PythonModuleMatcher {
    fn name(&self) -> &str {
        "python_no_module"
    }

    fn missing_module(&self, output: &str) -> Option<String> {
        last_capture(&RE_PY_NO_MODULE, output)
    }
}

/// A user-supplied signature whose first capture group is the module name.
#[derive(Debug, Clone)]
pub struct RegexMatcher {
    regex: Regex,
}

impl RegexMatcher {
    /// Compile `pattern`. It must contain at least one capture group.
    pub fn new(pattern: &str) -> Result<Self> {
        let regex = Regex::new(pattern).map_err(|e| ReviveError::ConfigValidationError {
            message: format!("failure_signature does not compile: {}", e),
        })?;
        if regex.captures_len() < 2 {
            return Err(ReviveError::ConfigValidationError {
                message: "failure_signature needs a capture group for the module name"
                    .to_string(),
            });
        }
        Ok(Self { regex })
    }
}

impl FailureMatcher for RegexMatcher {
    fn name(&self) -> &str {
        self.regex.as_str()
    }

    fn missing_module(&self, output: &str) -> Option<String> {
        last_capture(&self.regex, output)
    }
}

// The last signature in the output is the one that ended the process;
// earlier ones may come from optional imports the script caught.
fn last_capture(regex: &Regex, output: &str) -> Option<String> {
    regex
        .captures_iter(output)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|name| !name.is_empty())
        .last()
}

/// Build the matcher for an optional configured signature.
pub fn matcher_for(signature: Option<&str>) -> Result<Box<dyn FailureMatcher>> {
    match signature {
        Some(pattern) => Ok(Box::new(RegexMatcher::new(pattern)?)),
        None => Ok(Box::new(PythonModuleMatcher)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRACEBACK: &str = "Traceback (most recent call last):\n  \
        File \"/srv/scripts/scrape.py\", line 3, in <module>\n    \
        import requests\n\
        ModuleNotFoundError: No module named 'requests'\n";

    #[test]
    fn python_matcher_extracts_module() {
        assert_eq!(
            PythonModuleMatcher.missing_module(TRACEBACK),
            Some("requests".to_string())
        );
    }

    #[test]
    fn python_matcher_handles_import_error_wording() {
        let out = "ImportError: No module named 'yaml'";
        assert_eq!(
            PythonModuleMatcher.missing_module(out),
            Some("yaml".to_string())
        );
    }

    #[test]
    fn dotted_name_reported_as_written() {
        let out = "ModuleNotFoundError: No module named 'google.cloud'";
        assert_eq!(
            PythonModuleMatcher.missing_module(out),
            Some("google.cloud".to_string())
        );
    }

    #[test]
    fn last_signature_wins() {
        let out = "warning: No module named 'ujson', falling back\n\
                   ModuleNotFoundError: No module named 'lxml'\n";
        assert_eq!(
            PythonModuleMatcher.missing_module(out),
            Some("lxml".to_string())
        );
    }

    #[test]
    fn unrelated_failure_is_unclassified() {
        let out = "Traceback (most recent call last):\nZeroDivisionError: division by zero\n";
        assert!(PythonModuleMatcher.missing_module(out).is_none());
    }

    #[test]
    fn loose_wording_does_not_match() {
        // Exact signature only: no quotes means no match.
        let out = "error: no module named requests";
        assert!(PythonModuleMatcher.missing_module(out).is_none());
    }

    #[test]
    fn regex_matcher_uses_first_group() {
        let matcher = RegexMatcher::new(r"Cannot find module '([^']+)'").unwrap();
        let out = "Error: Cannot find module 'left-pad'";
        assert_eq!(matcher.missing_module(out), Some("left-pad".to_string()));
    }

    #[test]
    fn regex_matcher_requires_capture_group() {
        let err = RegexMatcher::new(r"Cannot find module").unwrap_err();
        assert!(err.to_string().contains("capture group"));
    }

    #[test]
    fn regex_matcher_rejects_invalid_pattern() {
        assert!(RegexMatcher::new(r"No module named '(").is_err());
    }

    #[test]
    fn matcher_for_defaults_to_python() {
        let matcher = matcher_for(None).unwrap();
        assert_eq!(matcher.name(), "python_no_module");
    }
}

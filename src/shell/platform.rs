//! Host detection: privilege level and Python packaging policy.

use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Facts about the host that drive install strategy selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct HostProfile {
    /// Running as root (enables apt).
    pub elevated: bool,
    /// Debian, Ubuntu or a derivative (per `/etc/os-release`).
    pub debian_family: bool,
    /// An `EXTERNALLY-MANAGED` marker guards the system interpreter.
    pub externally_managed: bool,
    /// A virtualenv is active, so pip never needs the system override.
    pub in_venv: bool,
}

impl HostProfile {
    /// Probe the current host. `elevated` overrides privilege detection.
    pub fn detect(elevated: Option<bool>) -> Self {
        let os_release = fs::read_to_string("/etc/os-release").unwrap_or_default();
        Self {
            elevated: elevated.unwrap_or_else(is_elevated),
            debian_family: is_debian_family(&os_release)
                || Path::new("/etc/debian_version").exists(),
            externally_managed: has_externally_managed_marker(&marker_candidates(Path::new(
                "/usr/lib",
            ))),
            in_venv: std::env::var_os("VIRTUAL_ENV").is_some(),
        }
    }
}

/// Check if running as root/admin.
pub fn is_elevated() -> bool {
    #[cfg(unix)]
    {
        // SAFETY: geteuid() is a simple syscall that returns the effective user ID
        unsafe { libc::geteuid() == 0 }
    }

    #[cfg(windows)]
    {
        std::env::var("ADMIN").is_ok()
    }

    #[cfg(not(any(unix, windows)))]
    {
        false
    }
}

/// Whether an `/etc/os-release` body names a Debian-family distribution.
pub fn is_debian_family(os_release: &str) -> bool {
    os_release
        .lines()
        .filter_map(|line| {
            line.strip_prefix("ID=")
                .or_else(|| line.strip_prefix("ID_LIKE="))
        })
        .flat_map(|value| value.trim_matches('"').split_whitespace())
        .any(|id| matches!(id, "debian" | "ubuntu"))
}

// `<lib_root>/python3*/EXTERNALLY-MANAGED`, plus the dist-packages locations
// Debian uses for the system interpreter.
fn marker_candidates(lib_root: &Path) -> Vec<PathBuf> {
    let mut candidates = vec![
        PathBuf::from("/usr/lib/python3/dist-packages/EXTERNALLY-MANAGED"),
        PathBuf::from("/usr/local/lib/python3/dist-packages/EXTERNALLY-MANAGED"),
    ];
    if let Ok(entries) = fs::read_dir(lib_root) {
        for entry in entries.flatten() {
            if entry.file_name().to_string_lossy().starts_with("python3") {
                candidates.push(entry.path().join("EXTERNALLY-MANAGED"));
            }
        }
    }
    candidates
}

fn has_externally_managed_marker(candidates: &[PathBuf]) -> bool {
    candidates.iter().any(|p| p.is_file())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn debian_id_detected() {
        assert!(is_debian_family("NAME=\"Debian GNU/Linux\"\nID=debian\n"));
    }

    #[test]
    fn ubuntu_via_id_like_detected() {
        let body = "ID=linuxmint\nID_LIKE=\"ubuntu debian\"\n";
        assert!(is_debian_family(body));
    }

    #[test]
    fn fedora_is_not_debian_family() {
        assert!(!is_debian_family("ID=fedora\nVERSION_ID=40\n"));
    }

    #[test]
    fn empty_os_release_is_not_debian_family() {
        assert!(!is_debian_family(""));
    }

    #[test]
    fn marker_found_under_versioned_lib_dir() {
        let temp = TempDir::new().unwrap();
        let lib = temp.path().join("python3.12");
        fs::create_dir_all(&lib).unwrap();
        fs::write(lib.join("EXTERNALLY-MANAGED"), "[externally-managed]\n").unwrap();

        let candidates = marker_candidates(temp.path());

        assert!(has_externally_managed_marker(&candidates));
    }

    #[test]
    fn no_marker_when_dirs_are_clean() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("python3.11")).unwrap();

        let candidates: Vec<PathBuf> = marker_candidates(temp.path())
            .into_iter()
            .filter(|p| p.starts_with(temp.path()))
            .collect();

        assert!(!has_externally_managed_marker(&candidates));
    }

    #[test]
    fn elevated_override_wins() {
        assert!(HostProfile::detect(Some(true)).elevated);
        assert!(!HostProfile::detect(Some(false)).elevated);
    }
}

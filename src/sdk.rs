//! Platform-dependent discovery of installed runtime image directories.
//!
//! The runtime ships as a shared-library image inside versioned directories under a small
//! set of well-known installation roots (`.../dotnet/shared/Microsoft.NETCore.App/<version>`).
//! This module enumerates those version directories for a given platform so the host can
//! pick the first one that exists on disk.
//!
//! Discovery is best-effort: roots that do not exist or cannot be read are skipped
//! silently, and an unrecognized platform identity yields an empty sequence rather than
//! an error. Candidate order is deterministic per platform - roots are probed in a fixed
//! order, and within a root the entries follow filesystem enumeration order.
//!
//! # Examples
//!
//! ```rust,no_run
//! use clrhost::sdk;
//!
//! for candidate in sdk::locate(std::env::consts::OS) {
//!     println!("runtime image candidate: {}", candidate.display());
//! }
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use strum::{Display, EnumIter, EnumString};

/// Placeholder in installation roots that expands to the current user's home directory.
const HOME_PLACEHOLDER: &str = "$HOME";

const LINUX_SDK_ROOTS: &[&str] = &[
    "/usr/share/dotnet/shared/Microsoft.NETCore.App",
    "$HOME/.dotnet/shared/Microsoft.NETCore.App",
];

const DARWIN_SDK_ROOTS: &[&str] = &[
    "/usr/local/share/dotnet/shared/Microsoft.NETCore.App",
    "$HOME/.dotnet/shared/Microsoft.NETCore.App",
];

const WINDOWS_SDK_ROOTS: &[&str] = &["C:\\Program Files\\dotnet\\shared\\Microsoft.NETCore.App"];

/// Operating system identity used to select runtime installation roots.
///
/// The set is closed; platform names outside it are not an error, they simply have no
/// known installation roots (see [`locate`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumIter, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum Platform {
    /// Linux-like systems.
    Linux,
    /// macOS / Darwin-like systems.
    #[strum(serialize = "darwin", serialize = "macos")]
    Darwin,
    /// Windows-like systems.
    Windows,
}

impl Platform {
    /// Returns the platform the current process is running on, if recognized.
    #[must_use]
    pub fn current() -> Option<Self> {
        Self::from_str(std::env::consts::OS).ok()
    }

    /// The fixed, ordered list of installation roots probed on this platform.
    ///
    /// Entries may contain a `$HOME` placeholder which [`locate`] expands before
    /// probing.
    #[must_use]
    pub fn sdk_roots(self) -> &'static [&'static str] {
        match self {
            Platform::Linux => LINUX_SDK_ROOTS,
            Platform::Darwin => DARWIN_SDK_ROOTS,
            Platform::Windows => WINDOWS_SDK_ROOTS,
        }
    }
}

/// Enumerates candidate runtime image directories for the named platform.
///
/// Each installation root is expanded (`$HOME` substituted with the current user's
/// home directory, empty if undeterminable) and its immediate subdirectories -
/// typically one per installed runtime version - are yielded in filesystem
/// enumeration order. Unreadable or missing roots are skipped.
///
/// An `os` value outside the recognized set ([`Platform`]) yields an empty sequence.
/// The returned iterator is lazy and finite; call `locate` again to restart it.
pub fn locate(os: &str) -> impl Iterator<Item = PathBuf> {
    let roots: &'static [&'static str] = Platform::from_str(os)
        .map(Platform::sdk_roots)
        .unwrap_or(&[]);

    roots
        .iter()
        .flat_map(|root| list_version_dirs(&expand_home(root)))
}

/// Enumerates candidate runtime image directories for the current platform.
pub fn locate_current() -> impl Iterator<Item = PathBuf> {
    locate(std::env::consts::OS)
}

/// Substitutes the home-directory placeholder in an installation root.
///
/// An undeterminable home directory expands to the empty string; the resulting path
/// simply fails the downstream existence probe.
fn expand_home(root: &str) -> PathBuf {
    if let Some(rest) = root.strip_prefix(HOME_PLACEHOLDER) {
        let home = home_dir().unwrap_or_default();
        let mut expanded = home;
        expanded.push_str(rest);
        PathBuf::from(expanded)
    } else {
        PathBuf::from(root)
    }
}

#[cfg(windows)]
fn home_dir() -> Option<String> {
    std::env::var("USERPROFILE").ok()
}

#[cfg(not(windows))]
fn home_dir() -> Option<String> {
    std::env::var("HOME").ok()
}

/// Lists the immediate subdirectories of `base`, skipping unreadable entries.
fn list_version_dirs(base: &Path) -> std::vec::IntoIter<PathBuf> {
    let mut dirs = Vec::new();

    if let Ok(entries) = fs::read_dir(base) {
        for entry in entries.flatten() {
            if entry.file_type().map(|t| t.is_dir()).unwrap_or(false) {
                dirs.push(entry.path());
            }
        }
    }

    dirs.into_iter()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unrecognized_platform_yields_empty() {
        assert_eq!(locate("plan9").count(), 0);
        assert_eq!(locate("").count(), 0);
        assert_eq!(locate("LINUX OS").count(), 0);
    }

    #[test]
    fn test_platform_from_str() {
        assert_eq!(Platform::from_str("linux"), Ok(Platform::Linux));
        assert_eq!(Platform::from_str("darwin"), Ok(Platform::Darwin));
        assert_eq!(Platform::from_str("macos"), Ok(Platform::Darwin));
        assert_eq!(Platform::from_str("windows"), Ok(Platform::Windows));
        assert!(Platform::from_str("freebsd").is_err());
        assert_eq!(Platform::Linux.to_string(), "linux");
    }

    #[test]
    fn test_every_platform_has_installation_roots() {
        use strum::IntoEnumIterator;

        for platform in Platform::iter() {
            assert!(!platform.sdk_roots().is_empty());
        }
    }

    #[test]
    fn test_sdk_roots_are_fixed_and_ordered() {
        let roots = Platform::Linux.sdk_roots();
        assert_eq!(roots[0], "/usr/share/dotnet/shared/Microsoft.NETCore.App");
        assert_eq!(roots[1], "$HOME/.dotnet/shared/Microsoft.NETCore.App");
    }

    #[test]
    fn test_expand_home_substitutes_placeholder() {
        let expanded = expand_home("$HOME/.dotnet/shared/Microsoft.NETCore.App");
        assert!(!expanded.to_string_lossy().contains("$HOME"));
    }

    #[test]
    fn test_expand_home_leaves_absolute_roots_alone() {
        let expanded = expand_home("/usr/share/dotnet/shared/Microsoft.NETCore.App");
        assert_eq!(
            expanded,
            PathBuf::from("/usr/share/dotnet/shared/Microsoft.NETCore.App")
        );
    }

    #[test]
    fn test_locate_lists_version_dirs_in_root_order() {
        let base = tempfile::tempdir().unwrap();
        std::fs::create_dir(base.path().join("8.0.1")).unwrap();
        std::fs::create_dir(base.path().join("9.0.0")).unwrap();
        std::fs::write(base.path().join("not-a-dir"), b"x").unwrap();

        let dirs: Vec<_> = list_version_dirs(base.path()).collect();
        assert_eq!(dirs.len(), 2);
        assert!(dirs.iter().all(|d| d.is_dir()));
    }

    #[test]
    fn test_missing_root_is_skipped_silently() {
        let dirs: Vec<_> = list_version_dirs(Path::new("/nonexistent/clrhost-test")).collect();
        assert!(dirs.is_empty());
    }

    #[test]
    fn test_locate_is_restartable() {
        // Two calls over the same platform produce the same sequence.
        let first: Vec<_> = locate("linux").collect();
        let second: Vec<_> = locate("linux").collect();
        assert_eq!(first, second);
    }
}

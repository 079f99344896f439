//! External converter discovery.
//!
//! [`ConverterLocator`] resolves the ffmpeg executable in a fixed order: an
//! explicit override, then a short list of platform install locations, then
//! a `PATH` search via [`which`]. Failing all three yields
//! [`mkvconv_core::Error::MissingDependency`] carrying an install hint.

use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Name of the converter executable.
pub const CONVERTER: &str = "ffmpeg";

/// Install locations checked before searching `PATH`, in order.
#[cfg(target_os = "macos")]
pub const WELL_KNOWN_LOCATIONS: &[&str] = &["/opt/homebrew/bin/ffmpeg", "/usr/local/bin/ffmpeg"];

#[cfg(target_os = "windows")]
pub const WELL_KNOWN_LOCATIONS: &[&str] = &[
    r"C:\ffmpeg\bin\ffmpeg.exe",
    r"C:\Program Files\ffmpeg\bin\ffmpeg.exe",
];

#[cfg(not(any(target_os = "macos", target_os = "windows")))]
pub const WELL_KNOWN_LOCATIONS: &[&str] = &[
    "/usr/bin/ffmpeg",
    "/usr/local/bin/ffmpeg",
    "/snap/bin/ffmpeg",
];

/// Human-readable install instructions for the current platform.
pub fn install_hint() -> &'static str {
    if cfg!(target_os = "macos") {
        "Install it with Homebrew: brew install ffmpeg"
    } else if cfg!(target_os = "windows") {
        "Download it from https://ffmpeg.org/download.html and add its bin directory to PATH"
    } else {
        "Install it with your package manager, e.g. sudo apt install ffmpeg"
    }
}

/// Where a converter path came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscoverySource {
    Override,
    WellKnown,
    SearchPath,
}

impl fmt::Display for DiscoverySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DiscoverySource::Override => "configured path",
            DiscoverySource::WellKnown => "well-known location",
            DiscoverySource::SearchPath => "PATH",
        };
        f.write_str(s)
    }
}

/// A resolved converter executable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Converter {
    pub path: PathBuf,
    pub source: DiscoverySource,
}

/// Availability information for the converter, returned by
/// [`ConverterLocator::check`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInfo {
    /// Tool name.
    pub name: String,
    /// Whether the tool was found.
    pub available: bool,
    /// Version string (first line of `-version` output), if available.
    pub version: Option<String>,
    /// Resolved path to the executable.
    pub path: Option<PathBuf>,
    /// How the path was found.
    pub source: Option<DiscoverySource>,
}

/// Ordered discovery strategy for the converter executable.
#[derive(Debug, Clone)]
pub struct ConverterLocator {
    override_path: Option<PathBuf>,
    candidates: Vec<PathBuf>,
    search_path: Option<OsString>,
}

impl Default for ConverterLocator {
    fn default() -> Self {
        Self::new()
    }
}

impl ConverterLocator {
    /// Locator using the platform's well-known locations and the process
    /// `PATH`.
    pub fn new() -> Self {
        Self {
            override_path: None,
            candidates: WELL_KNOWN_LOCATIONS.iter().map(PathBuf::from).collect(),
            search_path: None,
        }
    }

    /// Prefer `path` when it exists. A missing override falls through to the
    /// remaining strategies.
    pub fn with_override(mut self, path: Option<PathBuf>) -> Self {
        self.override_path = path;
        self
    }

    /// Replace the well-known locations.
    pub fn with_candidates(mut self, candidates: Vec<PathBuf>) -> Self {
        self.candidates = candidates;
        self
    }

    /// Search this `PATH`-style list instead of the process environment.
    pub fn with_search_path(mut self, paths: impl Into<OsString>) -> Self {
        self.search_path = Some(paths.into());
        self
    }

    /// Resolve the converter.
    ///
    /// # Errors
    ///
    /// Returns [`mkvconv_core::Error::MissingDependency`] when no strategy
    /// finds an executable.
    pub fn locate(&self) -> mkvconv_core::Result<Converter> {
        if let Some(ref path) = self.override_path {
            if is_executable_file(path) {
                return Ok(Converter {
                    path: path.clone(),
                    source: DiscoverySource::Override,
                });
            }
            tracing::warn!(
                "Configured ffmpeg path {} is not an executable file; falling back to discovery",
                path.display()
            );
        }

        if let Some(path) = self.candidates.iter().find(|p| is_executable_file(p)) {
            return Ok(Converter {
                path: path.clone(),
                source: DiscoverySource::WellKnown,
            });
        }

        let found = match self.search_path {
            Some(ref paths) => {
                let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
                which::which_in(CONVERTER, Some(paths), cwd)
            }
            None => which::which(CONVERTER),
        };

        match found {
            Ok(path) => Ok(Converter {
                path,
                source: DiscoverySource::SearchPath,
            }),
            Err(e) => {
                tracing::debug!("PATH search for {CONVERTER} failed: {e}");
                Err(mkvconv_core::Error::missing_dependency(
                    CONVERTER,
                    install_hint(),
                ))
            }
        }
    }

    /// Resolve the converter and report its version.
    pub fn check(&self) -> ToolInfo {
        match self.locate() {
            Ok(converter) => ToolInfo {
                name: CONVERTER.to_string(),
                available: true,
                version: detect_version(&converter.path),
                path: Some(converter.path),
                source: Some(converter.source),
            },
            Err(_) => ToolInfo {
                name: CONVERTER.to_string(),
                available: false,
                version: None,
                path: None,
                source: None,
            },
        }
    }
}

/// Whether `path` is a regular file the current user could execute.
#[cfg(unix)]
fn is_executable_file(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;

    std::fs::metadata(path)
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable_file(path: &Path) -> bool {
    path.is_file()
}

/// Run `<tool> -version` and return the first line of stdout.
fn detect_version(path: &Path) -> Option<String> {
    let output = std::process::Command::new(path)
        .arg("-version")
        .output()
        .ok()?;

    if !output.status.success() {
        return None;
    }

    String::from_utf8_lossy(&output.stdout)
        .lines()
        .next()
        .map(|s| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn fake_tool(dir: &TempDir, name: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, b"#!/bin/sh\n").unwrap();
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        }
        path
    }

    fn isolated(dir: &TempDir) -> ConverterLocator {
        ConverterLocator::new()
            .with_candidates(Vec::new())
            .with_search_path(dir.path().join("empty-bin").into_os_string())
    }

    #[test]
    fn override_wins_when_present() {
        let dir = TempDir::new().unwrap();
        let custom = fake_tool(&dir, "my-ffmpeg");
        let candidate = fake_tool(&dir, "other-ffmpeg");

        let found = isolated(&dir)
            .with_candidates(vec![candidate])
            .with_override(Some(custom.clone()))
            .locate()
            .unwrap();

        assert_eq!(found.path, custom);
        assert_eq!(found.source, DiscoverySource::Override);
    }

    #[test]
    fn missing_override_falls_back_to_candidates_in_order() {
        let dir = TempDir::new().unwrap();
        let second = fake_tool(&dir, "second");

        let found = isolated(&dir)
            .with_override(Some(dir.path().join("missing")))
            .with_candidates(vec![dir.path().join("first"), second.clone()])
            .locate()
            .unwrap();

        assert_eq!(found.path, second);
        assert_eq!(found.source, DiscoverySource::WellKnown);
    }

    #[cfg(unix)]
    #[test]
    fn non_executable_files_are_skipped() {
        let dir = TempDir::new().unwrap();
        let plain = dir.path().join("plain-ffmpeg");
        std::fs::write(&plain, b"not a program").unwrap();
        let runnable = fake_tool(&dir, "runnable-ffmpeg");

        let found = isolated(&dir)
            .with_override(Some(plain.clone()))
            .with_candidates(vec![plain, runnable.clone()])
            .locate()
            .unwrap();

        assert_eq!(found.path, runnable);
        assert_eq!(found.source, DiscoverySource::WellKnown);
    }

    #[cfg(unix)]
    #[test]
    fn search_path_is_last_resort() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let bin = dir.path().join("bin");
        std::fs::create_dir(&bin).unwrap();
        let exe = bin.join(CONVERTER);
        std::fs::write(&exe, b"#!/bin/sh\n").unwrap();
        std::fs::set_permissions(&exe, std::fs::Permissions::from_mode(0o755)).unwrap();

        let found = ConverterLocator::new()
            .with_candidates(Vec::new())
            .with_search_path(bin.clone().into_os_string())
            .locate()
            .unwrap();

        assert_eq!(found.path, exe);
        assert_eq!(found.source, DiscoverySource::SearchPath);
    }

    #[test]
    fn not_found_carries_install_hint() {
        let dir = TempDir::new().unwrap();
        let err = isolated(&dir).locate().unwrap_err();
        match err {
            mkvconv_core::Error::MissingDependency { tool, hint } => {
                assert_eq!(tool, "ffmpeg");
                assert_eq!(hint, install_hint());
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn check_reports_unavailable() {
        let dir = TempDir::new().unwrap();
        let info = isolated(&dir).check();
        assert!(!info.available);
        assert!(info.version.is_none());
        assert!(info.path.is_none());
    }
}

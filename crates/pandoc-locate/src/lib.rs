//! # pandoc-locate
//!
//! Resolve the [pandoc](https://pandoc.org) executable before a conversion
//! starts, so that a missing or outdated install is reported up front instead
//! of surfacing as a cryptic spawn failure halfway through a pipeline.
//!
//! ## How it works
//!
//! On a call to [`locate_pandoc`]:
//!
//! 1. A requested value containing a path separator is treated as a path and
//!    must name an existing file.
//! 2. A bare name (`pandoc`) is searched on `PATH`.
//! 3. When the caller asks for the default name, `PANDOC_PATH` takes
//!    precedence if it is set.
//!
//! [`pandoc_version`] then runs `pandoc --version` and parses the first
//! line, and [`ensure_lua_filter_support`] rejects versions older than 2.0,
//! which predate `--lua-filter`.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use pandoc_locate::{ensure_lua_filter_support, locate_pandoc, pandoc_version};
//!
//! let path = locate_pandoc("pandoc").expect("pandoc not installed");
//! let version = pandoc_version(&path).expect("pandoc --version failed");
//! ensure_lua_filter_support(&version).expect("pandoc too old");
//! println!("using pandoc {version} at {}", path.display());
//! ```
//!
//! ## Environment variable overrides
//!
//! - `PANDOC_PATH`: path to a pandoc executable; used when the requested
//!   name is the default `pandoc`.

use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;

use thiserror::Error;

// ── Public constants ─────────────────────────────────────────────────────────

/// Executable name looked up on `PATH` when nothing else is configured.
pub const DEFAULT_PANDOC: &str = "pandoc";

/// Environment variable that overrides the default executable.
pub const PANDOC_PATH_ENV: &str = "PANDOC_PATH";

/// First pandoc release that accepts `--lua-filter`.
pub const MIN_LUA_FILTER_VERSION: PandocVersion = PandocVersion {
    major: 2,
    minor: 0,
    patch: 0,
};

// ── Error type ───────────────────────────────────────────────────────────────

/// Errors returned by pandoc-locate operations.
#[derive(Error, Debug)]
pub enum LocateError {
    /// The requested name is empty.
    #[error("No pandoc executable was configured")]
    Empty,

    /// An explicit path was given but nothing exists there.
    #[error("Pandoc not found at '{path}'")]
    MissingPath { path: PathBuf },

    /// A bare name could not be found on `PATH`.
    #[error("Pandoc '{name}' not found on PATH: {reason}")]
    NotOnPath { name: String, reason: String },

    /// `pandoc --version` could not be run.
    #[error("Failed to run '{path} --version': {source}")]
    Probe {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// `pandoc --version` ran but exited unsuccessfully.
    #[error("'{path} --version' exited with status {code:?}")]
    ProbeFailed { path: PathBuf, code: Option<i32> },

    /// The version banner did not contain a parseable version.
    #[error("Unrecognised pandoc version banner: {banner:?}")]
    Banner { banner: String },

    /// The installed pandoc predates Lua filter support.
    #[error("Pandoc {found} is too old; {required} or newer is required for Lua filters")]
    Unsupported {
        found: PandocVersion,
        required: PandocVersion,
    },
}

// ── Version ──────────────────────────────────────────────────────────────────

/// A pandoc release number. Missing components parse as 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct PandocVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl fmt::Display for PandocVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl PandocVersion {
    /// Parse the first line of `pandoc --version`, e.g. `pandoc 3.1.11.1`
    /// or `pandoc.exe 2.19.2`.
    pub fn parse_banner(banner: &str) -> Result<Self, LocateError> {
        let first = banner.lines().next().unwrap_or("").trim();
        let number = first
            .split_whitespace()
            .find(|w| w.chars().next().is_some_and(|c| c.is_ascii_digit()))
            .ok_or_else(|| LocateError::Banner {
                banner: first.to_string(),
            })?;

        let mut parts = number.split('.').map(|p| {
            p.chars()
                .take_while(char::is_ascii_digit)
                .collect::<String>()
                .parse::<u32>()
        });
        let major = match parts.next() {
            Some(Ok(n)) => n,
            _ => {
                return Err(LocateError::Banner {
                    banner: first.to_string(),
                })
            }
        };
        let minor = parts.next().and_then(Result::ok).unwrap_or(0);
        let patch = parts.next().and_then(Result::ok).unwrap_or(0);

        Ok(Self {
            major,
            minor,
            patch,
        })
    }
}

// ── Public API ───────────────────────────────────────────────────────────────

/// Resolve `requested` to an executable path.
///
/// See the crate docs for the lookup order.
pub fn locate_pandoc(requested: &str) -> Result<PathBuf, LocateError> {
    let requested = requested.trim();
    if requested.is_empty() {
        return Err(LocateError::Empty);
    }

    if requested == DEFAULT_PANDOC {
        if let Ok(env_path) = std::env::var(PANDOC_PATH_ENV) {
            if !env_path.is_empty() {
                return resolve_explicit(Path::new(&env_path));
            }
        }
    }

    if looks_like_path(requested) {
        resolve_explicit(Path::new(requested))
    } else {
        which::which(requested).map_err(|e| LocateError::NotOnPath {
            name: requested.to_string(),
            reason: e.to_string(),
        })
    }
}

/// Run `<path> --version` and parse the reported version.
pub fn pandoc_version(path: &Path) -> Result<PandocVersion, LocateError> {
    let output = Command::new(path)
        .arg("--version")
        .output()
        .map_err(|source| LocateError::Probe {
            path: path.to_path_buf(),
            source,
        })?;

    if !output.status.success() {
        return Err(LocateError::ProbeFailed {
            path: path.to_path_buf(),
            code: output.status.code(),
        });
    }

    PandocVersion::parse_banner(&String::from_utf8_lossy(&output.stdout))
}

/// Reject pandoc releases that cannot run Lua filters.
pub fn ensure_lua_filter_support(version: &PandocVersion) -> Result<(), LocateError> {
    if *version < MIN_LUA_FILTER_VERSION {
        return Err(LocateError::Unsupported {
            found: *version,
            required: MIN_LUA_FILTER_VERSION,
        });
    }
    Ok(())
}

// ── Internal helpers ─────────────────────────────────────────────────────────

fn looks_like_path(s: &str) -> bool {
    s.contains('/') || s.contains(std::path::MAIN_SEPARATOR)
}

fn resolve_explicit(path: &Path) -> Result<PathBuf, LocateError> {
    if path.is_file() {
        Ok(path.to_path_buf())
    } else {
        Err(LocateError::MissingPath {
            path: path.to_path_buf(),
        })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_modern_banner() {
        let v = PandocVersion::parse_banner("pandoc 3.1.11.1\nFeatures: +server +lua\n").unwrap();
        assert_eq!(
            v,
            PandocVersion {
                major: 3,
                minor: 1,
                patch: 11
            }
        );
    }

    #[test]
    fn parse_windows_banner() {
        let v = PandocVersion::parse_banner("pandoc.exe 2.19.2").unwrap();
        assert_eq!(v.to_string(), "2.19.2");
    }

    #[test]
    fn parse_short_version() {
        let v = PandocVersion::parse_banner("pandoc 3").unwrap();
        assert_eq!(v.to_string(), "3.0.0");
    }

    #[test]
    fn garbage_banner_is_rejected() {
        assert!(matches!(
            PandocVersion::parse_banner("not pandoc at all"),
            Err(LocateError::Banner { .. })
        ));
        assert!(PandocVersion::parse_banner("").is_err());
    }

    #[test]
    fn lua_filter_support_threshold() {
        let old = PandocVersion::parse_banner("pandoc 1.19.2.4").unwrap();
        assert!(matches!(
            ensure_lua_filter_support(&old),
            Err(LocateError::Unsupported { .. })
        ));
        let new = PandocVersion::parse_banner("pandoc 2.0").unwrap();
        ensure_lua_filter_support(&new).unwrap();
    }

    #[test]
    fn empty_request_is_an_error() {
        assert!(matches!(locate_pandoc("   "), Err(LocateError::Empty)));
    }

    #[test]
    fn missing_explicit_path() {
        let err = locate_pandoc("/definitely/not/a/real/pandoc").unwrap_err();
        assert!(matches!(err, LocateError::MissingPath { .. }));
        assert!(err.to_string().contains("/definitely/not/a/real/pandoc"));
    }

    #[test]
    fn unknown_bare_name_not_on_path() {
        let err = locate_pandoc("turnpress-no-such-pandoc-binary").unwrap_err();
        assert!(matches!(err, LocateError::NotOnPath { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn failing_version_probe_is_reported() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::TempDir::new().unwrap();
        let script = dir.path().join("pandoc");
        std::fs::write(&script, "#!/bin/sh\necho 'pandoc 3.1.9'\nexit 2\n").unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let err = pandoc_version(&script).unwrap_err();
        assert!(matches!(err, LocateError::ProbeFailed { code: Some(2), .. }), "got {err}");
    }

    #[test]
    fn explicit_existing_file_resolves() {
        let dir = std::env::temp_dir();
        let file = dir.join(format!("pandoc-locate-test-{}", std::process::id()));
        std::fs::write(&file, b"#!/bin/sh\n").unwrap();
        let resolved = locate_pandoc(file.to_str().unwrap()).unwrap();
        std::fs::remove_file(&file).ok();
        assert_eq!(resolved, file);
    }
}

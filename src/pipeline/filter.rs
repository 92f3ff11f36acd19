//! Numbering filter resolution: give pandoc a filesystem path to the Lua
//! filter it runs on both invocations.
//!
//! The built-in filter is compiled into the binary, so an installed
//! `turnpress` has no data files to locate at runtime. pandoc needs a path,
//! though, so the script is written into a `TempDir` that lives exactly as
//! long as the returned [`FilterScript`]. A configured override is used in
//! place and only checked for existence.

use crate::config::ConversionConfig;
use crate::error::TurnpressError;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::debug;

/// Built-in heading-numbering filter.
pub const HEADER_NUMBERING_FILTER: &str = include_str!("../filters/header-numbering.lua");

/// File name the built-in filter is written under.
pub const FILTER_FILE_NAME: &str = "header-numbering.lua";

/// The resolved filter: a user-supplied script or the built-in one.
pub enum FilterScript {
    /// Configured via [`ConversionConfig::lua_filter`].
    Custom(PathBuf),
    /// Built-in filter written to a temp directory.
    /// The `TempDir` is kept alive to prevent cleanup until pandoc has run.
    Builtin { path: PathBuf, _temp_dir: TempDir },
}

impl FilterScript {
    /// Path to pass as `--lua-filter=`.
    pub fn path(&self) -> &Path {
        match self {
            FilterScript::Custom(p) => p,
            FilterScript::Builtin { path, .. } => path,
        }
    }
}

/// Resolve the filter for a conversion.
pub fn resolve_filter(config: &ConversionConfig) -> Result<FilterScript, TurnpressError> {
    match &config.lua_filter {
        Some(path) => {
            if !path.is_file() {
                return Err(TurnpressError::FilterNotFound { path: path.clone() });
            }
            debug!("Using custom Lua filter: {}", path.display());
            Ok(FilterScript::Custom(path.clone()))
        }
        None => materialise_builtin(),
    }
}

fn materialise_builtin() -> Result<FilterScript, TurnpressError> {
    let temp_dir = TempDir::new().map_err(|source| TurnpressError::FilterWriteFailed { source })?;
    let path = temp_dir.path().join(FILTER_FILE_NAME);
    std::fs::write(&path, HEADER_NUMBERING_FILTER)
        .map_err(|source| TurnpressError::FilterWriteFailed { source })?;

    debug!("Wrote built-in Lua filter to {}", path.display());
    Ok(FilterScript::Builtin {
        path,
        _temp_dir: temp_dir,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_filter_is_embedded() {
        assert!(HEADER_NUMBERING_FILTER.contains("function Header"));
        assert!(HEADER_NUMBERING_FILTER.contains("unnumbered"));
    }

    #[test]
    fn builtin_filter_written_and_removed() {
        let config = ConversionConfig::default();
        let script = resolve_filter(&config).unwrap();
        let path = script.path().to_path_buf();
        assert!(path.ends_with(FILTER_FILE_NAME));
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            HEADER_NUMBERING_FILTER
        );
        drop(script);
        assert!(!path.exists(), "temp filter should be removed on drop");
    }

    #[test]
    fn custom_filter_used_in_place() {
        let dir = TempDir::new().unwrap();
        let custom = dir.path().join("mine.lua");
        std::fs::write(&custom, "-- noop").unwrap();

        let config = ConversionConfig::builder().lua_filter(&custom).build().unwrap();
        let script = resolve_filter(&config).unwrap();
        assert_eq!(script.path(), custom.as_path());
    }

    #[test]
    fn missing_custom_filter_is_an_error() {
        let config = ConversionConfig::builder()
            .lua_filter("/definitely/not/here.lua")
            .build()
            .unwrap();
        assert!(matches!(
            resolve_filter(&config),
            Err(TurnpressError::FilterNotFound { .. })
        ));
    }
}

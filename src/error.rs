//! Error types for the turnpress library.
//!
//! Every failure is fatal for the run that hit it: nothing is retried and
//! nothing is rolled back, so intermediate files written before the failure
//! stay in the workspace.
//!
//! * **Missing prerequisites**: pandoc or the source document cannot be
//!   found. Detected before the workspace is touched.
//! * **External process**: pandoc could not be started, or exited non-zero.
//! * **Filesystem**: a workspace file could not be created, read or written.

use pandoc_locate::LocateError;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// The pandoc invocation that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PandocStage {
    /// docx → intermediate Markdown, extracting media.
    ExtractMarkdown,
    /// intermediate Markdown → standalone HTML.
    RenderHtml,
}

impl fmt::Display for PandocStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PandocStage::ExtractMarkdown => f.write_str("docx → markdown"),
            PandocStage::RenderHtml => f.write_str("markdown → html"),
        }
    }
}

/// All errors returned by the turnpress library.
#[derive(Debug, Error)]
pub enum TurnpressError {
    // ── Missing prerequisites ─────────────────────────────────────────────
    /// The pandoc executable could not be resolved.
    #[error("Pandoc not found, aborting\n{source}\nInstall pandoc or pass --pandoc <PATH>.")]
    PandocNotFound {
        #[source]
        source: LocateError,
    },

    /// The installed pandoc cannot run the numbering filter.
    #[error("Unsupported pandoc: {0}")]
    UnsupportedPandoc(#[source] LocateError),

    /// The source document was not given or does not exist.
    #[error("Docx not found, aborting: '{path}'")]
    DocxNotFound { path: PathBuf },

    /// A numbering filter override was configured but does not exist.
    #[error("Lua filter not found: '{path}'")]
    FilterNotFound { path: PathBuf },

    // ── External process ──────────────────────────────────────────────────
    /// pandoc could not be started at all.
    #[error("Failed to start pandoc ({stage}): {source}")]
    PandocSpawnFailed {
        stage: PandocStage,
        #[source]
        source: std::io::Error,
    },

    /// pandoc ran but exited unsuccessfully.
    #[error("Pandoc failed ({stage}) with exit code {}", exit_code(.code))]
    PandocFailed {
        stage: PandocStage,
        code: Option<i32>,
    },

    // ── Filesystem ────────────────────────────────────────────────────────
    /// The workspace directory could not be created.
    #[error("Failed to create workspace '{path}': {source}")]
    WorkspaceCreateFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The built-in Lua filter could not be written to a temporary file.
    #[error("Failed to materialise the numbering filter: {source}")]
    FilterWriteFailed {
        #[source]
        source: std::io::Error,
    },

    /// An intermediate file is absent or unreadable.
    #[error("Failed to read intermediate file '{path}': {source}")]
    IntermediateRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Could not create or write a Markdown file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

fn exit_code(code: &Option<i32>) -> String {
    code.map_or_else(|| "<signal>".to_string(), |c| c.to_string())
}

impl TurnpressError {
    /// `true` for errors raised before any file was written.
    pub fn is_missing_prerequisite(&self) -> bool {
        matches!(
            self,
            TurnpressError::PandocNotFound { .. }
                | TurnpressError::UnsupportedPandoc(_)
                | TurnpressError::DocxNotFound { .. }
                | TurnpressError::FilterNotFound { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pandoc_failed_display_with_code() {
        let e = TurnpressError::PandocFailed {
            stage: PandocStage::RenderHtml,
            code: Some(64),
        };
        let msg = e.to_string();
        assert!(msg.contains("markdown → html"), "got: {msg}");
        assert!(msg.contains("64"), "got: {msg}");
    }

    #[test]
    fn pandoc_failed_display_killed() {
        let e = TurnpressError::PandocFailed {
            stage: PandocStage::ExtractMarkdown,
            code: None,
        };
        assert!(e.to_string().contains("<signal>"));
    }

    #[test]
    fn docx_not_found_display() {
        let e = TurnpressError::DocxNotFound {
            path: PathBuf::from("report.docx"),
        };
        assert!(e.to_string().contains("report.docx"));
        assert!(e.is_missing_prerequisite());
    }

    #[test]
    fn pandoc_not_found_is_prerequisite() {
        let e = TurnpressError::PandocNotFound {
            source: LocateError::Empty,
        };
        assert!(e.to_string().starts_with("Pandoc not found"));
        assert!(e.is_missing_prerequisite());
    }

    #[test]
    fn io_errors_are_not_prerequisites() {
        let e = TurnpressError::IntermediateRead {
            path: PathBuf::from("ws/temp.html"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        };
        assert!(!e.is_missing_prerequisite());
        assert!(e.to_string().contains("temp.html"));
    }
}

//! Conversion stage: drive pandoc through its two invocations.
//!
//! ```text
//! report.docx ──1a──▶ <ws>/temp.md + <ws>/assets/ ──1b──▶ <ws>/temp.html
//! ```
//!
//! 1a extracts Markdown (and media) from the Word document; 1b renders that
//! Markdown as a standalone HTML page for the transform stage. Both runs use
//! the numbering filter and inherit the parent's stdio, so pandoc's own
//! warnings reach the user unchanged.
//!
//! Prerequisites are checked before the workspace is created: a run that
//! cannot find pandoc or the document writes nothing.

use crate::config::{ConversionConfig, ASSETS_DIR, TEMP_HTML, TEMP_MARKDOWN};
use crate::error::{PandocStage, TurnpressError};
use crate::pipeline::filter::{self, FilterScript};
use pandoc_locate::PandocVersion;
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// pandoc format for the intermediate Markdown: ordered lists keep their
/// start number, and a lone image is not promoted to a figure.
pub const MARKDOWN_FORMAT: &str = "markdown+startnum-implicit_figures";

/// Everything the two pandoc invocations need, validated.
#[derive(Debug, Clone)]
pub struct Prerequisites {
    /// Resolved pandoc executable.
    pub pandoc: PathBuf,
    /// Version reported by `pandoc --version`, when it could be probed.
    pub version: Option<PandocVersion>,
    /// Source document.
    pub docx: PathBuf,
    /// Absolute workspace path (not yet created).
    pub workspace: PathBuf,
}

/// Validate pandoc and the source document without touching the filesystem.
///
/// # Errors
/// - [`TurnpressError::PandocNotFound`] when pandoc does not resolve
/// - [`TurnpressError::DocxNotFound`] when the docx is unset or missing
/// - [`TurnpressError::UnsupportedPandoc`] when pandoc predates Lua filters
pub async fn check_prerequisites(
    config: &ConversionConfig,
) -> Result<Prerequisites, TurnpressError> {
    let requested = config.pandoc.clone();
    let pandoc = tokio::task::spawn_blocking(move || pandoc_locate::locate_pandoc(&requested))
        .await
        .map_err(|e| TurnpressError::Internal(format!("pandoc lookup panicked: {e}")))?
        .map_err(|source| TurnpressError::PandocNotFound { source })?;

    let docx = match &config.docx {
        Some(p) if p.is_file() => p.clone(),
        Some(p) => return Err(TurnpressError::DocxNotFound { path: p.clone() }),
        None => {
            return Err(TurnpressError::DocxNotFound {
                path: PathBuf::new(),
            })
        }
    };

    let probe_path = pandoc.clone();
    let version = tokio::task::spawn_blocking(move || pandoc_locate::pandoc_version(&probe_path))
        .await
        .map_err(|e| TurnpressError::Internal(format!("pandoc probe panicked: {e}")))?;
    let version = match version {
        Ok(v) => {
            pandoc_locate::ensure_lua_filter_support(&v)
                .map_err(TurnpressError::UnsupportedPandoc)?;
            Some(v)
        }
        Err(e) => {
            warn!("Could not determine pandoc version: {}", e);
            None
        }
    };

    let workspace = std::path::absolute(&config.workspace).map_err(|source| {
        TurnpressError::WorkspaceCreateFailed {
            path: config.workspace.clone(),
            source,
        }
    })?;

    info!(
        "Using pandoc {} at {}",
        version.map_or_else(|| "<unknown>".to_string(), |v| v.to_string()),
        pandoc.display()
    );

    Ok(Prerequisites {
        pandoc,
        version,
        docx,
        workspace,
    })
}

/// Create the workspace directory if absent.
pub async fn prepare_workspace(workspace: &Path) -> Result<(), TurnpressError> {
    tokio::fs::create_dir_all(workspace)
        .await
        .map_err(|source| TurnpressError::WorkspaceCreateFailed {
            path: workspace.to_path_buf(),
            source,
        })
}

/// Arguments for invocation 1a (docx → Markdown + media).
pub fn extract_markdown_args(docx: &Path, workspace: &Path, filter: &Path) -> Vec<OsString> {
    vec![
        docx.into(),
        "-o".into(),
        workspace.join(TEMP_MARKDOWN).into(),
        prefixed("--extract-media=", &workspace.join(ASSETS_DIR)),
        "-t".into(),
        MARKDOWN_FORMAT.into(),
        "--wrap=preserve".into(),
        prefixed("--lua-filter=", filter),
    ]
}

/// Arguments for invocation 1b (Markdown → standalone HTML).
pub fn render_html_args(workspace: &Path, filter: &Path) -> Vec<OsString> {
    vec![
        workspace.join(TEMP_MARKDOWN).into(),
        "-s".into(),
        "-o".into(),
        workspace.join(TEMP_HTML).into(),
        "-f".into(),
        MARKDOWN_FORMAT.into(),
        prefixed("--lua-filter=", filter),
    ]
}

/// Run invocation 1a.
pub async fn extract_markdown(
    prereq: &Prerequisites,
    filter: &FilterScript,
) -> Result<(), TurnpressError> {
    let args = extract_markdown_args(&prereq.docx, &prereq.workspace, filter.path());
    run_pandoc(&prereq.pandoc, &args, PandocStage::ExtractMarkdown).await
}

/// Run invocation 1b.
pub async fn render_html(
    prereq: &Prerequisites,
    filter: &FilterScript,
) -> Result<(), TurnpressError> {
    let args = render_html_args(&prereq.workspace, filter.path());
    run_pandoc(&prereq.pandoc, &args, PandocStage::RenderHtml).await
}

/// Full conversion stage: check prerequisites, create the workspace, run
/// both pandoc invocations.
pub async fn convert_docx_to_html(
    config: &ConversionConfig,
) -> Result<Prerequisites, TurnpressError> {
    let prereq = check_prerequisites(config).await?;
    let filter = filter::resolve_filter(config)?;
    prepare_workspace(&prereq.workspace).await?;
    extract_markdown(&prereq, &filter).await?;
    render_html(&prereq, &filter).await?;
    Ok(prereq)
}

async fn run_pandoc(
    pandoc: &Path,
    args: &[OsString],
    stage: PandocStage,
) -> Result<(), TurnpressError> {
    debug!("Running pandoc ({}): {} {:?}", stage, pandoc.display(), args);

    let status = Command::new(pandoc)
        .args(args)
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .status()
        .await
        .map_err(|source| TurnpressError::PandocSpawnFailed { stage, source })?;

    if !status.success() {
        return Err(TurnpressError::PandocFailed {
            stage,
            code: status.code(),
        });
    }
    Ok(())
}

fn prefixed(flag: &str, path: &Path) -> OsString {
    let mut s = OsString::from(flag);
    s.push(OsStr::new(path));
    s
}

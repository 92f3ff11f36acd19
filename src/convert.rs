//! Conversion entry points.
//!
//! [`convert`] runs the whole pipeline and leaves the result in
//! `<workspace>/temp.md`. [`convert_to_file`] additionally moves the
//! Markdown where the caller wants it and tidies the workspace.

use crate::config::{ConversionConfig, TEMP_FILES};
use crate::error::TurnpressError;
use crate::output::{ConversionOutput, ConversionStats};
use crate::pipeline::{filter, pandoc, transform};
use crate::progress::Stage;
use std::future::Future;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Convert the configured docx to Markdown.
///
/// This is the primary entry point for the library.
///
/// # Returns
/// The final Markdown, which is also left in `<workspace>/temp.md`, with
/// extracted media in `<workspace>/assets/`.
///
/// # Errors
/// Any stage failing aborts the run. Prerequisite errors are raised before
/// the workspace is created; later errors leave whatever intermediates were
/// already written in place.
pub async fn convert(config: &ConversionConfig) -> Result<ConversionOutput, TurnpressError> {
    let total_start = Instant::now();

    // ── Step 1: Prerequisites ────────────────────────────────────────────
    let prereq = pandoc::check_prerequisites(config).await?;
    info!("Starting conversion: {}", prereq.docx.display());
    let filter = filter::resolve_filter(config)?;
    pandoc::prepare_workspace(&prereq.workspace).await?;

    if let Some(ref cb) = config.progress_callback {
        cb.on_conversion_start(Stage::ALL.len());
    }

    // ── Step 2: docx → temp.md + assets ──────────────────────────────────
    let ((), extract_duration_ms) = run_stage(
        config,
        Stage::ExtractMarkdown,
        pandoc::extract_markdown(&prereq, &filter),
    )
    .await?;

    // ── Step 3: temp.md → temp.html ──────────────────────────────────────
    let ((), render_duration_ms) =
        run_stage(config, Stage::RenderHtml, pandoc::render_html(&prereq, &filter)).await?;
    drop(filter);

    // ── Step 4: temp.html → temp.md ──────────────────────────────────────
    let (report, transform_duration_ms) = run_stage(
        config,
        Stage::Transform,
        transform::convert_html_to_markdown(config),
    )
    .await?;

    let counts = report.counts;
    let stats = ConversionStats {
        extract_duration_ms,
        render_duration_ms,
        transform_duration_ms,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
        markdown_bytes: report.markdown.len(),
        headings: counts.headings,
        images: counts.images,
        images_rewritten: counts.images_rewritten,
        tables: counts.tables,
        html_tables: counts.html_tables,
        containers: counts.containers,
    };

    info!(
        "Conversion complete: {} bytes, {}ms total",
        stats.markdown_bytes, stats.total_duration_ms
    );

    if let Some(ref cb) = config.progress_callback {
        cb.on_conversion_complete(report.markdown.len());
    }

    Ok(ConversionOutput {
        markdown: report.markdown,
        markdown_path: config.temp_markdown(),
        stats,
    })
}

/// Convert and write the Markdown to `output_path`.
///
/// Uses atomic write (temp file + rename) to prevent partial files. When
/// [`ConversionConfig::clean`] is set, `temp.md` and `temp.html` are removed
/// from the workspace afterwards; `assets/` is kept because the Markdown
/// links into it.
pub async fn convert_to_file(
    output_path: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<ConversionStats, TurnpressError> {
    let output = convert(config).await?;
    let path = output_path.as_ref();
    let write_err = |source: std::io::Error| TurnpressError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }

    let tmp_path = path.with_extension("md.tmp");
    tokio::fs::write(&tmp_path, &output.markdown)
        .await
        .map_err(write_err)?;
    tokio::fs::rename(&tmp_path, path).await.map_err(write_err)?;
    info!("Wrote {}", path.display());

    if config.clean {
        if same_file(path, &output.markdown_path) {
            warn!(
                "Output is the workspace's {}; skipping cleanup",
                output.markdown_path.display()
            );
        } else {
            clean_workspace(&config.workspace).await?;
        }
    }

    Ok(output.stats)
}

/// Synchronous wrapper around [`convert`].
///
/// Creates a temporary tokio runtime internally.
pub fn convert_sync(config: &ConversionConfig) -> Result<ConversionOutput, TurnpressError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| TurnpressError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(convert(config))
}

/// Remove `temp.md` and `temp.html` from a workspace.
///
/// Missing files are not an error. Returns how many files were removed.
pub async fn clean_workspace(workspace: impl AsRef<Path>) -> Result<usize, TurnpressError> {
    let workspace = workspace.as_ref();
    let mut removed = 0;
    for name in TEMP_FILES {
        let path = workspace.join(name);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                debug!("Removed {}", path.display());
                removed += 1;
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(source) => return Err(TurnpressError::OutputWriteFailed { path, source }),
        }
    }
    Ok(removed)
}

// ── Internal helpers ─────────────────────────────────────────────────────

/// Await one stage, reporting it to the progress callback and timing it.
async fn run_stage<T>(
    config: &ConversionConfig,
    stage: Stage,
    fut: impl Future<Output = Result<T, TurnpressError>>,
) -> Result<(T, u64), TurnpressError> {
    if let Some(ref cb) = config.progress_callback {
        cb.on_stage_start(stage);
    }
    let start = Instant::now();
    match fut.await {
        Ok(value) => {
            let elapsed_ms = start.elapsed().as_millis() as u64;
            debug!("{} took {}ms", stage, elapsed_ms);
            if let Some(ref cb) = config.progress_callback {
                cb.on_stage_complete(stage, elapsed_ms);
            }
            Ok((value, elapsed_ms))
        }
        Err(e) => {
            if let Some(ref cb) = config.progress_callback {
                cb.on_stage_error(stage, &e.to_string());
            }
            Err(e)
        }
    }
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (std::path::absolute(a), std::path::absolute(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

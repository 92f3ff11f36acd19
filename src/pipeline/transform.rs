//! Transform stage: `<workspace>/temp.html` → `<workspace>/temp.md`.
//!
//! [`html_to_markdown`] is the whole transform as a pure function of the
//! HTML, the workspace path and the rendering options; the async wrapper
//! only adds the file I/O. Parsing and rendering run in `spawn_blocking`
//! because `RcDom` is `!Send` and the walk is CPU-bound.

use crate::config::{ConversionConfig, MarkdownOptions};
use crate::error::TurnpressError;
use crate::pipeline::html::{parse_html, strip_non_content};
use crate::pipeline::markdown::{MarkdownRenderer, RenderCounts};
use crate::pipeline::postprocess::clean_markdown;
use crate::pipeline::rules::ImageRewrite;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Result of one transform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformReport {
    pub markdown: String,
    pub counts: RenderCounts,
}

/// Convert a standalone HTML document to Markdown.
///
/// Deterministic: the same inputs always give byte-identical output.
pub fn html_to_markdown(html: &str, workspace: &Path, options: &MarkdownOptions) -> TransformReport {
    let dom = parse_html(html);
    let removed = strip_non_content(&dom);
    debug!("Removed {} non-content elements", removed);

    let images = ImageRewrite::new(workspace);
    let mut renderer = MarkdownRenderer::new(options, &images);
    let raw = renderer.render_document(&dom.document);

    TransformReport {
        markdown: clean_markdown(&raw),
        counts: renderer.into_counts(),
    }
}

/// Read `temp.html`, transform it, and overwrite `temp.md` with the result.
pub async fn convert_html_to_markdown(
    config: &ConversionConfig,
) -> Result<TransformReport, TurnpressError> {
    let html_path = config.temp_html();
    let html = tokio::fs::read_to_string(&html_path)
        .await
        .map_err(|source| TurnpressError::IntermediateRead {
            path: html_path.clone(),
            source,
        })?;
    debug!("Read {} bytes from {}", html.len(), html_path.display());

    let workspace = absolute_workspace(&config.workspace);
    let options = config.markdown.clone();
    let report = tokio::task::spawn_blocking(move || html_to_markdown(&html, &workspace, &options))
        .await
        .map_err(|e| TurnpressError::Internal(format!("transform task panicked: {e}")))?;

    let md_path = config.temp_markdown();
    tokio::fs::write(&md_path, &report.markdown)
        .await
        .map_err(|source| TurnpressError::OutputWriteFailed {
            path: md_path.clone(),
            source,
        })?;

    info!(
        "Wrote {} ({} headings, {} images, {} tables)",
        md_path.display(),
        report.counts.headings,
        report.counts.images,
        report.counts.tables
    );
    Ok(report)
}

/// pandoc was handed the absolute workspace, so that is the form its image
/// paths carry. [`ImageRewrite`] also matches the relative form.
fn absolute_workspace(workspace: &Path) -> PathBuf {
    std::path::absolute(workspace).unwrap_or_else(|_| workspace.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const PAGE: &str = r#"<!DOCTYPE html>
<html xmlns="http://www.w3.org/1999/xhtml" lang="" xml:lang="">
<head>
  <meta charset="utf-8" />
  <title>temp</title>
  <style>
    body { margin: 0 auto; }
  </style>
</head>
<body>
<h1 id="intro">1 Intro</h1>
<p>See <img src="/tmp/ws/assets/media/image1.png" alt="diagram" />.</p>
</body>
</html>
"#;

    #[test]
    fn title_and_style_never_reach_output() {
        let report = html_to_markdown(PAGE, Path::new("/tmp/ws"), &MarkdownOptions::default());
        assert_eq!(
            report.markdown,
            "# 1 Intro\n\nSee ![diagram](./assets/media/image1.png).\n"
        );
        assert!(!report.markdown.contains("temp"));
        assert!(!report.markdown.contains("margin"));
        assert_eq!(report.counts.images_rewritten, 1);
    }

    #[test]
    fn output_is_deterministic() {
        let options = MarkdownOptions::default();
        let a = html_to_markdown(PAGE, Path::new("/tmp/ws"), &options);
        let b = html_to_markdown(PAGE, Path::new("/tmp/ws"), &options);
        assert_eq!(a, b);
    }

    #[test]
    fn empty_body_gives_single_newline() {
        let report = html_to_markdown(
            "<html><head><title>T</title></head><body></body></html>",
            Path::new("/tmp/ws"),
            &MarkdownOptions::default(),
        );
        assert_eq!(report.markdown, "\n");
    }

    #[tokio::test]
    async fn missing_html_is_intermediate_read_error() {
        let dir = TempDir::new().unwrap();
        let config = ConversionConfig::builder()
            .workspace(dir.path())
            .build()
            .unwrap();
        let err = convert_html_to_markdown(&config).await.unwrap_err();
        assert!(matches!(err, TurnpressError::IntermediateRead { .. }));
    }

    #[tokio::test]
    async fn overwrites_temp_markdown() {
        let dir = TempDir::new().unwrap();
        let config = ConversionConfig::builder()
            .workspace(dir.path())
            .build()
            .unwrap();
        std::fs::write(config.temp_markdown(), "intermediate from pandoc").unwrap();
        let src = dir.path().join("assets").join("a.png");
        std::fs::write(
            config.temp_html(),
            format!(
                "<html><head><title>T</title></head><body><h2>Two</h2><img src=\"{}\"></body></html>",
                src.display()
            ),
        )
        .unwrap();

        let report = convert_html_to_markdown(&config).await.unwrap();
        let written = std::fs::read_to_string(config.temp_markdown()).unwrap();
        assert_eq!(written, report.markdown);
        assert_eq!(written, "## Two\n\n![](./assets/a.png)\n");
    }
}

//! Result types returned by the conversion entry points.

use serde::Serialize;
use std::path::PathBuf;

/// The outcome of a full conversion.
#[derive(Debug, Clone, Serialize)]
pub struct ConversionOutput {
    /// Final Markdown text.
    pub markdown: String,
    /// Where the Markdown was written (`<workspace>/temp.md`).
    pub markdown_path: PathBuf,
    /// Timings and content counts.
    pub stats: ConversionStats,
}

/// Timings and content counts for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConversionStats {
    /// pandoc docx → markdown.
    pub extract_duration_ms: u64,
    /// pandoc markdown → html.
    pub render_duration_ms: u64,
    /// HTML → Markdown transform, including file I/O.
    pub transform_duration_ms: u64,
    pub total_duration_ms: u64,
    /// Byte length of the final Markdown.
    pub markdown_bytes: usize,
    pub headings: usize,
    pub images: usize,
    /// Images whose `src` was rewritten relative to the workspace.
    pub images_rewritten: usize,
    pub tables: usize,
    /// Tables kept as raw HTML.
    pub html_tables: usize,
    pub containers: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stats_serialise_with_field_names() {
        let stats = ConversionStats {
            headings: 2,
            images: 1,
            ..Default::default()
        };
        let json = serde_json::to_string(&stats).unwrap();
        assert!(json.contains("\"headings\":2"));
        assert!(json.contains("\"images\":1"));
        assert!(json.contains("\"total_duration_ms\":0"));
    }
}

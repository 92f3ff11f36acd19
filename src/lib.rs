//! # turnpress
//!
//! Convert Word documents (`.docx`) into Markdown for VitePress sites.
//!
//! ## Why this crate?
//!
//! pandoc reads `.docx` very well, but its Markdown writer targets pandoc's
//! own dialect: fenced divs, attribute blocks, grid tables. A static-site
//! generator wants GFM tables, `:::` custom containers and relative image
//! links instead. turnpress lets pandoc do the reading, asks it for plain
//! HTML, and renders that HTML to Markdown with its own fixed rules.
//!
//! ## Pipeline Overview
//!
//! ```text
//! report.docx
//!  │
//!  ├─ 1. Extract    pandoc: docx → temp.md, media → assets/   (numbered headings)
//!  ├─ 2. Render     pandoc: temp.md → standalone temp.html
//!  ├─ 3. Parse      html5ever; <title> and <style> dropped
//!  ├─ 4. Classify   every node → one ContentKind
//!  ├─ 5. Render     one handler per kind; image paths made workspace-relative
//!  └─ 6. Polish     whitespace cleanup, written back over temp.md
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use turnpress::{convert, ConversionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConversionConfig::builder()
//!         .docx("handbook.docx")
//!         .workspace("./docs/handbook")
//!         .build()?;
//!     let output = convert(&config).await?;
//!     println!("{}", output.markdown);
//!     eprintln!("{} images, {} tables", output.stats.images, output.stats.tables);
//!     Ok(())
//! }
//! ```
//!
//! The transform stage is usable on its own, without pandoc:
//!
//! ```rust
//! use std::path::Path;
//! use turnpress::{html_to_markdown, MarkdownOptions};
//!
//! let html = r#"<html><head><title>T</title></head>
//! <body><h1>Hi</h1><img src="/tmp/ws/assets/a.png"></body></html>"#;
//! let report = html_to_markdown(html, Path::new("/tmp/ws"), &MarkdownOptions::default());
//! assert_eq!(report.markdown, "# Hi\n\n![](./assets/a.png)\n");
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `turnpress` binary (clap + anyhow + tracing-subscriber + indicatif + serde_json) |
//!
//! Disable `cli` when using only the library to avoid pulling in CLI-only deps:
//! ```toml
//! turnpress = { version = "0.3", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{
    BulletMarker, CodeFence, ConversionConfig, ConversionConfigBuilder, MarkdownOptions,
    TableFallback,
};
pub use convert::{clean_workspace, convert, convert_sync, convert_to_file};
pub use error::{PandocStage, TurnpressError};
pub use output::{ConversionOutput, ConversionStats};
pub use pipeline::pandoc::convert_docx_to_html;
pub use pipeline::rules::{ContainerKind, ContentKind};
pub use pipeline::transform::{convert_html_to_markdown, html_to_markdown, TransformReport};
pub use progress::{ConversionProgressCallback, NoopProgressCallback, ProgressCallback, Stage};

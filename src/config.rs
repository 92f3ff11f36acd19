//! Configuration types for docx-to-Markdown conversion.
//!
//! All conversion behaviour is controlled through [`ConversionConfig`], built
//! via its [`ConversionConfigBuilder`]. The config is read-only once built:
//! both stages of the pipeline borrow it, neither changes it.
//!
//! Rendering conventions that only affect the HTML-to-Markdown stage live in
//! the nested [`MarkdownOptions`], so the transformer can be driven on its
//! own without a full conversion config.

use crate::error::TurnpressError;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Workspace used when none is configured.
pub const DEFAULT_WORKSPACE: &str = "./turnpress";

/// Intermediate Markdown file name; also the final artefact.
pub const TEMP_MARKDOWN: &str = "temp.md";

/// Intermediate standalone HTML file name.
pub const TEMP_HTML: &str = "temp.html";

/// Intermediates removed by [`crate::convert::clean_workspace`].
pub const TEMP_FILES: [&str; 2] = [TEMP_MARKDOWN, TEMP_HTML];

/// Directory (inside the workspace) that pandoc extracts media into.
pub const ASSETS_DIR: &str = "assets";

/// Configuration for a docx-to-Markdown conversion.
///
/// Built via [`ConversionConfig::builder()`] or using
/// [`ConversionConfig::default()`].
///
/// # Example
/// ```rust
/// use turnpress::ConversionConfig;
///
/// let config = ConversionConfig::builder()
///     .workspace("./build/turnpress")
///     .docx("handbook.docx")
///     .build()
///     .unwrap();
/// assert!(config.temp_html().ends_with("temp.html"));
/// ```
#[derive(Clone)]
pub struct ConversionConfig {
    /// Working directory for intermediates, extracted media, and the final
    /// Markdown. Created on demand. Default: `./turnpress`.
    pub workspace: PathBuf,

    /// Pandoc executable: a bare name looked up on `PATH`, or a path.
    /// Default: `pandoc`.
    pub pandoc: String,

    /// Source Word document.
    pub docx: Option<PathBuf>,

    /// Numbering filter override. When `None` the built-in filter is written
    /// to a temporary file for the duration of the conversion stage.
    pub lua_filter: Option<PathBuf>,

    /// Remove `temp.md` / `temp.html` after the Markdown has been relocated.
    /// Default: true.
    pub clean: bool,

    /// Markdown rendering conventions for the transform stage.
    pub markdown: MarkdownOptions,

    /// Optional per-stage progress callback.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            workspace: PathBuf::from(DEFAULT_WORKSPACE),
            pandoc: pandoc_locate::DEFAULT_PANDOC.to_string(),
            docx: None,
            lua_filter: None,
            clean: true,
            markdown: MarkdownOptions::default(),
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ConversionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionConfig")
            .field("workspace", &self.workspace)
            .field("pandoc", &self.pandoc)
            .field("docx", &self.docx)
            .field("lua_filter", &self.lua_filter)
            .field("clean", &self.clean)
            .field("markdown", &self.markdown)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn ConversionProgressCallback>"),
            )
            .finish()
    }
}

impl ConversionConfig {
    /// Create a new builder for `ConversionConfig`.
    pub fn builder() -> ConversionConfigBuilder {
        ConversionConfigBuilder {
            config: Self::default(),
        }
    }

    /// `<workspace>/temp.md`
    pub fn temp_markdown(&self) -> PathBuf {
        self.workspace.join(TEMP_MARKDOWN)
    }

    /// `<workspace>/temp.html`
    pub fn temp_html(&self) -> PathBuf {
        self.workspace.join(TEMP_HTML)
    }

    /// `<workspace>/assets`
    pub fn assets_dir(&self) -> PathBuf {
        self.workspace.join(ASSETS_DIR)
    }
}

/// Builder for [`ConversionConfig`].
#[derive(Debug)]
pub struct ConversionConfigBuilder {
    config: ConversionConfig,
}

impl ConversionConfigBuilder {
    pub fn workspace(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.workspace = dir.into();
        self
    }

    pub fn pandoc(mut self, pandoc: impl Into<String>) -> Self {
        self.config.pandoc = pandoc.into();
        self
    }

    pub fn docx(mut self, docx: impl Into<PathBuf>) -> Self {
        self.config.docx = Some(docx.into());
        self
    }

    pub fn lua_filter(mut self, filter: impl Into<PathBuf>) -> Self {
        self.config.lua_filter = Some(filter.into());
        self
    }

    pub fn clean(mut self, v: bool) -> Self {
        self.config.clean = v;
        self
    }

    pub fn markdown(mut self, options: MarkdownOptions) -> Self {
        self.config.markdown = options;
        self
    }

    pub fn bullet_marker(mut self, marker: BulletMarker) -> Self {
        self.config.markdown.bullet_marker = marker;
        self
    }

    pub fn code_fence(mut self, fence: CodeFence) -> Self {
        self.config.markdown.code_fence = fence;
        self
    }

    pub fn table_fallback(mut self, fallback: TableFallback) -> Self {
        self.config.markdown.table_fallback = fallback;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    ///
    /// Only shape is checked here; whether pandoc and the docx actually exist
    /// is checked when the conversion stage starts.
    pub fn build(self) -> Result<ConversionConfig, TurnpressError> {
        let c = &self.config;
        if c.workspace.as_os_str().is_empty() {
            return Err(TurnpressError::InvalidConfig(
                "workspace must not be empty".into(),
            ));
        }
        if c.pandoc.trim().is_empty() {
            return Err(TurnpressError::InvalidConfig(
                "pandoc executable must not be empty".into(),
            ));
        }
        if c.docx.as_deref().is_some_and(|d| d.as_os_str().is_empty()) {
            return Err(TurnpressError::InvalidConfig(
                "docx path must not be empty".into(),
            ));
        }
        if c
            .lua_filter
            .as_deref()
            .is_some_and(|p: &Path| p.as_os_str().is_empty())
        {
            return Err(TurnpressError::InvalidConfig(
                "lua filter path must not be empty".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Markdown rendering options ───────────────────────────────────────────

/// Conventions used when rendering the HTML tree to Markdown.
///
/// Headings are always ATX (`#`) style.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkdownOptions {
    /// Marker for unordered list items. Default: `-`.
    pub bullet_marker: BulletMarker,
    /// Fence used around code blocks. Default: backticks.
    pub code_fence: CodeFence,
    /// What to do with tables that pipe syntax cannot express. Default: keep HTML.
    pub table_fallback: TableFallback,
}

/// Marker for unordered list items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BulletMarker {
    #[default]
    Dash,
    Asterisk,
    Plus,
}

impl BulletMarker {
    pub fn as_char(self) -> char {
        match self {
            BulletMarker::Dash => '-',
            BulletMarker::Asterisk => '*',
            BulletMarker::Plus => '+',
        }
    }
}

/// Fence character for code blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CodeFence {
    #[default]
    Backtick,
    Tilde,
}

impl CodeFence {
    pub fn as_char(self) -> char {
        match self {
            CodeFence::Backtick => '`',
            CodeFence::Tilde => '~',
        }
    }
}

/// Rendering of tables with merged cells or block content in cells.
///
/// VitePress renders inline HTML, so keeping such tables as HTML loses
/// nothing; `Flatten` squeezes them into a pipe table instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TableFallback {
    #[default]
    Html,
    Flatten,
}

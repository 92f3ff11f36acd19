//! CLI binary for turnpress.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `ConversionConfig` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use turnpress::{
    convert, convert_to_file, BulletMarker, CodeFence, ConversionConfig,
    ConversionProgressCallback, ProgressCallback, Stage, TableFallback, TurnpressError,
};

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────

/// Terminal progress callback: one spinner for the running stage and a log
/// line per finished stage.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        bar.set_prefix("Preparing");
        bar.set_message("Looking for pandoc…");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }

    /// Stop the spinner and erase its line.
    fn clear(&self) {
        self.bar.finish_and_clear();
    }
}

impl ConversionProgressCallback for CliProgressCallback {
    fn on_conversion_start(&self, total_stages: usize) {
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Converting in {total_stages} steps…"))
        ));
    }

    fn on_stage_start(&self, stage: Stage) {
        self.bar
            .set_prefix(format!("Step {}/{}", stage.number(), Stage::ALL.len()));
        self.bar.set_message(stage.to_string());
    }

    fn on_stage_complete(&self, stage: Stage, elapsed_ms: u64) {
        self.bar.println(format!(
            "  {} {:<32}  {}",
            green("✓"),
            stage.to_string(),
            dim(&format!("{:.1}s", elapsed_ms as f64 / 1000.0)),
        ));
    }

    fn on_stage_error(&self, stage: Stage, error: &str) {
        // Truncate very long error messages to keep output tidy.
        let msg = match error.char_indices().nth(79) {
            Some((cut, _)) => format!("{}\u{2026}", &error[..cut]),
            None => error.to_string(),
        };
        self.bar
            .println(format!("  {} {:<32}  {}", red("✗"), stage.to_string(), red(&msg)));
        self.bar.finish_and_clear();
    }

    fn on_conversion_complete(&self, markdown_len: usize) {
        self.bar.finish_and_clear();
        eprintln!(
            "{} {} bytes of Markdown",
            green("✔"),
            bold(&markdown_len.to_string())
        );
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Basic conversion (stdout)
  turnpress handbook.docx

  # Convert to file; media lands in ./docs/assets
  turnpress handbook.docx -w ./docs -o ./docs/handbook.md

  # Keep temp.md / temp.html for debugging
  turnpress handbook.docx -o out.md --keep-intermediate

  # Asterisk bullets, tilde fences, pipe tables only
  turnpress handbook.docx --bullet '*' --fence tilde --tables flatten

  # JSON output with stats
  turnpress --json handbook.docx > output.json

CUSTOM CONTAINERS:
  Word paragraphs styled "Tip", "Info", "Note", "Warning", "Caution",
  "Danger", "Important" or "Details" become VitePress ::: blocks.

ENVIRONMENT VARIABLES:
  PANDOC_PATH             pandoc to use when --pandoc is left at its default
  TURNPRESS_*             every flag, e.g. TURNPRESS_WORKSPACE=./docs
  RUST_LOG                log filter, overrides -v / -q

SETUP:
  pandoc 2.0 or newer must be installed: https://pandoc.org/installing.html
"#;

/// Convert Word documents to VitePress-ready Markdown.
#[derive(Parser, Debug)]
#[command(
    name = "turnpress",
    version,
    about = "Convert Word documents to VitePress-ready Markdown",
    long_about = "Convert a .docx file to Markdown: pandoc extracts the document and its \
media, turnpress renders the result with GFM tables, numbered headings, \
workspace-relative image links and VitePress ::: containers.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Word document to convert.
    docx: PathBuf,

    /// Workspace for intermediates, extracted media and temp.md.
    #[arg(short, long, env = "TURNPRESS_WORKSPACE", default_value = turnpress::config::DEFAULT_WORKSPACE)]
    workspace: PathBuf,

    /// pandoc executable name or path.
    #[arg(long, env = "TURNPRESS_PANDOC", default_value = "pandoc")]
    pandoc: String,

    /// Lua filter to use instead of the built-in heading numbering.
    #[arg(long, env = "TURNPRESS_LUA_FILTER")]
    lua_filter: Option<PathBuf>,

    /// Write Markdown to this file instead of stdout.
    #[arg(short, long, env = "TURNPRESS_OUTPUT")]
    output: Option<PathBuf>,

    /// Keep temp.md and temp.html in the workspace after writing --output.
    #[arg(long, env = "TURNPRESS_KEEP_INTERMEDIATE")]
    keep_intermediate: bool,

    /// Unordered list marker.
    #[arg(long, env = "TURNPRESS_BULLET", value_enum, default_value = "-")]
    bullet: BulletArg,

    /// Code block fence.
    #[arg(long, env = "TURNPRESS_FENCE", value_enum, default_value = "backtick")]
    fence: FenceArg,

    /// Tables with merged cells: keep as HTML, or flatten into pipe tables.
    #[arg(long, env = "TURNPRESS_TABLES", value_enum, default_value = "html")]
    tables: TablesArg,

    /// Output structured JSON (ConversionOutput) instead of Markdown.
    #[arg(long, env = "TURNPRESS_JSON")]
    json: bool,

    /// Disable progress spinner.
    #[arg(long, env = "TURNPRESS_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "TURNPRESS_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "TURNPRESS_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum BulletArg {
    #[value(name = "-")]
    Dash,
    #[value(name = "*")]
    Asterisk,
    #[value(name = "+")]
    Plus,
}

impl From<BulletArg> for BulletMarker {
    fn from(v: BulletArg) -> Self {
        match v {
            BulletArg::Dash => BulletMarker::Dash,
            BulletArg::Asterisk => BulletMarker::Asterisk,
            BulletArg::Plus => BulletMarker::Plus,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum FenceArg {
    Backtick,
    Tilde,
}

impl From<FenceArg> for CodeFence {
    fn from(v: FenceArg) -> Self {
        match v {
            FenceArg::Backtick => CodeFence::Backtick,
            FenceArg::Tilde => CodeFence::Tilde,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum TablesArg {
    Html,
    Flatten,
}

impl From<TablesArg> for TableFallback {
    fn from(v: TablesArg) -> Self {
        match v {
            TablesArg::Html => TableFallback::Html,
            TablesArg::Flatten => TableFallback::Flatten,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs when the spinner is active; the
    // per-stage lines provide all the feedback that matters to the user.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Build config ─────────────────────────────────────────────────────
    let spinner = show_progress.then(CliProgressCallback::new);
    let progress_cb: Option<ProgressCallback> = spinner
        .clone()
        .map(|s| s as Arc<dyn ConversionProgressCallback>);

    let config = build_config(&cli, progress_cb)?;

    // ── Run conversion ───────────────────────────────────────────────────
    if let Some(ref output_path) = cli.output {
        let stats = match convert_to_file(output_path, &config).await {
            Ok(stats) => stats,
            Err(e) => {
                exit_on_prerequisite(e, spinner.as_deref()).context("Conversion failed")?
            }
        };

        if cli.json {
            let json = serde_json::to_string_pretty(&stats).context("Failed to serialise stats")?;
            println!("{json}");
        } else if !cli.quiet {
            eprintln!(
                "{}  {} headings, {} images, {} tables  {}ms  →  {}",
                green("✔"),
                stats.headings,
                stats.images,
                stats.tables,
                stats.total_duration_ms,
                bold(&output_path.display().to_string()),
            );
            if stats.images > stats.images_rewritten {
                eprintln!(
                    "   {}",
                    dim(&format!(
                        "{} image path(s) left as found (not under the workspace)",
                        stats.images - stats.images_rewritten
                    ))
                );
            }
        }
    } else {
        let output = match convert(&config).await {
            Ok(output) => output,
            Err(e) => {
                exit_on_prerequisite(e, spinner.as_deref()).context("Conversion failed")?
            }
        };

        if cli.json {
            let json =
                serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
            println!("{json}");
        } else {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            handle
                .write_all(output.markdown.as_bytes())
                .context("Failed to write to stdout")?;
        }

        if !cli.quiet && !show_progress && !cli.json {
            eprintln!(
                "Converted {} in {}ms ({} also in {})",
                cli.docx.display(),
                output.stats.total_duration_ms,
                output.markdown_path.display(),
                config.workspace.display()
            );
        }
    }

    Ok(())
}

/// Missing pandoc or docx: print the message in red and exit with status 1.
/// Any other error is handed back to be reported with context. The spinner
/// is cleared first either way.
fn exit_on_prerequisite<T>(
    e: TurnpressError,
    spinner: Option<&CliProgressCallback>,
) -> std::result::Result<T, TurnpressError> {
    if let Some(spinner) = spinner {
        spinner.clear();
    }
    if e.is_missing_prerequisite() {
        eprintln!("{}", red(&e.to_string()));
        std::process::exit(1);
    }
    Err(e)
}

/// Map CLI args to `ConversionConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ConversionConfig> {
    let mut builder = ConversionConfig::builder()
        .docx(&cli.docx)
        .workspace(&cli.workspace)
        .pandoc(&cli.pandoc)
        .clean(!cli.keep_intermediate)
        .bullet_marker(cli.bullet.into())
        .code_fence(cli.fence.into())
        .table_fallback(cli.tables.into());

    if let Some(ref filter) = cli.lua_filter {
        builder = builder.lua_filter(filter);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn failed_conversion_clears_spinner() {
        let spinner = CliProgressCallback {
            bar: ProgressBar::hidden(),
        };
        let err = exit_on_prerequisite::<()>(
            TurnpressError::Internal("boom".to_string()),
            Some(&spinner),
        )
        .unwrap_err();
        assert!(matches!(err, TurnpressError::Internal(_)));
        assert!(spinner.bar.is_finished());
    }

    #[test]
    fn defaults_map_to_default_config() {
        let cli = Cli::try_parse_from(["turnpress", "report.docx"]).unwrap();
        let config = build_config(&cli, None).unwrap();
        assert_eq!(config.workspace, PathBuf::from("./turnpress"));
        assert_eq!(config.pandoc, "pandoc");
        assert!(config.clean);
        assert_eq!(config.markdown, turnpress::MarkdownOptions::default());
    }

    #[test]
    fn markdown_flags_map_to_options() {
        let cli = Cli::try_parse_from([
            "turnpress",
            "report.docx",
            "--bullet",
            "+",
            "--fence",
            "tilde",
            "--tables",
            "flatten",
            "--keep-intermediate",
        ])
        .unwrap();
        let config = build_config(&cli, None).unwrap();
        assert_eq!(config.markdown.bullet_marker, BulletMarker::Plus);
        assert_eq!(config.markdown.code_fence, CodeFence::Tilde);
        assert_eq!(config.markdown.table_fallback, TableFallback::Flatten);
        assert!(!config.clean);
    }
}

//! Node classification for the Markdown renderer.
//!
//! Every DOM node is mapped to exactly one [`ContentKind`]; the renderer has
//! one handler per variant. A node that matches nothing specific falls back
//! to [`ContentKind::Block`] or [`ContentKind::Other`], which both render
//! their children. Adding a construct means adding a variant, and the
//! compiler then points at the one `match` that must handle it.

use crate::pipeline::html::{attr, classes, tag_name, text_content};
use markup5ever_rcdom::{Handle, NodeData};
use std::path::Path;
use tracing::debug;

/// What a DOM node is, as far as Markdown is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    /// `h1`–`h6`, rendered as ATX headings.
    Heading(u8),
    Paragraph,
    Image,
    Link,
    Table,
    /// A VitePress `:::` container.
    Container(ContainerKind),
    List { ordered: bool },
    ListItem,
    Blockquote,
    /// `pre`, rendered as a fenced block.
    CodeBlock,
    InlineCode,
    Strong,
    Emphasis,
    Strikethrough,
    Superscript,
    Subscript,
    /// pandoc `span.math`; `display` for `span.math.display`.
    Math { display: bool },
    /// Task-list `input[type=checkbox]`.
    Checkbox,
    LineBreak,
    Rule,
    Text,
    /// Never rendered (`head`, `script`, …).
    Removed,
    /// Unknown block-level element: children separated as a block.
    Block,
    /// Anything else: children rendered inline.
    Other,
}

impl ContentKind {
    /// Block-level kinds are separated from their neighbours by a blank line.
    pub fn is_block(self) -> bool {
        matches!(
            self,
            ContentKind::Heading(_)
                | ContentKind::Paragraph
                | ContentKind::Table
                | ContentKind::Container(_)
                | ContentKind::List { .. }
                | ContentKind::ListItem
                | ContentKind::Blockquote
                | ContentKind::CodeBlock
                | ContentKind::Rule
                | ContentKind::Block
                | ContentKind::Math { display: true }
        )
    }

    /// Markdown delimiter for the emphasis kinds.
    pub fn delimiter(self) -> Option<&'static str> {
        match self {
            ContentKind::Strong => Some("**"),
            ContentKind::Emphasis => Some("*"),
            ContentKind::Strikethrough => Some("~~"),
            _ => None,
        }
    }
}

/// VitePress custom container types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerKind {
    Info,
    Tip,
    Warning,
    Danger,
    Details,
}

impl ContainerKind {
    /// Container name as written after `:::`.
    pub fn name(self) -> &'static str {
        match self {
            ContainerKind::Info => "info",
            ContainerKind::Tip => "tip",
            ContainerKind::Warning => "warning",
            ContainerKind::Danger => "danger",
            ContainerKind::Details => "details",
        }
    }

    /// Map a class or custom-style name, case-insensitively.
    /// Admonition names from other tools map to the closest VitePress type.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "info" | "note" => Some(ContainerKind::Info),
            "tip" | "hint" => Some(ContainerKind::Tip),
            "warning" | "caution" => Some(ContainerKind::Warning),
            "danger" | "important" | "error" => Some(ContainerKind::Danger),
            "details" => Some(ContainerKind::Details),
            _ => None,
        }
    }
}

const REMOVED: [&str; 8] = [
    "head", "title", "style", "script", "noscript", "meta", "link", "template",
];

const GENERIC_BLOCKS: [&str; 16] = [
    "div", "section", "article", "header", "footer", "main", "nav", "aside", "figure",
    "figcaption", "dl", "dt", "dd", "address", "details", "summary",
];

/// Classify one node.
pub fn classify(node: &Handle) -> ContentKind {
    let tag = match &node.data {
        NodeData::Text { .. } => return ContentKind::Text,
        NodeData::Element { .. } => tag_name(node).unwrap_or_default(),
        NodeData::Document => return ContentKind::Other,
        _ => return ContentKind::Removed,
    };

    match tag {
        "h1" => ContentKind::Heading(1),
        "h2" => ContentKind::Heading(2),
        "h3" => ContentKind::Heading(3),
        "h4" => ContentKind::Heading(4),
        "h5" => ContentKind::Heading(5),
        "h6" => ContentKind::Heading(6),
        "p" => ContentKind::Paragraph,
        "img" => ContentKind::Image,
        "a" => ContentKind::Link,
        "table" => ContentKind::Table,
        "ul" => ContentKind::List { ordered: false },
        "ol" => ContentKind::List { ordered: true },
        "li" => ContentKind::ListItem,
        "blockquote" => ContentKind::Blockquote,
        "pre" => ContentKind::CodeBlock,
        "code" | "kbd" | "samp" | "tt" => ContentKind::InlineCode,
        "strong" | "b" => ContentKind::Strong,
        "em" | "i" | "cite" | "var" => ContentKind::Emphasis,
        "del" | "s" | "strike" => ContentKind::Strikethrough,
        "sup" => ContentKind::Superscript,
        "sub" => ContentKind::Subscript,
        "br" => ContentKind::LineBreak,
        "hr" => ContentKind::Rule,
        "input" if attr(node, "type").is_some_and(|t| t.eq_ignore_ascii_case("checkbox")) => {
            ContentKind::Checkbox
        }
        "span" => match classes(node) {
            c if c.iter().any(|x| x == "math") => ContentKind::Math {
                display: c.iter().any(|x| x == "display"),
            },
            _ => ContentKind::Other,
        },
        "div" => container_kind(node)
            .map(ContentKind::Container)
            .unwrap_or(ContentKind::Block),
        t if REMOVED.contains(&t) => ContentKind::Removed,
        t if GENERIC_BLOCKS.contains(&t) => ContentKind::Block,
        _ => ContentKind::Other,
    }
}

/// Container type of a `div`, from a class (`<div class="tip">`, pandoc
/// fenced divs) or a Word paragraph style (`custom-style`).
fn container_kind(node: &Handle) -> Option<ContainerKind> {
    classes(node)
        .iter()
        .find_map(|c| ContainerKind::from_name(c))
        .or_else(|| {
            attr(node, "data-custom-style")
                .or_else(|| attr(node, "custom-style"))
                .and_then(|s| ContainerKind::from_name(&s))
        })
}

// ── Image path rewriting ─────────────────────────────────────────────────

/// Rewrites image sources rooted at the workspace to `./…` paths.
///
/// pandoc extracts media to an absolute `<workspace>/assets` path and the
/// HTML references it verbatim. The final Markdown lives in the workspace,
/// so the workspace prefix is replaced by `.`. Matching happens on a path
/// boundary and ignores the `/` vs `\` distinction; sources rooted
/// elsewhere (remote URLs, `data:` URIs, relative paths) are left alone.
#[derive(Debug, Clone)]
pub struct ImageRewrite {
    roots: Vec<String>,
}

impl ImageRewrite {
    /// Roots: the workspace as given, its absolute form, and the
    /// percent-encoded form of each (pandoc escapes spaces in URLs).
    pub fn new(workspace: &Path) -> Self {
        let mut candidates = vec![workspace.to_string_lossy().into_owned()];
        if let Ok(abs) = std::path::absolute(workspace) {
            candidates.push(abs.to_string_lossy().into_owned());
        }

        let mut roots: Vec<String> = Vec::new();
        for c in candidates {
            let normalised = normalise_separators(&c);
            let normalised = normalised.trim_end_matches('/').to_string();
            if normalised.is_empty() {
                continue;
            }
            let encoded = normalised.replace(' ', "%20");
            for root in [normalised, encoded] {
                if !roots.contains(&root) {
                    roots.push(root);
                }
            }
        }
        // Longest first so `/a/b` wins over `/a` when both apply.
        roots.sort_by_key(|r| std::cmp::Reverse(r.len()));
        Self { roots }
    }

    /// The rewritten source, or `None` when `src` is not under the workspace.
    pub fn rewrite(&self, src: &str) -> Option<String> {
        let normalised = normalise_separators(src);
        for root in &self.roots {
            if let Some(rest) = normalised.strip_prefix(root.as_str()) {
                if rest.is_empty() {
                    return Some(".".to_string());
                }
                if rest.starts_with('/') {
                    return Some(format!(".{rest}"));
                }
            }
        }
        debug!("Image source not under workspace, left unchanged: {}", src);
        None
    }

    /// [`Self::rewrite`], falling back to the original source.
    pub fn apply(&self, src: &str) -> String {
        self.rewrite(src).unwrap_or_else(|| src.to_string())
    }
}

fn normalise_separators(s: &str) -> String {
    s.replace('\\', "/")
}

/// `true` when a table cannot be expressed as a GFM pipe table: merged
/// cells, nested tables, or cells holding more than one block.
pub fn is_complex_table(table: &Handle) -> bool {
    fn cell_is_complex(cell: &Handle) -> bool {
        let spans = ["colspan", "rowspan"].iter().any(|a| {
            attr(cell, a)
                .and_then(|v| v.trim().parse::<u32>().ok())
                .is_some_and(|n| n > 1)
        });
        if spans {
            return true;
        }
        let blocks = cell
            .children
            .borrow()
            .iter()
            .filter(|c| {
                matches!(
                    classify(c),
                    ContentKind::Paragraph
                        | ContentKind::Heading(_)
                        | ContentKind::Block
                        | ContentKind::Container(_)
                        | ContentKind::Blockquote
                )
            })
            .count();
        blocks > 1 || contains_any(cell, &["table", "ul", "ol", "pre"])
    }

    fn walk(node: &Handle, depth: usize) -> bool {
        for child in node.children.borrow().iter() {
            match tag_name(child) {
                Some("td") | Some("th") => {
                    if cell_is_complex(child) {
                        return true;
                    }
                }
                // Do not descend into nested tables: the cell check catches them.
                Some("table") if depth > 0 => {}
                Some(_) => {
                    if walk(child, depth + 1) {
                        return true;
                    }
                }
                None => {}
            }
        }
        false
    }

    walk(table, 0)
}

fn contains_any(node: &Handle, names: &[&str]) -> bool {
    node.children.borrow().iter().any(|c| {
        tag_name(c).is_some_and(|t| names.contains(&t)) || contains_any(c, names)
    })
}

/// Language of a code block from `pre`/`code` classes: pandoc writes
/// `class="sourceCode python"`, other tools `class="language-python"`.
pub fn code_language(pre: &Handle) -> Option<String> {
    let mut candidates = classes(pre);
    if let Some(code) = pre
        .children
        .borrow()
        .iter()
        .find(|c| tag_name(c) == Some("code"))
    {
        candidates.extend(classes(code));
    }
    candidates
        .into_iter()
        .filter(|c| c != "sourceCode" && c != "numberSource" && !c.is_empty())
        .map(|c| {
            c.strip_prefix("language-")
                .or_else(|| c.strip_prefix("lang-"))
                .map(str::to_string)
                .unwrap_or(c)
        })
        .next()
}

/// TeX source of a pandoc math span when it was written with delimiters
/// (`\(…\)` or `\[…\]`), e.g. by `--mathjax`.
pub fn math_source(span: &Handle) -> Option<String> {
    let text = text_content(span);
    let t = text.trim();
    t.strip_prefix("\\(")
        .and_then(|s| s.strip_suffix("\\)"))
        .or_else(|| t.strip_prefix("\\[").and_then(|s| s.strip_suffix("\\]")))
        .map(|s| s.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::html::{find_element, parse_html};

    fn first(html: &str, tag: &str) -> Handle {
        // Keep the DOM alive: dropping an RcDom detaches all descendants'
        // children, even for handles still held by the caller.
        let dom: &'static _ = Box::leak(Box::new(parse_html(html)));
        find_element(&dom.document, tag).expect(tag)
    }

    #[test]
    fn classifies_headings_by_level() {
        for level in 1..=6u8 {
            let tag = format!("h{level}");
            let node = first(&format!("<{tag}>x</{tag}>"), &tag);
            assert_eq!(classify(&node), ContentKind::Heading(level));
        }
    }

    #[test]
    fn classifies_containers() {
        let node = first(r#"<div class="warning">x</div>"#, "div");
        assert_eq!(classify(&node), ContentKind::Container(ContainerKind::Warning));

        let node = first(r#"<div data-custom-style="Note">x</div>"#, "div");
        assert_eq!(classify(&node), ContentKind::Container(ContainerKind::Info));

        let node = first(r#"<div class="sourceCode">x</div>"#, "div");
        assert_eq!(classify(&node), ContentKind::Block);
    }

    #[test]
    fn classifies_math_and_checkbox() {
        let node = first(r#"<span class="math display">x</span>"#, "span");
        assert_eq!(classify(&node), ContentKind::Math { display: true });
        assert!(classify(&node).is_block());

        let node = first(r#"<span class="math inline">x</span>"#, "span");
        assert_eq!(classify(&node), ContentKind::Math { display: false });

        let node = first(r#"<input type="checkbox" checked>"#, "input");
        assert_eq!(classify(&node), ContentKind::Checkbox);
    }

    #[test]
    fn head_content_is_removed() {
        let dom = parse_html("<html><head><meta charset=utf-8></head><body></body></html>");
        let head = find_element(&dom.document, "head").unwrap();
        assert_eq!(classify(&head), ContentKind::Removed);
    }

    #[test]
    fn rewrites_workspace_prefix() {
        let rw = ImageRewrite::new(Path::new("/tmp/ws"));
        assert_eq!(rw.apply("/tmp/ws/assets/a.png"), "./assets/a.png");
        assert_eq!(rw.apply("/tmp/ws"), ".");
    }

    #[test]
    fn trailing_separator_in_workspace() {
        let rw = ImageRewrite::new(Path::new("/tmp/ws/"));
        assert_eq!(rw.apply("/tmp/ws/assets/media/image1.png"), "./assets/media/image1.png");
    }

    #[test]
    fn requires_path_boundary() {
        let rw = ImageRewrite::new(Path::new("/tmp/ws"));
        assert_eq!(rw.rewrite("/tmp/wsx/assets/a.png"), None);
    }

    #[test]
    fn leaves_foreign_sources_alone() {
        let rw = ImageRewrite::new(Path::new("/tmp/ws"));
        for src in [
            "https://example.org/a.png",
            "assets/a.png",
            "./assets/a.png",
            "data:image/png;base64,AAAA",
            "/other/root/a.png",
        ] {
            assert_eq!(rw.apply(src), src);
        }
    }

    #[test]
    fn windows_separators_match() {
        let rw = ImageRewrite::new(Path::new("/tmp/ws"));
        assert_eq!(rw.apply("\\tmp\\ws\\assets\\a.png"), "./assets/a.png");
    }

    #[test]
    fn percent_encoded_spaces_match() {
        let rw = ImageRewrite::new(Path::new("/tmp/my docs"));
        assert_eq!(rw.apply("/tmp/my%20docs/assets/a.png"), "./assets/a.png");
        assert_eq!(rw.apply("/tmp/my docs/assets/a.png"), "./assets/a.png");
    }

    #[test]
    fn relative_workspace_matches_absolute_src() {
        let rw = ImageRewrite::new(Path::new("turnpress-rel-ws"));
        let abs = std::path::absolute("turnpress-rel-ws").unwrap();
        let src = format!("{}/assets/a.png", abs.to_string_lossy().replace('\\', "/"));
        assert_eq!(rw.apply(&src), "./assets/a.png");
    }

    #[test]
    fn complex_table_detection() {
        let simple = first("<table><tr><td><p>a</p></td><td>b</td></tr></table>", "table");
        assert!(!is_complex_table(&simple));

        let merged = first(r#"<table><tr><td colspan="2">a</td></tr></table>"#, "table");
        assert!(is_complex_table(&merged));

        let multi = first("<table><tr><td><p>a</p><p>b</p></td></tr></table>", "table");
        assert!(is_complex_table(&multi));

        let list = first("<table><tr><td><ul><li>a</li></ul></td></tr></table>", "table");
        assert!(is_complex_table(&list));
    }

    #[test]
    fn code_language_from_pandoc_classes() {
        let pre = first(
            r#"<pre class="sourceCode python"><code class="sourceCode python">x</code></pre>"#,
            "pre",
        );
        assert_eq!(code_language(&pre).as_deref(), Some("python"));

        let pre = first(r#"<pre><code class="language-rust">x</code></pre>"#, "pre");
        assert_eq!(code_language(&pre).as_deref(), Some("rust"));

        let pre = first("<pre><code>x</code></pre>", "pre");
        assert_eq!(code_language(&pre), None);
    }

    #[test]
    fn math_source_strips_delimiters() {
        let span = first(r#"<span class="math inline">\(x^2\)</span>"#, "span");
        assert_eq!(math_source(&span).as_deref(), Some("x^2"));

        let span = first(r#"<span class="math display">\[ \sum_i a_i \]</span>"#, "span");
        assert_eq!(math_source(&span).as_deref(), Some("\\sum_i a_i"));

        let span = first(r#"<span class="math inline"><em>x</em></span>"#, "span");
        assert_eq!(math_source(&span), None);
    }
}

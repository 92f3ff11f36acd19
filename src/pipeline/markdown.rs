//! Markdown rendering of a parsed HTML tree.
//!
//! [`MarkdownRenderer`] walks the DOM and hands each node to the handler
//! for its [`ContentKind`]. Block handlers return their text wrapped in
//! blank lines on both sides; the joins are left to
//! [`postprocess`](crate::pipeline::postprocess), which collapses the runs.
//! Inline handlers return text with no surrounding newlines.
//!
//! `<br>` renders as a private-use sentinel first and is expanded to a
//! backslash hard break only when the enclosing block is finished. Headings
//! and table cells, where a hard break is not allowed, see the sentinel and
//! substitute a space or `<br>` instead.

use crate::config::{MarkdownOptions, TableFallback};
use crate::pipeline::html::{
    attr, element_children, has_class, serialize_html, tag_name, text_content,
};
use crate::pipeline::postprocess::tidy_fragment;
use crate::pipeline::rules::{
    classify, code_language, is_complex_table, math_source, ContainerKind, ContentKind,
    ImageRewrite,
};
use markup5ever_rcdom::{Handle, NodeData};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

/// Placeholder for `<br>` until the enclosing block is complete.
const LINE_BREAK: char = '\u{E000}';

static RE_WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t\r\n\x0C]+").unwrap());
static RE_INLINE_SPECIAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"([\\`*_\[\]$])").unwrap());
static RE_HTML_OPEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"<([A-Za-z/!?])").unwrap());
static RE_ORDERED_START: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d+)([.)])(?: |$)").unwrap());
static RE_HARD_BREAK: Lazy<Regex> = Lazy::new(|| Regex::new("\u{E000}[ \t]*").unwrap());

/// Items rendered, for stats and logging.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RenderCounts {
    pub headings: usize,
    pub images: usize,
    pub images_rewritten: usize,
    pub tables: usize,
    pub html_tables: usize,
    pub containers: usize,
}

/// Renders a DOM tree to Markdown.
pub struct MarkdownRenderer<'a> {
    options: &'a MarkdownOptions,
    images: &'a ImageRewrite,
    counts: RenderCounts,
    in_list_item: bool,
    /// Longest container fence emitted since the enclosing container opened.
    container_fence: usize,
}

impl<'a> MarkdownRenderer<'a> {
    pub fn new(options: &'a MarkdownOptions, images: &'a ImageRewrite) -> Self {
        Self {
            options,
            images,
            counts: RenderCounts::default(),
            in_list_item: false,
            container_fence: 0,
        }
    }

    /// Render a node and everything below it. The output still needs
    /// [`clean_markdown`](crate::pipeline::postprocess::clean_markdown).
    pub fn render_document(&mut self, root: &Handle) -> String {
        let out = self.render_children(root);
        expand_breaks(&out)
    }

    pub fn counts(&self) -> &RenderCounts {
        &self.counts
    }

    pub fn into_counts(self) -> RenderCounts {
        self.counts
    }

    // ── Dispatch ─────────────────────────────────────────────────────────

    fn render_children(&mut self, node: &Handle) -> String {
        let children: Vec<Handle> = node.children.borrow().clone();
        self.render_nodes(&children)
    }

    /// Render siblings in order. Text next to a block sibling loses the
    /// whitespace on that side so it does not start or end a line with a
    /// space. A space is never doubled across a sibling boundary, and
    /// adjacent runs of the same emphasis merge into one.
    fn render_nodes(&mut self, nodes: &[Handle]) -> String {
        let kinds: Vec<ContentKind> = nodes.iter().map(classify).collect();
        let mut out = String::new();
        for (i, node) in nodes.iter().enumerate() {
            let rendered = self.render(node, kinds[i]);
            let mut piece = rendered.as_str();
            if kinds[i] == ContentKind::Text {
                if i > 0 && kinds[i - 1].is_block() {
                    piece = piece.trim_start();
                }
                if kinds.get(i + 1).is_some_and(|k| k.is_block()) {
                    piece = piece.trim_end();
                }
            }
            if out.ends_with(' ') {
                piece = piece.trim_start_matches(' ');
            }
            if let Some(delimiter) = kinds[i].delimiter() {
                if i > 0
                    && kinds[i - 1] == kinds[i]
                    && out.ends_with(delimiter)
                    && piece.starts_with(delimiter)
                {
                    out.truncate(out.len() - delimiter.len());
                    piece = &piece[delimiter.len()..];
                }
            }
            out.push_str(piece);
        }
        out
    }

    fn render(&mut self, node: &Handle, kind: ContentKind) -> String {
        match kind {
            ContentKind::Heading(level) => self.heading(node, level),
            ContentKind::Paragraph => block(&self.render_children(node)),
            ContentKind::Image => self.image(node),
            ContentKind::Link => self.link(node),
            ContentKind::Table => self.table(node),
            ContentKind::Container(kind) => self.container(node, kind),
            ContentKind::List { ordered } => self.list(node, ordered),
            ContentKind::ListItem => block(&self.render_children(node)),
            ContentKind::Blockquote => self.blockquote(node),
            ContentKind::CodeBlock => self.code_block(node),
            ContentKind::InlineCode => inline_code(&text_content(node)),
            ContentKind::Strong | ContentKind::Emphasis | ContentKind::Strikethrough => {
                let delimiter = kind.delimiter().unwrap_or_default();
                wrap_inline(&self.render_children(node), delimiter)
            }
            ContentKind::Superscript => format!("<sup>{}</sup>", self.render_children(node)),
            ContentKind::Subscript => format!("<sub>{}</sub>", self.render_children(node)),
            ContentKind::Math { display } => self.math(node, display),
            ContentKind::Checkbox => {
                if attr(node, "checked").is_some() {
                    "[x] ".to_string()
                } else {
                    "[ ] ".to_string()
                }
            }
            ContentKind::LineBreak => LINE_BREAK.to_string(),
            ContentKind::Rule => block("---"),
            ContentKind::Text => match &node.data {
                NodeData::Text { contents } => escape_text(&contents.borrow()),
                _ => String::new(),
            },
            ContentKind::Removed => String::new(),
            ContentKind::Block => block(&self.render_children(node)),
            ContentKind::Other => self.render_children(node),
        }
    }

    // ── Block handlers ───────────────────────────────────────────────────

    fn heading(&mut self, node: &Handle, level: u8) -> String {
        let text = single_line(&self.render_children(node), " ");
        if text.is_empty() {
            return String::new();
        }
        self.counts.headings += 1;
        block(&format!("{} {}", "#".repeat(level as usize), text))
    }

    /// A container's fence is one colon longer than the longest fence
    /// nested inside it, so an inner `:::` cannot close the outer block.
    fn container(&mut self, node: &Handle, kind: ContainerKind) -> String {
        self.counts.containers += 1;
        let outer_fence = std::mem::take(&mut self.container_fence);

        let children: Vec<Handle> = node.children.borrow().clone();
        let title_at = children.iter().position(|c| {
            matches!(tag_name(c), Some("p") | Some("div")) && has_class(c, "title")
        });
        let title = title_at
            .map(|i| single_line(&self.render_children(&children[i]), " "))
            .filter(|t| !t.is_empty());
        let body_nodes: Vec<Handle> = children
            .into_iter()
            .enumerate()
            .filter(|(i, _)| Some(*i) != title_at)
            .map(|(_, c)| c)
            .collect();
        let body = tidy_fragment(&expand_breaks(&self.render_nodes(&body_nodes)));

        let fence = ":".repeat((self.container_fence + 1).max(3));
        self.container_fence = outer_fence.max(fence.len());

        let mut out = format!("{fence} {}", kind.name());
        if let Some(title) = title {
            out.push(' ');
            out.push_str(&title);
        }
        out.push('\n');
        if !body.is_empty() {
            out.push_str(&body);
            out.push('\n');
        }
        out.push_str(&fence);
        block(&out)
    }

    fn list(&mut self, node: &Handle, ordered: bool) -> String {
        let nested = self.in_list_item;
        let start: usize = attr(node, "start")
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(1);
        let bullet = self.options.bullet_marker.as_char();

        let mut items = Vec::new();
        for (i, li) in element_children(node)
            .iter()
            .filter(|c| tag_name(c) == Some("li"))
            .enumerate()
        {
            let marker = if ordered {
                format!("{}. ", start.saturating_add(i))
            } else {
                format!("{bullet} ")
            };
            self.in_list_item = true;
            let content = tidy_fragment(&expand_breaks(&self.render_children(li)));
            self.in_list_item = nested;
            items.push(format!("{marker}{}", indent_continuation(&content, marker.len())));
        }
        if items.is_empty() {
            return String::new();
        }

        let body = items.join("\n");
        if nested {
            // Tight inside the parent item: no blank line before the sublist.
            format!("\n{body}\n")
        } else {
            block(&body)
        }
    }

    fn blockquote(&mut self, node: &Handle) -> String {
        let content = tidy_fragment(&expand_breaks(&self.render_children(node)));
        if content.is_empty() {
            return String::new();
        }
        let quoted = content
            .lines()
            .map(|l| if l.is_empty() { ">".to_string() } else { format!("> {l}") })
            .collect::<Vec<_>>()
            .join("\n");
        block(&quoted)
    }

    fn code_block(&mut self, node: &Handle) -> String {
        let text = text_content(node);
        let code = text.strip_suffix('\n').unwrap_or(&text);
        let c = self.options.code_fence.as_char();
        let longest = longest_run(code, c);
        let fence: String = std::iter::repeat_n(c, (longest + 1).max(3)).collect();
        let lang = code_language(node).unwrap_or_default();
        block(&format!("{fence}{lang}\n{code}\n{fence}"))
    }

    fn math(&mut self, node: &Handle, display: bool) -> String {
        match (math_source(node), display) {
            (Some(tex), true) => block(&format!("$$\n{tex}\n$$")),
            (Some(tex), false) => format!("${tex}$"),
            (None, true) => block(&self.render_children(node)),
            (None, false) => self.render_children(node),
        }
    }

    fn table(&mut self, node: &Handle) -> String {
        self.counts.tables += 1;
        if self.options.table_fallback == TableFallback::Html && is_complex_table(node) {
            self.counts.html_tables += 1;
            return block(&serialize_html(node));
        }

        let mut caption = None;
        let mut rows: Vec<Handle> = Vec::new();
        for child in element_children(node) {
            let name = tag_name(&child).unwrap_or_default().to_string();
            match name.as_str() {
                "caption" => caption = Some(child),
                "thead" | "tbody" | "tfoot" => rows.extend(
                    element_children(&child)
                        .into_iter()
                        .filter(|r| tag_name(r) == Some("tr")),
                ),
                "tr" => rows.push(child),
                _ => {}
            }
        }

        let mut cells: Vec<Vec<String>> = Vec::new();
        let mut aligns: Vec<Option<Align>> = Vec::new();
        for row in &rows {
            let mut line = Vec::new();
            for (col, cell) in element_children(row)
                .iter()
                .filter(|c| matches!(tag_name(c), Some("td") | Some("th")))
                .enumerate()
            {
                if aligns.len() <= col {
                    aligns.resize(col + 1, None);
                }
                if aligns[col].is_none() {
                    aligns[col] = cell_alignment(cell);
                }
                let text = single_line(&self.render_children(cell), "<br>");
                line.push(text.replace('|', "\\|"));
            }
            cells.push(line);
        }

        let columns = cells.iter().map(Vec::len).max().unwrap_or(0);
        if columns == 0 {
            return String::new();
        }
        for row in &mut cells {
            row.resize(columns, String::new());
        }
        let widths: Vec<usize> = (0..columns)
            .map(|c| {
                cells
                    .iter()
                    .map(|r| r[c].chars().count())
                    .max()
                    .unwrap_or(0)
                    .max(3)
            })
            .collect();

        let mut lines = Vec::with_capacity(cells.len() + 1);
        for (i, row) in cells.iter().enumerate() {
            lines.push(table_row(row, &widths));
            if i == 0 {
                let sep: Vec<String> = widths
                    .iter()
                    .enumerate()
                    .map(|(c, w)| separator(aligns.get(c).copied().flatten(), *w))
                    .collect();
                lines.push(format!("| {} |", sep.join(" | ")));
            }
        }

        let mut out = String::new();
        if let Some(caption) = caption {
            let text = single_line(&self.render_children(&caption), " ");
            if !text.is_empty() {
                out.push_str(&text);
                out.push_str("\n\n");
            }
        }
        out.push_str(&lines.join("\n"));
        block(&out)
    }

    // ── Inline handlers ──────────────────────────────────────────────────

    fn image(&mut self, node: &Handle) -> String {
        self.counts.images += 1;
        let src = attr(node, "src").unwrap_or_default();
        let src = match self.images.rewrite(&src) {
            Some(rewritten) => {
                self.counts.images_rewritten += 1;
                rewritten
            }
            None => src,
        };
        let alt = attr(node, "alt")
            .map(|a| escape_label(&collapse_whitespace(&a)))
            .unwrap_or_default();
        format!("![{alt}]({}{})", destination(&src), title_suffix(node))
    }

    fn link(&mut self, node: &Handle) -> String {
        let content = self.render_children(node);
        let href = attr(node, "href").unwrap_or_default();
        if content.trim().is_empty() {
            return String::new();
        }
        if href.is_empty() {
            return content;
        }
        let is_url = href.starts_with("http://")
            || href.starts_with("https://")
            || href.starts_with("mailto:");
        if is_url && text_content(node).trim() == href && attr(node, "title").is_none() {
            return format!("<{href}>");
        }
        format!("[{}]({}{})", content.trim(), destination(&href), title_suffix(node))
    }
}

// ── Helpers ──────────────────────────────────────────────────────────────

/// Wrap finished block content in blank lines.
fn block(content: &str) -> String {
    let trimmed = content.trim_matches(|c: char| c.is_whitespace() || c == LINE_BREAK);
    if trimmed.is_empty() {
        return String::new();
    }
    format!("\n\n{}\n\n", expand_breaks(trimmed))
}

fn expand_breaks(s: &str) -> String {
    RE_HARD_BREAK.replace_all(s, "\\\n").to_string()
}

/// Flatten to one line for headings and table cells; `br` is what a line
/// break becomes.
fn single_line(s: &str, br: &str) -> String {
    let s = s.replace("\\\n", &LINE_BREAK.to_string());
    let s = collapse_whitespace(&s);
    let s = s.trim_matches(|c: char| c == ' ' || c == LINE_BREAK);
    s.replace(&format!(" {LINE_BREAK} "), &LINE_BREAK.to_string())
        .replace(LINE_BREAK, br)
}

fn collapse_whitespace(s: &str) -> String {
    RE_WHITESPACE.replace_all(s, " ").to_string()
}

/// Collapse whitespace and escape Markdown syntax in a text node.
fn escape_text(raw: &str) -> String {
    let collapsed = collapse_whitespace(raw);
    let escaped = RE_INLINE_SPECIAL
        .replace_all(&collapsed, r"\${1}")
        .into_owned();
    let escaped = RE_HTML_OPEN.replace_all(&escaped, r"\<${1}").into_owned();
    let body = escaped.trim_start_matches(' ');
    let lead = &escaped[..escaped.len() - body.len()];
    format!("{lead}{}", escape_line_start(body))
}

/// Escape what would start a block construct at the beginning of a line.
fn escape_line_start(s: &str) -> String {
    if let Some(caps) = RE_ORDERED_START.captures(s) {
        let digits = &caps[1];
        return format!("{digits}\\{}", &s[digits.len()..]);
    }
    let mut chars = s.chars();
    match (chars.next(), chars.next()) {
        (Some('#' | '>' | '='), _) => format!("\\{s}"),
        (Some('-' | '+'), None | Some(' ' | '-')) => format!("\\{s}"),
        _ => s.to_string(),
    }
}

fn escape_label(s: &str) -> String {
    s.replace('\\', "\\\\").replace('[', "\\[").replace(']', "\\]")
}

/// Link/image destination, angle-bracketed when it would break the syntax.
fn destination(url: &str) -> String {
    if url.contains([' ', '(', ')', '<', '>']) {
        format!("<{}>", url.replace('<', "%3C").replace('>', "%3E"))
    } else {
        url.to_string()
    }
}

fn title_suffix(node: &Handle) -> String {
    match attr(node, "title") {
        Some(t) if !t.trim().is_empty() => {
            format!(" \"{}\"", collapse_whitespace(&t).replace('"', "\\\""))
        }
        _ => String::new(),
    }
}

/// Move surrounding whitespace outside the delimiters; `** x**` is not
/// emphasis in CommonMark. Block content gets the delimiters inside each
/// paragraph, since emphasis cannot span a blank line.
fn wrap_inline(content: &str, delimiter: &str) -> String {
    let inner = content.trim_matches(|c: char| c.is_whitespace() || c == LINE_BREAK);
    if inner.is_empty() {
        return content.to_string();
    }
    let start = content.find(inner).unwrap_or(0);
    let lead = &content[..start];
    let trail = &content[start + inner.len()..];
    let wrapped = inner
        .split("\n\n")
        .map(|para| {
            let para = para.trim();
            if para.is_empty() {
                String::new()
            } else {
                format!("{delimiter}{para}{delimiter}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n\n");
    format!("{lead}{wrapped}{trail}")
}

fn inline_code(raw: &str) -> String {
    let code = raw.replace(['\n', '\r'], " ");
    if code.is_empty() {
        return String::new();
    }
    let ticks: String = "`".repeat(longest_run(&code, '`') + 1);
    let pad = if code.starts_with('`') || code.ends_with('`') {
        " "
    } else {
        ""
    };
    format!("{ticks}{pad}{code}{pad}{ticks}")
}

fn longest_run(s: &str, c: char) -> usize {
    let mut best = 0;
    let mut current = 0;
    for ch in s.chars() {
        if ch == c {
            current += 1;
            best = best.max(current);
        } else {
            current = 0;
        }
    }
    best
}

fn indent_continuation(content: &str, width: usize) -> String {
    let pad = " ".repeat(width);
    content
        .split('\n')
        .enumerate()
        .map(|(i, line)| {
            if i == 0 || line.is_empty() {
                line.to_string()
            } else {
                format!("{pad}{line}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Align {
    Left,
    Center,
    Right,
}

fn cell_alignment(cell: &Handle) -> Option<Align> {
    let from_style = attr(cell, "style").and_then(|style| {
        style.split(';').find_map(|decl| {
            let (prop, value) = decl.split_once(':')?;
            (prop.trim().eq_ignore_ascii_case("text-align")).then(|| value.trim().to_ascii_lowercase())
        })
    });
    match from_style.or_else(|| attr(cell, "align").map(|a| a.to_ascii_lowercase()))?.as_str() {
        "left" => Some(Align::Left),
        "center" => Some(Align::Center),
        "right" => Some(Align::Right),
        _ => None,
    }
}

fn separator(align: Option<Align>, width: usize) -> String {
    match align {
        Some(Align::Left) => format!(":{}", "-".repeat(width - 1)),
        Some(Align::Center) => format!(":{}:", "-".repeat(width - 2)),
        Some(Align::Right) => format!("{}:", "-".repeat(width - 1)),
        None => "-".repeat(width),
    }
}

fn table_row(cells: &[String], widths: &[usize]) -> String {
    let padded: Vec<String> = cells
        .iter()
        .zip(widths)
        .map(|(cell, w)| {
            let fill = w.saturating_sub(cell.chars().count());
            format!("{cell}{}", " ".repeat(fill))
        })
        .collect();
    format!("| {} |", padded.join(" | "))
}

//! Post-processing: deterministic cleanup of the rendered Markdown.
//!
//! The renderer separates every block with a blank line on both sides and
//! leaves the joins to this pass, so adjacent blocks produce runs of blank
//! lines that are collapsed here. pandoc also passes through whatever the
//! Word document carried: CRLF line endings in code, zero-width joiners,
//! soft hyphens.
//!
//! Fenced code blocks are copied through untouched by the whitespace rules;
//! blank lines and trailing spaces inside them can be significant.
//!
//! ## Rule Order
//!
//! Line endings are normalised first so fence detection sees `\n` only.
//! Leading blank lines and the final newline are handled last.

use once_cell::sync::Lazy;
use regex::Regex;

/// Apply all post-processing rules to rendered Markdown.
///
/// Rules (applied in order):
/// 1. Normalise line endings (CRLF → LF)
/// 2. Strip invisible Unicode (zero-width spaces, BOM, soft hyphens, etc.)
/// 3. Trim trailing whitespace per line, outside fenced code
/// 4. Collapse consecutive blank lines to one, outside fenced code
/// 5. Drop leading blank lines
/// 6. Ensure the file ends with exactly one newline
pub fn clean_markdown(input: &str) -> String {
    let s = normalise_line_endings(input);
    let s = remove_invisible_chars(&s);
    let s = trim_trailing_whitespace(&s);
    let s = collapse_blank_lines(&s);
    let s = trim_leading_blank_lines(&s);
    ensure_final_newline(s)
}

/// Tidy a rendered fragment before it is nested (list item, blockquote,
/// container body): rules 3 and 4, then surrounding blank lines removed.
pub fn tidy_fragment(input: &str) -> String {
    let s = trim_trailing_whitespace(input);
    let s = collapse_blank_lines(&s);
    s.trim_matches('\n').to_string()
}

// ── Fence tracking ───────────────────────────────────────────────────────

/// Fence character and run length when `line` opens or closes a fence.
fn fence_marker(line: &str) -> Option<(char, usize)> {
    let t = line.trim_start();
    let c = t.chars().next().filter(|c| *c == '`' || *c == '~')?;
    let n = t.chars().take_while(|x| *x == c).count();
    (n >= 3).then_some((c, n))
}

/// Split into lines, each tagged with whether it is fenced code content.
/// The fence lines themselves count as outside.
fn tag_lines(input: &str) -> Vec<(&str, bool)> {
    let mut open: Option<(char, usize)> = None;
    input
        .split('\n')
        .map(|line| match (open, fence_marker(line)) {
            (None, Some(marker)) => {
                open = Some(marker);
                (line, false)
            }
            (Some((c, n)), Some((c2, n2)))
                if c == c2 && n2 >= n && line.trim().trim_start_matches(c).is_empty() =>
            {
                open = None;
                (line, false)
            }
            (Some(_), _) => (line, true),
            (None, None) => (line, false),
        })
        .collect()
}

// ── Rule 1: Normalise line endings ───────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Rule 2: Remove invisible Unicode characters ──────────────────────────

fn remove_invisible_chars(input: &str) -> String {
    input.replace(
        [
            '\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{200D}', '\u{2060}',
        ],
        "",
    )
}

// ── Rule 3: Trim trailing whitespace per line ────────────────────────────

fn trim_trailing_whitespace(input: &str) -> String {
    tag_lines(input)
        .into_iter()
        .map(|(line, fenced)| if fenced { line } else { line.trim_end() })
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Rule 4: Collapse blank lines ─────────────────────────────────────────

fn collapse_blank_lines(input: &str) -> String {
    let mut result: Vec<&str> = Vec::new();
    let mut previous_blank = false;
    for (line, fenced) in tag_lines(input) {
        let blank = !fenced && line.trim().is_empty();
        if blank && previous_blank {
            continue;
        }
        result.push(if blank { "" } else { line });
        previous_blank = blank;
    }
    result.join("\n")
}

// ── Rule 5: Drop leading blank lines ─────────────────────────────────────

static RE_LEADING_BLANK: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(?:[ \t]*\n)+").unwrap());

fn trim_leading_blank_lines(input: &str) -> String {
    RE_LEADING_BLANK.replace(input, "").to_string()
}

// ── Rule 6: Ensure file ends with single newline ─────────────────────────

fn ensure_final_newline(input: String) -> String {
    let trimmed = input.trim_end_matches(['\n', ' ', '\t']);
    if trimmed.is_empty() {
        String::from("\n")
    } else {
        format!("{}\n", trimmed)
    }
}

// ── Tests ────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalise_line_endings() {
        assert_eq!(normalise_line_endings("a\r\nb\rc"), "a\nb\nc");
    }

    #[test]
    fn test_remove_invisible() {
        let input = "hello\u{200B}world\u{FEFF}foo\u{00AD}bar";
        assert_eq!(remove_invisible_chars(input), "helloworldfoobar");
    }

    #[test]
    fn test_trim_trailing_whitespace() {
        assert_eq!(
            trim_trailing_whitespace("  hello   \nworld  "),
            "  hello\nworld"
        );
    }

    #[test]
    fn test_trailing_whitespace_kept_in_fence() {
        let input = "text  \n```\ncode  \n```\nafter ";
        assert_eq!(trim_trailing_whitespace(input), "text\n```\ncode  \n```\nafter");
    }

    #[test]
    fn test_collapse_blank_lines() {
        let input = "a\n\n\n\n\n\nb";
        assert_eq!(collapse_blank_lines(input), "a\n\nb");
    }

    #[test]
    fn test_whitespace_only_lines_count_as_blank() {
        assert_eq!(collapse_blank_lines("a\n  \n\t\n\nb"), "a\n\nb");
    }

    #[test]
    fn test_blank_lines_kept_in_fence() {
        let input = "```python\nx = 1\n\n\n\ny = 2\n```\n\n\n\nafter";
        assert_eq!(
            collapse_blank_lines(input),
            "```python\nx = 1\n\n\n\ny = 2\n```\n\nafter"
        );
    }

    #[test]
    fn test_tilde_fence_not_closed_by_backticks() {
        let input = "~~~\n```\n\n\n~~~\n\n\nx";
        assert_eq!(collapse_blank_lines(input), "~~~\n```\n\n\n~~~\n\nx");
    }

    #[test]
    fn test_indented_fence_in_list_item() {
        let input = "- item\n\n  ```\n  a\n\n\n  b\n  ```";
        assert_eq!(collapse_blank_lines(input), input);
    }

    #[test]
    fn test_ensure_final_newline() {
        assert_eq!(ensure_final_newline("hello".into()), "hello\n");
        assert_eq!(ensure_final_newline("hello\n\n\n".into()), "hello\n");
        assert_eq!(ensure_final_newline(String::new()), "\n");
    }

    #[test]
    fn test_leading_blank_lines_dropped() {
        assert_eq!(trim_leading_blank_lines("\n\n  \n# Hi"), "# Hi");
        assert_eq!(trim_leading_blank_lines("    indented"), "    indented");
    }

    #[test]
    fn test_tidy_fragment() {
        assert_eq!(tidy_fragment("\n\na  \n\n\n\nb\n\n"), "a\n\nb");
    }

    #[test]
    fn test_clean_markdown_full_pipeline() {
        let input = "\n\n# Title\r\n\r\n\n\nSome\u{200B} text   \n\n\n\n\n\n## Section\n\n";
        assert_eq!(clean_markdown(input), "# Title\n\nSome text\n\n## Section\n");
    }
}

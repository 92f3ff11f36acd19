//! HTML loading: parse pandoc's standalone page into an `RcDom` and strip
//! what is not content.
//!
//! pandoc's `-s` output carries a `<title>` (the document title, or the file
//! name when there is none) and an embedded `<style>` block. Neither belongs
//! in the Markdown, and both would otherwise leak through as text, so they
//! are detached from the tree before rendering.

use html5ever::parse_document;
use html5ever::tendril::TendrilSink;
use markup5ever_rcdom::{Handle, NodeData, RcDom};

/// Elements removed before rendering.
pub const NON_CONTENT_ELEMENTS: [&str; 2] = ["title", "style"];

const VOID_ELEMENTS: [&str; 14] = [
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

/// Parse a full HTML document.
pub fn parse_html(html: &str) -> RcDom {
    parse_document(RcDom::default(), Default::default()).one(html)
}

/// Detach every `<title>` and `<style>` element. Returns how many were removed.
pub fn strip_non_content(dom: &RcDom) -> usize {
    remove_elements(&dom.document, &NON_CONTENT_ELEMENTS)
}

fn remove_elements(node: &Handle, names: &[&str]) -> usize {
    let mut removed = 0;
    node.children.borrow_mut().retain(|child| {
        let drop = tag_name(child).is_some_and(|t| names.contains(&t));
        if drop {
            removed += 1;
        }
        !drop
    });
    for child in node.children.borrow().iter() {
        removed += remove_elements(child, names);
    }
    removed
}

/// Local name of an element, `None` for text, comments and the document.
pub fn tag_name(node: &Handle) -> Option<&str> {
    match &node.data {
        NodeData::Element { name, .. } => Some(&*name.local),
        _ => None,
    }
}

/// Attribute value by local name.
pub fn attr(node: &Handle, key: &str) -> Option<String> {
    match &node.data {
        NodeData::Element { attrs, .. } => attrs
            .borrow()
            .iter()
            .find(|a| (&*a.name.local).eq_ignore_ascii_case(key))
            .map(|a| a.value.to_string()),
        _ => None,
    }
}

/// Whitespace-separated `class` attribute entries.
pub fn classes(node: &Handle) -> Vec<String> {
    attr(node, "class")
        .map(|c| c.split_whitespace().map(str::to_string).collect())
        .unwrap_or_default()
}

pub fn has_class(node: &Handle, class: &str) -> bool {
    classes(node).iter().any(|c| c == class)
}

/// Element children only.
pub fn element_children(node: &Handle) -> Vec<Handle> {
    node.children
        .borrow()
        .iter()
        .filter(|c| matches!(c.data, NodeData::Element { .. }))
        .cloned()
        .collect()
}

/// Concatenated text of all descendants, verbatim.
pub fn text_content(node: &Handle) -> String {
    let mut out = String::new();
    collect_text(node, &mut out);
    out
}

fn collect_text(node: &Handle, out: &mut String) {
    match &node.data {
        NodeData::Text { contents } => out.push_str(&contents.borrow()),
        _ => {
            for child in node.children.borrow().iter() {
                collect_text(child, out);
            }
        }
    }
}

/// First descendant element (depth-first, including `node`) with this name.
pub fn find_element(node: &Handle, name: &str) -> Option<Handle> {
    if tag_name(node) == Some(name) {
        return Some(node.clone());
    }
    node.children
        .borrow()
        .iter()
        .find_map(|c| find_element(c, name))
}

/// Serialise an element and its subtree back to HTML.
pub fn serialize_html(node: &Handle) -> String {
    let mut out = String::new();
    serialize_node(&mut out, node);
    out
}

fn serialize_node(out: &mut String, node: &Handle) {
    match &node.data {
        NodeData::Text { contents } => out.push_str(&esc_text(&contents.borrow())),
        NodeData::Element { name, attrs, .. } => {
            let tag = &*name.local;
            out.push('<');
            out.push_str(tag);
            for a in attrs.borrow().iter() {
                out.push(' ');
                out.push_str(&a.name.local);
                out.push_str("=\"");
                out.push_str(&esc_attr(&a.value));
                out.push('"');
            }
            out.push('>');
            if VOID_ELEMENTS.contains(&tag) {
                return;
            }
            for child in node.children.borrow().iter() {
                serialize_node(out, child);
            }
            out.push_str("</");
            out.push_str(tag);
            out.push('>');
        }
        NodeData::Document => {
            for child in node.children.borrow().iter() {
                serialize_node(out, child);
            }
        }
        _ => {}
    }
}

fn esc_text(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

fn esc_attr(s: &str) -> String {
    s.replace('&', "&amp;").replace('"', "&quot;")
}

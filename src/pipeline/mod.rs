//! Pipeline stages for docx-to-Markdown conversion.
//!
//! Each submodule implements one step. The two pandoc invocations live in
//! [`pandoc`]; everything after them is pure string and tree work and can be
//! driven without pandoc installed.
//!
//! ## Data Flow
//!
//! ```text
//! docx ──▶ pandoc 1a ──▶ temp.md ──▶ pandoc 1b ──▶ temp.html
//!          (+ assets/)                               │
//!                                                    ▼
//! temp.md ◀── postprocess ◀── markdown ◀── rules ◀── html
//! ```
//!
//! 1. [`filter`]  : resolve the heading-numbering Lua filter to a path
//! 2. [`pandoc`]  : check prerequisites, run docx → markdown → html
//! 3. [`html`]    : parse with html5ever, drop `<title>` and `<style>`
//! 4. [`rules`]   : classify each node into a [`rules::ContentKind`]
//! 5. [`markdown`]: one handler per kind
//! 6. [`postprocess`]: whitespace cleanup outside fenced code
//! 7. [`transform`]: steps 3 to 6 plus the file I/O

pub mod filter;
pub mod html;
pub mod markdown;
pub mod pandoc;
pub mod postprocess;
pub mod rules;
pub mod transform;

//! CLI output formatting for `build` and `check`.
//!
//! # Information-First Display
//!
//! Every page is shown by its semantic identity first (position, title,
//! label) with filesystem paths as indented context lines, so the output
//! reads as a table of contents you can trace back to source files.
//!
//! # Output Format
//!
//! ## Build
//!
//! ```text
//! Pages
//! 001 License [1] → license/index.html
//!     Source: license/index.md
//! 002 Introduction [2] → intro/index.html
//!     Source: intro/index.md
//!     Next: Notes
//! 003 Notes [A] → notes/index.html
//!     Source: notes/index.md
//!     Previous: Introduction
//!
//! Assets
//!     intro/hello.py
//!     static/site.css
//!
//! Built 3 pages, 2 links, 2 assets → docs
//! ```
//!
//! ## Check
//!
//! Same page and asset listing with `Would copy` in place of `Assets`, and a
//! closing `Book is valid` line.
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format functions
//! are pure: no I/O, no side effects.

use crate::numbering::Numbering;
use crate::registry::{Page, PageKind};
use crate::site::{BuildSummary, CheckSummary};
use std::path::{Path, PathBuf};

// ============================================================================
// Shared display helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Path relative to `base` when possible, for shorter display.
fn display_relative(path: &Path, base: &Path) -> String {
    path.strip_prefix(base)
        .unwrap_or(path)
        .display()
        .to_string()
}

fn plural(count: usize, one: &str, many: &str) -> String {
    if count == 1 {
        format!("{count} {one}")
    } else {
        format!("{count} {many}")
    }
}

/// Page header: position, title, label and output path.
///
/// ```text
/// 002 Introduction [2] → intro/index.html
/// 001 License (extra) → license/index.html     // no label known
/// ```
fn page_header(page: &Page, numbering: &Numbering) -> String {
    let label = match numbering.get(&page.slug) {
        Some(label) => format!(" [{label}]"),
        None if page.kind == PageKind::Extra => " (extra)".to_string(),
        None => String::new(),
    };
    format!(
        "{} {}{} \u{2192} {}",
        format_index(page.index + 1),
        page.title(),
        label,
        page.output.display()
    )
}

// ============================================================================
// Pages and assets
// ============================================================================

/// Format the page listing shared by `build` and `check`.
pub fn format_pages(pages: &[Page], numbering: &Numbering, root: &Path) -> Vec<String> {
    let mut lines = vec!["Pages".to_string()];
    for page in pages {
        lines.push(page_header(page, numbering));
        lines.push(format!(
            "{}Source: {}",
            indent(1),
            display_relative(&page.source, root)
        ));
        if let Some(prev) = page.previous.and_then(|i| pages.get(i)) {
            lines.push(format!("{}Previous: {}", indent(1), prev.title()));
        }
        if let Some(next) = page.next.and_then(|i| pages.get(i)) {
            lines.push(format!("{}Next: {}", indent(1), next.title()));
        }
    }
    lines
}

fn format_assets(heading: &str, assets: &[PathBuf]) -> Vec<String> {
    if assets.is_empty() {
        return Vec::new();
    }
    let mut lines = vec![String::new(), heading.to_string()];
    lines.extend(
        assets
            .iter()
            .map(|a| format!("{}{}", indent(1), a.display())),
    );
    lines
}

// ============================================================================
// Commands
// ============================================================================

/// Format the result of a full build.
pub fn format_build_output(summary: &BuildSummary, root: &Path) -> Vec<String> {
    let mut lines = format_pages(&summary.pages, &summary.numbering, root);
    lines.extend(format_assets("Assets", &summary.assets));
    lines.push(String::new());
    lines.push(format!(
        "Built {}, {}, {} \u{2192} {}",
        plural(summary.pages.len(), "page", "pages"),
        plural(summary.link_count, "link", "links"),
        plural(summary.assets.len(), "asset", "assets"),
        summary.output.display()
    ));
    lines
}

/// Print build output to stdout.
pub fn print_build_output(summary: &BuildSummary, root: &Path) {
    for line in format_build_output(summary, root) {
        println!("{}", line);
    }
}

/// Format the result of a check run.
pub fn format_check_output(summary: &CheckSummary, root: &Path) -> Vec<String> {
    let mut lines = format_pages(&summary.pages, &summary.numbering, root);
    lines.extend(format_assets("Would copy", &summary.assets));
    lines.push(String::new());
    lines.push(format!(
        "Book is valid: {}, {}",
        plural(summary.pages.len(), "page", "pages"),
        plural(summary.link_count, "link", "links"),
    ));
    lines
}

/// Print check output to stdout.
pub fn print_check_output(summary: &CheckSummary, root: &Path) {
    for line in format_check_output(summary, root) {
        println!("{}", line);
    }
}

/// An error and each of its causes, one per line.
///
/// ```text
/// error: template error in page 'intro'
///     caused by: Failed to render '__tera_one_off'
///     caused by: Function call 'include' failed
/// ```
pub fn format_error(err: &dyn std::error::Error) -> Vec<String> {
    let mut lines = vec![format!("error: {err}")];
    let mut source = err.source();
    while let Some(cause) = source {
        lines.push(format!("{}caused by: {cause}", indent(1)));
        source = cause.source();
    }
    lines
}

/// Print an error chain to stderr.
pub fn print_error(err: &dyn std::error::Error) {
    for line in format_error(err) {
        eprintln!("{}", line);
    }
}

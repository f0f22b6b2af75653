//! Page numbering table for the built site.
//!
//! Maps every page slug to its display label so client-side scripts can turn
//! a cross-reference like `<a href="../tools/">` into "Chapter 3" or
//! "Appendix B" without the compiler rewriting links.
//!
//! Numbering is derived from the config groups, not from the previous/next
//! chain: extras get numbers (but are never chained), appendices get letters.
//!
//! Written to `<output>/numbering.js`:
//!
//! ```text
//! const NUMBERING = {
//!   "intro": "1",
//!   "notes": "A"
//! };
//! ```

use crate::config::Config;
use crate::naming::{letter_label, ordinal_label};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const NUMBERING_FILE: &str = "numbering.js";

#[derive(Error, Debug)]
pub enum NumberingError {
    #[error("cannot write {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Slug → display label.
pub type Numbering = BTreeMap<String, String>;

/// Compute labels: `1..` over extras ++ chapters, `A..` over appendices.
///
/// Entries without a slug are skipped; the registry rejects them before this
/// runs in a real build.
pub fn build_numbering(config: &Config) -> Numbering {
    let numbered = config
        .extras
        .iter()
        .chain(&config.chapters)
        .enumerate()
        .filter_map(|(i, entry)| entry.slug.clone().map(|slug| (slug, ordinal_label(i))));
    let lettered = config
        .appendices
        .iter()
        .enumerate()
        .filter_map(|(i, entry)| entry.slug.clone().map(|slug| (slug, letter_label(i))));
    numbered.chain(lettered).collect()
}

/// The `numbering.js` source for a table.
pub fn render_numbering(numbering: &Numbering) -> Result<String, NumberingError> {
    let json = serde_json::to_string_pretty(numbering)?;
    Ok(format!("const NUMBERING = {json};\n"))
}

/// Write `numbering.js` into the output directory. Returns the written path.
pub fn write_numbering(output_dir: &Path, numbering: &Numbering) -> Result<PathBuf, NumberingError> {
    let path = output_dir.join(NUMBERING_FILE);
    let text = render_numbering(numbering)?;
    fs::write(&path, text).map_err(|source| NumberingError::Io {
        path: path.clone(),
        source,
    })?;
    Ok(path)
}

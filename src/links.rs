//! Shared link definitions.
//!
//! The links document is a YAML list of `{slug, url}` entries:
//!
//! ```yaml
//! - slug: rust
//!   url: https://www.rust-lang.org/
//! - slug: cmark
//!   url: https://commonmark.org/
//! ```
//!
//! Every entry becomes one Markdown reference definition (`[rust]: https://...`)
//! and the whole block is appended to every page before Markdown conversion, so
//! pages can write `[Rust][rust]` without repeating URLs. Nothing is deduplicated
//! or validated; when a label repeats, the Markdown engine's own resolution
//! applies (the first definition wins).

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LinksError {
    #[error("cannot read links {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid links document {path}: {source}")]
    Yaml {
        path: PathBuf,
        source: serde_yaml::Error,
    },
}

/// A single `(label, url)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkEntry {
    pub slug: String,
    pub url: String,
}

/// Read the links document. An empty file yields no links.
pub fn load_links(path: &Path) -> Result<Vec<LinkEntry>, LinksError> {
    let content = fs::read_to_string(path).map_err(|source| LinksError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    if content.trim().is_empty() {
        return Ok(Vec::new());
    }
    serde_yaml::from_str(&content).map_err(|source| LinksError::Yaml {
        path: path.to_path_buf(),
        source,
    })
}

/// Render entries as Markdown reference definitions, one per line, in order.
pub fn link_table(links: &[LinkEntry]) -> String {
    links
        .iter()
        .map(|link| format!("[{}]: {}\n", link.slug, link.url))
        .collect()
}

//! Book configuration module.
//!
//! Handles loading and validating `folio.toml`. The configuration is read once
//! at startup and is read-only for the rest of the run, except that the
//! resolved link list is attached to it after the links document is loaded.
//!
//! ## Config File
//!
//! ```toml
//! root = "src"              # Source tree (page sources, includes, assets)
//! output = "docs"           # Output directory, wiped on every build
//! links = "links.yml"       # Optional links document
//! header = "inc/head.html"  # Included before every page body
//! footer = "inc/foot.html"  # Included after every page body
//!
//! copy = ["**/*.py", "static/*"]
//! exclude = ["**/__pycache__/**"]
//!
//! [[extras]]
//! slug = "license"
//!
//! [[chapters]]
//! slug = "intro"
//! title = "Introduction"
//!
//! [[appendices]]
//! slug = "bib"
//!
//! [processing]
//! max_processes = 4         # Render workers (omit for auto = CPU cores)
//! ```
//!
//! `copy`, `exclude`, `extras`, `chapters` and `appendices` are required, but
//! may be empty lists. Page entries accept any additional keys; they become
//! page metadata visible to templates. Unknown top-level keys are rejected.
//!
//! Relative `root`, `output` and `links` paths resolve against the directory
//! holding the config file.

use crate::links::LinkEntry;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

/// File name looked up when no `--config` is given.
pub const DEFAULT_CONFIG_FILE: &str = "folio.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// One page as declared in the config file.
///
/// Only `slug` is meaningful to the compiler; it is optional here so that a
/// missing slug is reported by the page registry with the entry's position
/// rather than as an opaque TOML error.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    /// Explicit source path, relative to `root`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<PathBuf>,
    /// Explicit output path, relative to the output directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,
    /// Any other keys (title, exercises, ...).
    #[serde(flatten)]
    pub meta: serde_json::Map<String, serde_json::Value>,
}

impl PageEntry {
    /// Entry with just a slug. Mostly useful in tests.
    pub fn new(slug: &str) -> Self {
        Self {
            slug: Some(slug.to_string()),
            ..Self::default()
        }
    }
}

/// Render worker settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel render workers.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)`, at least one
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config
        .max_processes
        .map(|n| n.clamp(1, cores))
        .unwrap_or(cores)
}

/// The config file as written, before required keys are checked.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ConfigFile {
    root: Option<PathBuf>,
    output: Option<PathBuf>,
    links: Option<PathBuf>,
    header: Option<String>,
    footer: Option<String>,
    copy: Option<Vec<String>>,
    exclude: Option<Vec<String>>,
    extras: Option<Vec<PageEntry>>,
    chapters: Option<Vec<PageEntry>>,
    appendices: Option<Vec<PageEntry>>,
    processing: ProcessingConfig,
}

/// Resolved book configuration.
#[derive(Debug, Clone, Serialize)]
pub struct Config {
    /// Source root; page sources, includes and assets live under it.
    pub root: PathBuf,
    /// Output directory. Deleted and recreated by every build.
    pub output: PathBuf,
    /// Path of the links document, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub links: Option<PathBuf>,
    /// Include path (relative to `root`) placed before every page body.
    pub header: String,
    /// Include path (relative to `root`) placed after every page body.
    pub footer: String,
    /// Glob patterns, relative to `root`, of files copied verbatim.
    pub copy: Vec<String>,
    /// Glob patterns removing matches from `copy`.
    pub exclude: Vec<String>,
    pub extras: Vec<PageEntry>,
    pub chapters: Vec<PageEntry>,
    pub appendices: Vec<PageEntry>,
    pub processing: ProcessingConfig,
    /// Links loaded from `links`, attached once the links document is read.
    #[serde(rename = "link_entries")]
    pub links_resolved: Vec<LinkEntry>,
}

pub const DEFAULT_HEADER: &str = "inc/head.html";
pub const DEFAULT_FOOTER: &str = "inc/foot.html";

impl Default for Config {
    fn default() -> Self {
        Self {
            root: PathBuf::from("src"),
            output: PathBuf::from("docs"),
            links: None,
            header: DEFAULT_HEADER.to_string(),
            footer: DEFAULT_FOOTER.to_string(),
            copy: Vec::new(),
            exclude: Vec::new(),
            extras: Vec::new(),
            chapters: Vec::new(),
            appendices: Vec::new(),
            processing: ProcessingConfig::default(),
            links_resolved: Vec::new(),
        }
    }
}

impl ConfigFile {
    /// Check required keys and resolve relative paths against `base`.
    fn resolve(self, base: &Path) -> Result<Config, ConfigError> {
        let missing: Vec<&str> = [
            ("copy", self.copy.is_none()),
            ("exclude", self.exclude.is_none()),
            ("extras", self.extras.is_none()),
            ("chapters", self.chapters.is_none()),
            ("appendices", self.appendices.is_none()),
        ]
        .into_iter()
        .filter_map(|(key, absent)| absent.then_some(key))
        .collect();
        if !missing.is_empty() {
            return Err(ConfigError::Validation(format!(
                "missing required setting(s): {}",
                missing.join(", ")
            )));
        }

        let defaults = Config::default();
        let config = Config {
            root: base.join(self.root.unwrap_or(defaults.root)),
            output: base.join(self.output.unwrap_or(defaults.output)),
            links: self.links.map(|p| base.join(p)),
            header: self.header.unwrap_or(defaults.header),
            footer: self.footer.unwrap_or(defaults.footer),
            copy: self.copy.unwrap_or_default(),
            exclude: self.exclude.unwrap_or_default(),
            extras: self.extras.unwrap_or_default(),
            chapters: self.chapters.unwrap_or_default(),
            appendices: self.appendices.unwrap_or_default(),
            processing: self.processing,
            links_resolved: Vec::new(),
        };
        config.validate()?;
        Ok(config)
    }
}

impl Config {
    /// Validate settings that would make a build unsafe or meaningless.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.header.trim().is_empty() || self.footer.trim().is_empty() {
            return Err(ConfigError::Validation(
                "header and footer must name include files".into(),
            ));
        }
        if self.header.contains('"') || self.footer.contains('"') {
            return Err(ConfigError::Validation(
                "header and footer paths must not contain quotes".into(),
            ));
        }
        // The output directory is wiped on every build.
        if resolve_path(&self.root).starts_with(resolve_path(&self.output)) {
            return Err(ConfigError::Validation(format!(
                "output directory {} must not contain the source root {}",
                self.output.display(),
                self.root.display()
            )));
        }
        if self.processing.max_processes == Some(0) {
            return Err(ConfigError::Validation(
                "processing.max_processes must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Number of pages across all three groups.
    pub fn page_count(&self) -> usize {
        self.extras.len() + self.chapters.len() + self.appendices.len()
    }
}

/// Absolute form of `path` with `.` and `..` removed.
///
/// The longest prefix that exists on disk is canonicalized, so symlinks in
/// it are followed; the rest is kept as written.
fn resolve_path(path: &Path) -> PathBuf {
    let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    let mut lexical = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                lexical.pop();
            }
            other => lexical.push(other),
        }
    }

    let mut missing = Vec::new();
    let mut existing = lexical.as_path();
    loop {
        if let Ok(canonical) = existing.canonicalize() {
            return missing
                .iter()
                .rev()
                .fold(canonical, |acc: PathBuf, name| acc.join(name));
        }
        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                missing.push(name.to_os_string());
                existing = parent;
            }
            _ => return lexical,
        }
    }
}

/// Parse config text. Relative paths resolve against `base`.
pub fn parse_config(content: &str, base: &Path) -> Result<Config, ConfigError> {
    let file: ConfigFile = toml::from_str(content)?;
    file.resolve(base)
}

/// Load and validate a config file.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let base = path.parent().unwrap_or_else(|| Path::new(""));
    parse_config(&content, base)
}

/// Returns a fully-commented starter `folio.toml`.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Folio Configuration
# ===================
# Paths are relative to this file.

# Source tree: page sources, include files and static assets.
root = "src"

# Output directory. It is deleted and recreated on every build.
output = "docs"

# Optional YAML list of `{slug, url}` entries. Each one becomes a Markdown
# reference definition (`[slug]: url`) appended to every page.
# links = "links.yml"

# Files included (and template-expanded) around every page body.
header = "inc/head.html"
footer = "inc/foot.html"

# Static files copied verbatim into the output tree (globs relative to root).
copy = ["**/*.py", "static/*"]

# Matches of these globs are removed from the `copy` list.
exclude = ["**/__pycache__/**"]

# Unnumbered pages. They get ordinal labels but no previous/next links.
# Default source is <root>/<slug>/index.md, default output <slug>/index.html.
# Any extra key (title, ...) is visible to templates as page metadata.
[[extras]]
slug = "license"
title = "License"

# Numbered chapters, in reading order.
[[chapters]]
slug = "intro"
title = "Introduction"

# Lettered appendices, after the chapters.
[[appendices]]
slug = "glossary"
title = "Glossary"

[processing]
# Maximum parallel render workers (omit for auto = number of CPU cores).
# max_processes = 4
"##
}

// =============================================================================
// Tests
// =============================================================================

//! Static asset copying.
//!
//! Files under the source root matching any `copy` glob are copied verbatim
//! to the same relative path under the output directory, unless they also
//! match an `exclude` glob:
//!
//! ```toml
//! copy = ["**/*.py", "static/*"]
//! exclude = ["**/__pycache__/**"]
//! ```
//!
//! Patterns are matched against root-relative paths with `*` confined to one
//! path component and `**/` spanning any number of directories (including
//! none). Hidden files and directories (`.DS_Store`, `.git/`) only match a
//! pattern that spells out the leading dot, such as `static/.htaccess`.
//! There is no conflict detection: when two sources map to the same
//! destination the later copy wins.

use glob::{MatchOptions, Pattern};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum AssetError {
    #[error("invalid glob pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        source: glob::PatternError,
    },
    #[error("cannot walk {path}: {source}")]
    Walk {
        path: PathBuf,
        source: walkdir::Error,
    },
    #[error("cannot copy {from} to {to}: {source}")]
    Copy {
        from: PathBuf,
        to: PathBuf,
        source: std::io::Error,
    },
}

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: true,
};

fn compile(patterns: &[String]) -> Result<Vec<Pattern>, AssetError> {
    patterns
        .iter()
        .map(|p| {
            Pattern::new(p).map_err(|source| AssetError::Pattern {
                pattern: p.clone(),
                source,
            })
        })
        .collect()
}

/// Every file under `root`, as sorted root-relative paths.
///
/// `skip` (typically the output directory) is not descended into.
fn walk_files(root: &Path, skip: Option<&Path>) -> Result<Vec<PathBuf>, AssetError> {
    let mut files = Vec::new();
    let walker = WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| skip.is_none_or(|s| e.path() != s));
    for entry in walker {
        let entry = entry.map_err(|source| AssetError::Walk {
            path: root.to_path_buf(),
            source,
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        if let Ok(relative) = entry.path().strip_prefix(root) {
            files.push(relative.to_path_buf());
        }
    }
    Ok(files)
}

/// Resolve the copy list: matches of each `copy` pattern in pattern order,
/// minus anything an `exclude` pattern matches.
pub fn select_assets(
    root: &Path,
    copy: &[String],
    exclude: &[String],
    skip: Option<&Path>,
) -> Result<Vec<PathBuf>, AssetError> {
    let include = compile(copy)?;
    let exclude = compile(exclude)?;
    if include.is_empty() {
        return Ok(Vec::new());
    }
    let files = walk_files(root, skip)?;

    let mut seen = HashSet::new();
    let mut selected = Vec::new();
    for pattern in &include {
        for file in &files {
            if !pattern.matches_path_with(file, MATCH_OPTIONS) {
                continue;
            }
            if exclude.iter().any(|x| x.matches_path_with(file, MATCH_OPTIONS)) {
                debug!(file = %file.display(), "excluded asset");
                continue;
            }
            if seen.insert(file.clone()) {
                selected.push(file.clone());
            }
        }
    }
    Ok(selected)
}

/// Copy the selected assets from `root` into `output`, creating directories
/// as needed. Returns the copied root-relative paths.
pub fn copy_assets(
    root: &Path,
    output: &Path,
    copy: &[String],
    exclude: &[String],
) -> Result<Vec<PathBuf>, AssetError> {
    let assets = select_assets(root, copy, exclude, Some(output))?;
    for relative in &assets {
        let from = root.join(relative);
        let to = output.join(relative);
        let copy_err = |source| AssetError::Copy {
            from: from.clone(),
            to: to.clone(),
            source,
        };
        if let Some(parent) = to.parent() {
            fs::create_dir_all(parent).map_err(copy_err)?;
        }
        fs::copy(&from, &to).map_err(copy_err)?;
    }
    info!(count = assets.len(), "assets copied");
    Ok(assets)
}

//! Whole-book build orchestration.
//!
//! ```text
//! validate ─▶ registry ─▶ links ─▶ clear output ─▶ load all ─▶ render all ─▶ numbering ─▶ assets
//!                                                        (barrier)
//! ```
//!
//! Registry construction and config validation touch no files, so a broken
//! config never wipes an existing output directory. Every page is loaded
//! before the first one renders: templates may read any page's metadata
//! (`pages`, `page.previous`, `page.next`).

use crate::assets::{self, AssetError};
use crate::config::{Config, ConfigError};
use crate::links::{self, LinksError};
use crate::loader::{self, LoadError};
use crate::numbering::{self, Numbering, NumberingError};
use crate::registry::{self, Page, RegistryError};
use crate::render::{self, RenderError, SiteContext};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum BuildError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error(transparent)]
    Links(#[from] LinksError),
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error(transparent)]
    Numbering(#[from] NumberingError),
    #[error(transparent)]
    Assets(#[from] AssetError),
    #[error("cannot prepare output directory {path}: {source}")]
    Output {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// What a build produced, for display.
#[derive(Debug)]
pub struct BuildSummary {
    /// Every page, loaded, in registry order.
    pub pages: Vec<Page>,
    pub numbering: Numbering,
    /// Copied assets, relative to the root.
    pub assets: Vec<PathBuf>,
    pub link_count: usize,
    pub output: PathBuf,
}

/// What a check run saw.
#[derive(Debug)]
pub struct CheckSummary {
    pub pages: Vec<Page>,
    pub numbering: Numbering,
    pub assets: Vec<PathBuf>,
    pub link_count: usize,
}

/// Validate, register pages and attach the link entries to `config`.
fn prepare(config: &mut Config) -> Result<Vec<Page>, BuildError> {
    config.validate()?;
    let pages = registry::build_registry(config)?;
    if let Some(path) = &config.links {
        config.links_resolved = links::load_links(path)?;
    }
    Ok(pages)
}

fn clear_output(path: &Path) -> Result<(), BuildError> {
    let output_err = |source| BuildError::Output {
        path: path.to_path_buf(),
        source,
    };
    if path.exists() {
        fs::remove_dir_all(path).map_err(output_err)?;
    }
    fs::create_dir_all(path).map_err(output_err)
}

/// Run the full build.
pub fn build(config: &mut Config) -> Result<BuildSummary, BuildError> {
    let mut pages = prepare(config)?;
    info!(pages = pages.len(), links = config.links_resolved.len(), "registry ready");

    clear_output(&config.output)?;
    loader::load_pages(&mut pages, &config.header, &config.footer)?;

    let site = SiteContext::new(config, &pages, links::link_table(&config.links_resolved))?;
    render::render_all(&site, &pages, &config.output)?;

    let numbering = numbering::build_numbering(config);
    numbering::write_numbering(&config.output, &numbering)?;

    let assets = assets::copy_assets(&config.root, &config.output, &config.copy, &config.exclude)?;

    info!(output = %config.output.display(), "build complete");
    Ok(BuildSummary {
        pages,
        numbering,
        assets,
        link_count: config.links_resolved.len(),
        output: config.output.clone(),
    })
}

/// Everything up to and including loading, plus asset selection. Writes nothing.
pub fn check(config: &mut Config) -> Result<CheckSummary, BuildError> {
    let mut pages = prepare(config)?;
    loader::load_pages(&mut pages, &config.header, &config.footer)?;
    let assets = assets::select_assets(
        &config.root,
        &config.copy,
        &config.exclude,
        Some(&config.output),
    )?;
    Ok(CheckSummary {
        numbering: numbering::build_numbering(config),
        pages,
        assets,
        link_count: config.links_resolved.len(),
    })
}

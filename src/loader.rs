//! Page loading: the first of the two passes.
//!
//! Every page's source is read and its front matter merged onto the page
//! record before any page is rendered. Rendering one page may look at another
//! page's metadata (a neighbour's title, an appendix's exercise list), so this
//! is a hard barrier: [`site::build`](crate::site::build) calls
//! [`load_pages`] for the whole list and only then starts rendering.
//!
//! ## Source Format
//!
//! ```text
//! ---
//! title: Introduction
//! exercises:
//!   - slug: first
//!     title: First Steps
//! ---
//! # Introduction
//!
//! Body text in Markdown, with template directives.
//! ```
//!
//! The front matter block is optional. After loading, `content` holds the body
//! wrapped between the header and footer include directives.
//!
//! Front matter may set `output` to a relative path (`output: LICENSE.html`)
//! to move the page's HTML file; absolute paths and `..` are ignored with a
//! warning. The other registry fields (`slug`, `source`, `previous`, ...) are
//! reserved and front-matter values for them are dropped.

use crate::registry::{Page, RESERVED_KEYS};
use gray_matter::Matter;
use gray_matter::engine::YAML;
use serde_json::{Map, Value};
use std::fs;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("cannot read page source {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid front matter in {path}: {source}")]
    FrontMatter {
        path: PathBuf,
        source: gray_matter::Error,
    },
    #[error("front matter in {path} must be a mapping")]
    NotAMapping { path: PathBuf },
}

/// The directive that includes (and expands) `file`, relative to the root.
pub fn include_directive(file: &str) -> String {
    format!("{{{{ include(file=\"{file}\") }}}}")
}

/// Body wrapped between the header and footer include directives.
pub fn wrap_body(body: &str, header: &str, footer: &str) -> String {
    format!(
        "{}\n\n{}\n\n{}\n",
        include_directive(header),
        body.trim_end(),
        include_directive(footer)
    )
}

/// Split a source document into front matter fields and Markdown body.
pub fn split_front_matter(text: &str, path: &Path) -> Result<(Map<String, Value>, String), LoadError> {
    let matter = Matter::<YAML>::new();
    let parsed = matter
        .parse::<Value>(text)
        .map_err(|source| LoadError::FrontMatter {
            path: path.to_path_buf(),
            source,
        })?;

    let meta = match parsed.data {
        None | Some(Value::Null) => Map::new(),
        Some(Value::Object(map)) => map,
        Some(_) => {
            return Err(LoadError::NotAMapping {
                path: path.to_path_buf(),
            });
        }
    };
    Ok((meta, parsed.content))
}

/// Merge front matter onto a page. Later fields overwrite earlier ones;
/// reserved keys are skipped.
fn merge_meta(page: &mut Page, fields: Map<String, Value>) {
    for (key, value) in fields {
        if key == "output" {
            match front_matter_output(&value) {
                Some(output) => {
                    debug!(page = %page.slug, output = %output.display(), "output path from front matter");
                    page.output = output;
                }
                None => warn!(page = %page.slug, value = %value, "ignoring output: expected a relative file path"),
            }
            continue;
        }
        if RESERVED_KEYS.contains(&key.as_str()) {
            warn!(page = %page.slug, key = %key, "ignoring reserved key in front matter");
            continue;
        }
        page.meta.insert(key, value);
    }
}

/// A front-matter `output` value, if it is a relative path that stays inside
/// the output directory.
fn front_matter_output(value: &Value) -> Option<PathBuf> {
    let path = PathBuf::from(value.as_str()?);
    let inside = path.components().count() > 0
        && path.components().all(|c| matches!(c, Component::Normal(_)));
    inside.then_some(path)
}

/// Load one page from its source file.
pub fn load_page(page: &mut Page, header: &str, footer: &str) -> Result<(), LoadError> {
    let text = fs::read_to_string(&page.source).map_err(|source| LoadError::Io {
        path: page.source.clone(),
        source,
    })?;
    let (fields, body) = split_front_matter(&text, &page.source)?;
    debug!(page = %page.slug, fields = fields.len(), "loaded front matter");
    merge_meta(page, fields);
    page.content = Some(wrap_body(&body, header, footer));
    Ok(())
}

/// Load every page that is not loaded yet. Returns how many were read.
///
/// Stops at the first failure; there is no partial-success mode.
pub fn load_pages(pages: &mut [Page], header: &str, footer: &str) -> Result<usize, LoadError> {
    let mut loaded = 0;
    for page in pages.iter_mut().filter(|p| !p.is_loaded()) {
        load_page(page, header, footer)?;
        loaded += 1;
    }
    info!(loaded, total = pages.len(), "pages loaded");
    Ok(loaded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, PageEntry};
    use crate::registry::{build_registry, default_output};
    use tempfile::TempDir;

    fn book(tmp: &TempDir, chapters: &[(&str, &str)]) -> Vec<Page> {
        let root = tmp.path().to_path_buf();
        for (slug, text) in chapters {
            fs::create_dir_all(root.join(slug)).unwrap();
            fs::write(root.join(slug).join("index.md"), text).unwrap();
        }
        let config = Config {
            root,
            chapters: chapters.iter().map(|(slug, _)| PageEntry::new(slug)).collect(),
            ..Config::default()
        };
        build_registry(&config).unwrap()
    }

    #[test]
    fn front_matter_is_split_from_body() {
        let (meta, body) = split_front_matter(
            "---\ntitle: Introduction\nlevel: 2\n---\n# Hello\n",
            Path::new("x.md"),
        )
        .unwrap();
        assert_eq!(meta["title"], "Introduction");
        assert_eq!(meta["level"], 2);
        assert!(body.contains("# Hello"));
        assert!(!body.contains("title:"));
    }

    #[test]
    fn missing_front_matter_gives_empty_meta() {
        let (meta, body) = split_front_matter("# Just a body\n", Path::new("x.md")).unwrap();
        assert!(meta.is_empty());
        assert_eq!(body.trim(), "# Just a body");
    }

    #[test]
    fn scalar_front_matter_rejected() {
        let result = split_front_matter("---\njust a string\n---\nbody\n", Path::new("x.md"));
        assert!(matches!(result, Err(LoadError::NotAMapping { .. })));
    }

    #[test]
    fn wrap_body_adds_header_and_footer() {
        let wrapped = wrap_body("Body\n\n", "inc/head.html", "inc/foot.html");
        assert_eq!(
            wrapped,
            "{{ include(file=\"inc/head.html\") }}\n\nBody\n\n{{ include(file=\"inc/foot.html\") }}\n"
        );
    }

    #[test]
    fn load_merges_front_matter_over_config_meta() {
        let tmp = TempDir::new().unwrap();
        let mut pages = book(&tmp, &[("intro", "---\ntitle: From Source\nauthor: Ada\n---\nHi\n")]);
        pages[0].meta.insert("title".into(), Value::from("From Config"));

        load_pages(&mut pages, "h.html", "f.html").unwrap();
        assert_eq!(pages[0].title(), "From Source");
        assert_eq!(pages[0].meta["author"], "Ada");
    }

    #[test]
    fn reserved_front_matter_keys_are_ignored() {
        let tmp = TempDir::new().unwrap();
        let mut pages = book(&tmp, &[("intro", "---\nslug: hijack\nnext: 7\n---\nHi\n")]);

        load_pages(&mut pages, "h.html", "f.html").unwrap();
        assert_eq!(pages[0].slug, "intro");
        assert_eq!(pages[0].next, None);
        assert!(!pages[0].meta.contains_key("slug"));
    }

    #[test]
    fn front_matter_output_moves_page() {
        let tmp = TempDir::new().unwrap();
        let mut pages = book(&tmp, &[("license", "---\noutput: LICENSE.html\n---\nMIT\n")]);

        load_pages(&mut pages, "h.html", "f.html").unwrap();
        assert_eq!(pages[0].output, PathBuf::from("LICENSE.html"));
        assert!(!pages[0].meta.contains_key("output"));
    }

    #[test]
    fn front_matter_output_outside_site_ignored() {
        let tmp = TempDir::new().unwrap();
        let mut pages = book(
            &tmp,
            &[
                ("up", "---\noutput: ../escape.html\n---\nA\n"),
                ("abs", "---\noutput: /tmp/abs.html\n---\nB\n"),
                ("num", "---\noutput: 3\n---\nC\n"),
            ],
        );

        load_pages(&mut pages, "h.html", "f.html").unwrap();
        for page in &pages {
            assert_eq!(page.output, default_output(&page.slug), "{}", page.slug);
        }
    }

    #[test]
    fn every_page_is_loaded() {
        let tmp = TempDir::new().unwrap();
        let mut pages = book(&tmp, &[("intro", "One\n"), ("tools", "Two\n")]);

        let loaded = load_pages(&mut pages, "h.html", "f.html").unwrap();
        assert_eq!(loaded, 2);
        assert!(pages.iter().all(Page::is_loaded));
        assert!(pages[1].content.as_deref().unwrap().contains("Two"));
    }

    #[test]
    fn loading_twice_does_not_reread() {
        let tmp = TempDir::new().unwrap();
        let mut pages = book(&tmp, &[("intro", "Original\n")]);
        load_pages(&mut pages, "h.html", "f.html").unwrap();

        fs::remove_file(&pages[0].source).unwrap();
        let loaded = load_pages(&mut pages, "h.html", "f.html").unwrap();
        assert_eq!(loaded, 0);
        assert!(pages[0].content.as_deref().unwrap().contains("Original"));
    }

    #[test]
    fn missing_source_aborts_loading() {
        let tmp = TempDir::new().unwrap();
        let mut pages = book(&tmp, &[("intro", "Hi\n")]);
        pages[0].source = tmp.path().join("gone").join("index.md");

        let result = load_pages(&mut pages, "h.html", "f.html");
        match result {
            Err(LoadError::Io { path, .. }) => assert!(path.ends_with("gone/index.md")),
            other => panic!("expected I/O error, got {other:?}"),
        }
        assert!(!pages[0].is_loaded());
    }
}

//! Page registry: the ordered list of every page in the book.
//!
//! Pages are declared in three groups in the config. The registry concatenates
//! them into one list and derives everything that follows from position alone:
//!
//! ```text
//! extras ++ chapters ++ appendices   →  index 0..N-1, default paths
//!           chapters ++ appendices   →  previous / next chain
//! ```
//!
//! Extras are never chained, so templates must check `page.previous` and
//! `page.next` before using them.
//!
//! This is a pure function of the configuration: no file is touched. Loading
//! sources is the [`loader`](crate::loader)'s job; `content` stays `None` until
//! then.

use crate::config::{Config, PageEntry};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug, PartialEq)]
pub enum RegistryError {
    #[error("{kind} entry #{position} has no slug")]
    MissingSlug { kind: PageKind, position: usize },
    #[error("duplicate slug '{slug}' (pages {first} and {second})")]
    DuplicateSlug {
        slug: String,
        first: usize,
        second: usize,
    },
}

/// Keys the compiler owns. Metadata cannot overwrite them.
pub const RESERVED_KEYS: &[&str] = &[
    "slug", "index", "kind", "source", "output", "previous", "next", "content",
];

/// Which config group a page came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PageKind {
    Extra,
    Chapter,
    Appendix,
}

impl std::fmt::Display for PageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            PageKind::Extra => "extra",
            PageKind::Chapter => "chapter",
            PageKind::Appendix => "appendix",
        })
    }
}

/// A page record, filled in phase by phase over a single run.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub slug: String,
    /// Position in `extras ++ chapters ++ appendices`.
    pub index: usize,
    pub kind: PageKind,
    /// Input file.
    pub source: PathBuf,
    /// Output file, relative to the output directory.
    pub output: PathBuf,
    /// Index of the preceding numbered page.
    pub previous: Option<usize>,
    /// Index of the following numbered page.
    pub next: Option<usize>,
    /// Wrapped Markdown body. `None` until loaded.
    pub content: Option<String>,
    /// Config keys and front matter, front matter winning.
    pub meta: Map<String, Value>,
}

impl Page {
    pub fn is_loaded(&self) -> bool {
        self.content.is_some()
    }

    /// Template-facing view of the page without neighbours or content.
    ///
    /// Metadata is flattened first so structural fields always win.
    pub fn summary(&self) -> Value {
        let mut map = self.meta.clone();
        map.insert("slug".into(), Value::from(self.slug.clone()));
        map.insert("index".into(), Value::from(self.index));
        map.insert("kind".into(), Value::from(self.kind.to_string()));
        map.insert(
            "source".into(),
            Value::from(self.source.to_string_lossy().into_owned()),
        );
        map.insert(
            "output".into(),
            Value::from(self.output.to_string_lossy().into_owned()),
        );
        Value::Object(map)
    }

    /// Display title: `meta.title` when present, else the slug.
    pub fn title(&self) -> &str {
        self.meta
            .get("title")
            .and_then(Value::as_str)
            .unwrap_or(&self.slug)
    }
}

/// Default source path: `<root>/<slug>/index.md`.
pub fn default_source(root: &Path, slug: &str) -> PathBuf {
    root.join(slug).join("index.md")
}

/// Default output path: `<slug>/index.html`.
pub fn default_output(slug: &str) -> PathBuf {
    Path::new(slug).join("index.html")
}

/// Build the full page list from the config.
pub fn build_registry(config: &Config) -> Result<Vec<Page>, RegistryError> {
    let groups = [
        (PageKind::Extra, &config.extras),
        (PageKind::Chapter, &config.chapters),
        (PageKind::Appendix, &config.appendices),
    ];

    let mut pages = Vec::with_capacity(config.page_count());
    let mut seen: HashMap<String, usize> = HashMap::new();
    for (kind, entries) in groups {
        for (position, entry) in entries.iter().enumerate() {
            let index = pages.len();
            let page = register(&config.root, kind, position, index, entry)?;
            if let Some(&first) = seen.get(&page.slug) {
                return Err(RegistryError::DuplicateSlug {
                    slug: page.slug,
                    first,
                    second: index,
                });
            }
            seen.insert(page.slug.clone(), index);
            pages.push(page);
        }
    }

    link_numbered(&mut pages);
    debug!(pages = pages.len(), "registered pages");
    Ok(pages)
}

fn register(
    root: &Path,
    kind: PageKind,
    position: usize,
    index: usize,
    entry: &PageEntry,
) -> Result<Page, RegistryError> {
    let slug = entry
        .slug
        .clone()
        .filter(|s| !s.trim().is_empty())
        .ok_or(RegistryError::MissingSlug { kind, position })?;

    let source = match &entry.source {
        Some(path) => root.join(path),
        None => default_source(root, &slug),
    };
    let output = entry
        .output
        .clone()
        .unwrap_or_else(|| default_output(&slug));

    let mut meta = entry.meta.clone();
    for key in RESERVED_KEYS {
        if meta.remove(*key).is_some() {
            warn!(page = %slug, key = *key, "ignoring reserved key in config entry");
        }
    }

    Ok(Page {
        slug,
        index,
        kind,
        source,
        output,
        previous: None,
        next: None,
        content: None,
        meta,
    })
}

/// Chain chapters and appendices in order. Extras are skipped.
fn link_numbered(pages: &mut [Page]) {
    let numbered: Vec<usize> = pages
        .iter()
        .filter(|p| p.kind != PageKind::Extra)
        .map(|p| p.index)
        .collect();

    for (pos, &index) in numbered.iter().enumerate() {
        let page = &mut pages[index];
        page.previous = pos.checked_sub(1).map(|p| numbered[p]);
        page.next = numbered.get(pos + 1).copied();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(extras: &[&str], chapters: &[&str], appendices: &[&str]) -> Config {
        let entries = |slugs: &[&str]| -> Vec<PageEntry> { slugs.iter().map(|s| PageEntry::new(s)).collect() };
        Config {
            root: PathBuf::from("/book/src"),
            extras: entries(extras),
            chapters: entries(chapters),
            appendices: entries(appendices),
            ..Config::default()
        }
    }

    fn slugs_of(pages: &[Page], indices: impl IntoIterator<Item = Option<usize>>) -> Vec<Option<&str>> {
        indices
            .into_iter()
            .map(|i| i.map(|i| pages[i].slug.as_str()))
            .collect()
    }

    #[test]
    fn indices_follow_concatenation_order() {
        let pages = build_registry(&config(&["license", "contrib"], &["intro", "tools"], &["bib"])).unwrap();
        let order: Vec<(&str, usize)> = pages.iter().map(|p| (p.slug.as_str(), p.index)).collect();
        assert_eq!(
            order,
            vec![("license", 0), ("contrib", 1), ("intro", 2), ("tools", 3), ("bib", 4)]
        );
    }

    #[test]
    fn kinds_match_groups() {
        let pages = build_registry(&config(&["x"], &["c"], &["a"])).unwrap();
        let kinds: Vec<PageKind> = pages.iter().map(|p| p.kind).collect();
        assert_eq!(kinds, vec![PageKind::Extra, PageKind::Chapter, PageKind::Appendix]);
    }

    #[test]
    fn numbered_pages_form_a_chain() {
        let pages = build_registry(&config(&["license"], &["intro", "tools"], &["bib", "gloss"])).unwrap();
        let numbered = &pages[1..];

        assert_eq!(
            slugs_of(&pages, numbered.iter().map(|p| p.previous)),
            vec![None, Some("intro"), Some("tools"), Some("bib")]
        );
        assert_eq!(
            slugs_of(&pages, numbered.iter().map(|p| p.next)),
            vec![Some("tools"), Some("bib"), Some("gloss"), None]
        );
    }

    #[test]
    fn extras_are_never_chained() {
        let pages = build_registry(&config(&["a", "b", "c"], &["intro"], &[])).unwrap();
        for extra in pages.iter().filter(|p| p.kind == PageKind::Extra) {
            assert_eq!(extra.previous, None, "{} has previous", extra.slug);
            assert_eq!(extra.next, None, "{} has next", extra.slug);
        }
        let intro = &pages[3];
        assert_eq!(intro.previous, None);
        assert_eq!(intro.next, None);
    }

    #[test]
    fn single_chapter_chains_to_single_appendix() {
        let pages = build_registry(&config(&[], &["intro"], &["notes"])).unwrap();
        assert_eq!(pages[0].next, Some(1));
        assert_eq!(pages[0].previous, None);
        assert_eq!(pages[1].previous, Some(0));
        assert_eq!(pages[1].next, None);
    }

    #[test]
    fn default_paths_derive_from_root_and_slug() {
        let pages = build_registry(&config(&[], &["intro"], &[])).unwrap();
        assert_eq!(pages[0].source, PathBuf::from("/book/src/intro/index.md"));
        assert_eq!(pages[0].output, PathBuf::from("intro/index.html"));
        assert_eq!(
            default_source(Path::new("/book/src"), "intro"),
            pages[0].source
        );
        assert_eq!(default_output("intro"), pages[0].output);
    }

    #[test]
    fn explicit_paths_win() {
        let mut cfg = config(&[], &[], &[]);
        cfg.extras.push(PageEntry {
            source: Some(PathBuf::from("index.md")),
            output: Some(PathBuf::from("index.html")),
            ..PageEntry::new("home")
        });
        let pages = build_registry(&cfg).unwrap();
        assert_eq!(pages[0].source, PathBuf::from("/book/src/index.md"));
        assert_eq!(pages[0].output, PathBuf::from("index.html"));
    }

    #[test]
    fn missing_slug_is_structural_error() {
        let mut cfg = config(&[], &["intro"], &[]);
        cfg.chapters.push(PageEntry::default());
        assert_eq!(
            build_registry(&cfg),
            Err(RegistryError::MissingSlug {
                kind: PageKind::Chapter,
                position: 1
            })
        );
    }

    #[test]
    fn duplicate_slug_rejected() {
        let result = build_registry(&config(&["intro"], &["intro"], &[]));
        assert_eq!(
            result,
            Err(RegistryError::DuplicateSlug {
                slug: "intro".into(),
                first: 0,
                second: 1
            })
        );
    }

    #[test]
    fn nothing_is_loaded_at_registration() {
        let pages = build_registry(&config(&["a"], &["b"], &["c"])).unwrap();
        assert!(pages.iter().all(|p| !p.is_loaded()));
    }

    #[test]
    fn reserved_config_keys_are_dropped() {
        let mut cfg = config(&[], &[], &[]);
        let mut entry = PageEntry::new("intro");
        entry.meta.insert("index".into(), Value::from(99));
        entry.meta.insert("title".into(), Value::from("Intro"));
        cfg.chapters.push(entry);

        let pages = build_registry(&cfg).unwrap();
        assert_eq!(pages[0].index, 0);
        assert!(!pages[0].meta.contains_key("index"));
        assert_eq!(pages[0].title(), "Intro");
    }

    #[test]
    fn summary_flattens_meta_under_structural_fields() {
        let mut cfg = config(&[], &[], &[]);
        let mut entry = PageEntry::new("intro");
        entry.meta.insert("title".into(), Value::from("Introduction"));
        cfg.chapters.push(entry);
        let pages = build_registry(&cfg).unwrap();

        let summary = pages[0].summary();
        assert_eq!(summary["slug"], "intro");
        assert_eq!(summary["index"], 0);
        assert_eq!(summary["kind"], "chapter");
        assert_eq!(summary["title"], "Introduction");
        assert_eq!(summary["output"], "intro/index.html");
        assert!(summary.get("previous").is_none());
    }
}

//! Page rendering: the second of the two passes.
//!
//! Each loaded page goes through three steps:
//!
//! ```text
//! content ──expand──▶ Markdown ──+ link table──▶ pulldown-cmark ──▶ <output>/<page.output>
//! ```
//!
//! ## Template Context
//!
//! Page bodies are Tera templates. Every page sees:
//!
//! | Name | Value |
//! |------|-------|
//! | `site` | The whole configuration, with the loaded `link_entries` |
//! | `pages` | Every page summary, in registry order |
//! | `page` | This page; `page.previous` / `page.next` only when they exist |
//! | `root` | The source root directory |
//! | `to_root` | Relative path from this page's output back to the site root |
//!
//! ## Helper Functions
//!
//! | Call | Result |
//! |------|--------|
//! | `code_class(file="x.py")` | `language-py` |
//! | `read_file(path=page.source, sub="x.py")` | File next to `path`, HTML-escaped |
//! | `read_page(path=page.source, sub="x.html")` | File next to `path`, verbatim |
//! | `include(file="inc/head.html")` | `<root>/<file>`, expanded |
//! | `exercise(chapter=page, exercise=ex, which="problem")` | Exercise part with heading, expanded |
//! | `render(text="...")` | `text`, expanded |
//! | `to_root()` | Same as the `to_root` variable |
//!
//! Expansion is not transitive by itself: a helper's return value is spliced
//! in verbatim. The helpers that pull in template text (`include`, `exercise`,
//! `render`) explicitly expand it again through a nested [`Renderer`] one
//! level deeper. `read_file` and `read_page` never expand.
//!
//! Nesting is capped at [`MAX_RENDER_DEPTH`]; a file that includes itself
//! fails with [`RenderError::RecursionLimit`] instead of overflowing the stack.
//!
//! ## Parallelism
//!
//! All pages are loaded before rendering starts and nothing is shared
//! mutably during rendering, so pages render in parallel on the rayon pool.

use crate::config::Config;
use crate::helpers::{self, ExercisePart};
use crate::naming::slugify;
use crate::registry::Page;
use pulldown_cmark::{CowStr, Event, Options, Parser, Tag, TagEnd, html as md_html};
use rayon::prelude::*;
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tera::Tera;
use thiserror::Error;
use tracing::{debug, info};

/// Maximum nesting of `include` / `exercise` / `render` expansions.
pub const MAX_RENDER_DEPTH: usize = 16;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("template error in page '{page}'")]
    Template { page: String, source: tera::Error },
    #[error(
        "include depth limit ({limit}) exceeded in page '{page}' while expanding {target}; does a file include itself?"
    )]
    RecursionLimit {
        page: String,
        target: String,
        limit: usize,
    },
    #[error("page '{page}' has not been loaded")]
    NotLoaded { page: String },
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("cannot write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("cannot build template context: {0}")]
    Context(#[from] serde_json::Error),
}

impl RenderError {
    /// Whether this error, or anything it wraps, is a depth-limit failure.
    pub fn is_recursion_limit(&self) -> bool {
        let mut current: Option<&(dyn std::error::Error + 'static)> = Some(self);
        while let Some(err) = current {
            if let Some(RenderError::RecursionLimit { .. }) = err.downcast_ref::<RenderError>() {
                return true;
            }
            current = err.source();
        }
        false
    }
}

// ============================================================================
// Site-wide context
// ============================================================================

/// Everything shared by all pages during the render pass. Read-only.
pub struct SiteContext {
    root: PathBuf,
    site: Value,
    pages: Vec<Value>,
    link_table: String,
}

impl SiteContext {
    pub fn new(config: &Config, pages: &[Page], link_table: String) -> Result<Self, RenderError> {
        Ok(Self {
            root: config.root.clone(),
            site: serde_json::to_value(config)?,
            pages: pages.iter().map(Page::summary).collect(),
            link_table,
        })
    }

    /// `page` as templates see it: its summary plus neighbour summaries.
    pub fn page_value(&self, page: &Page) -> Value {
        let mut value = page.summary();
        if let Value::Object(map) = &mut value {
            if let Some(prev) = page.previous.and_then(|i| self.pages.get(i)) {
                map.insert("previous".into(), prev.clone());
            }
            if let Some(next) = page.next.and_then(|i| self.pages.get(i)) {
                map.insert("next".into(), next.clone());
            }
        }
        value
    }

    /// Template context for one page.
    pub fn context_for(&self, page: &Page) -> tera::Context {
        let mut context = tera::Context::new();
        context.insert("site", &self.site);
        context.insert("pages", &self.pages);
        context.insert("page", &self.page_value(page));
        context.insert("root", &self.root.to_string_lossy());
        context.insert("to_root", &helpers::to_root(&page.output));
        context
    }

    /// A depth-zero renderer bound to `page`.
    pub fn renderer_for(&self, page: &Page) -> Renderer {
        Renderer::new(
            &page.slug,
            &self.root,
            helpers::to_root(&page.output),
            self.context_for(page),
        )
    }

    pub fn link_table(&self) -> &str {
        &self.link_table
    }
}

// ============================================================================
// Renderer
// ============================================================================

#[derive(Debug)]
struct Scope {
    page: String,
    root: PathBuf,
    to_root: String,
    context: tera::Context,
}

/// Expands template text for one page.
///
/// Cloning is cheap; every helper closure holds its own clone so that nested
/// expansions reuse the same context one level deeper.
#[derive(Clone, Debug)]
pub struct Renderer {
    scope: Arc<Scope>,
    depth: usize,
}

impl Renderer {
    pub fn new(page: &str, root: &Path, to_root: String, context: tera::Context) -> Self {
        Self {
            scope: Arc::new(Scope {
                page: page.to_string(),
                root: root.to_path_buf(),
                to_root,
                context,
            }),
            depth: 0,
        }
    }

    /// Include nesting level; 0 for a page's own body.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Evaluate `template` once against this page's context.
    pub fn render(&self, template: &str) -> Result<String, RenderError> {
        let mut tera = Tera::default();
        tera.autoescape_on(vec![]);
        self.register_helpers(&mut tera);
        tera.render_str(template, &self.scope.context)
            .map_err(|source| RenderError::Template {
                page: self.scope.page.clone(),
                source,
            })
    }

    /// A renderer one level deeper, or the depth-limit error.
    fn nested(&self, target: &str) -> Result<Renderer, RenderError> {
        let depth = self.depth + 1;
        if depth > MAX_RENDER_DEPTH {
            return Err(RenderError::RecursionLimit {
                page: self.scope.page.clone(),
                target: target.to_string(),
                limit: MAX_RENDER_DEPTH,
            });
        }
        Ok(Renderer {
            scope: Arc::clone(&self.scope),
            depth,
        })
    }

    fn read(path: &Path) -> Result<String, RenderError> {
        fs::read_to_string(path).map_err(|source| RenderError::Read {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Read `<root>/<file>` and expand it.
    pub fn include(&self, file: &str) -> Result<String, RenderError> {
        let nested = self.nested(file)?;
        let path = self.scope.root.join(file);
        debug!(page = %self.scope.page, file, depth = nested.depth, "include");
        nested.render(&Self::read(&path)?)
    }

    /// Expand `text` one level deeper.
    pub fn render_nested(&self, text: &str) -> Result<String, RenderError> {
        self.nested("render()")?.render(text)
    }

    /// Read an exercise part, expand it and put a heading above it.
    pub fn exercise(
        &self,
        root: Option<&Path>,
        chapter: &str,
        exercise: &str,
        title: &str,
        part: ExercisePart,
    ) -> Result<String, RenderError> {
        let root = root.unwrap_or(&self.scope.root);
        let path = helpers::exercise_path(root, chapter, exercise, part);
        let nested = self.nested(&path.to_string_lossy())?;
        debug!(page = %self.scope.page, exercise, %part, depth = nested.depth, "exercise");
        let body = nested.render(&Self::read(&path)?)?;
        Ok(helpers::exercise_heading(exercise, title, part) + &body)
    }

    fn register_helpers(&self, tera: &mut Tera) {
        tera.register_function("code_class", |args: &HashMap<String, Value>| -> tera::Result<Value> {
            let file = str_arg(args, "file")?;
            Ok(Value::from(helpers::code_class(file)))
        });

        tera.register_function("read_file", |args: &HashMap<String, Value>| -> tera::Result<Value> {
            let (including, sub) = (str_arg(args, "path")?, str_arg(args, "sub")?);
            helpers::read_file(Path::new(including), sub)
                .map(Value::from)
                .map_err(|e| io_failure(Path::new(including), sub, e))
        });

        tera.register_function("read_page", |args: &HashMap<String, Value>| -> tera::Result<Value> {
            let (including, sub) = (str_arg(args, "path")?, str_arg(args, "sub")?);
            helpers::read_page(Path::new(including), sub)
                .map(Value::from)
                .map_err(|e| io_failure(Path::new(including), sub, e))
        });

        let to_root = self.scope.to_root.clone();
        tera.register_function("to_root", move |_: &HashMap<String, Value>| -> tera::Result<Value> {
            Ok(Value::from(to_root.clone()))
        });

        let this = self.clone();
        tera.register_function("include", move |args: &HashMap<String, Value>| -> tera::Result<Value> {
            let file = str_arg(args, "file")?;
            this.include(file)
                .map(Value::from)
                .map_err(|e| tera::Error::chain(format!("include(file=\"{file}\") failed"), e))
        });

        let this = self.clone();
        tera.register_function("render", move |args: &HashMap<String, Value>| -> tera::Result<Value> {
            let text = str_arg(args, "text")?;
            this.render_nested(text)
                .map(Value::from)
                .map_err(|e| tera::Error::chain("render() failed", e))
        });

        let this = self.clone();
        tera.register_function("exercise", move |args: &HashMap<String, Value>| -> tera::Result<Value> {
            let chapter = slug_arg(args, "chapter")?;
            let exercise = args
                .get("exercise")
                .ok_or_else(|| tera::Error::msg("exercise() requires an `exercise` argument"))?;
            let exercise_slug = slug_of(exercise)
                .ok_or_else(|| tera::Error::msg("exercise() `exercise` needs a slug"))?;
            let title = exercise
                .get("title")
                .and_then(Value::as_str)
                .unwrap_or(exercise_slug);
            let part: ExercisePart = str_arg(args, "which")?.parse().map_err(tera::Error::msg)?;
            let root = args.get("root").and_then(Value::as_str).map(Path::new);

            this.exercise(root, chapter, exercise_slug, title, part)
                .map(Value::from)
                .map_err(|e| {
                    tera::Error::chain(format!("exercise({chapter}/{exercise_slug}/{part}) failed"), e)
                })
        });
    }
}

fn str_arg<'a>(args: &'a HashMap<String, Value>, name: &str) -> tera::Result<&'a str> {
    args.get(name)
        .and_then(Value::as_str)
        .ok_or_else(|| tera::Error::msg(format!("missing string argument `{name}`")))
}

/// A slug given either directly as a string or as an object's `slug` field.
fn slug_of(value: &Value) -> Option<&str> {
    match value {
        Value::String(s) => Some(s),
        Value::Object(map) => map.get("slug").and_then(Value::as_str),
        _ => None,
    }
}

fn slug_arg<'a>(args: &'a HashMap<String, Value>, name: &str) -> tera::Result<&'a str> {
    args.get(name)
        .and_then(slug_of)
        .ok_or_else(|| tera::Error::msg(format!("argument `{name}` must be a slug or have one")))
}

fn io_failure(including: &Path, sub: &str, source: std::io::Error) -> tera::Error {
    let path = helpers::sibling_path(including, sub);
    tera::Error::chain(format!("cannot read {}", path.display()), source)
}

// ============================================================================
// Markdown
// ============================================================================

/// Convert Markdown to HTML, giving every heading without an explicit id an
/// anchor derived from its text.
pub fn markdown_to_html(markdown: &str) -> String {
    let options =
        Options::ENABLE_TABLES | Options::ENABLE_FOOTNOTES | Options::ENABLE_STRIKETHROUGH;
    let events = with_heading_anchors(Parser::new_ext(markdown, options));
    let mut html = String::with_capacity(markdown.len() * 3 / 2);
    md_html::push_html(&mut html, events.into_iter());
    html
}

fn with_heading_anchors<'a>(parser: impl Iterator<Item = Event<'a>>) -> Vec<Event<'a>> {
    let mut events = Vec::new();
    // (index of the heading's Start event, text seen so far)
    let mut heading: Option<(usize, String)> = None;
    for event in parser {
        match &event {
            Event::Start(Tag::Heading { .. }) => heading = Some((events.len(), String::new())),
            Event::Text(text) | Event::Code(text) => {
                if let Some((_, buf)) = heading.as_mut() {
                    buf.push_str(text);
                }
            }
            Event::End(TagEnd::Heading(_)) => {
                if let Some((start, text)) = heading.take() {
                    let anchor = slugify(&text);
                    if let Event::Start(Tag::Heading { id, .. }) = &mut events[start] {
                        if id.is_none() && !anchor.is_empty() {
                            *id = Some(CowStr::from(anchor));
                        }
                    }
                }
            }
            _ => {}
        }
        events.push(event);
    }
    events
}

// ============================================================================
// Pages
// ============================================================================

/// Expand a loaded page, append the link table and convert to HTML.
pub fn render_page(site: &SiteContext, page: &Page) -> Result<String, RenderError> {
    let content = page.content.as_deref().ok_or_else(|| RenderError::NotLoaded {
        page: page.slug.clone(),
    })?;
    let expanded = site.renderer_for(page).render(content)?;
    let markdown = format!("{}\n\n{}", expanded.trim_end(), site.link_table());
    Ok(markdown_to_html(&markdown))
}

/// Write rendered HTML to `<output_dir>/<page.output>`.
pub fn write_page(output_dir: &Path, page: &Page, html: &str) -> Result<PathBuf, RenderError> {
    let path = output_dir.join(&page.output);
    let write_err = |source| RenderError::Write {
        path: path.clone(),
        source,
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(write_err)?;
    }
    fs::write(&path, html).map_err(write_err)?;
    Ok(path)
}

/// Render and write every page. All pages must already be loaded.
pub fn render_all(
    site: &SiteContext,
    pages: &[Page],
    output_dir: &Path,
) -> Result<Vec<PathBuf>, RenderError> {
    if let Some(page) = pages.iter().find(|p| !p.is_loaded()) {
        return Err(RenderError::NotLoaded {
            page: page.slug.clone(),
        });
    }
    let written = pages
        .par_iter()
        .map(|page| {
            let html = render_page(site, page)?;
            let path = write_page(output_dir, page, &html)?;
            debug!(page = %page.slug, path = %path.display(), "rendered");
            Ok(path)
        })
        .collect::<Result<Vec<_>, RenderError>>()?;
    info!(count = written.len(), "pages rendered");
    Ok(written)
}

//! # Folio
//!
//! A static site compiler for books. A book is a list of pages in three groups
//! (extras, chapters, appendices) named in `folio.toml`; each page is a
//! Markdown file whose body is also a template.
//!
//! # Architecture: Two Passes
//!
//! ```text
//! folio.toml ─▶ registry ─▶ load every page ─▶ render every page ─▶ docs/
//!                 (pure)     (front matter)     (templates, HTML)
//! ```
//!
//! Loading finishes for every page before any page renders. A page template
//! can therefore reference metadata from any other page, most commonly its
//! neighbours in the reading order (`page.previous.title`).
//!
//! Around the two passes, the build writes a `numbering.js` table (slug →
//! "1", "2", "A" …) and copies whitelisted static files.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`config`] | `folio.toml` loading and validation, stock config |
//! | [`links`] | Links document → Markdown reference definitions |
//! | [`registry`] | Page records: index, kind, paths, previous/next chain |
//! | [`loader`] | Front matter split and merge, header/footer wrapping |
//! | [`render`] | Template expansion with helpers, Markdown → HTML, writing |
//! | [`helpers`] | File and path building blocks behind the template helpers |
//! | [`naming`] | Heading anchors and page labels |
//! | [`numbering`] | `numbering.js` export |
//! | [`assets`] | Glob-selected static file copying |
//! | [`site`] | Build and check orchestration |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Page Bodies Are Templates
//!
//! Every page body goes through [Tera](https://keats.github.io/tera/) before
//! Markdown conversion. Helper functions (`include`, `exercise`, `read_file`,
//! …) pull other files into the page. Helpers that return template text expand
//! it again, so an included file may itself include files, up to
//! [`render::MAX_RENDER_DEPTH`] levels.
//!
//! ## Position Is Identity
//!
//! A page's index, its previous/next links and its display label all come from
//! its position in the config. Reordering chapters is a config edit; nothing
//! in page sources needs renumbering.
//!
//! ## Static HTML Fragments via Maud
//!
//! The few HTML fragments the compiler writes itself (exercise headings) are
//! built with [Maud](https://maud.lambda.xyz/) so interpolated titles are
//! escaped at compile-checked call sites.

pub mod assets;
pub mod config;
pub mod helpers;
pub mod links;
pub mod loader;
pub mod naming;
pub mod numbering;
pub mod output;
pub mod registry;
pub mod render;
pub mod site;

#[cfg(test)]
pub(crate) mod test_helpers;

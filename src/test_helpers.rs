//! Shared test utilities for the folio test suite.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = setup_fixtures();
//! let mut config = load_config(&tmp.path().join("folio.toml")).unwrap();
//! let summary = build(&mut config).unwrap();
//!
//! let intro = find_page(&summary.pages, "intro");
//! assert_eq!(page_slugs(&summary.pages), ["license", "intro", "notes"]);
//! ```

use std::path::Path;
use tempfile::TempDir;

use crate::registry::Page;

// =========================================================================
// Fixture setup
// =========================================================================

/// Copy `fixtures/book/` to a temp directory and return it.
///
/// Tests get an isolated copy they can mutate (and build into) without
/// affecting other tests or the source fixtures.
pub fn setup_fixtures() -> TempDir {
    let tmp = TempDir::new().unwrap();
    let fixtures = Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/book");
    copy_dir_recursive(&fixtures, tmp.path()).unwrap();
    tmp
}

fn copy_dir_recursive(src: &Path, dst: &Path) -> std::io::Result<()> {
    for entry in std::fs::read_dir(src)? {
        let entry = entry?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());

        if src_path.is_dir() {
            std::fs::create_dir_all(&dst_path)?;
            copy_dir_recursive(&src_path, &dst_path)?;
        } else {
            std::fs::copy(&src_path, &dst_path)?;
        }
    }
    Ok(())
}

// =========================================================================
// Page lookups: panic with a clear message on miss
// =========================================================================

/// Find a page by slug. Panics if not found.
pub fn find_page<'a>(pages: &'a [Page], slug: &str) -> &'a Page {
    pages.iter().find(|p| p.slug == slug).unwrap_or_else(|| {
        let slugs = page_slugs(pages);
        panic!("page '{slug}' not found. Available: {slugs:?}")
    })
}

/// All page slugs in registry order.
pub fn page_slugs(pages: &[Page]) -> Vec<&str> {
    pages.iter().map(|p| p.slug.as_str()).collect()
}

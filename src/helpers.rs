//! Building blocks behind the template helper functions.
//!
//! Everything here takes its context as explicit arguments (root directory,
//! including file, ...). The [`render`](crate::render) module wraps these as
//! template functions and adds the recursive re-expansion where needed.

use maud::html;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::str::FromStr;

/// Which half of an exercise to include.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExercisePart {
    Problem,
    Solution,
}

impl ExercisePart {
    pub fn as_str(self) -> &'static str {
        match self {
            ExercisePart::Problem => "problem",
            ExercisePart::Solution => "solution",
        }
    }
}

impl fmt::Display for ExercisePart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExercisePart {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "problem" => Ok(ExercisePart::Problem),
            "solution" => Ok(ExercisePart::Solution),
            other => Err(format!(
                "exercise part must be 'problem' or 'solution', got '{other}'"
            )),
        }
    }
}

/// Highlighting class for a code sample: `hello.py` → `language-py`.
///
/// Files without an extension get `language-text`.
pub fn code_class(file: &str) -> String {
    let ext = Path::new(file)
        .extension()
        .map(|e| e.to_string_lossy().into_owned())
        .unwrap_or_else(|| "text".to_string());
    format!("language-{ext}")
}

/// Escape `&`, `<` and `>` so source code displays literally.
///
/// Ampersands go first so the entities introduced for `<` and `>` are not
/// escaped again.
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Resolve `sub` relative to the directory holding `including`.
pub fn sibling_path(including: &Path, sub: &str) -> PathBuf {
    including
        .parent()
        .unwrap_or_else(|| Path::new(""))
        .join(sub)
}

/// Read a file next to `including`, escaped for display inside `<pre>`.
pub fn read_file(including: &Path, sub: &str) -> io::Result<String> {
    fs::read_to_string(sibling_path(including, sub)).map(|text| escape_html(&text))
}

/// Read a file next to `including` verbatim, for embedding HTML fragments.
pub fn read_page(including: &Path, sub: &str) -> io::Result<String> {
    fs::read_to_string(sibling_path(including, sub))
}

/// `<root>/<chapter>/<exercise>/<problem|solution>.md`
pub fn exercise_path(root: &Path, chapter: &str, exercise: &str, part: ExercisePart) -> PathBuf {
    root.join(chapter)
        .join(exercise)
        .join(format!("{}.md", part.as_str()))
}

/// Heading placed above an included exercise part.
///
/// A raw HTML block followed by a blank line, so the Markdown that follows is
/// still parsed as Markdown.
pub fn exercise_heading(exercise: &str, title: &str, part: ExercisePart) -> String {
    let id = format!("{exercise}-{part}");
    let class = format!("exercise exercise-{part}");
    let heading = html! {
        h3 id=(id) class=(class) { (title) }
    };
    heading.into_string() + "\n\n"
}

/// Relative path from an output file back to the site root.
///
/// `index.html` → `./`, `intro/index.html` → `../`,
/// `a/b/page.html` → `../../`.
pub fn to_root(output: &Path) -> String {
    let depth = output
        .parent()
        .map(|dir| {
            dir.components()
                .filter(|c| matches!(c, Component::Normal(_)))
                .count()
        })
        .unwrap_or(0);
    if depth == 0 {
        "./".to_string()
    } else {
        "../".repeat(depth)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn code_class_from_extension() {
        assert_eq!(code_class("hello.py"), "language-py");
        assert_eq!(code_class("src/main.rs"), "language-rs");
        assert_eq!(code_class("archive.tar.gz"), "language-gz");
    }

    #[test]
    fn code_class_without_extension() {
        assert_eq!(code_class("Makefile"), "language-text");
    }

    #[test]
    fn escape_html_ampersand_first() {
        assert_eq!(escape_html("<a & b>"), "&lt;a &amp; b&gt;");
    }

    #[test]
    fn escape_html_existing_entities_are_escaped_once() {
        assert_eq!(escape_html("&lt;"), "&amp;lt;");
    }

    #[test]
    fn escape_html_leaves_quotes() {
        assert_eq!(escape_html(r#"x = "y""#), r#"x = "y""#);
    }

    #[test]
    fn read_file_escapes_and_resolves_relative_to_includer() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("intro");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("cmp.py"), "if a < b and b > c: pass\n").unwrap();

        let text = read_file(&dir.join("index.md"), "cmp.py").unwrap();
        assert_eq!(text, "if a &lt; b and b &gt; c: pass\n");
    }

    #[test]
    fn read_page_is_verbatim() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("frag.html"), "<p>Hi &amp; bye</p>\n").unwrap();

        let text = read_page(&tmp.path().join("index.md"), "frag.html").unwrap();
        assert_eq!(text, "<p>Hi &amp; bye</p>\n");
    }

    #[test]
    fn read_file_missing_is_io_error() {
        let tmp = TempDir::new().unwrap();
        let err = read_file(&tmp.path().join("index.md"), "nope.py").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn exercise_part_parses() {
        assert_eq!("problem".parse::<ExercisePart>(), Ok(ExercisePart::Problem));
        assert_eq!("solution".parse::<ExercisePart>(), Ok(ExercisePart::Solution));
        assert!("answer".parse::<ExercisePart>().is_err());
    }

    #[test]
    fn exercise_path_layout() {
        let path = exercise_path(Path::new("/src"), "intro", "first", ExercisePart::Solution);
        assert_eq!(path, PathBuf::from("/src/intro/first/solution.md"));
    }

    #[test]
    fn exercise_heading_escapes_title() {
        let heading = exercise_heading("cmp", "a < b", ExercisePart::Problem);
        assert_eq!(
            heading,
            "<h3 id=\"cmp-problem\" class=\"exercise exercise-problem\">a &lt; b</h3>\n\n"
        );
    }

    #[test]
    fn to_root_depths() {
        assert_eq!(to_root(Path::new("index.html")), "./");
        assert_eq!(to_root(Path::new("intro/index.html")), "../");
        assert_eq!(to_root(Path::new("a/b/page.html")), "../../");
    }
}

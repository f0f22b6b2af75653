//! The two naming schemes used in a built book.
//!
//! These are independent and must not be mixed up:
//!
//! - **Heading anchors** ([`slugify`]): derived from heading text, used as
//!   HTML `id`s so headings can be linked to (`#getting-started`).
//! - **Page labels** ([`ordinal_label`], [`letter_label`]): positional display
//!   labels for pages. Extras and chapters are numbered `1`, `2`, …;
//!   appendices are lettered `A`, `B`, ….
//!
//! Page slugs themselves are author-chosen in the config and are not derived
//! by anything here.

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

/// Characters left unescaped in anchors: RFC 3986 unreserved.
const ANCHOR_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Heading text → anchor id.
///
/// Lowercase, trim, drop everything that is not a letter, digit, underscore,
/// hyphen or whitespace, collapse whitespace runs into a single `-`, then
/// percent-encode (non-ASCII letters survive as `%XX` sequences).
///
/// - `"Hello, World!"` → `"hello-world"`
/// - `"  Already-lower  "` → `"already-lower"`
/// - `"Café au lait"` → `"caf%C3%A9-au-lait"`
pub fn slugify(text: &str) -> String {
    let lowered = text.to_lowercase();
    let kept: String = lowered
        .trim()
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_' || *c == '-' || c.is_whitespace())
        .collect();
    let joined = kept.split_whitespace().collect::<Vec<_>>().join("-");
    utf8_percent_encode(&joined, ANCHOR_ENCODE_SET).to_string()
}

/// Label for the page at 0-based `position` among extras and chapters.
pub fn ordinal_label(position: usize) -> String {
    (position + 1).to_string()
}

/// Label for the appendix at 0-based `position`: `A`…`Z`, then `AA`, `AB`, ….
pub fn letter_label(position: usize) -> String {
    let mut n = position + 1;
    let mut label = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        label.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    label.reverse();
    String::from_utf8(label).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_strips_punctuation() {
        assert_eq!(slugify("Hello, World!"), "hello-world");
    }

    #[test]
    fn slugify_trims_and_keeps_hyphens() {
        assert_eq!(slugify("  Already-lower  "), "already-lower");
    }

    #[test]
    fn slugify_collapses_whitespace_runs() {
        assert_eq!(slugify("a  \t b\n\nc"), "a-b-c");
    }

    #[test]
    fn slugify_keeps_underscores_and_digits() {
        assert_eq!(slugify("Step_2 of 10"), "step_2-of-10");
    }

    #[test]
    fn slugify_percent_encodes_non_ascii() {
        assert_eq!(slugify("Café au lait"), "caf%C3%A9-au-lait");
    }

    #[test]
    fn slugify_is_deterministic() {
        let text = "Why? Because: reasons (mostly)";
        assert_eq!(slugify(text), slugify(text));
        assert_eq!(slugify(text), "why-because-reasons-mostly");
    }

    #[test]
    fn slugify_of_only_punctuation_is_empty() {
        assert_eq!(slugify("?!"), "");
    }

    #[test]
    fn ordinal_labels_are_one_based() {
        assert_eq!(ordinal_label(0), "1");
        assert_eq!(ordinal_label(9), "10");
    }

    #[test]
    fn letter_labels_start_at_a() {
        assert_eq!(letter_label(0), "A");
        assert_eq!(letter_label(1), "B");
        assert_eq!(letter_label(25), "Z");
    }

    #[test]
    fn letter_labels_continue_past_z() {
        assert_eq!(letter_label(26), "AA");
        assert_eq!(letter_label(27), "AB");
        assert_eq!(letter_label(51), "AZ");
        assert_eq!(letter_label(52), "BA");
    }
}

//! Body text trimming and HTML sanitization.
//!
//! Replies usually carry the whole quoted thread below the new content. A
//! configured list of break markers (`<div class="gmail_quote`, `Sent from my
//! iPhone`, ...) marks where the new content ends; everything from the
//! earliest marker onwards is dropped. HTML bodies are then reduced to an
//! allow-listed subset of markup before they reach a page.

use std::collections::{HashMap, HashSet};

/// Inline formatting elements kept by [`TextNormalizer::sanitize`].
const FORMATTING_TAGS: &[&str] = &[
    "b", "big", "br", "code", "del", "em", "font", "i", "ins", "s", "small", "span", "strike",
    "strong", "sub", "sup", "tt", "u",
];

/// Block-level elements kept by [`TextNormalizer::sanitize`].
const BLOCK_TAGS: &[&str] = &[
    "blockquote", "div", "h1", "h2", "h3", "h4", "h5", "h6", "hr", "li", "ol", "p", "pre", "ul",
];

const LINK_SCHEMES: &[&str] = &["http", "https", "mailto"];

/// Trims quoted reply chains and sanitizes HTML bodies.
pub struct TextNormalizer {
    break_markers: Vec<String>,
    cleaner: ammonia::Builder<'static>,
}

impl TextNormalizer {
    /// Create a normalizer. Empty markers are ignored.
    pub fn new(break_markers: impl IntoIterator<Item = impl Into<String>>) -> Self {
        let break_markers: Vec<String> = break_markers
            .into_iter()
            .map(Into::into)
            .filter(|m: &String| !m.is_empty())
            .collect();
        tracing::debug!(markers = ?break_markers, "Using break markers");

        let mut cleaner = ammonia::Builder::empty();
        cleaner
            .tags(
                FORMATTING_TAGS
                    .iter()
                    .chain(BLOCK_TAGS)
                    .chain(&["a", "img"])
                    .copied()
                    .collect(),
            )
            .tag_attributes(HashMap::from([
                ("a", HashSet::from(["href", "title"])),
                (
                    "img",
                    HashSet::from(["src", "alt", "title", "width", "height"]),
                ),
            ]))
            .url_schemes(LINK_SCHEMES.iter().copied().collect())
            .link_rel(Some("nofollow"))
            .clean_content_tags(HashSet::from(["script", "style"]));

        Self {
            break_markers,
            cleaner,
        }
    }

    /// Truncate `text` right before the earliest configured break marker.
    pub fn trim<'t>(&self, text: &'t str) -> &'t str {
        trim_at_markers(text, &self.break_markers)
    }

    /// Reduce arbitrary HTML to the allow-listed subset.
    pub fn sanitize(&self, html: &str) -> String {
        self.cleaner.clean(html).to_string()
    }

    /// Normalize one text part: always trimmed, sanitized only when HTML.
    pub fn normalize(&self, text: &str, is_html: bool) -> String {
        let trimmed = self.trim(text);
        if is_html {
            self.sanitize(trimmed)
        } else {
            trimmed.to_string()
        }
    }
}

/// Cut `text` at the earliest occurrence of any marker.
///
/// Every marker is searched; the smallest match index wins regardless of the
/// order of `markers`. Without a match the text is returned unchanged.
pub fn trim_at_markers<'t>(text: &'t str, markers: &[String]) -> &'t str {
    markers
        .iter()
        .filter(|m| !m.is_empty())
        .filter_map(|m| text.find(m.as_str()))
        .min()
        .map_or(text, |cut| &text[..cut])
}

/// Escape plain text for embedding in a page, keeping line breaks.
pub fn plain_to_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + text.len() / 8);
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            '\r' => {}
            '\n' => out.push_str("<br>\n"),
            _ => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn markers(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_trim_without_marker_is_identity() {
        let text = "Hello\nworld";
        assert_eq!(trim_at_markers(text, &markers(&["-- ", "gmail_quote"])), text);
    }

    #[test]
    fn test_trim_excludes_marker_and_tail() {
        let text = "New content\nSent from my iPhone\n> old";
        let out = trim_at_markers(text, &markers(&["Sent from my iPhone"]));
        assert_eq!(out, "New content\n");
        assert!(!out.contains("Sent from"));
    }

    #[test]
    fn test_trim_earliest_marker_wins_regardless_of_order() {
        let text = "top <hr> middle <div class=\"gmail_quote\"> bottom";
        let a = trim_at_markers(text, &markers(&["gmail_quote", "<hr"]));
        let b = trim_at_markers(text, &markers(&["<hr", "gmail_quote"]));
        assert_eq!(a, "top ");
        assert_eq!(a, b);
    }

    #[test]
    fn test_trim_ignores_empty_markers() {
        let text = "keep me";
        assert_eq!(trim_at_markers(text, &markers(&[""])), text);
    }

    #[test]
    fn test_trim_handles_multibyte_text() {
        let text = "Café ☕ — Forwarded message — ñ";
        let out = trim_at_markers(text, &markers(&["Forwarded message"]));
        assert_eq!(out, "Café ☕ — ");
    }

    #[test]
    fn test_sanitize_removes_scripts_and_handlers() {
        let n = TextNormalizer::new(Vec::<String>::new());
        let out = n.sanitize("<p onclick=\"x()\">Hi<script>alert(1)</script></p>");
        assert_eq!(out, "<p>Hi</p>");
    }

    #[test]
    fn test_sanitize_keeps_links_and_images() {
        let n = TextNormalizer::new(Vec::<String>::new());
        let out = n.sanitize(
            "<a href=\"https://example.com\">x</a><img src=\"https://example.com/a.png\" alt=\"a\">",
        );
        assert!(out.contains("href=\"https://example.com\""));
        assert!(out.contains("rel=\"nofollow\""));
        assert!(out.contains("<img src=\"https://example.com/a.png\" alt=\"a\">"));
    }

    #[test]
    fn test_sanitize_drops_javascript_urls() {
        let n = TextNormalizer::new(Vec::<String>::new());
        let out = n.sanitize("<a href=\"javascript:alert(1)\">x</a>");
        assert!(!out.contains("javascript"));
    }

    #[test]
    fn test_normalize_gmail_quote() {
        let n = TextNormalizer::new(["gmail_quote"]);
        let out = n.normalize("<p>Hi</p><div class=\"gmail_quote\">On Monday...</div>", true);
        assert_eq!(out, "<p>Hi</p>");
    }

    #[test]
    fn test_normalize_plain_text_is_not_sanitized() {
        let n = TextNormalizer::new(["--"]);
        assert_eq!(n.normalize("a <b> c\n--\nsig", false), "a <b> c\n");
    }

    #[test]
    fn test_plain_to_html() {
        assert_eq!(plain_to_html("a < b\r\nc & d"), "a &lt; b<br>\nc &amp; d");
    }
}

//! Markup-to-text cleanup pipeline.
//!
//! Each pass is a function `&str -> String` applied in sequence. Every pass
//! leaves nothing behind that an earlier pass would match again, which keeps
//! the whole pipeline idempotent.

use std::sync::LazyLock;

use regex::{Captures, Regex};

/// Run the full cleanup pipeline on a raw markup fragment.
pub(crate) fn run_pipeline(html: &str) -> String {
    let mut result = html.to_string();

    result = drop_container_tags(&result);
    result = paragraphs_to_newlines(&result);
    result = line_breaks_to_newlines(&result);
    result = strip_tags(&result);
    result = decode_entities(&result);
    result = collapse_spaces(&result);
    result = trim_lines(&result);
    result = collapse_blank_lines(&result);

    result.trim().to_string()
}

// ---------------------------------------------------------------------------
// Pass 1: Drop generic container tags
// ---------------------------------------------------------------------------

/// Remove `<div>` open/close tags (with or without attributes).
fn drop_container_tags(html: &str) -> String {
    static DIV_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"(?i)</?div(?:\s[^>]*)?>").expect("valid regex"));

    DIV_RE.replace_all(html, "").to_string()
}

// ---------------------------------------------------------------------------
// Pass 2: Paragraph tags become newlines
// ---------------------------------------------------------------------------

fn paragraphs_to_newlines(html: &str) -> String {
    static P_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"(?i)</?p(?:\s[^>]*)?>").expect("valid regex"));

    P_RE.replace_all(html, "\n").to_string()
}

// ---------------------------------------------------------------------------
// Pass 3: Line-break tags become newlines
// ---------------------------------------------------------------------------

fn line_breaks_to_newlines(html: &str) -> String {
    static BR_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"(?i)<br\s*/?>").expect("valid regex"));

    BR_RE.replace_all(html, "\n").to_string()
}

// ---------------------------------------------------------------------------
// Pass 4: Strip every remaining tag
// ---------------------------------------------------------------------------

/// Remove any `<...>` span, whatever the tag name.
fn strip_tags(html: &str) -> String {
    static TAG_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"<[^>]*>").expect("valid regex"));

    TAG_RE.replace_all(html, "").to_string()
}

// ---------------------------------------------------------------------------
// Pass 5: Decode whitespace and typographic entities
// ---------------------------------------------------------------------------

/// Decode a fixed set of entities.
///
/// `&lt;`, `&gt;` and `&amp;` stay encoded: decoding them could produce a
/// new tag span or entity on the next run.
fn decode_entities(text: &str) -> String {
    static ENTITY_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"&(nbsp|quot|apos|#39|ndash|mdash|lsquo|rsquo|ldquo|rdquo|hellip);")
            .expect("valid regex")
    });

    ENTITY_RE
        .replace_all(text, |caps: &Captures| {
            match &caps[1] {
                "nbsp" => " ",
                "quot" => "\"",
                "apos" | "#39" => "'",
                "ndash" => "\u{2013}",
                "mdash" => "\u{2014}",
                "lsquo" => "\u{2018}",
                "rsquo" => "\u{2019}",
                "ldquo" => "\u{201C}",
                "rdquo" => "\u{201D}",
                _ => "\u{2026}",
            }
            .to_string()
        })
        .to_string()
}

// ---------------------------------------------------------------------------
// Pass 6: Collapse runs of spaces
// ---------------------------------------------------------------------------

fn collapse_spaces(text: &str) -> String {
    static SPACES_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r" {2,}").expect("valid regex"));

    SPACES_RE.replace_all(text, " ").to_string()
}

// ---------------------------------------------------------------------------
// Pass 7: Trim every line
// ---------------------------------------------------------------------------

fn trim_lines(text: &str) -> String {
    text.lines().map(str::trim).collect::<Vec<_>>().join("\n")
}

// ---------------------------------------------------------------------------
// Pass 8: Collapse blank-line runs
// ---------------------------------------------------------------------------

/// Collapse runs of 3+ newlines into exactly one blank line.
fn collapse_blank_lines(text: &str) -> String {
    static MULTI_BLANK_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\n{3,}").expect("valid regex"));

    MULTI_BLANK_RE.replace_all(text, "\n\n").to_string()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drop_container_tags_keeps_inner_text() {
        let input = r#"<div class="x">one</div><DIV>two</DIV>"#;
        assert_eq!(drop_container_tags(input), "onetwo");
    }

    #[test]
    fn drop_container_tags_ignores_similar_names() {
        // <dialog> is not a <div>
        assert_eq!(drop_container_tags("<dialog>x</dialog>"), "<dialog>x</dialog>");
    }

    #[test]
    fn paragraphs_become_newlines() {
        assert_eq!(paragraphs_to_newlines("<p>a</p><p class=\"c\">b</p>"), "\na\n\nb\n");
    }

    #[test]
    fn paragraphs_leave_pre_alone() {
        assert_eq!(paragraphs_to_newlines("<pre>x</pre>"), "<pre>x</pre>");
    }

    #[test]
    fn line_breaks_become_newlines() {
        assert_eq!(line_breaks_to_newlines("a<br>b<br/>c<BR />d"), "a\nb\nc\nd");
    }

    #[test]
    fn strip_tags_removes_any_tag() {
        let input = r#"<span style="x">a</span><img src="i.png"/><b>b</b>"#;
        assert_eq!(strip_tags(input), "ab");
    }

    #[test]
    fn strip_tags_spans_lines() {
        assert_eq!(strip_tags("a<a\nhref=\"x\">b</a>"), "ab");
    }

    #[test]
    fn decode_entities_known_set() {
        assert_eq!(decode_entities("a&nbsp;b &quot;c&quot;"), "a b \"c\"");
        assert_eq!(decode_entities("it&#39;s&hellip;"), "it's\u{2026}");
    }

    #[test]
    fn decode_entities_keeps_markup_entities() {
        assert_eq!(decode_entities("&lt;b&gt; &amp;"), "&lt;b&gt; &amp;");
    }

    #[test]
    fn collapse_spaces_single() {
        assert_eq!(collapse_spaces("a    b  c d"), "a b c d");
    }

    #[test]
    fn trim_lines_strips_each_line() {
        assert_eq!(trim_lines("  a  \n\tb\n   "), "a\nb\n");
    }

    #[test]
    fn collapse_blank_lines_keeps_one_blank() {
        assert_eq!(collapse_blank_lines("a\n\n\n\n\nb"), "a\n\nb");
        assert_eq!(collapse_blank_lines("a\n\nb"), "a\n\nb");
    }

    #[test]
    fn full_pipeline_on_chapter_markup() {
        let input = "<div id=\"novel_content\"><div>\n  <p>첫 문장입니다.</p>\n  <p>&nbsp;</p>\n  <p>두   번째&hellip;</p>\n</div></div>";
        assert_eq!(run_pipeline(input), "첫 문장입니다.\n\n두 번째\u{2026}");
    }
}

//! Markup-to-plain-text sanitizing and chapter file naming.
//!
//! [`sanitize`] turns a chapter body fragment into plain text through a series
//! of cleanup passes. [`sanitize_file_name`] and [`chapter_file_name`] derive
//! filesystem-safe names from chapter titles.

mod cleanup;

use std::sync::LazyLock;

use regex::Regex;
use tracing::trace;

/// Name used when a title sanitizes down to nothing.
const UNTITLED: &str = "untitled";

/// Upper bound on a sanitized title, in bytes (leaves room for prefix and extension).
const MAX_TITLE_BYTES: usize = 200;

/// Extension of chapter and merged files.
pub const TEXT_EXTENSION: &str = "txt";

/// Convert a markup fragment into plain text.
///
/// Container tags are dropped, paragraph and line-break tags become newlines,
/// every other tag is stripped, and whitespace is normalized so that
/// paragraphs are separated by exactly one blank line. The result has no
/// leading or trailing whitespace.
///
/// Idempotent: `sanitize(&sanitize(x)) == sanitize(x)`.
pub fn sanitize(fragment: &str) -> String {
    let text = cleanup::run_pipeline(fragment);
    trace!(input_len = fragment.len(), output_len = text.len(), "sanitized fragment");
    text
}

/// Make a chapter title safe to use as a file name.
///
/// Reserved characters (`\ / : * ? " < > |`) and control characters become
/// `_`, all whitespace is removed, leading dots are dropped so the file is
/// never hidden, and the name is capped in length. An empty result becomes
/// `untitled`. Clean input comes back unchanged.
pub fn sanitize_file_name(title: &str) -> String {
    static INVALID_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r#"[\\/:*?"<>|\x00-\x1F\x7F]"#).expect("valid regex"));

    let replaced = INVALID_RE.replace_all(title, "_");
    let compact: String = replaced.chars().filter(|c| !c.is_whitespace()).collect();
    let name = truncate_at_char_boundary(compact.trim_start_matches('.'), MAX_TITLE_BYTES);

    if name.is_empty() {
        UNTITLED.to_string()
    } else {
        name.to_string()
    }
}

/// File name for a downloaded chapter.
///
/// With `numbered` set the listing position is carried as a zero-padded
/// prefix (`0012_Title.txt`), so the merge stage orders by position even when
/// the title contains unrelated numbers.
pub fn chapter_file_name(position: u32, title: &str, numbered: bool) -> String {
    let title = sanitize_file_name(title);
    if numbered {
        format!("{position:04}_{title}.{TEXT_EXTENSION}")
    } else {
        format!("{title}.{TEXT_EXTENSION}")
    }
}

fn truncate_at_char_boundary(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

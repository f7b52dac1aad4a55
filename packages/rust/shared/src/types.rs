//! Core domain types shared by the downloader and the merge stage.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use url::Url;

// ---------------------------------------------------------------------------
// ChapterLink
// ---------------------------------------------------------------------------

/// A chapter URL found at a fixed position in the listing page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapterLink {
    /// 1-based position of the entry in the listing.
    pub position: u32,
    /// Absolute chapter page URL.
    pub url: Url,
}

impl ChapterLink {
    pub fn new(position: u32, url: Url) -> Self {
        Self { position, url }
    }
}

// ---------------------------------------------------------------------------
// ChapterFile
// ---------------------------------------------------------------------------

/// A chapter persisted to the output directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapterFile {
    /// Where the chapter text lives.
    pub path: PathBuf,
    /// Sort key recovered from the file name (see [`ordering_key`]).
    pub ordering_key: u64,
}

impl ChapterFile {
    /// Build a `ChapterFile` for `path`, deriving the key from its file name.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let ordering_key = path
            .file_name()
            .map(|name| ordering_key(&name.to_string_lossy()))
            .unwrap_or(0);
        Self { path, ordering_key }
    }

    /// File name component, lossily converted.
    pub fn file_name(&self) -> String {
        file_name_of(&self.path)
    }
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Extract the ordering key from a chapter file name.
///
/// The key is the first maximal run of ASCII digits anywhere in the name.
/// Names without digits, or whose first run does not fit in a `u64`, get 0.
pub fn ordering_key(file_name: &str) -> u64 {
    static DIGITS_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"[0-9]+").expect("valid regex"));

    DIGITS_RE
        .find(file_name)
        .and_then(|m| m.as_str().parse::<u64>().ok())
        .unwrap_or(0)
}

// ---------------------------------------------------------------------------
// Stage
// ---------------------------------------------------------------------------

/// Pipeline state, reported as the run progresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Idle,
    ListingFetched,
    LinksExtracted,
    Downloading,
    DownloadsComplete,
    Merging,
    Merged,
    Done,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::ListingFetched => "listing fetched",
            Self::LinksExtracted => "links extracted",
            Self::Downloading => "downloading",
            Self::DownloadsComplete => "downloads complete",
            Self::Merging => "merging",
            Self::Merged => "merged",
            Self::Done => "done",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering_key_takes_first_digit_run() {
        assert_eq!(ordering_key("ch_10.txt"), 10);
        assert_eq!(ordering_key("0007_Episode12.txt"), 7);
        assert_eq!(ordering_key("제3화-끝.txt"), 3);
    }

    #[test]
    fn ordering_key_defaults_to_zero() {
        assert_eq!(ordering_key("prologue.txt"), 0);
        assert_eq!(ordering_key(""), 0);
        // Overflowing runs fall back to 0 rather than saturating.
        assert_eq!(ordering_key("99999999999999999999999.txt"), 0);
    }

    #[test]
    fn ordering_key_ignores_non_ascii_digits() {
        // Arabic-Indic digits are not decimal keys.
        assert_eq!(ordering_key("chapter_٣.txt"), 0);
    }

    #[test]
    fn stage_display() {
        assert_eq!(Stage::DownloadsComplete.to_string(), "downloads complete");
    }

    #[test]
    fn chapter_file_from_path() {
        let file = ChapterFile::from_path("output/0042_Title.txt");
        assert_eq!(file.ordering_key, 42);
        assert_eq!(file.file_name(), "0042_Title.txt");
    }
}

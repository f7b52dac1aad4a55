//! Listing extraction, chapter parsing, and the concurrent chapter downloader.
//!
//! This crate provides:
//! - [`listing`]: Positional chapter link extraction from the listing page
//! - [`chapter`]: Title/body extraction from a chapter page
//! - [`engine`]: Bounded worker pool that downloads chapters to disk
//! - [`progress`]: Completion counter and progress callbacks

pub mod chapter;
pub mod engine;
pub mod listing;
pub mod progress;

pub use chapter::{ChapterContent, ChapterSelectors, parse_chapter, strip_title_prefix};
pub use engine::{
    ChapterFailure, ChapterOutcome, ChapterStatus, DownloadReport, Downloader, build_client,
    fetch_html, pick_user_agent,
};
pub use listing::{ListingSelector, POSITION_PLACEHOLDER, extract_links, links_from_html};
pub use progress::{ProgressCounter, ProgressReporter, SilentProgress};

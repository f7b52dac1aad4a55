//! Pipeline orchestration for novel-dl.
//!
//! This crate ties together link extraction, the chapter downloader, and the
//! merge stage into the end-to-end `download` workflow.

pub mod merge;
pub mod pipeline;

pub use merge::{MergeResult, merge_chapters};
pub use pipeline::{RunSummary, finish, run, run_merge};

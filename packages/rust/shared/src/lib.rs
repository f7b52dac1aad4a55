//! Shared types, error model, and configuration for novel-dl.
//!
//! This crate is the foundation depended on by all other novel-dl crates.
//! It provides:
//! - [`NovelDlError`]: the unified error type
//! - Domain types ([`ChapterLink`], [`ChapterFile`], [`Stage`], [`ordering_key`])
//! - Configuration ([`AppConfig`], [`DownloadConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, DefaultsConfig, DownloadConfig, HttpConfig, SelectorsConfig, config_dir,
    config_file_path, init_config, load_config, load_config_from,
};
pub use error::{NovelDlError, Result};
pub use types::{ChapterFile, ChapterLink, Stage, ordering_key};

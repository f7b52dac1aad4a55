//! The error every novel-dl library call returns.
//!
//! The CLI turns these into `color-eyre` reports; the downloader turns
//! per-chapter ones into failure entries instead.

use std::path::PathBuf;

/// Why a listing, chapter, merge, or config operation failed.
#[derive(Debug, thiserror::Error)]
pub enum NovelDlError {
    /// Unreadable config file, bad selector, or missing required setting.
    #[error("config error: {message}")]
    Config { message: String },

    /// Transport failure or a response other than 200.
    #[error("network error: {0}")]
    Network(String),

    /// A page was fetched but the expected content was not in it.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Reading or writing `path` failed.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A user-supplied value is out of range.
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// `Result` specialized to [`NovelDlError`].
pub type Result<T> = std::result::Result<T, NovelDlError>;

impl NovelDlError {
    /// Shorthand for [`NovelDlError::Config`].
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Shorthand for [`NovelDlError::Parse`].
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Shorthand for [`NovelDlError::Validation`].
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Attach the path that was being read or written.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

//! Bounded, concurrent chapter downloader.
//!
//! One task is spawned per chapter link. A semaphore sized to the configured
//! thread count gates how many tasks fetch at once; each task waits a fixed
//! courtesy delay, fetches and sanitizes its chapter, and writes one file.
//! A failed chapter is logged and skipped, never aborting the rest.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use rand::seq::SliceRandom;
use reqwest::{Client, StatusCode};
use tokio::sync::Semaphore;
use tracing::{debug, info, instrument, warn};
use url::Url;

use novel_dl_shared::{ChapterFile, ChapterLink, DownloadConfig, NovelDlError, Result};
use novel_dl_text::{chapter_file_name, sanitize};

use crate::chapter::{ChapterSelectors, parse_chapter, strip_title_prefix};
use crate::progress::ProgressCounter;

/// Fallback User-Agent when the configured pool is empty.
const DEFAULT_USER_AGENT: &str = concat!("novel-dl/", env!("CARGO_PKG_VERSION"));

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// Result of one chapter task.
#[derive(Debug, Clone)]
pub struct ChapterOutcome {
    pub position: u32,
    pub url: Url,
    pub status: ChapterStatus,
}

/// Whether a chapter made it to disk.
#[derive(Debug, Clone)]
pub enum ChapterStatus {
    Written(ChapterFile),
    Failed(String),
}

impl ChapterOutcome {
    pub fn is_written(&self) -> bool {
        matches!(self.status, ChapterStatus::Written(_))
    }
}

/// A chapter that could not be downloaded.
#[derive(Debug, Clone)]
pub struct ChapterFailure {
    pub position: u32,
    pub url: Url,
    pub error: String,
}

/// Summary of a completed download pass.
#[derive(Debug, Clone)]
pub struct DownloadReport {
    /// Number of links scheduled.
    pub total: usize,
    /// Files written, in listing order.
    pub written: Vec<ChapterFile>,
    /// Chapters that failed, in listing order.
    pub failures: Vec<ChapterFailure>,
    /// Wall-clock time of the pass.
    pub duration: Duration,
}

// ---------------------------------------------------------------------------
// HTTP helpers
// ---------------------------------------------------------------------------

/// Pick one User-Agent from `pool` for the whole run.
pub fn pick_user_agent(pool: &[String]) -> String {
    pool.choose(&mut rand::thread_rng())
        .cloned()
        .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string())
}

/// Build the HTTP client shared by every request of a run.
pub fn build_client(user_agent: &str, timeout_secs: u64) -> Result<Client> {
    Client::builder()
        .user_agent(user_agent)
        .redirect(reqwest::redirect::Policy::limited(5))
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| NovelDlError::Network(format!("failed to build HTTP client: {e}")))
}

/// GET `url` and return its body. Any status other than 200 is an error.
pub async fn fetch_html(client: &Client, url: &Url) -> Result<String> {
    let response = client
        .get(url.as_str())
        .send()
        .await
        .map_err(|e| NovelDlError::Network(format!("{url}: {e}")))?;

    let status = response.status();
    if status != StatusCode::OK {
        return Err(NovelDlError::Network(format!("{url}: HTTP {status}")));
    }

    response
        .text()
        .await
        .map_err(|e| NovelDlError::Network(format!("{url}: body read failed: {e}")))
}

// ---------------------------------------------------------------------------
// Downloader
// ---------------------------------------------------------------------------

/// Worker pool that downloads chapters into an output directory.
pub struct Downloader {
    client: Client,
    selectors: Arc<ChapterSelectors>,
    output_dir: PathBuf,
    threads: usize,
    delay: Duration,
    numbered_file_names: bool,
}

impl Downloader {
    /// Create a downloader from runtime config and a prepared client.
    pub fn new(config: &DownloadConfig, client: Client) -> Result<Self> {
        if config.threads == 0 {
            return Err(NovelDlError::validation("thread count must be at least 1"));
        }
        let selectors = ChapterSelectors::compile(&config.title_selectors, &config.content_selectors)?;

        Ok(Self {
            client,
            selectors: Arc::new(selectors),
            output_dir: config.output_dir.clone(),
            threads: config.threads,
            delay: Duration::from_millis(config.delay_ms),
            numbered_file_names: config.numbered_file_names,
        })
    }

    /// Download every link, at most `threads` at a time.
    ///
    /// Returns once all tasks have finished. `counter` is incremented exactly
    /// once per link whatever the outcome.
    #[instrument(skip_all, fields(links = links.len(), threads = self.threads))]
    pub async fn download_all(
        &self,
        links: &[ChapterLink],
        counter: Arc<ProgressCounter>,
    ) -> DownloadReport {
        let start_time = Instant::now();
        let semaphore = Arc::new(Semaphore::new(self.threads));

        info!(
            delay_ms = self.delay.as_millis(),
            output_dir = %self.output_dir.display(),
            "starting chapter downloads"
        );

        let mut handles = Vec::with_capacity(links.len());

        for link in links {
            let task = ChapterTask {
                client: self.client.clone(),
                selectors: self.selectors.clone(),
                output_dir: self.output_dir.clone(),
                delay: self.delay,
                numbered_file_names: self.numbered_file_names,
            };
            let sem = semaphore.clone();
            let counter = counter.clone();
            let task_link = link.clone();

            let handle = tokio::spawn(async move {
                match sem.acquire_owned().await {
                    Ok(_permit) => {
                        counter.reporter().chapter_started(&task_link);
                        let outcome = task.run(&task_link).await;
                        // Counted while the slot is still held.
                        counter.increment(&outcome).await;
                        outcome
                    }
                    Err(e) => {
                        let outcome = failed(&task_link, format!("pool closed: {e}"));
                        counter.increment(&outcome).await;
                        outcome
                    }
                }
            });
            handles.push((link.clone(), handle));
        }

        let mut written = Vec::new();
        let mut failures = Vec::new();

        for (link, handle) in handles {
            let outcome = match handle.await {
                Ok(outcome) => outcome,
                Err(e) => {
                    // The task died before counting itself.
                    let outcome = failed(&link, format!("task failed: {e}"));
                    counter.increment(&outcome).await;
                    outcome
                }
            };

            match outcome.status {
                ChapterStatus::Written(file) => written.push(file),
                ChapterStatus::Failed(error) => failures.push(ChapterFailure {
                    position: outcome.position,
                    url: outcome.url,
                    error,
                }),
            }
        }

        let report = DownloadReport {
            total: links.len(),
            written,
            failures,
            duration: start_time.elapsed(),
        };

        info!(
            written = report.written.len(),
            failed = report.failures.len(),
            duration_ms = report.duration.as_millis(),
            "chapter downloads completed"
        );

        report
    }
}

fn failed(link: &ChapterLink, error: String) -> ChapterOutcome {
    ChapterOutcome {
        position: link.position,
        url: link.url.clone(),
        status: ChapterStatus::Failed(error),
    }
}

// ---------------------------------------------------------------------------
// Per-chapter task
// ---------------------------------------------------------------------------

/// Everything one task needs, owned so it can move into `tokio::spawn`.
struct ChapterTask {
    client: Client,
    selectors: Arc<ChapterSelectors>,
    output_dir: PathBuf,
    delay: Duration,
    numbered_file_names: bool,
}

impl ChapterTask {
    async fn run(&self, link: &ChapterLink) -> ChapterOutcome {
        match self.download(link).await {
            Ok(file) => {
                debug!(position = link.position, path = %file.path.display(), "chapter written");
                ChapterOutcome {
                    position: link.position,
                    url: link.url.clone(),
                    status: ChapterStatus::Written(file),
                }
            }
            Err(e) => {
                warn!(position = link.position, url = %link.url, error = %e, "chapter download failed");
                failed(link, e.to_string())
            }
        }
    }

    async fn download(&self, link: &ChapterLink) -> Result<ChapterFile> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        debug!(position = link.position, url = %link.url, "fetching chapter");
        let html = fetch_html(&self.client, &link.url).await?;

        let content = parse_chapter(&html, &self.selectors, link.position)?;
        let body = strip_title_prefix(&sanitize(&content.raw_body), &content.title);
        if body.is_empty() {
            debug!(position = link.position, "chapter body is empty after sanitizing");
        }

        let file_name = chapter_file_name(link.position, &content.title, self.numbered_file_names);
        let path = write_atomic(&self.output_dir, &file_name, &body).await?;

        Ok(ChapterFile::from_path(path))
    }
}

/// Write `content` to `dir/file_name` via a hidden temp file and rename, so a
/// failed write never leaves a partial chapter behind.
pub(crate) async fn write_atomic(dir: &Path, file_name: &str, content: &str) -> Result<PathBuf> {
    let target = dir.join(file_name);
    let temp = dir.join(format!(".{file_name}.tmp"));

    if let Err(e) = tokio::fs::write(&temp, content).await {
        let _ = tokio::fs::remove_file(&temp).await;
        return Err(NovelDlError::io(&temp, e));
    }

    if let Err(e) = tokio::fs::rename(&temp, &target).await {
        let _ = tokio::fs::remove_file(&temp).await;
        return Err(NovelDlError::io(&target, e));
    }

    Ok(target)
}

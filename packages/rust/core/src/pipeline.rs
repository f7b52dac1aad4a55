//! End-to-end download pipeline: listing → links → chapters, then an optional merge.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{info, instrument, warn};
use url::Url;

use novel_dl_crawler::{
    DownloadReport, Downloader, ListingSelector, ProgressCounter, ProgressReporter,
    build_client, fetch_html, links_from_html, pick_user_agent,
};
use novel_dl_shared::{ChapterLink, DownloadConfig, NovelDlError, Result, Stage};

use crate::merge::{MergeResult, merge_chapters};

/// Result of a download run.
#[derive(Debug)]
pub struct RunSummary {
    /// Number of chapter links extracted from the listing.
    pub links_found: usize,
    /// Where the link list was saved.
    pub links_file: PathBuf,
    /// Directory chapter files were written to.
    pub output_dir: PathBuf,
    /// Per-chapter results.
    pub report: DownloadReport,
}

/// Run the download pipeline.
///
/// 1. Pick a User-Agent and build one HTTP client
/// 2. Fetch the listing page
/// 3. Extract chapter links for positions `first_chapter..=last_chapter`
/// 4. Save the link list
/// 5. Create the output directory
/// 6. Download every chapter through the bounded pool
///
/// A range with `last_chapter < first_chapter` is rejected before any
/// request. Steps 2, 4 and 5 are fatal on failure. Per-chapter failures end
/// up in [`DownloadReport::failures`].
#[instrument(skip_all, fields(url = %listing_url, first_chapter = config.first_chapter, last_chapter = last_chapter))]
pub async fn run(
    config: &DownloadConfig,
    listing_url: &Url,
    last_chapter: u32,
    progress: Arc<dyn ProgressReporter>,
) -> Result<RunSummary> {
    config.validate()?;
    if last_chapter < config.first_chapter {
        return Err(NovelDlError::validation(format!(
            "last chapter {last_chapter} is before first chapter {}",
            config.first_chapter
        )));
    }
    let listing_selector = ListingSelector::new(config.listing_selector.clone())?;

    let user_agent = pick_user_agent(&config.user_agents);
    let client = build_client(&user_agent, config.timeout_secs)?;
    let downloader = Downloader::new(config, client.clone())?;

    info!(url = %listing_url, "fetching chapter listing");
    let html = fetch_html(&client, listing_url).await?;
    enter(progress.as_ref(), Stage::ListingFetched);

    let positions = config.first_chapter..=last_chapter;
    let links = links_from_html(&html, listing_url, positions, &listing_selector)?;
    if links.is_empty() {
        warn!("no chapter links found in listing");
    }
    info!(links = links.len(), "chapter links extracted");
    enter(progress.as_ref(), Stage::LinksExtracted);

    save_links(&config.links_file, &links).await?;

    tokio::fs::create_dir_all(&config.output_dir)
        .await
        .map_err(|e| NovelDlError::io(&config.output_dir, e))?;

    enter(progress.as_ref(), Stage::Downloading);
    let counter = Arc::new(ProgressCounter::new(links.len(), progress.clone()));
    let report = downloader.download_all(&links, counter).await;
    enter(progress.as_ref(), Stage::DownloadsComplete);

    Ok(RunSummary {
        links_found: links.len(),
        links_file: config.links_file.clone(),
        output_dir: config.output_dir.clone(),
        report,
    })
}

/// Merge the chapters in the configured output directory.
pub fn run_merge(config: &DownloadConfig, progress: &dyn ProgressReporter) -> Result<MergeResult> {
    enter(progress, Stage::Merging);
    let result = merge_chapters(
        &config.output_dir,
        &config.merged_file_name,
        Some(config.links_file.as_path()),
    )?;
    enter(progress, Stage::Merged);
    Ok(result)
}

/// Report the end of the run.
pub fn finish(progress: &dyn ProgressReporter) {
    enter(progress, Stage::Done);
}

fn enter(progress: &dyn ProgressReporter, stage: Stage) {
    info!(%stage, "pipeline stage");
    progress.stage(stage);
}

/// Write one URL per line, in extraction order.
async fn save_links(path: &Path, links: &[ChapterLink]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| NovelDlError::io(parent, e))?;
    }

    let mut content = String::new();
    for link in links {
        content.push_str(link.url.as_str());
        content.push('\n');
    }

    tokio::fs::write(path, content)
        .await
        .map_err(|e| NovelDlError::io(path, e))?;
    info!(path = %path.display(), "link list saved");
    Ok(())
}

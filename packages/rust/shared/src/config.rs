//! Application configuration for novel-dl.
//!
//! User config lives at `~/.novel-dl/novel-dl.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{NovelDlError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "novel-dl.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".novel-dl";

// ---------------------------------------------------------------------------
// Config structs (matching novel-dl.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Global defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// CSS selectors for the listing and chapter pages.
    #[serde(default)]
    pub selectors: SelectorsConfig,

    /// HTTP client settings.
    #[serde(default)]
    pub http: HttpConfig,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Directory chapter files are written to.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    /// File the extracted chapter URLs are saved to.
    #[serde(default = "default_links_file")]
    pub links_file: String,

    /// Name of the merged document inside `output_dir`.
    #[serde(default = "default_merged_file_name")]
    pub merged_file_name: String,

    /// First listing position to download (1-based).
    #[serde(default = "default_first_chapter")]
    pub first_chapter: u32,

    /// Number of concurrent chapter downloads.
    #[serde(default = "default_threads")]
    pub threads: usize,

    /// Courtesy delay before each chapter fetch, in ms.
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Prefix chapter files with their zero-padded listing position.
    #[serde(default = "default_true")]
    pub numbered_file_names: bool,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            links_file: default_links_file(),
            merged_file_name: default_merged_file_name(),
            first_chapter: default_first_chapter(),
            threads: default_threads(),
            delay_ms: default_delay_ms(),
            timeout_secs: default_timeout_secs(),
            numbered_file_names: true,
        }
    }
}

fn default_output_dir() -> String {
    "./output".into()
}
fn default_links_file() -> String {
    "links.txt".into()
}
fn default_merged_file_name() -> String {
    "merged.txt".into()
}
fn default_first_chapter() -> u32 {
    1
}
fn default_threads() -> usize {
    1
}
fn default_delay_ms() -> u64 {
    1250
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_true() -> bool {
    true
}

/// `[selectors]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectorsConfig {
    /// Listing entry selector; `{n}` is replaced with the 1-based position.
    #[serde(default = "default_listing_entry")]
    pub listing_entry: String,

    /// Chapter title selectors, tried in order.
    #[serde(default = "default_title_selectors")]
    pub title: Vec<String>,

    /// Chapter body selectors, tried in order.
    #[serde(default = "default_content_selectors")]
    pub content: Vec<String>,
}

impl Default for SelectorsConfig {
    fn default() -> Self {
        Self {
            listing_entry: default_listing_entry(),
            title: default_title_selectors(),
            content: default_content_selectors(),
        }
    }
}

fn default_listing_entry() -> String {
    "#serial-move > div > ul > li:nth-child({n}) > div.wr-subject > a".into()
}

fn default_title_selectors() -> Vec<String> {
    [
        "#content_wrapper > div.page-title > span",
        ".toon-title",
        ".view-title",
        "h1.title",
        ".post-title",
        ".entry-title",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_content_selectors() -> Vec<String> {
    [
        "#novel_content",
        ".novel-content",
        ".view-content",
        ".entry-content",
        ".post-content",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

/// `[http]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// User-Agent pool; one entry is picked per run.
    #[serde(default = "default_user_agents")]
    pub user_agents: Vec<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agents: default_user_agents(),
        }
    }
}

fn default_user_agents() -> Vec<String> {
    [
        "Mozilla/5.0 (Linux; Android 4.4.1; SM-J200G Build/KTU84P) AppleWebKit/601.9 (KHTML, like Gecko) Chrome/54.0.2322.256 Mobile Safari/533.9",
        "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_3_1) AppleWebKit/603.26 (KHTML, like Gecko) Chrome/48.0.1152.123 Safari/600",
        "Mozilla/5.0 (Macintosh; Intel Mac OS X 9_5_0) Gecko/20100101 Firefox/71.4",
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/58.0.3029.110 Safari/537.36",
        "Mozilla/5.0 (iPhone; CPU iPhone OS 8_8_7; like Mac OS X) AppleWebKit/533.1 (KHTML, like Gecko) Chrome/53.0.1144.134 Mobile Safari/603.9",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

// ---------------------------------------------------------------------------
// Download config (runtime, merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime download configuration, merged from config file + CLI flags.
#[derive(Debug, Clone)]
pub struct DownloadConfig {
    /// Directory chapter files are written to.
    pub output_dir: PathBuf,
    /// Where the extracted chapter URLs are saved.
    pub links_file: PathBuf,
    /// Merged document file name inside `output_dir`.
    pub merged_file_name: String,
    /// First listing position to download (1-based).
    pub first_chapter: u32,
    /// Maximum concurrent chapter downloads.
    pub threads: usize,
    /// Courtesy delay before each chapter fetch, in ms.
    pub delay_ms: u64,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// Prefix chapter files with their listing position.
    pub numbered_file_names: bool,
    /// Listing entry selector template (`{n}` placeholder).
    pub listing_selector: String,
    /// Chapter title selectors, in priority order.
    pub title_selectors: Vec<String>,
    /// Chapter body selectors, in priority order.
    pub content_selectors: Vec<String>,
    /// User-Agent pool.
    pub user_agents: Vec<String>,
}

impl From<&AppConfig> for DownloadConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            output_dir: PathBuf::from(&config.defaults.output_dir),
            links_file: PathBuf::from(&config.defaults.links_file),
            merged_file_name: config.defaults.merged_file_name.clone(),
            first_chapter: config.defaults.first_chapter,
            threads: config.defaults.threads,
            delay_ms: config.defaults.delay_ms,
            timeout_secs: config.defaults.timeout_secs,
            numbered_file_names: config.defaults.numbered_file_names,
            listing_selector: config.selectors.listing_entry.clone(),
            title_selectors: config.selectors.title.clone(),
            content_selectors: config.selectors.content.clone(),
            user_agents: config.http.user_agents.clone(),
        }
    }
}

impl DownloadConfig {
    /// Reject settings the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.threads == 0 {
            return Err(NovelDlError::validation("thread count must be at least 1"));
        }
        if self.first_chapter == 0 {
            return Err(NovelDlError::validation("first chapter must be at least 1"));
        }
        if !self.listing_selector.contains("{n}") {
            return Err(NovelDlError::config(format!(
                "listing selector must contain a {{n}} placeholder: {}",
                self.listing_selector
            )));
        }
        if self.content_selectors.is_empty() {
            return Err(NovelDlError::config("no content selectors configured"));
        }
        if self.merged_file_name.is_empty() {
            return Err(NovelDlError::config("merged file name must not be empty"));
        }
        Ok(())
    }

    /// Path of the merged document.
    pub fn merged_path(&self) -> PathBuf {
        self.output_dir.join(&self.merged_file_name)
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.novel-dl/`).
pub fn config_dir() -> Result<PathBuf> {
    let home =
        dirs::home_dir().ok_or_else(|| NovelDlError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.novel-dl/novel-dl.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| NovelDlError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| NovelDlError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| NovelDlError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| NovelDlError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| NovelDlError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

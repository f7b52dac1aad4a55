//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use color_eyre::eyre::Result;
use indicatif::{ProgressBar, ProgressStyle};
use novel_dl_crawler::{ChapterOutcome, ChapterStatus, ProgressReporter};
use novel_dl_shared::{
    AppConfig, ChapterLink, DownloadConfig, Stage, init_config, load_config, load_config_from,
};
use tracing::info;
use url::Url;

use crate::prompt;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// novel-dl: download a web novel chapter by chapter.
#[derive(Parser)]
#[command(
    name = "novel-dl",
    version,
    about = "Download web novel chapters from a listing page and merge them into one text file.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file to use instead of ~/.novel-dl/novel-dl.toml.
    #[arg(long, global = true, env = "NOVEL_DL_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Download chapters from a listing page.
    Download(DownloadArgs),

    /// Merge already-downloaded chapters into one file.
    Merge {
        /// Directory holding the chapter files.
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Arguments for `download`. Missing values are asked for interactively.
#[derive(Args)]
pub(crate) struct DownloadArgs {
    /// Chapter listing URL.
    pub url: Option<Url>,

    /// First chapter position to download (1-based, inclusive).
    #[arg(short, long)]
    pub first: Option<u32>,

    /// Last chapter position to download (1-based, inclusive).
    #[arg(short, long)]
    pub last: Option<u32>,

    /// Number of concurrent downloads.
    #[arg(short, long)]
    pub threads: Option<usize>,

    /// Courtesy delay before each chapter request, in milliseconds.
    #[arg(long)]
    pub delay_ms: Option<u64>,

    /// Output directory for chapter files.
    #[arg(short, long)]
    pub out: Option<PathBuf>,

    /// Where to save the extracted chapter URLs.
    #[arg(long)]
    pub links_file: Option<PathBuf>,

    /// Skip the confirmation prompt.
    #[arg(short, long)]
    pub yes: bool,

    /// Merge after downloading without asking.
    #[arg(long, conflicts_with = "no_merge")]
    pub merge: bool,

    /// Do not merge after downloading.
    #[arg(long)]
    pub no_merge: bool,
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "novel_dl=info",
        1 => "novel_dl=debug",
        _ => "novel_dl=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt().with_env_filter(env_filter).with_target(false).init();
        }
        LogFormat::Json => {
            fmt().json().with_env_filter(env_filter).init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.as_deref();
    match cli.command {
        Command::Download(args) => cmd_download(args, config_path).await,
        Command::Merge { out } => cmd_merge(out, config_path),
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(config_path),
        },
    }
}

fn load_app_config(path: Option<&Path>) -> Result<AppConfig> {
    Ok(match path {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    })
}

/// Build the runtime config: file values, then CLI flags on top.
fn download_config(args: &DownloadArgs, app: &AppConfig) -> DownloadConfig {
    let mut config = DownloadConfig::from(app);
    if let Some(out) = &args.out {
        config.output_dir = out.clone();
    }
    if let Some(links_file) = &args.links_file {
        config.links_file = links_file.clone();
    }
    if let Some(delay_ms) = args.delay_ms {
        config.delay_ms = delay_ms;
    }
    if let Some(threads) = args.threads {
        config.threads = threads;
    }
    if let Some(first) = args.first {
        config.first_chapter = first;
    }
    config
}

async fn cmd_download(args: DownloadArgs, config_path: Option<&Path>) -> Result<()> {
    let app_config = load_app_config(config_path)?;
    let mut config = download_config(&args, &app_config);
    let first_chapter = config.first_chapter.max(1);

    let url = match args.url.clone() {
        Some(url) => url,
        None => prompt::listing_url("Chapter listing URL")?,
    };
    let last_chapter = match args.last {
        Some(n) => n,
        None => prompt::number_at_least("Last chapter number", first_chapter)?,
    };

    if !args.yes {
        let question = format!("Download chapters {first_chapter}-{last_chapter} from {url}?");
        if !prompt::confirm(&question)? {
            println!("Aborted.");
            return Ok(());
        }
    }

    if args.threads.is_none() {
        config.threads = prompt::number_at_least("Number of threads", 1)? as usize;
    }
    config.validate()?;

    info!(
        url = %url,
        first_chapter = config.first_chapter,
        last_chapter,
        threads = config.threads,
        output_dir = %config.output_dir.display(),
        "starting download"
    );

    let progress = Arc::new(CliProgress::new());
    let result = novel_dl_core::run(&config, &url, last_chapter, progress.clone()).await;
    progress.clear();
    let summary = result?;

    let report = &summary.report;
    println!();
    println!("  Download finished.");
    println!("  Links:    {} ({})", summary.links_found, summary.links_file.display());
    println!("  Written:  {}", report.written.len());
    println!("  Failed:   {}", report.failures.len());
    println!("  Output:   {}", summary.output_dir.display());
    println!("  Time:     {:.1}s", report.duration.as_secs_f64());
    for failure in &report.failures {
        println!("    #{} {}: {}", failure.position, failure.url, failure.error);
    }
    println!();

    let do_merge = if args.merge {
        true
    } else if args.no_merge {
        false
    } else {
        prompt::confirm("Merge downloaded chapters into one file?")?
    };

    if do_merge {
        let merged = novel_dl_core::run_merge(&config, progress.as_ref())?;
        println!("  Merged {} chapters into {}", merged.chapter_count, merged.path.display());
    }

    novel_dl_core::finish(progress.as_ref());
    Ok(())
}

fn cmd_merge(out: Option<PathBuf>, config_path: Option<&Path>) -> Result<()> {
    let app_config = load_app_config(config_path)?;
    let mut config = DownloadConfig::from(&app_config);
    if let Some(out) = out {
        config.output_dir = out;
    }

    let merged = novel_dl_core::merge_chapters(
        &config.output_dir,
        &config.merged_file_name,
        Some(config.links_file.as_path()),
    )?;
    println!("Merged {} chapters into {}", merged.chapter_count, merged.path.display());
    Ok(())
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(config_path: Option<&Path>) -> Result<()> {
    let config = load_app_config(config_path)?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter: a spinner for pipeline stages, a bar for chapters.
struct CliProgress {
    bar: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .expect("valid template")
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        bar.enable_steady_tick(std::time::Duration::from_millis(80));
        bar.set_message("Fetching chapter listing");
        Self { bar }
    }

    fn clear(&self) {
        if !self.bar.is_finished() {
            self.bar.finish_and_clear();
        }
    }
}

impl ProgressReporter for CliProgress {
    fn stage(&self, stage: Stage) {
        match stage {
            Stage::Downloading => {
                self.bar.set_style(
                    ProgressStyle::with_template(
                        "{spinner:.cyan} [{bar:30.cyan/blue}] {pos}/{len} {msg}",
                    )
                    .expect("valid template")
                    .progress_chars("=> "),
                );
                self.bar.set_position(0);
                self.bar.set_message("downloading");
            }
            Stage::DownloadsComplete => self.clear(),
            Stage::Merging | Stage::Merged | Stage::Done => {}
            other => self.bar.set_message(other.to_string()),
        }
    }

    fn chapter_started(&self, link: &ChapterLink) {
        self.bar.set_message(format!("#{}", link.position));
    }

    fn chapter_finished(&self, outcome: &ChapterOutcome, completed: usize, total: usize) {
        self.bar.set_length(total as u64);
        self.bar.set_position(completed as u64);
        if let ChapterStatus::Failed(error) = &outcome.status {
            self.bar
                .println(format!("  failed #{}: {error}", outcome.position));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn download_flags_override_config() {
        let cli = Cli::try_parse_from([
            "novel-dl",
            "download",
            "https://novels.example.com/list",
            "--first",
            "3",
            "--last",
            "12",
            "--threads",
            "4",
            "--delay-ms",
            "0",
            "--out",
            "book",
            "--yes",
            "--no-merge",
        ])
        .unwrap();

        let Command::Download(args) = cli.command else {
            panic!("expected download");
        };
        assert_eq!(args.last, Some(12));
        assert!(args.yes && args.no_merge && !args.merge);

        let config = download_config(&args, &AppConfig::default());
        assert_eq!(config.threads, 4);
        assert_eq!(config.first_chapter, 3);
        assert_eq!(config.delay_ms, 0);
        assert_eq!(config.output_dir, PathBuf::from("book"));
        assert_eq!(config.links_file, PathBuf::from("links.txt"));
    }

    #[test]
    fn merge_flags_conflict() {
        let result = Cli::try_parse_from(["novel-dl", "download", "--merge", "--no-merge"]);
        assert!(result.is_err());
    }

    #[test]
    fn download_args_are_optional() {
        let cli = Cli::try_parse_from(["novel-dl", "download"]).unwrap();
        let Command::Download(args) = cli.command else {
            panic!("expected download");
        };
        assert!(args.url.is_none() && args.last.is_none() && args.threads.is_none());
        assert!(args.first.is_none());

        let config = download_config(&args, &AppConfig::default());
        assert_eq!(config.first_chapter, 1);
    }

    #[test]
    fn global_flags_parse_after_subcommand() {
        let cli =
            Cli::try_parse_from(["novel-dl", "merge", "-vv", "--log-format", "json"]).unwrap();
        assert_eq!(cli.verbose, 2);
        assert!(matches!(cli.log_format, LogFormat::Json));
    }
}

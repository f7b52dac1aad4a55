//! novel-dl CLI: download a web novel chapter by chapter.
//!
//! Extracts chapter links from a listing page, downloads them through a
//! bounded worker pool, and optionally merges them into one text file.

mod commands;
mod prompt;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}

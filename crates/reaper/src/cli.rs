use clap::{Parser, Subcommand};
use reaper_config::{OutputFormat, constants};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "reaper")]
#[command(author, version, about = "Reaps CI build containers", long_about = None)]
pub struct Cli {
    /// Path to reaper.toml.
    #[arg(long, env = "REAPER_CONFIG", default_value = constants::DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Consume build lifecycle events over HTTP and enforce limits.
    Serve,

    /// Fetch every build, evaluate the retention criteria and reap.
    Reap(ReapArgs),

    /// Print the store as newline-delimited JSON.
    Export(ExportArgs),
}

#[derive(Debug, clap::Args)]
pub struct ReapArgs {
    /// Report decisions without deleting any container.
    #[arg(long)]
    pub dry_run: bool,

    /// Include builds that are not running.
    #[arg(long)]
    pub all: bool,

    /// `text` or `json`; defaults to the configured format.
    #[arg(long)]
    pub output_format: Option<OutputFormat>,
}

#[derive(Debug, clap::Args)]
pub struct ExportArgs {
    /// Store directory; defaults to the configured one.
    #[arg(long)]
    pub data_directory: Option<PathBuf>,
}

use chrono::{DateTime, FixedOffset, Utc};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::engine::values::parse_timestamp_text;
use crate::utils::config::PackagePaths;
use crate::utils::settings::SettingsOverrides;

/// Feed database rows to a document index: full listings, incremental updates, single fetches.
#[derive(Clone, Parser)]
#[command(name = "rowfeed")]
#[command(about = "Feed database rows to a document index; use --dry-run to list without writing feeds.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Settings file. Default: `rowfeed.toml` in the current directory.
    #[arg(long, short, global = true)]
    pub config: Option<PathBuf>,

    /// Log batches instead of writing feed files.
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Directory for feed files (overrides feed.output_dir).
    #[arg(long, short = 'o', global = true)]
    pub out_dir: Option<PathBuf>,

    /// Records per batch (overrides feed.max_ids_per_batch).
    #[arg(long, short = 'b', global = true)]
    pub batch_size: Option<usize>,

    /// Read each result fully before listing (overrides database.disable_streaming).
    #[arg(long, global = true)]
    pub no_streaming: bool,

    /// Verbose output and a record counter.
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Warnings and errors only.
    #[arg(long, short = 'q', global = true, conflicts_with = "verbose")]
    pub quiet: bool,
}

#[derive(Clone, Subcommand)]
pub enum Commands {
    /// List every document once.
    Full,
    /// List documents changed since the watermark.
    Incremental {
        /// Watermark to start from (RFC 3339 or `YYYY-MM-DD HH:MM:SS`, UTC). Default: now.
        #[arg(long, value_parser = parse_since)]
        since: Option<DateTime<Utc>>,
    },
    /// Full listing, then incremental passes on an interval until Ctrl+C.
    Watch {
        /// Seconds between incremental passes (overrides feed.watch_interval_secs).
        #[arg(long, short = 'i')]
        interval: Option<u64>,
        #[arg(long, value_parser = parse_since)]
        since: Option<DateTime<Utc>>,
    },
    /// Retrieve one document's content, metadata and ACL.
    Fetch {
        /// Document id as listed in a feed.
        id: String,
        /// Write the body here instead of stdout.
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Resolve one document's ACL.
    Acl { id: String },
}

fn parse_since(s: &str) -> Result<DateTime<Utc>, String> {
    let utc = FixedOffset::east_opt(0).ok_or("invalid UTC offset")?;
    parse_timestamp_text(s, utc).ok_or_else(|| format!("'{s}' is not a timestamp"))
}

impl Cli {
    pub fn config_path(&self) -> PathBuf {
        self.config
            .clone()
            .unwrap_or_else(|| PathBuf::from(PackagePaths::get().config_filename()))
    }

    pub fn overrides(&self) -> SettingsOverrides {
        let interval = match &self.command {
            Commands::Watch { interval, .. } => *interval,
            _ => None,
        };
        SettingsOverrides {
            max_ids_per_batch: self.batch_size,
            disable_streaming: self.no_streaming.then_some(true),
            output_dir: self.out_dir.clone(),
            watch_interval_secs: interval,
        }
    }
}

//! 命令行参数

use clap::{Args, Parser, Subcommand};
use clap_verbosity_flag::{InfoLevel, Verbosity};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "dsr-match",
    version,
    about = "Match construction work items against DSR schedule-of-rates volumes",
    long_about = "Price construction work items against Schedule-of-Rates (DSR) reference volumes.\n\n\
                  Items are matched by code first, then by description similarity.\n\
                  Settings are read from dsr-match.toml and DSR_* environment variables; flags win."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for debug, -vv for trace, -q for warnings only).
    #[command(flatten)]
    pub verbosity: Verbosity<InfoLevel>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Merge reference volumes into the reference database.
    Ingest(IngestArgs),

    /// Match an item file against the reference store and report the cost.
    Match(MatchArgs),

    /// Extract items from a raw text file and write the structured item format.
    Convert(ConvertArgs),
}

#[derive(Debug, Args)]
pub struct IngestArgs {
    /// Reference volume JSON file; repeat to merge several, later ordinals win.
    #[arg(long = "volume", value_name = "PATH", required = true)]
    pub volumes: Vec<PathBuf>,

    /// Category for entries that do not name one (default: civil).
    #[arg(long)]
    pub category: Option<String>,

    /// Database URL (default from configuration).
    #[arg(long, value_name = "URL")]
    pub database: Option<String>,

    /// Merge into the records already in the database instead of replacing them.
    #[arg(long)]
    pub append: bool,

    /// Also write the merged store as a volume JSON file.
    #[arg(long = "export-json", value_name = "PATH")]
    pub export_json: Option<PathBuf>,

    /// Also write the merged store as CSV.
    #[arg(long = "export-csv", value_name = "PATH")]
    pub export_csv: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct MatchArgs {
    /// Item file: structured JSON, raw PDF text JSON, or plain text.
    #[arg(short, long, value_name = "PATH")]
    pub input: PathBuf,

    /// Reference volume JSON file; repeatable. Without it the database is used.
    #[arg(long = "volume", value_name = "PATH")]
    pub volumes: Vec<PathBuf>,

    /// Database URL (default from configuration).
    #[arg(long, value_name = "URL", conflicts_with = "volumes")]
    pub database: Option<String>,

    /// Write the JSON report here.
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Write the matched items as CSV here.
    #[arg(long, value_name = "PATH")]
    pub csv: Option<PathBuf>,

    /// Similarity threshold for fallback matches, 0 to 1 (default 0.3).
    #[arg(short, long, value_parser = parse_threshold)]
    pub threshold: Option<f64>,

    /// Only match against this category.
    #[arg(long)]
    pub category: Option<String>,

    /// Number of matching threads (default: all cores).
    #[arg(long)]
    pub workers: Option<usize>,

    /// Scan the whole corpus instead of the item's chapter first.
    #[arg(long = "no-chapter-filter")]
    pub no_chapter_filter: bool,

    /// Project name recorded in the report (default: input file stem).
    #[arg(long)]
    pub project: Option<String>,
}

#[derive(Debug, Args)]
pub struct ConvertArgs {
    /// Raw text file (PDF text JSON or plain text).
    #[arg(short, long, value_name = "PATH")]
    pub input: PathBuf,

    /// Output path (default: <input stem>.items.json next to the input).
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,
}

fn parse_threshold(value: &str) -> Result<f64, String> {
    let threshold: f64 = value.parse().map_err(|_| format!("`{value}` is not a number"))?;
    if (0.0..=1.0).contains(&threshold) {
        Ok(threshold)
    } else {
        Err(format!("threshold must be within [0, 1], got {threshold}"))
    }
}

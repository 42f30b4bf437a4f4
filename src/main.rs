//! CLI entry point for the stall market rater.
//!
//! Provides subcommands for the daily update (fetch, merge history, write
//! reports), for inspecting a snapshot without touching history, and for
//! printing the historical baselines.

use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use stall_rater::{
    config::DetectionConfig,
    fetch::{BasicClient, DEFAULT_STALL_LIST_URL, load_source},
    history::HistoryStore,
    items::ItemNames,
    parser::decode_snapshot,
    pipeline::{RunPaths, run},
    snapshot::StallKind,
    stats::item_stats,
};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "stall_rater")]
#[command(about = "Tracks stall market prices and flags bargains", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch a snapshot, merge it into history and rewrite all reports
    Run {
        /// Path to file or URL to fetch (defaults to STALL_LIST_URL or the public endpoint)
        #[arg(value_name = "FILE_OR_URL")]
        source: Option<String>,

        /// History JSON file, rewritten on every run
        #[arg(long, default_value = "market_history.json")]
        history: PathBuf,

        /// Directory for CSV reports and run artifacts
        #[arg(short, long, default_value = "docs")]
        docs_dir: PathBuf,

        /// Item name files; the first one that exists is used
        #[arg(long, default_value = "items_name.json")]
        items: Vec<PathBuf>,

        /// Optional JSON file overriding detection thresholds
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Date to record the snapshot under (YYYY-MM-DD, defaults to today UTC)
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Decode a snapshot and log what it contains, without touching history
    Inspect {
        /// Path to file or URL to fetch
        #[arg(value_name = "FILE_OR_URL")]
        source: Option<String>,
    },
    /// Log historical baselines from the history file
    Stats {
        /// History JSON file
        #[arg(long, default_value = "market_history.json")]
        history: PathBuf,

        /// Only show this item
        #[arg(short, long)]
        item: Option<u32>,

        /// Use buy listings instead of sell listings
        #[arg(long, default_value_t = false)]
        buy: bool,

        /// Leave the given date out of the statistics
        #[arg(long)]
        exclude_date: Option<NaiveDate>,

        /// Optional JSON file overriding detection thresholds
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/stall_rater.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("stall_rater.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            source,
            history,
            docs_dir,
            items,
            config,
            date,
        } => {
            let config = DetectionConfig::load_or_default(config.as_deref())?;
            let names = ItemNames::load(&items)?;

            let client = BasicClient::new()?;
            let bytes = load_source(&client, &resolve_source(source)).await?;

            let now = Utc::now();
            let date = date.unwrap_or_else(|| now.date_naive());
            let paths = RunPaths {
                history,
                docs_dir,
            };

            let (summary, _) = run(&bytes, date, now, &paths, &names, &config)?;
            info!(
                stalls = summary.stalls,
                sell_rows = summary.sell_rows,
                history_days = summary.history_days,
                discount_hits = summary.discount_hits,
                profit_hits = summary.profit_hits,
                "Done"
            );
        }
        Commands::Inspect { source } => {
            let client = BasicClient::new()?;
            let bytes = load_source(&client, &resolve_source(source)).await?;
            let decoded = decode_snapshot(&bytes);

            let sell_stalls = decoded
                .stalls
                .iter()
                .filter(|s| s.kind == StallKind::Sell)
                .count();
            let slots: usize = decoded.stalls.iter().map(|s| s.slots.len()).sum();

            for stall in &decoded.stalls {
                tracing::debug!(
                    number = stall.number,
                    kind = %stall.kind,
                    seller = %stall.seller_name,
                    stall = %stall.stall_label,
                    slots = stall.slots.len(),
                    "Stall"
                );
            }

            info!(
                stalls = decoded.stalls.len(),
                sell_stalls,
                buy_stalls = decoded.stalls.len() - sell_stalls,
                slots,
                sell_items = decoded.snapshot.sell.len(),
                buy_items = decoded.snapshot.buy.len(),
                "Snapshot summary"
            );
        }
        Commands::Stats {
            history,
            item,
            buy,
            exclude_date,
            config,
        } => {
            let config = DetectionConfig::load_or_default(config.as_deref())?;
            let store = HistoryStore::load(&history)
                .with_context(|| format!("cannot compute stats from {}", history.display()))?;

            let kind = if buy { StallKind::Buy } else { StallKind::Sell };
            let opts = match exclude_date {
                Some(d) => config.stats_options(d).with_include_today(false),
                None => config.stats_options(Utc::now().date_naive()),
            }
            .with_kind(kind);

            let stats = item_stats(&store, &opts);
            if stats.is_empty() {
                warn!("History has no observations");
            }

            for (item_id, stat) in stats.iter().filter(|(id, _)| item.is_none_or(|i| **id == i)) {
                info!(
                    item_id,
                    median = ?stat.median,
                    average = ?stat.average,
                    observations = stat.observations,
                    "Item stats"
                );
            }
            info!(items = stats.len(), days = store.len(), kind = %kind, "Stats computed");
        }
    }

    Ok(())
}

/// Explicit source, then `STALL_LIST_URL`, then the public endpoint.
fn resolve_source(source: Option<String>) -> String {
    source
        .or_else(|| std::env::var("STALL_LIST_URL").ok())
        .unwrap_or_else(|| DEFAULT_STALL_LIST_URL.to_string())
}

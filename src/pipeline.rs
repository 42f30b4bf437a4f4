//! One end-to-end run: decode, merge into history, report.

use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use std::path::PathBuf;
use tracing::{info, warn};

use crate::analyzers::analyzer::build_reports;
use crate::analyzers::types::Reports;
use crate::config::DetectionConfig;
use crate::history::HistoryStore;
use crate::items::ItemNames;
use crate::output::{write_last_run, write_raw_snapshot, write_reports};
use crate::parser::decode_snapshot;

/// Where a run reads and writes its files.
#[derive(Debug, Clone)]
pub struct RunPaths {
    pub history: PathBuf,
    pub docs_dir: PathBuf,
}

/// Counts reported at the end of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub stalls: usize,
    pub sell_rows: usize,
    pub history_days: usize,
    pub discount_hits: usize,
    pub profit_hits: usize,
}

/// Decodes `bytes`, merges them into the history for `date`, rewrites the
/// history file and all reports.
///
/// The history is saved before any report is written, so a report failure
/// never loses the day's observations.
#[tracing::instrument(skip(bytes, date, names, config, now), fields(bytes = bytes.len(), date = %date))]
pub fn run(
    bytes: &[u8],
    date: NaiveDate,
    now: DateTime<Utc>,
    paths: &RunPaths,
    names: &ItemNames,
    config: &DetectionConfig,
) -> Result<(RunSummary, Reports)> {
    let decoded = decode_snapshot(bytes);
    info!(
        stalls = decoded.stalls.len(),
        sell_rows = decoded.sell_rows.len(),
        "Snapshot decoded"
    );
    if decoded.stalls.is_empty() {
        warn!("Snapshot contained no complete stall records");
    }

    let mut history = HistoryStore::load(&paths.history)?;
    history.merge(date, decoded.snapshot);
    history.save(&paths.history)?;

    let reports = build_reports(date, &decoded.sell_rows, &history, names, config);
    log_hits(&reports, config.show_max_rows);

    write_reports(&paths.docs_dir, &reports)?;
    write_raw_snapshot(&paths.docs_dir, bytes)?;
    write_last_run(&paths.docs_dir, now)?;

    let summary = RunSummary {
        stalls: decoded.stalls.len(),
        sell_rows: decoded.sell_rows.len(),
        history_days: history.len(),
        discount_hits: reports.discount_hits.len(),
        profit_hits: reports.profit_hits.len(),
    };
    info!(?summary, "Run complete");

    Ok((summary, reports))
}

fn log_hits(reports: &Reports, max_rows: usize) {
    if reports.discount_hits.is_empty() {
        info!("No discounted sell listings");
    }
    for hit in reports.discount_hits.iter().take(max_rows) {
        info!(
            discount_pct = hit.discount_pct,
            item_id = hit.item_id,
            item_name = %hit.item_name,
            price = hit.price,
            avg = hit.avg,
            obs = hit.obs,
            qty = hit.qty,
            seller = %hit.seller,
            stall = %hit.stall,
            "Discount hit"
        );
    }

    if reports.profit_hits.is_empty() {
        info!("No profitable sell listings");
    }
    for hit in reports.profit_hits.iter().take(max_rows) {
        info!(
            item_id = hit.item_id,
            item_name = %hit.item_name,
            price = hit.price,
            avg = hit.avg,
            qty = hit.qty,
            profit_total = hit.profit_total,
            discount_pct = hit.discount_pct,
            seller = %hit.seller,
            "Profit hit"
        );
    }
}

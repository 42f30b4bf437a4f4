//! Report persistence.
//!
//! Every CSV is rewritten from scratch on each run, header included even
//! when there are no rows.

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use csv::WriterBuilder;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::analyzers::types::Reports;

pub const DISCOUNT_CSV: &str = "discount_hits_ge_50pct.csv";
pub const PROFIT_CSV: &str = "profit_hits_ge_20000.csv";
pub const SALES_TODAY_CSV: &str = "sales_all_today.csv";
pub const SALES_ENRICHED_CSV: &str = "sales_all_today_enriched.csv";
pub const ITEM_ANALYSIS_CSV: &str = "item_analysis_today.csv";
pub const PRESENCE_CSV: &str = "stall_presence.csv";
pub const RAW_SNAPSHOT: &str = "stall_list.raw";
pub const LAST_RUN_JSON: &str = "last_run.json";

/// A serializable report row with a fixed column order.
///
/// `HEADERS` must list the struct's fields in declaration order.
pub trait CsvRow: Serialize {
    const HEADERS: &'static [&'static str];
}

#[derive(Serialize)]
struct LastRun {
    updated_at: String,
}

/// Writes `rows` to `path`, replacing any existing file.
pub fn write_csv<T: CsvRow>(path: &Path, rows: &[T]) -> Result<()> {
    let mut writer = WriterBuilder::new()
        .has_headers(false)
        .from_path(path)
        .with_context(|| format!("failed to create {}", path.display()))?;

    writer.write_record(T::HEADERS)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;

    debug!(path = %path.display(), rows = rows.len(), "Wrote CSV");
    Ok(())
}

/// Writes every report CSV into `dir`, returning the paths written.
#[tracing::instrument(skip(reports), fields(dir = %dir.display()))]
pub fn write_reports(dir: &Path, reports: &Reports) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir)?;

    let mut written = Vec::new();

    macro_rules! emit {
        ($name:expr, $rows:expr) => {{
            let path = dir.join($name);
            write_csv(&path, $rows)?;
            written.push(path);
        }};
    }

    emit!(DISCOUNT_CSV, &reports.discount_hits);
    emit!(PROFIT_CSV, &reports.profit_hits);
    emit!(SALES_TODAY_CSV, &reports.sales_today);
    emit!(SALES_ENRICHED_CSV, &reports.enriched_sales);
    emit!(ITEM_ANALYSIS_CSV, &reports.item_analysis);
    emit!(PRESENCE_CSV, &reports.presence);

    info!(files = written.len(), "Reports written");
    Ok(written)
}

/// Keeps a copy of the raw snapshot next to the reports.
pub fn write_raw_snapshot(dir: &Path, bytes: &[u8]) -> Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let path = dir.join(RAW_SNAPSHOT);
    fs::write(&path, bytes).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(path)
}

/// Records when the reports were last refreshed, e.g.
/// `{"updated_at":"2025-09-03T12:00:00Z"}`.
pub fn write_last_run(dir: &Path, at: DateTime<Utc>) -> Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let path = dir.join(LAST_RUN_JSON);
    let body = LastRun {
        updated_at: at.to_rfc3339_opts(SecondsFormat::Secs, true),
    };
    fs::write(&path, serde_json::to_vec(&body)?)?;
    Ok(path)
}

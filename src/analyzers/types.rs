//! Row types written by the report pipeline, one struct per CSV.

use chrono::NaiveDate;
use serde::Serialize;

use crate::output::CsvRow;
use crate::snapshot::{ItemId, Price, Quantity};

/// A sell listing priced at least the configured percentage under its average.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiscountHit {
    pub discount_pct: f64,
    pub item_id: ItemId,
    pub item_name: String,
    pub price: Price,
    pub avg: f64,
    pub obs: usize,
    pub qty: Quantity,
    pub seller: String,
    pub stall: String,
}

impl CsvRow for DiscountHit {
    const HEADERS: &'static [&'static str] = &[
        "discount_pct",
        "item_id",
        "item_name",
        "price",
        "avg",
        "obs",
        "qty",
        "seller",
        "stall",
    ];
}

/// A sell listing whose whole stack is worth at least the configured profit
/// when resold at the historical average.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfitHit {
    pub date: NaiveDate,
    pub item_id: ItemId,
    pub item_name: String,
    pub seller: String,
    pub stall: String,
    pub price: Price,
    pub avg: f64,
    pub profit_unit: f64,
    pub qty: Quantity,
    pub profit_total: f64,
    pub discount_pct: f64,
    pub obs: usize,
}

impl CsvRow for ProfitHit {
    const HEADERS: &'static [&'static str] = &[
        "date",
        "item_id",
        "item_name",
        "seller",
        "stall",
        "price",
        "avg",
        "profit_unit",
        "qty",
        "profit_total",
        "discount_pct",
        "obs",
    ];
}

/// One sell slot of today's snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SaleRow {
    pub date: NaiveDate,
    pub item_id: ItemId,
    pub item_name: String,
    pub price: Price,
    pub quantity: Quantity,
    pub seller: String,
    pub stall: String,
}

impl CsvRow for SaleRow {
    const HEADERS: &'static [&'static str] = &[
        "date", "item_id", "item_name", "price", "quantity", "seller", "stall",
    ];
}

/// A [`SaleRow`] compared against the item's historical baselines.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichedSale {
    pub date: NaiveDate,
    pub item_id: ItemId,
    pub item_name: String,
    pub price: Price,
    pub quantity: Quantity,
    pub seller: String,
    pub stall: String,
    pub avg_hist: Option<f64>,
    pub median_hist: Option<f64>,
    pub obs_hist: usize,
    pub pct_vs_avg: Option<f64>,
    pub pct_vs_median: Option<f64>,
    pub discount_pct_vs_avg: Option<f64>,
}

impl CsvRow for EnrichedSale {
    const HEADERS: &'static [&'static str] = &[
        "date",
        "item_id",
        "item_name",
        "price",
        "quantity",
        "seller",
        "stall",
        "avg_hist",
        "median_hist",
        "obs_hist",
        "pct_vs_avg",
        "pct_vs_median",
        "discount_pct_vs_avg",
    ];
}

/// Per-item summary of today's listings, baselines and presence.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemAnalysis {
    pub item_id: ItemId,
    pub item_name: String,
    pub today_qty_sum: Option<Quantity>,
    pub today_price_min: Option<Price>,
    pub today_price_avg: Option<f64>,
    pub today_price_max: Option<Price>,
    pub today_sellers: Option<usize>,
    pub today_stalls: Option<usize>,
    pub avg_hist: Option<f64>,
    pub median_hist: Option<f64>,
    pub obs_hist: usize,
    pub first_seen: Option<NaiveDate>,
    pub last_seen: Option<NaiveDate>,
    pub last_seen_relative: Option<String>,
    pub seen_days_count: Option<usize>,
    pub dates: Option<String>,
}

impl CsvRow for ItemAnalysis {
    const HEADERS: &'static [&'static str] = &[
        "item_id",
        "item_name",
        "today_qty_sum",
        "today_price_min",
        "today_price_avg",
        "today_price_max",
        "today_sellers",
        "today_stalls",
        "avg_hist",
        "median_hist",
        "obs_hist",
        "first_seen",
        "last_seen",
        "last_seen_relative",
        "seen_days_count",
        "dates",
    ];
}

/// On which days an item was listed for sale.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PresenceRow {
    pub item_id: ItemId,
    pub item_name: String,
    pub first_seen: NaiveDate,
    pub last_seen: NaiveDate,
    pub last_seen_relative: String,
    pub seen_days_count: usize,
    /// `;`-joined ISO dates.
    pub dates: String,
}

impl CsvRow for PresenceRow {
    const HEADERS: &'static [&'static str] = &[
        "item_id",
        "item_name",
        "first_seen",
        "last_seen",
        "last_seen_relative",
        "seen_days_count",
        "dates",
    ];
}

/// Everything one run writes out.
#[derive(Debug, Clone, Default)]
pub struct Reports {
    pub discount_hits: Vec<DiscountHit>,
    pub profit_hits: Vec<ProfitHit>,
    pub sales_today: Vec<SaleRow>,
    pub enriched_sales: Vec<EnrichedSale>,
    pub item_analysis: Vec<ItemAnalysis>,
    pub presence: Vec<PresenceRow>,
}

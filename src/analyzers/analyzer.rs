use chrono::NaiveDate;
use std::collections::BTreeMap;
use tracing::info;

use crate::analyzers::aggregate::{aggregate_today, item_analysis, presence_rows};
use crate::analyzers::detect::detect_hits;
use crate::analyzers::types::{EnrichedSale, Reports, SaleRow};
use crate::analyzers::utility::{pct_of, round2};
use crate::config::DetectionConfig;
use crate::history::HistoryStore;
use crate::items::ItemNames;
use crate::parser::SellRow;
use crate::snapshot::{ItemId, StallKind};
use crate::stats::{WeightedAverage, price_medians, weighted_averages};

/// Builds every report for one run from today's sell rows and the already
/// merged history.
pub fn build_reports(
    date: NaiveDate,
    sell_rows: &[SellRow],
    history: &HistoryStore,
    names: &ItemNames,
    config: &DetectionConfig,
) -> Reports {
    let opts = config.stats_options(date);

    let medians = price_medians(history, &opts);
    let averages = weighted_averages(history, &opts, &medians);
    info!(
        medians = medians.len(),
        averages = averages.len(),
        "Computed sell baselines"
    );

    let (discount_hits, profit_hits) = detect_hits(date, sell_rows, &averages, names, config);

    let sales_today: Vec<SaleRow> = sell_rows
        .iter()
        .map(|r| SaleRow {
            date,
            item_id: r.item_id,
            item_name: names.get(r.item_id).to_string(),
            price: r.price,
            quantity: r.quantity,
            seller: r.seller_name.clone(),
            stall: r.stall_label.clone(),
        })
        .collect();

    let enriched_sales = sales_today
        .iter()
        .map(|s| enrich(s, &medians, &averages))
        .collect();

    let presence = history.presence(StallKind::Sell);
    let today_aggs = aggregate_today(sell_rows);

    Reports {
        discount_hits,
        profit_hits,
        item_analysis: item_analysis(&today_aggs, &medians, &averages, &presence, names, date),
        presence: presence_rows(&presence, names, date),
        sales_today,
        enriched_sales,
    }
}

fn enrich(
    sale: &SaleRow,
    medians: &BTreeMap<ItemId, f64>,
    averages: &BTreeMap<ItemId, WeightedAverage>,
) -> EnrichedSale {
    let avg = averages.get(&sale.item_id);
    let average = avg.map(|a| a.average);
    let median = medians.get(&sale.item_id).copied();
    let price = f64::from(sale.price);

    EnrichedSale {
        date: sale.date,
        item_id: sale.item_id,
        item_name: sale.item_name.clone(),
        price: sale.price,
        quantity: sale.quantity,
        seller: sale.seller.clone(),
        stall: sale.stall.clone(),
        avg_hist: average.map(round2),
        median_hist: median.map(round2),
        obs_hist: avg.map_or(0, |a| a.observations),
        pct_vs_avg: pct_of(price, average).map(round2),
        pct_vs_median: pct_of(price, median).map(round2),
        discount_pct_vs_avg: pct_of(price, average).map(|p| round2(100.0 - p)),
    }
}

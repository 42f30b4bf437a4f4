//! Historical price baselines per item.
//!
//! Two passes over the history: first the median of every recorded price key,
//! then a quantity-weighted average that ignores prices at or above
//! `median * outlier_multiplier`. Items with no data are left out of the
//! result maps rather than reported as zero.

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::history::HistoryStore;
use crate::snapshot::{ItemId, Price, StallKind};

pub const DEFAULT_OUTLIER_MULTIPLIER: f64 = 3.0;

/// Which part of the history feeds the statistics.
#[derive(Debug, Clone, Copy)]
pub struct StatsOptions {
    pub kind: StallKind,
    /// The run's current date, used by `include_today`.
    pub today: NaiveDate,
    pub include_today: bool,
    pub outlier_multiplier: f64,
}

impl StatsOptions {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            kind: StallKind::Sell,
            today,
            include_today: true,
            outlier_multiplier: DEFAULT_OUTLIER_MULTIPLIER,
        }
    }

    pub fn with_include_today(mut self, include_today: bool) -> Self {
        self.include_today = include_today;
        self
    }

    pub fn with_outlier_multiplier(mut self, outlier_multiplier: f64) -> Self {
        self.outlier_multiplier = outlier_multiplier;
        self
    }

    pub fn with_kind(mut self, kind: StallKind) -> Self {
        self.kind = kind;
        self
    }

    fn qualifies(&self, date: NaiveDate) -> bool {
        self.include_today || date != self.today
    }
}

/// Outlier-filtered, quantity-weighted average price.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WeightedAverage {
    pub average: f64,
    /// Number of `(date, price)` entries that survived the filter.
    pub observations: usize,
}

/// Combined baseline for one item.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct ItemStat {
    pub median: Option<f64>,
    pub average: Option<f64>,
    pub observations: usize,
}

/// Median of every price key recorded for each item.
///
/// Each `(date, price)` entry counts once no matter its quantity.
pub fn price_medians(history: &HistoryStore, opts: &StatsOptions) -> BTreeMap<ItemId, f64> {
    let mut prices: BTreeMap<ItemId, Vec<Price>> = BTreeMap::new();

    for (date, snapshot) in history.days() {
        if !opts.qualifies(date) {
            continue;
        }
        for (item_id, price_map) in snapshot.histogram(opts.kind) {
            prices
                .entry(*item_id)
                .or_default()
                .extend(price_map.keys().copied());
        }
    }

    prices
        .into_iter()
        .filter_map(|(item_id, mut values)| median(&mut values).map(|m| (item_id, m)))
        .collect()
}

/// Quantity-weighted average per item, skipping prices at or above
/// `median * outlier_multiplier` for items that have a median.
pub fn weighted_averages(
    history: &HistoryStore,
    opts: &StatsOptions,
    medians: &BTreeMap<ItemId, f64>,
) -> BTreeMap<ItemId, WeightedAverage> {
    // (sum of price * qty, sum of qty, surviving entries)
    let mut totals: BTreeMap<ItemId, (u128, u128, usize)> = BTreeMap::new();

    for (date, snapshot) in history.days() {
        if !opts.qualifies(date) {
            continue;
        }
        for (item_id, price_map) in snapshot.histogram(opts.kind) {
            let med = medians.get(item_id);

            for (&price, &quantity) in price_map {
                if quantity == 0 {
                    continue;
                }
                if let Some(med) = med {
                    if f64::from(price) >= med * opts.outlier_multiplier {
                        continue;
                    }
                }

                let entry = totals.entry(*item_id).or_insert((0, 0, 0));
                entry.0 += u128::from(price) * u128::from(quantity);
                entry.1 += u128::from(quantity);
                entry.2 += 1;
            }
        }
    }

    totals
        .into_iter()
        .filter(|(_, (_, sum_q, _))| *sum_q > 0)
        .map(|(item_id, (sum_pq, sum_q, observations))| {
            (
                item_id,
                WeightedAverage {
                    average: sum_pq as f64 / sum_q as f64,
                    observations,
                },
            )
        })
        .collect()
}

/// Runs both passes and joins them per item.
///
/// Every item with a median appears; `average` is `None` when all of its
/// entries were filtered out.
pub fn item_stats(history: &HistoryStore, opts: &StatsOptions) -> BTreeMap<ItemId, ItemStat> {
    let medians = price_medians(history, opts);
    let averages = weighted_averages(history, opts, &medians);

    medians
        .iter()
        .map(|(item_id, median)| {
            let avg = averages.get(item_id);
            (
                *item_id,
                ItemStat {
                    median: Some(*median),
                    average: avg.map(|a| a.average),
                    observations: avg.map_or(0, |a| a.observations),
                },
            )
        })
        .collect()
}

/// Statistical median; the mean of the two middle values for even lengths.
pub fn median(values: &mut [Price]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_unstable();

    let n = values.len();
    let mid = if n % 2 == 0 {
        (f64::from(values[n / 2 - 1]) + f64::from(values[n / 2])) / 2.0
    } else {
        f64::from(values[n / 2])
    };
    Some(mid)
}

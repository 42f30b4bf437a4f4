//! Discount and profit detection over today's sell listings.

use chrono::NaiveDate;
use std::collections::BTreeMap;

use crate::analyzers::types::{DiscountHit, ProfitHit};
use crate::analyzers::utility::round2;
use crate::config::DetectionConfig;
use crate::items::ItemNames;
use crate::parser::SellRow;
use crate::snapshot::ItemId;
use crate::stats::WeightedAverage;

/// Scans `rows` for listings far enough under their historical average.
///
/// A row is considered only when its item name is not blocked, its average
/// exists, is positive and rests on at least `min_observations` entries.
/// Returns `(discount_hits, profit_hits)`, each sorted best first.
pub fn detect_hits(
    date: NaiveDate,
    rows: &[SellRow],
    averages: &BTreeMap<ItemId, WeightedAverage>,
    names: &ItemNames,
    config: &DetectionConfig,
) -> (Vec<DiscountHit>, Vec<ProfitHit>) {
    let mut discounts = Vec::new();
    let mut profits = Vec::new();

    for row in rows {
        let item_name = names.get(row.item_id);
        if config.is_blocked(item_name) {
            continue;
        }

        let Some(avg) = averages.get(&row.item_id) else {
            continue;
        };
        if avg.observations < config.min_observations || avg.average <= 0.0 {
            continue;
        }

        let price = f64::from(row.price);
        let discount_pct = (1.0 - price / avg.average) * 100.0;

        if discount_pct >= config.discount_threshold_pct {
            discounts.push(DiscountHit {
                discount_pct: round2(discount_pct),
                item_id: row.item_id,
                item_name: item_name.to_string(),
                price: row.price,
                avg: round2(avg.average),
                obs: avg.observations,
                qty: row.quantity,
                seller: row.seller_name.clone(),
                stall: row.stall_label.clone(),
            });
        }

        let profit_unit = avg.average - price;
        let profit_total = profit_unit * row.quantity as f64;
        if profit_total >= config.profit_min {
            profits.push(ProfitHit {
                date,
                item_id: row.item_id,
                item_name: item_name.to_string(),
                seller: row.seller_name.clone(),
                stall: row.stall_label.clone(),
                price: row.price,
                avg: round2(avg.average),
                profit_unit: round2(profit_unit),
                qty: row.quantity,
                profit_total: round2(profit_total),
                discount_pct: round2(discount_pct),
                obs: avg.observations,
            });
        }
    }

    discounts.sort_by(|a, b| {
        b.discount_pct
            .total_cmp(&a.discount_pct)
            .then(a.item_id.cmp(&b.item_id))
    });
    profits.sort_by(|a, b| {
        b.discount_pct
            .total_cmp(&a.discount_pct)
            .then(b.profit_total.total_cmp(&a.profit_total))
            .then(b.profit_unit.total_cmp(&a.profit_unit))
    });

    (discounts, profits)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 9, 3).unwrap()
    }

    fn row(item_id: ItemId, price: u32, quantity: u64) -> SellRow {
        SellRow {
            item_id,
            price,
            quantity,
            seller_name: "Alice".to_string(),
            stall_label: "Bargains".to_string(),
        }
    }

    fn averages(entries: &[(ItemId, f64, usize)]) -> BTreeMap<ItemId, WeightedAverage> {
        entries
            .iter()
            .map(|(id, average, observations)| {
                (
                    *id,
                    WeightedAverage {
                        average: *average,
                        observations: *observations,
                    },
                )
            })
            .collect()
    }

    #[test]
    fn test_discount_threshold() {
        let avgs = averages(&[(1, 100.0, 5)]);
        let rows = [row(1, 50, 1), row(1, 51, 1), row(1, 10, 1)];

        let (discounts, profits) = detect_hits(
            date(),
            &rows,
            &avgs,
            &ItemNames::default(),
            &DetectionConfig::default(),
        );

        let pcts: Vec<f64> = discounts.iter().map(|h| h.discount_pct).collect();
        assert_eq!(pcts, vec![90.0, 50.0]);
        assert!(profits.is_empty());
    }

    #[test]
    fn test_too_few_observations_skipped() {
        let avgs = averages(&[(1, 100.0, 2)]);
        let (discounts, _) = detect_hits(
            date(),
            &[row(1, 1, 1)],
            &avgs,
            &ItemNames::default(),
            &DetectionConfig::default(),
        );
        assert!(discounts.is_empty());
    }

    #[test]
    fn test_blocked_name_skipped() {
        let avgs = averages(&[(1, 100.0, 5), (2, 100.0, 5)]);
        let names = ItemNames::from_entries([
            (1, "Iron Sword".to_string()),
            (2, "Elven Signet".to_string()),
        ]);

        let (discounts, _) = detect_hits(
            date(),
            &[row(1, 1, 1), row(2, 1, 1)],
            &avgs,
            &names,
            &DetectionConfig::default(),
        );

        assert_eq!(discounts.len(), 1);
        assert_eq!(discounts[0].item_name, "Elven Signet");
    }

    #[test]
    fn test_profit_hits_sorted() {
        let avgs = averages(&[(1, 1_000.0, 3), (2, 50_000.0, 4)]);
        let rows = [row(1, 800, 100), row(2, 40_000, 3), row(2, 45_000, 1)];

        let (_, profits) = detect_hits(
            date(),
            &rows,
            &avgs,
            &ItemNames::default(),
            &DetectionConfig::default(),
        );

        assert_eq!(profits.len(), 2);
        // both at 20% off; larger total first
        assert_eq!(profits[0].item_id, 2);
        assert_eq!(profits[0].profit_total, 30_000.0);
        assert_eq!(profits[1].item_id, 1);
        assert_eq!(profits[1].profit_unit, 200.0);
        assert_eq!(profits[1].profit_total, 20_000.0);
    }

    #[test]
    fn test_missing_average_skipped() {
        let (discounts, profits) = detect_hits(
            date(),
            &[row(9, 1, 255)],
            &BTreeMap::new(),
            &ItemNames::default(),
            &DetectionConfig::default(),
        );
        assert!(discounts.is_empty());
        assert!(profits.is_empty());
    }
}

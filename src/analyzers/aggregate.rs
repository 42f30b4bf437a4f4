use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet, HashSet};

use crate::analyzers::types::{ItemAnalysis, PresenceRow};
use crate::analyzers::utility::{mean, relative_day, round2};
use crate::history::Presence;
use crate::items::ItemNames;
use crate::parser::SellRow;
use crate::snapshot::{ItemId, Price, Quantity};
use crate::stats::WeightedAverage;

/// Today's sell listings of one item, folded together.
#[derive(Debug, Clone, PartialEq)]
pub struct TodayAggregate {
    pub qty_sum: Quantity,
    pub price_min: Price,
    pub price_avg: f64,
    pub price_max: Price,
    pub sellers: usize,
    pub stalls: usize,
}

/// Groups today's sell rows by item.
///
/// `price_avg` is the plain mean over listings, not weighted by quantity.
pub fn aggregate_today(rows: &[SellRow]) -> BTreeMap<ItemId, TodayAggregate> {
    let mut grouped: BTreeMap<ItemId, Vec<&SellRow>> = BTreeMap::new();
    for row in rows {
        grouped.entry(row.item_id).or_default().push(row);
    }

    grouped
        .into_iter()
        .map(|(item_id, rows)| {
            let prices: Vec<f64> = rows.iter().map(|r| f64::from(r.price)).collect();
            let sellers: HashSet<&str> = rows.iter().map(|r| r.seller_name.as_str()).collect();
            let stalls: HashSet<&str> = rows.iter().map(|r| r.stall_label.as_str()).collect();

            let agg = TodayAggregate {
                qty_sum: rows.iter().map(|r| r.quantity).sum(),
                price_min: rows.iter().map(|r| r.price).min().unwrap_or_default(),
                price_avg: round2(mean(&prices).unwrap_or_default()),
                price_max: rows.iter().map(|r| r.price).max().unwrap_or_default(),
                sellers: sellers.len(),
                stalls: stalls.len(),
            };
            (item_id, agg)
        })
        .collect()
}

/// One row per item in the presence map.
pub fn presence_rows(
    presence: &BTreeMap<ItemId, Presence>,
    names: &ItemNames,
    today: NaiveDate,
) -> Vec<PresenceRow> {
    presence
        .iter()
        .map(|(item_id, p)| PresenceRow {
            item_id: *item_id,
            item_name: names.get(*item_id).to_string(),
            first_seen: p.first_seen(),
            last_seen: p.last_seen(),
            last_seen_relative: relative_day(p.last_seen(), today),
            seen_days_count: p.seen_days(),
            dates: join_dates(p.dates()),
        })
        .collect()
}

/// Joins today's aggregates, historical baselines and presence for every
/// item seen either today or in history.
pub fn item_analysis(
    today_aggs: &BTreeMap<ItemId, TodayAggregate>,
    medians: &BTreeMap<ItemId, f64>,
    averages: &BTreeMap<ItemId, WeightedAverage>,
    presence: &BTreeMap<ItemId, Presence>,
    names: &ItemNames,
    today: NaiveDate,
) -> Vec<ItemAnalysis> {
    let items: BTreeSet<ItemId> = today_aggs.keys().chain(presence.keys()).copied().collect();

    items
        .into_iter()
        .map(|item_id| {
            let agg = today_aggs.get(&item_id);
            let avg = averages.get(&item_id);
            let seen = presence.get(&item_id);

            ItemAnalysis {
                item_id,
                item_name: names.get(item_id).to_string(),
                today_qty_sum: agg.map(|a| a.qty_sum),
                today_price_min: agg.map(|a| a.price_min),
                today_price_avg: agg.map(|a| a.price_avg),
                today_price_max: agg.map(|a| a.price_max),
                today_sellers: agg.map(|a| a.sellers),
                today_stalls: agg.map(|a| a.stalls),
                avg_hist: avg.map(|a| round2(a.average)),
                median_hist: medians.get(&item_id).map(|m| round2(*m)),
                obs_hist: avg.map_or(0, |a| a.observations),
                first_seen: seen.map(Presence::first_seen),
                last_seen: seen.map(Presence::last_seen),
                last_seen_relative: seen.map(|p| relative_day(p.last_seen(), today)),
                seen_days_count: seen.map(Presence::seen_days),
                dates: seen.map(|p| join_dates(p.dates())),
            }
        })
        .collect()
}

fn join_dates(dates: &[NaiveDate]) -> String {
    dates
        .iter()
        .map(|d| d.format("%Y-%m-%d").to_string())
        .collect::<Vec<_>>()
        .join(";")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn row(item_id: ItemId, price: Price, quantity: Quantity, seller: &str, stall: &str) -> SellRow {
        SellRow {
            item_id,
            price,
            quantity,
            seller_name: seller.to_string(),
            stall_label: stall.to_string(),
        }
    }

    #[test]
    fn test_aggregate_today() {
        let rows = [
            row(7, 100, 3, "Alice", "A"),
            row(7, 120, 1, "Alice", "A"),
            row(7, 90, 2, "Bob", "B"),
            row(8, 5, 1, "Bob", "B"),
        ];

        let aggs = aggregate_today(&rows);
        assert_eq!(
            aggs[&7],
            TodayAggregate {
                qty_sum: 6,
                price_min: 90,
                price_avg: 103.33,
                price_max: 120,
                sellers: 2,
                stalls: 2,
            }
        );
        assert_eq!(aggs[&8].qty_sum, 1);
    }

    #[test]
    fn test_presence_rows() {
        let presence = BTreeMap::from([(
            7,
            Presence::new([date("2025-09-01"), date("2025-09-03")]).unwrap(),
        )]);
        let names = ItemNames::from_entries([(7, "Elven Signet".to_string())]);

        let rows = presence_rows(&presence, &names, date("2025-09-03"));
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].item_name, "Elven Signet");
        assert_eq!(rows[0].first_seen, date("2025-09-01"));
        assert_eq!(rows[0].last_seen_relative, "today");
        assert_eq!(rows[0].seen_days_count, 2);
        assert_eq!(rows[0].dates, "2025-09-01;2025-09-03");
    }

    #[test]
    fn test_item_analysis_outer_join() {
        let today = date("2025-09-03");
        let aggs = aggregate_today(&[row(7, 100, 3, "Alice", "A")]);
        let medians = BTreeMap::from([(7, 100.0), (8, 4.0)]);
        let averages = BTreeMap::from([(
            8,
            WeightedAverage {
                average: 4.333333,
                observations: 3,
            },
        )]);
        let presence = BTreeMap::from([(
            8,
            Presence::new([date("2025-09-01")]).unwrap(),
        )]);

        let rows = item_analysis(
            &aggs,
            &medians,
            &averages,
            &presence,
            &ItemNames::default(),
            today,
        );

        assert_eq!(rows.len(), 2);

        assert_eq!(rows[0].item_id, 7);
        assert_eq!(rows[0].today_qty_sum, Some(3));
        assert_eq!(rows[0].median_hist, Some(100.0));
        assert_eq!(rows[0].avg_hist, None);
        assert_eq!(rows[0].obs_hist, 0);
        assert_eq!(rows[0].first_seen, None);

        assert_eq!(rows[1].item_id, 8);
        assert_eq!(rows[1].today_qty_sum, None);
        assert_eq!(rows[1].avg_hist, Some(4.33));
        assert_eq!(rows[1].obs_hist, 3);
        assert_eq!(rows[1].last_seen_relative.as_deref(), Some("2 days ago"));
    }
}

//! Per-day price histograms built from one decode pass.
//!
//! A [`DaySnapshot`] holds one [`PriceHistogram`] per stall kind. While a
//! single snapshot is being decoded, repeated `(item_id, price)` pairs are
//! summed with [`DaySnapshot::record`]. Reconciling several runs of the same
//! day is a different operation (max, not sum) and lives in
//! [`crate::history::HistoryStore::merge`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

pub type ItemId = u32;
pub type Price = u32;
pub type Quantity = u64;

/// Item id → (price → quantity).
///
/// Serialized with string keys (`{"7": {"100": 5}}`); serde_json converts the
/// integer keys on the way in and out.
pub type PriceHistogram = BTreeMap<ItemId, BTreeMap<Price, Quantity>>;

/// Whether a stall is offering items or requesting them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StallKind {
    #[serde(rename = "SELL")]
    Sell,
    #[serde(rename = "BUY")]
    Buy,
}

impl StallKind {
    /// The feed marks selling stalls with `1`; every other flag is a buy stall.
    pub fn from_flag(flag: u8) -> Self {
        if flag == 1 { StallKind::Sell } else { StallKind::Buy }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StallKind::Sell => "SELL",
            StallKind::Buy => "BUY",
        }
    }
}

impl fmt::Display for StallKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One occupied item slot of a stall.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotRecord {
    pub item_id: ItemId,
    pub price: Price,
    pub quantity: Quantity,
}

/// Aggregated listings for one calendar day.
///
/// Both keys are required when deserializing: a stored day without `SELL` or
/// `BUY` is treated as a corrupt history.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaySnapshot {
    #[serde(rename = "SELL")]
    pub sell: PriceHistogram,
    #[serde(rename = "BUY")]
    pub buy: PriceHistogram,
}

impl DaySnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn histogram(&self, kind: StallKind) -> &PriceHistogram {
        match kind {
            StallKind::Sell => &self.sell,
            StallKind::Buy => &self.buy,
        }
    }

    pub fn histogram_mut(&mut self, kind: StallKind) -> &mut PriceHistogram {
        match kind {
            StallKind::Sell => &mut self.sell,
            StallKind::Buy => &mut self.buy,
        }
    }

    /// Adds a slot to the histogram of `kind`, summing with any quantity
    /// already recorded at the same `(item_id, price)`.
    pub fn record(&mut self, kind: StallKind, slot: &SlotRecord) {
        *self
            .histogram_mut(kind)
            .entry(slot.item_id)
            .or_default()
            .entry(slot.price)
            .or_insert(0) += slot.quantity;
    }

    /// Raises every `(item_id, price)` quantity to at least the value seen in
    /// `other`, inserting pairs that are missing.
    pub fn merge_max(&mut self, other: &DaySnapshot) {
        for kind in [StallKind::Sell, StallKind::Buy] {
            let target = self.histogram_mut(kind);
            for (item_id, prices) in other.histogram(kind) {
                let stored = target.entry(*item_id).or_default();
                for (price, quantity) in prices {
                    let slot = stored.entry(*price).or_insert(0);
                    *slot = (*slot).max(*quantity);
                }
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.sell.is_empty() && self.buy.is_empty()
    }
}

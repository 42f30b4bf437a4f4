//! Date-indexed archive of daily snapshots.
//!
//! Stored on disk as one JSON object keyed by `YYYY-MM-DD`:
//!
//! ```json
//! {"2025-09-01": {"SELL": {"7": {"100": 5}}, "BUY": {}}}
//! ```
//!
//! The file is read at the start of a run and fully rewritten at the end,
//! through a sibling `.tmp` file renamed over the original.
//! Callers are expected to run one pipeline at a time against a given file.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::de::{self, Deserializer, MapAccess, Visitor};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::snapshot::{DaySnapshot, ItemId, StallKind};

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct HistoryStore {
    days: BTreeMap<NaiveDate, DaySnapshot>,
}

/// On which days an item was listed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Presence {
    /// Sorted, deduplicated, never empty.
    dates: Vec<NaiveDate>,
}

impl Presence {
    /// Returns `None` when `dates` is empty.
    pub fn new(dates: impl IntoIterator<Item = NaiveDate>) -> Option<Self> {
        let dates: Vec<NaiveDate> = dates
            .into_iter()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        (!dates.is_empty()).then_some(Self { dates })
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn first_seen(&self) -> NaiveDate {
        self.dates[0]
    }

    pub fn last_seen(&self) -> NaiveDate {
        self.dates[self.dates.len() - 1]
    }

    pub fn seen_days(&self) -> usize {
        self.dates.len()
    }
}

impl HistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads the store at `path`, or returns an empty one if the file does not
    /// exist. A file that exists but does not parse is an error.
    #[tracing::instrument]
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!("History file not found, starting empty");
            return Ok(Self::new());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read history {}", path.display()))?;
        let store: Self = serde_json::from_str(&content)
            .with_context(|| format!("history {} is corrupt", path.display()))?;

        info!(days = store.len(), "History loaded");
        Ok(store)
    }

    /// Rewrites the whole store to `path` as compact JSON.
    #[tracing::instrument(skip(self), fields(days = self.len()))]
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let body = serde_json::to_vec(self)?;
        let tmp = temp_path(path);
        fs::write(&tmp, &body)
            .with_context(|| format!("failed to write history {}", tmp.display()))?;
        fs::rename(&tmp, path)
            .with_context(|| format!("failed to replace history {}", path.display()))?;

        debug!(bytes = body.len(), "History saved");
        Ok(())
    }

    /// Folds a run's snapshot into the entry for `date`.
    ///
    /// A new date is inserted as-is. An existing date keeps, for every
    /// `(item_id, price)`, the larger of the stored and the new quantity, so
    /// running the pipeline twice in one day never double counts.
    pub fn merge(&mut self, date: NaiveDate, today: DaySnapshot) {
        match self.days.get_mut(&date) {
            Some(stored) => stored.merge_max(&today),
            None => {
                self.days.insert(date, today);
            }
        }
    }

    pub fn get(&self, date: NaiveDate) -> Option<&DaySnapshot> {
        self.days.get(&date)
    }

    /// Iterates days in date order.
    pub fn days(&self) -> impl Iterator<Item = (NaiveDate, &DaySnapshot)> {
        self.days.iter().map(|(d, s)| (*d, s))
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    /// Days on which each item appears in the `kind` histogram.
    pub fn presence(&self, kind: StallKind) -> BTreeMap<ItemId, Presence> {
        let mut seen: BTreeMap<ItemId, BTreeSet<NaiveDate>> = BTreeMap::new();

        for (date, snapshot) in self.days() {
            for item_id in snapshot.histogram(kind).keys() {
                seen.entry(*item_id).or_default().insert(date);
            }
        }

        seen.into_iter()
            .map(|(item_id, dates)| {
                (
                    item_id,
                    Presence {
                        dates: dates.into_iter().collect(),
                    },
                )
            })
            .collect()
    }
}

/// Sibling of `path` that a save writes before renaming over it.
fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

impl<'de> Deserialize<'de> for HistoryStore {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(HistoryVisitor)
    }
}

/// Accepts only canonical `YYYY-MM-DD` keys, each at most once.
struct HistoryVisitor;

impl<'de> Visitor<'de> for HistoryVisitor {
    type Value = HistoryStore;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a map of YYYY-MM-DD dates to daily snapshots")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<HistoryStore, A::Error> {
        let mut days = BTreeMap::new();

        while let Some(key) = map.next_key::<String>()? {
            let date = NaiveDate::parse_from_str(&key, DATE_FORMAT)
                .map_err(|e| de::Error::custom(format!("invalid date key {key:?}: {e}")))?;
            if date.format(DATE_FORMAT).to_string() != key {
                return Err(de::Error::custom(format!(
                    "date key {key:?} is not in YYYY-MM-DD form"
                )));
            }

            let snapshot: DaySnapshot = map.next_value()?;
            if days.insert(date, snapshot).is_some() {
                return Err(de::Error::custom(format!("duplicate date key {key:?}")));
            }
        }

        Ok(HistoryStore { days })
    }
}

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

use chrono::NaiveDate;

use crate::stats::{DEFAULT_OUTLIER_MULTIPLIER, StatsOptions};

/// Thresholds for discount and profit detection.
///
/// Stored as a JSON object on disk; every field is optional:
/// ```json
/// {
///   "discount_threshold_pct": 60,
///   "exclude_name_keywords": ["Blueprint"]
/// }
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    pub discount_threshold_pct: f64,
    /// Minimum surviving history entries before an item's average is trusted.
    pub min_observations: usize,
    pub include_today: bool,
    pub outlier_multiplier: f64,
    pub profit_min: f64,
    /// Case-insensitive substrings; matching item names are never reported.
    pub exclude_name_keywords: Vec<String>,
    /// How many hits of each report to log.
    pub show_max_rows: usize,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            discount_threshold_pct: 50.0,
            min_observations: 3,
            include_today: true,
            outlier_multiplier: DEFAULT_OUTLIER_MULTIPLIER,
            profit_min: 20_000.0,
            exclude_name_keywords: [
                "Boots",
                "Gloves",
                "Gauntlets",
                "Armor",
                "Fairy",
                "Shadow Gem",
                "Potion of Monkey",
                "Lustrious Gem",
                "Candy",
                "Sword",
                "Blueprint",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            show_max_rows: 30,
        }
    }
}

impl DetectionConfig {
    /// Loads the config from a JSON file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let config = serde_json::from_str(&content)
            .with_context(|| format!("invalid config {}", path.display()))?;
        Ok(config)
    }

    /// Loads `path` when given, otherwise the defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        path.map_or_else(|| Ok(Self::default()), Self::load)
    }

    /// Sell-side statistics options for `today` under these thresholds.
    pub fn stats_options(&self, today: NaiveDate) -> StatsOptions {
        StatsOptions::new(today)
            .with_include_today(self.include_today)
            .with_outlier_multiplier(self.outlier_multiplier)
    }

    pub fn is_blocked(&self, item_name: &str) -> bool {
        let name = item_name.to_lowercase();
        self.exclude_name_keywords
            .iter()
            .any(|kw| name.contains(&kw.to_lowercase()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::HistoryStore;
    use crate::stats::item_stats;

    #[test]
    fn test_is_blocked_case_insensitive() {
        let config = DetectionConfig::default();
        assert!(config.is_blocked("Steel Gloves"));
        assert!(config.is_blocked("blueprint: ship hull"));
        assert!(!config.is_blocked("Elven Signet"));
        assert!(!config.is_blocked(""));
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("detection.json");
        std::fs::write(&path, r#"{"discount_threshold_pct": 60, "exclude_name_keywords": []}"#)
            .unwrap();

        let config = DetectionConfig::load(&path).unwrap();
        assert_eq!(config.discount_threshold_pct, 60.0);
        assert!(config.exclude_name_keywords.is_empty());
        assert_eq!(config.min_observations, 3);
        assert_eq!(config.outlier_multiplier, 3.0);
    }

    #[test]
    fn test_stats_options_follow_config() {
        let today = NaiveDate::from_ymd_opt(2025, 9, 3).unwrap();
        let config: DetectionConfig =
            serde_json::from_str(r#"{"include_today": false, "outlier_multiplier": 2.5}"#)
                .unwrap();

        let opts = config.stats_options(today);
        assert!(!opts.include_today);
        assert_eq!(opts.outlier_multiplier, 2.5);
        assert_eq!(opts.today, today);

        let history: HistoryStore = serde_json::from_str(
            r#"{
                "2020-01-01": {"SELL": {"7": {"10": 1}}, "BUY": {}},
                "2025-09-03": {"SELL": {"7": {"50": 1}}, "BUY": {}}
            }"#,
        )
        .unwrap();
        let stats = item_stats(&history, &opts);
        assert_eq!(stats[&7].median, Some(10.0));
        assert_eq!(stats[&7].observations, 1);
    }

    #[test]
    fn test_load_or_default_without_path() {
        let config = DetectionConfig::load_or_default(None).unwrap();
        assert_eq!(config.profit_min, 20_000.0);
    }
}

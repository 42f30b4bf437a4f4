//! Item id → display name lookup.

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::snapshot::ItemId;

/// Read-only name table, stored on disk as a JSON object:
/// ```json
/// { "1847": "Elven Signet", "3457": "Ship Repair Kit" }
/// ```
#[derive(Debug, Clone, Default)]
pub struct ItemNames {
    entries: HashMap<ItemId, String>,
}

impl ItemNames {
    /// Loads the first of `paths` that exists. If none does, returns an empty
    /// table so reports still render with ids only.
    pub fn load(paths: &[PathBuf]) -> Result<Self> {
        for path in paths {
            if path.exists() {
                let names = Self::load_file(path)?;
                info!(path = %path.display(), entries = names.len(), "Loaded item names");
                return Ok(names);
            }
        }

        warn!("No item name file found, names will be blank");
        Ok(Self::default())
    }

    fn load_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let entries: HashMap<ItemId, String> = serde_json::from_str(&content)
            .with_context(|| format!("invalid item name file {}", path.display()))?;
        Ok(Self { entries })
    }

    pub fn from_entries(entries: impl IntoIterator<Item = (ItemId, String)>) -> Self {
        Self {
            entries: entries.into_iter().collect(),
        }
    }

    /// Returns the name for `item_id`, or `""` when unknown.
    pub fn get(&self, item_id: ItemId) -> &str {
        self.entries.get(&item_id).map(String::as_str).unwrap_or("")
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

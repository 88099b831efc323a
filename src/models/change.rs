// src/models/change.rs

//! Change-set structures produced by the diff engine.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::Item;

/// Item field compared individually when the fingerprint changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangedField {
    Title,
    Summary,
    Excerpt,
    /// Fingerprints differ but no field differs after normalization
    Fingerprint,
}

impl fmt::Display for ChangedField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Title => "title",
            Self::Summary => "summary",
            Self::Excerpt => "excerpt",
            Self::Fingerprint => "fingerprint",
        };
        f.write_str(name)
    }
}

/// An item reported as new or updated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChangedItem {
    /// The item as observed in the current snapshot
    pub item: Item,

    /// Empty for new items
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub changed_fields: Vec<ChangedField>,
}

/// New/updated classification between two snapshots of one site.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct ChangeSet {
    pub site_key: String,

    #[serde(default)]
    pub listing_url: String,

    #[serde(default)]
    pub api_url: String,

    /// Date of the snapshot compared against; absent on a first run
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_run_date: Option<NaiveDate>,

    pub new_items: Vec<ChangedItem>,
    pub updated_items: Vec<ChangedItem>,
    pub unchanged_count: usize,
}

impl ChangeSet {
    /// Check if there are any changes.
    pub fn has_changes(&self) -> bool {
        !self.new_items.is_empty() || !self.updated_items.is_empty()
    }

    /// Get the total number of changes.
    pub fn change_count(&self) -> usize {
        self.new_items.len() + self.updated_items.len()
    }

    /// Whether this change set was computed without a previous snapshot.
    pub fn is_first_run(&self) -> bool {
        self.previous_run_date.is_none()
    }
}

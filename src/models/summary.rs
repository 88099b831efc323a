// src/models/summary.rs

//! Run-wide summary handed to reporting collaborators.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::FailureKind;
use crate::models::ChangeSet;

/// A page the external screenshot collaborator should capture.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScreenshotTarget {
    pub url: String,
    pub file_name: String,
    pub label: String,
}

/// Terminal outcome of one site in a run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SiteOutcome {
    Succeeded {
        change_set: ChangeSet,
        item_count: usize,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        screenshot_targets: Vec<ScreenshotTarget>,
    },
    Failed {
        kind: FailureKind,
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        status_code: Option<u16>,
    },
}

/// Per-site entry of the run summary.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SiteReport {
    pub site_key: String,
    pub site_name: String,
    #[serde(default)]
    pub listing_url: String,
    #[serde(default)]
    pub api_url: String,
    pub outcome: SiteOutcome,
}

impl SiteReport {
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, SiteOutcome::Succeeded { .. })
    }

    pub fn change_set(&self) -> Option<&ChangeSet> {
        match &self.outcome {
            SiteOutcome::Succeeded { change_set, .. } => Some(change_set),
            SiteOutcome::Failed { .. } => None,
        }
    }

    pub fn failure(&self) -> Option<(FailureKind, &str)> {
        match &self.outcome {
            SiteOutcome::Failed { kind, message, .. } => Some((*kind, message.as_str())),
            SiteOutcome::Succeeded { .. } => None,
        }
    }
}

/// Every configured site with its outcome, in configuration order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RunSummary {
    pub run_date: NaiveDate,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub sites: Vec<SiteReport>,
}

impl RunSummary {
    pub fn succeeded(&self) -> impl Iterator<Item = &SiteReport> {
        self.sites.iter().filter(|s| s.is_success())
    }

    pub fn failed(&self) -> impl Iterator<Item = &SiteReport> {
        self.sites.iter().filter(|s| !s.is_success())
    }

    /// True when no site succeeded (including the zero-site case).
    pub fn all_failed(&self) -> bool {
        self.succeeded().next().is_none()
    }

    pub fn total_new(&self) -> usize {
        self.sites
            .iter()
            .filter_map(SiteReport::change_set)
            .map(|c| c.new_items.len())
            .sum()
    }

    pub fn total_updated(&self) -> usize {
        self.sites
            .iter()
            .filter_map(SiteReport::change_set)
            .map(|c| c.updated_items.len())
            .sum()
    }

    pub fn site(&self, site_key: &str) -> Option<&SiteReport> {
        self.sites.iter().find(|s| s.site_key == site_key)
    }
}

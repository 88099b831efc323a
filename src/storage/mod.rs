// src/storage/mod.rs

//! Snapshot persistence.
//!
//! Snapshots are keyed by `(site_key, run_date)`. A snapshot is immutable
//! once written; later runs supersede it but never delete it.
//!
//! ## Directory Structure
//!
//! ```text
//! data/
//! ├── nt/
//! │   ├── 2026-02-02.json
//! │   └── 2026-02-09.json
//! └── unitel/
//!     └── 2026-02-09.json
//! ```

pub mod local;
pub mod memory;

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::Result;
use crate::models::Snapshot;

pub use local::LocalSnapshotStore;
pub use memory::MemorySnapshotStore;

/// Where and when a snapshot was written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveReceipt {
    pub site_key: String,
    pub run_date: NaiveDate,
    pub item_count: usize,
    /// True when an existing snapshot for the same key was replaced
    pub replaced: bool,
    /// File written, for filesystem-backed stores
    pub path: Option<PathBuf>,
}

/// Trait for snapshot storage backends.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Persist a snapshot under `(site_key, run_date)`.
    ///
    /// An existing snapshot for the same key is a `StoreConflict` unless
    /// `overwrite` is set.
    async fn save(&self, snapshot: &Snapshot, overwrite: bool) -> Result<SaveReceipt>;

    /// Load the snapshot for exactly this date.
    async fn load(&self, site_key: &str, run_date: NaiveDate) -> Result<Option<Snapshot>>;

    /// Most recent snapshot strictly before `before`; `None` when the site
    /// has no earlier snapshot.
    async fn load_previous(&self, site_key: &str, before: NaiveDate) -> Result<Option<Snapshot>>;

    /// Dates with a stored snapshot, ascending.
    async fn list_dates(&self, site_key: &str) -> Result<Vec<NaiveDate>>;
}

/// Latest date strictly before `before` in an ascending list.
pub(crate) fn previous_date(dates: &[NaiveDate], before: NaiveDate) -> Option<NaiveDate> {
    dates.iter().rev().find(|date| **date < before).copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 2, day).unwrap()
    }

    #[test]
    fn test_previous_date_is_strictly_before() {
        let dates = [date(2), date(9), date(16)];
        assert_eq!(previous_date(&dates, date(16)), Some(date(9)));
        assert_eq!(previous_date(&dates, date(17)), Some(date(16)));
        assert_eq!(previous_date(&dates, date(2)), None);
        assert_eq!(previous_date(&[], date(2)), None);
    }
}

// src/storage/memory.rs

//! In-memory snapshot store for tests and dry runs.

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::{AppError, Result};
use crate::models::{Snapshot, is_valid_site_key};
use crate::storage::{SaveReceipt, SnapshotStore};

/// Snapshots held in a map keyed by `(site_key, run_date)`.
#[derive(Debug, Default)]
pub struct MemorySnapshotStore {
    snapshots: Mutex<BTreeMap<(String, NaiveDate), Snapshot>>,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store seeded with existing snapshots.
    pub fn with_snapshots(snapshots: impl IntoIterator<Item = Snapshot>) -> Self {
        let store = Self::new();
        if let Ok(mut map) = store.snapshots.lock() {
            for snapshot in snapshots {
                map.insert((snapshot.site_key.clone(), snapshot.run_date()), snapshot);
            }
        }
        store
    }

    pub fn len(&self) -> usize {
        self.snapshots.lock().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, BTreeMap<(String, NaiveDate), Snapshot>>> {
        self.snapshots
            .lock()
            .map_err(|_| AppError::validation("snapshot store lock poisoned"))
    }
}

fn check_key(site_key: &str) -> Result<()> {
    if is_valid_site_key(site_key) {
        Ok(())
    } else {
        Err(AppError::validation(format!(
            "site key '{site_key}' must match [a-z0-9_-]+"
        )))
    }
}

#[async_trait]
impl SnapshotStore for MemorySnapshotStore {
    async fn save(&self, snapshot: &Snapshot, overwrite: bool) -> Result<SaveReceipt> {
        check_key(&snapshot.site_key)?;
        let run_date = snapshot.run_date();
        let key = (snapshot.site_key.clone(), run_date);

        let mut map = self.lock()?;
        let replaced = map.contains_key(&key);
        if replaced && !overwrite {
            return Err(AppError::StoreConflict {
                site_key: snapshot.site_key.clone(),
                run_date,
            });
        }
        map.insert(key, snapshot.clone());

        Ok(SaveReceipt {
            site_key: snapshot.site_key.clone(),
            run_date,
            item_count: snapshot.len(),
            replaced,
            path: None,
        })
    }

    async fn load(&self, site_key: &str, run_date: NaiveDate) -> Result<Option<Snapshot>> {
        check_key(site_key)?;
        Ok(self.lock()?.get(&(site_key.to_string(), run_date)).cloned())
    }

    async fn load_previous(&self, site_key: &str, before: NaiveDate) -> Result<Option<Snapshot>> {
        check_key(site_key)?;
        let map = self.lock()?;
        Ok(map
            .range((site_key.to_string(), NaiveDate::MIN)..(site_key.to_string(), before))
            .next_back()
            .map(|(_, snapshot)| snapshot.clone()))
    }

    async fn list_dates(&self, site_key: &str) -> Result<Vec<NaiveDate>> {
        check_key(site_key)?;
        Ok(self
            .lock()?
            .keys()
            .filter(|(key, _)| key == site_key)
            .map(|(_, date)| *date)
            .collect())
    }
}

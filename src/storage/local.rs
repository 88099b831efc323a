// src/storage/local.rs

//! Local filesystem snapshot store.
//!
//! ## Storage Layout
//!
//! ```text
//! {root}/
//! └── {site_key}/
//!     └── YYYY-MM-DD.json   # one pretty-printed Snapshot per run date
//! ```
//!
//! Writes go to a temporary file that is renamed into place, so an
//! interrupted save never leaves a partial snapshot behind. Files whose
//! name is not a date are ignored.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Serialize, de::DeserializeOwned};
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::models::{Snapshot, is_valid_site_key};
use crate::storage::{SaveReceipt, SnapshotStore, previous_date};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Filesystem snapshot store rooted at a data directory.
#[derive(Debug, Clone)]
pub struct LocalSnapshotStore {
    root_dir: PathBuf,
}

impl LocalSnapshotStore {
    /// Create a store rooted at the given directory.
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root_dir
    }

    fn site_dir(&self, site_key: &str) -> Result<PathBuf> {
        if !is_valid_site_key(site_key) {
            return Err(AppError::validation(format!(
                "site key '{site_key}' must match [a-z0-9_-]+"
            )));
        }
        Ok(self.root_dir.join(site_key))
    }

    /// Path of the snapshot for `(site_key, run_date)`.
    pub fn snapshot_path(&self, site_key: &str, run_date: NaiveDate) -> Result<PathBuf> {
        Ok(self
            .site_dir(site_key)?
            .join(format!("{}.json", run_date.format(DATE_FORMAT))))
    }

    /// Write bytes atomically (write to temp, then rename).
    async fn write_bytes(path: &Path, bytes: &[u8]) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let tmp = path.with_extension("json.tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        file.sync_all().await?;
        drop(file);

        tokio::fs::rename(&tmp, path).await?;
        Ok(())
    }

    async fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(value)?;
        Self::write_bytes(path, &bytes).await
    }

    /// Read bytes, returning None if the file doesn't exist.
    async fn read_bytes(path: &Path) -> Result<Option<Vec<u8>>> {
        match tokio::fs::read(path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Io(e)),
        }
    }

    async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
        match Self::read_bytes(path).await? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl SnapshotStore for LocalSnapshotStore {
    async fn save(&self, snapshot: &Snapshot, overwrite: bool) -> Result<SaveReceipt> {
        let run_date = snapshot.run_date();
        let path = self.snapshot_path(&snapshot.site_key, run_date)?;

        let exists = tokio::fs::try_exists(&path).await?;
        if exists && !overwrite {
            return Err(AppError::StoreConflict {
                site_key: snapshot.site_key.clone(),
                run_date,
            });
        }

        Self::write_json(&path, snapshot).await?;
        log::info!(
            "{}: saved snapshot with {} items to {}",
            snapshot.site_key,
            snapshot.len(),
            path.display()
        );

        Ok(SaveReceipt {
            site_key: snapshot.site_key.clone(),
            run_date,
            item_count: snapshot.len(),
            replaced: exists,
            path: Some(path),
        })
    }

    async fn load(&self, site_key: &str, run_date: NaiveDate) -> Result<Option<Snapshot>> {
        let path = self.snapshot_path(site_key, run_date)?;
        Self::read_json(&path).await
    }

    async fn load_previous(&self, site_key: &str, before: NaiveDate) -> Result<Option<Snapshot>> {
        let dates = self.list_dates(site_key).await?;
        match previous_date(&dates, before) {
            Some(date) => {
                log::debug!("{}: previous snapshot is {}", site_key, date);
                self.load(site_key, date).await
            }
            None => {
                log::info!("{}: no snapshot before {}", site_key, before);
                Ok(None)
            }
        }
    }

    async fn list_dates(&self, site_key: &str) -> Result<Vec<NaiveDate>> {
        let dir = self.site_dir(site_key)?;
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(AppError::Io(e)),
        };

        let mut dates = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if let Ok(date) = NaiveDate::parse_from_str(stem, DATE_FORMAT) {
                dates.push(date);
            }
        }
        dates.sort();
        Ok(dates)
    }
}

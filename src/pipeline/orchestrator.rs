// src/pipeline/orchestrator.rs

//! Run-wide orchestration.
//!
//! Every configured site goes `Pending → Fetching → {Succeeded, Failed}`
//! independently: collect, load the previous snapshot, compare, save. A
//! failing site never affects the others. When the run deadline passes or
//! the shutdown future resolves, sites still collecting are reported as
//! cancelled; sites already saving are allowed to finish.

use std::fmt;
use std::future::{self, Future};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use futures::stream::{self, StreamExt};
use tokio::sync::watch;

use crate::error::{FailureKind, Result};
use crate::fetch::PageFetcher;
use crate::models::{
    ChangeSet, RunConfig, RunSummary, SiteConfig, SiteOutcome, SiteReport, Snapshot,
};
use crate::pipeline::diff::{carry_forward_excerpts, compare};
use crate::services::{Adapter, AdapterOptions, screenshot_targets};
use crate::storage::SnapshotStore;

/// Lifecycle of one site within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SiteState {
    Pending,
    Fetching,
    Succeeded,
    Failed,
}

impl fmt::Display for SiteState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Pending => "pending",
            Self::Fetching => "fetching",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

fn transition(site_key: &str, from: SiteState, to: SiteState) {
    log::info!("{}: {} -> {}", site_key, from, to);
}

/// Runs all sites against one store and one fetcher.
pub struct Orchestrator {
    config: RunConfig,
    options: AdapterOptions,
    store: Arc<dyn SnapshotStore>,
    fetcher: Arc<dyn PageFetcher>,
}

impl Orchestrator {
    pub fn new(
        config: RunConfig,
        store: Arc<dyn SnapshotStore>,
        fetcher: Arc<dyn PageFetcher>,
    ) -> Self {
        let options = AdapterOptions {
            fetch_details: config.fetch_details,
            ..AdapterOptions::default()
        };
        Self {
            config,
            options,
            store,
            fetcher,
        }
    }

    pub fn with_adapter_options(mut self, options: AdapterOptions) -> Self {
        self.options = options;
        self
    }

    /// Run every site to completion or until the run deadline.
    pub async fn run(&self, sites: &[SiteConfig], run_date: NaiveDate) -> RunSummary {
        self.run_until(sites, run_date, future::pending()).await
    }

    /// Like [`run`](Self::run), but also stops when `shutdown` resolves.
    ///
    /// The deadline and `shutdown` only interrupt sites that are still
    /// collecting. A site that has collected always finishes comparing and
    /// saving, so a reported cancellation never leaves a snapshot behind.
    /// The summary lists every site exactly once, in configuration order.
    pub async fn run_until<F>(
        &self,
        sites: &[SiteConfig],
        run_date: NaiveDate,
        shutdown: F,
    ) -> RunSummary
    where
        F: Future<Output = ()>,
    {
        let started_at = Utc::now();
        let run_timestamp = run_date.and_time(started_at.time()).and_utc();
        let concurrency = self.config.max_concurrent_sites.max(1);
        log::info!(
            "Starting run for {} ({} sites, {} at a time)",
            run_date,
            sites.len(),
            concurrency
        );

        let (cancel_tx, cancel_rx) = watch::channel(None::<&'static str>);
        let mut outcomes: Vec<Option<SiteOutcome>> = vec![None; sites.len()];

        {
            let mut site_stream = stream::iter(sites.iter().enumerate())
                .map(|(idx, site)| {
                    let cancel = cancel_rx.clone();
                    async move {
                        let outcome = self.process_site(site, run_date, run_timestamp, cancel).await;
                        (idx, outcome)
                    }
                })
                .buffer_unordered(concurrency);

            let timeout = self.config.run_timeout();
            let deadline = async move {
                match timeout {
                    Some(limit) => tokio::time::sleep(limit).await,
                    None => future::pending::<()>().await,
                }
            };
            tokio::pin!(deadline);
            tokio::pin!(shutdown);

            let mut cancelling = false;
            loop {
                tokio::select! {
                    biased;
                    next = site_stream.next() => match next {
                        Some((idx, outcome)) => outcomes[idx] = Some(outcome),
                        None => break,
                    },
                    _ = &mut deadline, if !cancelling => {
                        log::warn!("Run timeout reached, cancelling sites still collecting");
                        cancelling = true;
                        cancel_tx.send_replace(Some("run timeout exceeded"));
                    }
                    _ = &mut shutdown, if !cancelling => {
                        log::warn!("Shutdown requested, cancelling sites still collecting");
                        cancelling = true;
                        cancel_tx.send_replace(Some("run cancelled"));
                    }
                }
            }
        }

        let reports = sites
            .iter()
            .zip(outcomes)
            .map(|(site, outcome)| SiteReport {
                site_key: site.key.clone(),
                site_name: site.display_name().to_string(),
                listing_url: site.listing_url.clone(),
                api_url: site.api_url.clone(),
                outcome: outcome.unwrap_or_else(|| cancelled_outcome("run cancelled")),
            })
            .collect();

        let summary = RunSummary {
            run_date,
            started_at,
            finished_at: Utc::now(),
            sites: reports,
        };
        log::info!(
            "Run finished: {} succeeded, {} failed, {} new, {} updated",
            summary.succeeded().count(),
            summary.failed().count(),
            summary.total_new(),
            summary.total_updated()
        );
        summary
    }

    async fn process_site(
        &self,
        site: &SiteConfig,
        run_date: NaiveDate,
        run_timestamp: DateTime<Utc>,
        mut cancel: watch::Receiver<Option<&'static str>>,
    ) -> SiteOutcome {
        transition(&site.key, SiteState::Pending, SiteState::Fetching);

        let collected = tokio::select! {
            biased;
            reason = cancelled(&mut cancel) => {
                log::warn!("{}: {}", site.key, reason);
                transition(&site.key, SiteState::Fetching, SiteState::Failed);
                return cancelled_outcome(reason);
            }
            collected = self.collect_site(site, run_timestamp) => collected,
        };

        let result = match collected {
            Ok(snapshot) => self.commit_site(site, run_date, snapshot).await,
            Err(error) => Err(error),
        };

        match result {
            Ok((change_set, item_count)) => {
                log::info!(
                    "{}: {} items, {} new, {} updated, {} unchanged",
                    site.key,
                    item_count,
                    change_set.new_items.len(),
                    change_set.updated_items.len(),
                    change_set.unchanged_count
                );
                transition(&site.key, SiteState::Fetching, SiteState::Succeeded);
                SiteOutcome::Succeeded {
                    screenshot_targets: screenshot_targets(site, &change_set),
                    change_set,
                    item_count,
                }
            }
            Err(error) => {
                log::error!("{}: {}", site.key, error);
                transition(&site.key, SiteState::Fetching, SiteState::Failed);
                SiteOutcome::Failed {
                    kind: error.kind(),
                    message: error.to_string(),
                    status_code: error.status_code(),
                }
            }
        }
    }

    /// Observe the site. Safe to abandon: nothing is persisted here.
    async fn collect_site(
        &self,
        site: &SiteConfig,
        run_timestamp: DateTime<Utc>,
    ) -> Result<Snapshot> {
        let adapter = Adapter::from_config(site, &self.options)?;
        adapter.collect(self.fetcher.as_ref(), run_timestamp).await
    }

    /// Compare against the previous snapshot, then persist.
    async fn commit_site(
        &self,
        site: &SiteConfig,
        run_date: NaiveDate,
        mut snapshot: Snapshot,
    ) -> Result<(ChangeSet, usize)> {
        let previous = self.store.load_previous(&site.key, run_date).await?;
        let restored = carry_forward_excerpts(previous.as_ref(), &mut snapshot);
        if restored > 0 {
            log::info!(
                "{}: kept last excerpt for {} items whose detail page failed",
                site.key,
                restored
            );
        }

        let change_set = compare(previous.as_ref(), &snapshot);
        self.store.save(&snapshot, self.config.overwrite).await?;
        Ok((change_set, snapshot.len()))
    }
}

fn cancelled_outcome(reason: &str) -> SiteOutcome {
    SiteOutcome::Failed {
        kind: FailureKind::Cancelled,
        message: reason.to_string(),
        status_code: None,
    }
}

/// Resolves with the reason once cancellation is signalled.
async fn cancelled(cancel: &mut watch::Receiver<Option<&'static str>>) -> &'static str {
    loop {
        if let Some(reason) = *cancel.borrow_and_update() {
            return reason;
        }
        if cancel.changed().await.is_err() {
            return future::pending().await;
        }
    }
}

/// Write the run summary to `{output_dir}/{run_date}/summary.json`.
pub async fn write_summary(summary: &RunSummary, output_dir: &Path) -> Result<PathBuf> {
    let dir = output_dir.join(summary.run_date.format("%Y-%m-%d").to_string());
    tokio::fs::create_dir_all(&dir).await?;
    let path = dir.join("summary.json");
    tokio::fs::write(&path, serde_json::to_vec_pretty(summary)?).await?;
    Ok(path)
}

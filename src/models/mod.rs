// src/models/mod.rs

//! Domain models for the monitor.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod change;
mod config;
mod item;
mod summary;

// Re-export all public types
pub use change::{ChangeSet, ChangedField, ChangedItem};
pub use config::{
    BrowserConfig, FetchConfig, MonitorConfig, PathsConfig, RunConfig, SiteConfig, SiteKind,
    is_valid_site_key, validate_sites,
};
pub use item::{
    CollectionSource, EXCERPT_MAX, Fingerprint, Item, SUMMARY_MAX, Snapshot, TITLE_MAX,
};
pub use summary::{RunSummary, ScreenshotTarget, SiteOutcome, SiteReport};

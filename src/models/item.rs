// src/models/item.rs

//! Item and snapshot data structures.

use std::collections::HashSet;
use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::pipeline::fingerprint::fingerprint_fields;
use crate::utils::truncate_graphemes;

/// Maximum title length in graphemes.
pub const TITLE_MAX: usize = 200;
/// Maximum summary length in graphemes.
pub const SUMMARY_MAX: usize = 500;
/// Maximum excerpt length in graphemes.
pub const EXCERPT_MAX: usize = 2000;

/// Fixed-length SHA-256 hex digest of an item's normalized text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub(crate) fn from_hex(hex: String) -> Self {
        Self(hex)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One discrete piece of content on a monitored site.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Item {
    /// Canonical absolute URL, identity key within a site
    pub url: String,

    /// Short headline, may be empty
    #[serde(default)]
    pub title: String,

    /// Source-reported publication date (display only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,

    /// Short description, may be empty
    #[serde(default)]
    pub summary: String,

    /// Digest over normalized title, summary and excerpt
    #[serde(default)]
    pub content_fingerprint: Fingerprint,

    /// Larger text sample from the detail page or API body
    #[serde(default)]
    pub raw_excerpt: String,

    /// The detail page failed to load this run, so `raw_excerpt` is not current
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub detail_failed: bool,
}

impl Item {
    /// Create an item with a title; the fingerprint is computed immediately.
    pub fn new(url: impl Into<String>, title: impl AsRef<str>) -> Self {
        let mut item = Self {
            url: url.into(),
            title: truncate_graphemes(title.as_ref().trim(), TITLE_MAX),
            date: None,
            summary: String::new(),
            content_fingerprint: Fingerprint::default(),
            raw_excerpt: String::new(),
            detail_failed: false,
        };
        item.refresh_fingerprint();
        item
    }

    pub fn with_summary(mut self, summary: impl AsRef<str>) -> Self {
        self.summary = truncate_graphemes(summary.as_ref().trim(), SUMMARY_MAX);
        self.refresh_fingerprint();
        self
    }

    /// Empty dates are stored as absent.
    pub fn with_date(mut self, date: impl AsRef<str>) -> Self {
        let date = date.as_ref().trim();
        self.date = (!date.is_empty()).then(|| date.to_string());
        self
    }

    pub fn with_excerpt(mut self, excerpt: impl AsRef<str>) -> Self {
        self.set_excerpt(excerpt.as_ref());
        self
    }

    /// Replace the excerpt in place, keeping the fingerprint in sync.
    pub fn set_excerpt(&mut self, excerpt: &str) {
        self.raw_excerpt = truncate_graphemes(excerpt.trim(), EXCERPT_MAX);
        self.refresh_fingerprint();
    }

    /// Recompute `content_fingerprint` from the current text fields.
    pub fn refresh_fingerprint(&mut self) {
        self.content_fingerprint =
            fingerprint_fields(&[&self.title, &self.summary, &self.raw_excerpt]);
    }
}

/// How a snapshot's item list was obtained.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectionSource {
    /// Static listing page
    #[default]
    Listing,
    /// Structured API endpoint
    Api,
    /// Listing page after the API attempt failed
    HtmlFallback,
    /// Script-executing browser render
    Rendered,
    /// Generic same-origin link crawl
    Crawl,
}

/// The complete observation of one site at one run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Snapshot {
    /// Key of the site that produced this snapshot
    pub site_key: String,

    /// When the fetch occurred
    pub run_timestamp: DateTime<Utc>,

    /// Provenance: listing page used for discovery
    #[serde(default)]
    pub listing_url: String,

    /// Provenance: API endpoint, empty when none
    #[serde(default)]
    pub api_url: String,

    /// Provenance: where the items came from
    #[serde(default)]
    pub source: CollectionSource,

    /// Items in discovery order
    #[serde(default)]
    pub items: Vec<Item>,
}

impl Snapshot {
    /// Build a snapshot, keeping only the first item for each URL.
    pub fn new(site_key: impl Into<String>, run_timestamp: DateTime<Utc>, items: Vec<Item>) -> Self {
        let mut seen = HashSet::new();
        let items = items
            .into_iter()
            .filter(|item| seen.insert(item.url.clone()))
            .collect();

        Self {
            site_key: site_key.into(),
            run_timestamp,
            listing_url: String::new(),
            api_url: String::new(),
            source: CollectionSource::default(),
            items,
        }
    }

    pub fn with_provenance(mut self, listing_url: &str, api_url: &str) -> Self {
        self.listing_url = listing_url.to_string();
        self.api_url = api_url.to_string();
        self
    }

    pub fn with_source(mut self, source: CollectionSource) -> Self {
        self.source = source;
        self
    }

    /// Store key date for this snapshot.
    pub fn run_date(&self) -> NaiveDate {
        self.run_timestamp.date_naive()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Look up an item by URL.
    pub fn item(&self, url: &str) -> Option<&Item> {
        self.items.iter().find(|item| item.url == url)
    }
}

// src/services/json_api.rs

//! Structured endpoint with listing-page fallback.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use thiserror::Error;
use url::Url;

use crate::error::{FetchError, Result};
use crate::fetch::{FetchRequest, PageFetcher};
use crate::models::{CollectionSource, Item, SiteConfig, Snapshot};
use crate::services::AdapterOptions;
use crate::services::listing::ListingScraper;
use crate::utils::strip_markup;
use crate::utils::url::canonicalize;

/// Object keys that may hold the record array.
const RECORD_KEYS: &[&str] = &["data", "items", "result", "news", "list"];

const URL_KEYS: &[&str] = &["url", "link", "href"];
const ID_KEYS: &[&str] = &["slug", "id"];
const TITLE_KEYS: &[&str] = &["title", "name", "heading"];
const DATE_KEYS: &[&str] = &["date", "created_at", "published_at", "publish_date"];
const SUMMARY_KEYS: &[&str] = &["summary", "description", "short_description", "excerpt"];
const BODY_KEYS: &[&str] = &["content", "body", "text"];

/// Why the structured endpoint could not be used.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiFallback {
    #[error("endpoint unavailable: {0}")]
    Unreachable(FetchError),

    #[error("invalid JSON: {0}")]
    InvalidJson(String),

    #[error("unexpected payload shape: {0}")]
    SchemaMismatch(&'static str),
}

/// Tries the site's JSON endpoint first and scrapes the listing page when
/// the endpoint fails.
pub struct JsonApiAdapter {
    listing: ListingScraper,
    base: Url,
    item_url_template: String,
}

impl JsonApiAdapter {
    pub fn new(site: &SiteConfig, options: &AdapterOptions) -> Result<Self> {
        let base = Url::parse(&site.listing_url)?;
        let item_url_template = site.item_url_template.clone().unwrap_or_else(|| {
            format!("{}/news/{{id}}", base.origin().ascii_serialization())
        });

        Ok(Self {
            listing: ListingScraper::new(site, options)?,
            base,
            item_url_template,
        })
    }

    pub fn site(&self) -> &SiteConfig {
        self.listing.site()
    }

    pub async fn collect(
        &self,
        fetcher: &dyn PageFetcher,
        run_timestamp: DateTime<Utc>,
    ) -> Result<Snapshot> {
        let site = self.site();
        let (items, source) = match self.attempt_api(fetcher).await {
            Ok(items) => {
                log::info!("{}: API returned {} items", site.key, items.len());
                (items, CollectionSource::Api)
            }
            Err(reason) => {
                log::warn!(
                    "{}: API attempt failed ({}), falling back to listing page",
                    site.key,
                    reason
                );
                let items = self.listing.fetch_listing(fetcher, &site.listing_url).await?;
                (items, CollectionSource::HtmlFallback)
            }
        };

        let items = self.listing.enrich(fetcher, items).await;
        Ok(self.listing.snapshot(items, run_timestamp, source))
    }

    /// Fetch and map the endpoint's records.
    pub async fn attempt_api(
        &self,
        fetcher: &dyn PageFetcher,
    ) -> std::result::Result<Vec<Item>, ApiFallback> {
        let request = FetchRequest::json(&self.site().api_url)
            .language(self.site().accept_language.as_deref());
        let response = fetcher
            .fetch(&request)
            .await
            .map_err(ApiFallback::Unreachable)?;
        self.parse_api(&response.body)
    }

    /// Map a payload to items. Records without a resolvable URL are skipped.
    pub fn parse_api(&self, body: &str) -> std::result::Result<Vec<Item>, ApiFallback> {
        let payload: Value =
            serde_json::from_str(body).map_err(|e| ApiFallback::InvalidJson(e.to_string()))?;
        let records = records(&payload)?;

        let mut items = Vec::with_capacity(records.len());
        let mut seen = HashSet::new();
        for record in records.iter().filter_map(Value::as_object) {
            let Some(url) = self.record_url(record) else {
                log::debug!("{}: skipping API record without URL", self.site().key);
                continue;
            };
            if !seen.insert(url.clone()) {
                continue;
            }

            let title = field(record, TITLE_KEYS).unwrap_or_default();
            let mut item = Item::new(url, strip_markup(&title))
                .with_summary(strip_markup(&field(record, SUMMARY_KEYS).unwrap_or_default()))
                .with_excerpt(strip_markup(&field(record, BODY_KEYS).unwrap_or_default()));
            if let Some(date) = field(record, DATE_KEYS) {
                item = item.with_date(date);
            }
            items.push(item);
        }
        Ok(items)
    }

    fn record_url(&self, record: &Map<String, Value>) -> Option<String> {
        if let Some(href) = field(record, URL_KEYS) {
            return canonicalize(&self.base, &href);
        }
        let id = field(record, ID_KEYS)?;
        let id = id.trim();
        if id.starts_with("http") || id.starts_with('/') {
            canonicalize(&self.base, id)
        } else {
            canonicalize(&self.base, &self.item_url_template.replace("{id}", id))
        }
    }
}

/// The record array: the payload itself or the first array under a known key.
fn records(payload: &Value) -> std::result::Result<&Vec<Value>, ApiFallback> {
    match payload {
        Value::Array(records) => Ok(records),
        Value::Object(map) => RECORD_KEYS
            .iter()
            .find_map(|key| map.get(*key).and_then(Value::as_array))
            .ok_or(ApiFallback::SchemaMismatch("object without a record array")),
        _ => Err(ApiFallback::SchemaMismatch("neither an array nor an object")),
    }
}

/// First non-empty string or number under any of `keys`.
fn field(record: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match record.get(*key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

// src/services/listing.rs

//! Listing-page scraping and detail enrichment shared by the adapters.

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use scraper::{Html, Selector};
use url::Url;

use crate::error::{AppError, Result};
use crate::fetch::{FetchRequest, FetchResponse, PageFetcher};
use crate::models::{CollectionSource, Item, SiteConfig, Snapshot};
use crate::services::AdapterOptions;
use crate::services::extract::{
    DEFAULT_DETAIL_SELECTORS, DEFAULT_LINK_SELECTORS, LinkFilter, detail_text, listing_items,
    parse_selectors,
};

/// Compiled per-site scraping rules.
pub struct ListingScraper {
    site: SiteConfig,
    link_selectors: Vec<Selector>,
    detail_selectors: Vec<Selector>,
    fetch_details: bool,
    max_details: Option<usize>,
    concurrency: usize,
}

impl ListingScraper {
    pub fn new(site: &SiteConfig, options: &AdapterOptions) -> Result<Self> {
        Ok(Self {
            site: site.clone(),
            link_selectors: parse_selectors(&site.link_selectors, DEFAULT_LINK_SELECTORS)?,
            detail_selectors: parse_selectors(&site.detail_selectors, DEFAULT_DETAIL_SELECTORS)?,
            fetch_details: site.fetch_details.unwrap_or(options.fetch_details),
            max_details: site.max_detail_pages,
            concurrency: options.max_concurrent_details.max(1),
        })
    }

    /// Cap detail fetches when the site does not set its own cap.
    pub fn with_default_detail_cap(mut self, cap: usize) -> Self {
        self.max_details.get_or_insert(cap);
        self
    }

    pub fn site(&self) -> &SiteConfig {
        &self.site
    }

    /// Request for one of this site's pages.
    pub fn request(&self, url: &str) -> FetchRequest {
        FetchRequest::page(url)
            .rendered(self.site.renders())
            .language(self.site.accept_language.as_deref())
            .wait_for(self.site.wait_for_selector.as_deref())
    }

    /// Links that may become items: include patterns applied, listing
    /// pages and configured exclusions removed.
    pub fn filter(&self) -> LinkFilter {
        self.site
            .listing_urls()
            .chain(self.site.exclude_urls.iter().map(String::as_str))
            .fold(LinkFilter::new(&self.site.include_patterns), |filter, url| {
                filter.exclude(url)
            })
    }

    /// Fetch a listing page and extract its items.
    pub async fn fetch_listing(&self, fetcher: &dyn PageFetcher, url: &str) -> Result<Vec<Item>> {
        let response = fetcher.fetch(&self.request(url)).await?;
        self.parse_listing(&response)
    }

    /// Extract items from an already loaded listing page.
    pub fn parse_listing(&self, response: &FetchResponse) -> Result<Vec<Item>> {
        if response.body.trim().is_empty() {
            return Err(AppError::parse(&response.url, "listing page is empty"));
        }
        let base = Url::parse(&response.url)?;
        let document = Html::parse_document(&response.body);
        let items = listing_items(&document, &base, &self.link_selectors, &self.filter());

        log::info!("{}: parsed {} items from {}", self.site.key, items.len(), response.url);
        Ok(items)
    }

    /// Replace each item's excerpt with the text of its own page.
    ///
    /// Failures are logged and leave the item as it was. Item order is kept.
    pub async fn enrich(&self, fetcher: &dyn PageFetcher, items: Vec<Item>) -> Vec<Item> {
        if !self.fetch_details || items.is_empty() {
            return items;
        }

        let limit = self.max_details.unwrap_or(usize::MAX);
        let total = items.len().min(limit);
        let results: Vec<(Item, bool)> = stream::iter(items.into_iter().enumerate())
            .map(|(idx, item)| async move {
                if idx >= limit {
                    return (item, true);
                }
                self.fetch_detail(fetcher, item).await
            })
            .buffered(self.concurrency)
            .collect()
            .await;

        let failures = results.iter().filter(|(_, ok)| !ok).count();
        if failures > 0 {
            log::warn!(
                "{}: {} of {} detail pages failed",
                self.site.key,
                failures,
                total
            );
        } else {
            log::debug!("{}: fetched {} detail pages", self.site.key, total);
        }

        results.into_iter().map(|(item, _)| item).collect()
    }

    async fn fetch_detail(&self, fetcher: &dyn PageFetcher, mut item: Item) -> (Item, bool) {
        match fetcher.fetch(&self.request(&item.url)).await {
            Ok(response) => {
                if let Some(text) = self.detail_excerpt(&response.body) {
                    item.set_excerpt(&text);
                }
                (item, true)
            }
            Err(error) => {
                log::warn!("{}: failed to fetch detail {}: {}", self.site.key, item.url, error);
                item.detail_failed = true;
                (item, false)
            }
        }
    }

    fn detail_excerpt(&self, body: &str) -> Option<String> {
        let document = Html::parse_document(body);
        detail_text(&document, &self.detail_selectors)
    }

    /// Wrap items into this site's snapshot.
    pub fn snapshot(
        &self,
        items: Vec<Item>,
        run_timestamp: DateTime<Utc>,
        source: CollectionSource,
    ) -> Snapshot {
        Snapshot::new(&self.site.key, run_timestamp, items)
            .with_provenance(&self.site.listing_url, &self.site.api_url)
            .with_source(source)
    }
}

// src/services/generic.rs

//! Generic URL-driven crawler for sites without a dedicated configuration.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use scraper::{ElementRef, Html};
use unicode_segmentation::UnicodeSegmentation;
use url::Url;

use crate::error::{AppError, Result};
use crate::fetch::{FetchResponse, PageFetcher};
use crate::models::{CollectionSource, Item, SiteConfig, Snapshot};
use crate::services::AdapterOptions;
use crate::services::extract::{
    all_anchors, element_text, in_page_chrome, page_title, summary_near, visible_text,
};
use crate::services::listing::ListingScraper;
use crate::utils::url::{canonicalize, same_origin, same_page};

/// Linked pages fetched per run unless the site sets its own cap.
pub const DEFAULT_MAX_DETAIL_PAGES: usize = 50;

/// Link text shorter than this is navigation noise (arrows, page numbers).
const MIN_LINK_TEXT: usize = 3;

/// Treats the start page and every same-origin link on it as items.
pub struct GenericAdapter {
    listing: ListingScraper,
}

impl GenericAdapter {
    pub fn new(site: &SiteConfig, options: &AdapterOptions) -> Result<Self> {
        Ok(Self {
            listing: ListingScraper::new(site, options)?
                .with_default_detail_cap(DEFAULT_MAX_DETAIL_PAGES),
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
        let response = fetcher
            .fetch(&self.listing.request(&self.site().listing_url))
            .await?;
        let (page, links) = self.parse_page(&response)?;
        log::info!(
            "{}: found {} same-origin links on {}",
            self.site().key,
            links.len(),
            response.url
        );

        let mut items = vec![page];
        items.extend(self.listing.enrich(fetcher, links).await);
        Ok(self
            .listing
            .snapshot(items, run_timestamp, CollectionSource::Crawl))
    }

    /// The start page as an item, plus one item per qualifying link.
    fn parse_page(&self, response: &FetchResponse) -> Result<(Item, Vec<Item>)> {
        if response.body.trim().is_empty() {
            return Err(AppError::parse(&response.url, "page is empty"));
        }

        let base = Url::parse(&response.url)?;
        let start_url = canonicalize(&base, &self.site().listing_url)
            .unwrap_or_else(|| self.site().listing_url.clone());
        let document = Html::parse_document(&response.body);

        let body_text = body(&document).map(visible_text).unwrap_or_default();
        let page = Item::new(&start_url, page_title(&document)).with_excerpt(body_text);

        let filter = self.listing.filter();
        let mut seen = HashSet::new();
        let mut links = Vec::new();
        for anchor in all_anchors(&document) {
            if in_page_chrome(anchor) {
                continue;
            }
            let Some(url) = anchor
                .value()
                .attr("href")
                .and_then(|href| canonicalize(&base, href))
            else {
                continue;
            };
            if !same_origin(&base, &url) || same_page(&url, &start_url) || !filter.accepts(&url) {
                continue;
            }

            let text = element_text(anchor);
            if text.graphemes(true).count() < MIN_LINK_TEXT || !seen.insert(url.clone()) {
                continue;
            }
            links.push(Item::new(url, text).with_summary(summary_near(anchor)));
        }

        Ok((page, links))
    }
}

fn body(document: &Html) -> Option<ElementRef<'_>> {
    document
        .root_element()
        .descendants()
        .filter_map(ElementRef::wrap)
        .find(|el| el.value().name() == "body")
}

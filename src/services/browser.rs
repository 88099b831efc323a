// src/services/browser.rs

//! Script-rendered listing pages.

use chrono::{DateTime, Utc};

use crate::error::{AppError, Result};
use crate::fetch::{FetchResponse, PageFetcher};
use crate::models::{CollectionSource, SiteConfig, Snapshot};
use crate::services::AdapterOptions;
use crate::services::listing::ListingScraper;

/// Rendered documents at or below this size are treated as shells that
/// never finished rendering.
const MIN_DOCUMENT_BYTES: usize = 500;

/// Renders the listing pages in a browser, trying each configured URL in order.
pub struct BrowserAdapter {
    listing: ListingScraper,
}

impl BrowserAdapter {
    pub fn new(site: &SiteConfig, options: &AdapterOptions) -> Result<Self> {
        Ok(Self {
            listing: ListingScraper::new(site, options)?,
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
        let response = self.render_listing(fetcher).await?;
        let items = self.listing.parse_listing(&response)?;
        let items = self.listing.enrich(fetcher, items).await;
        Ok(self
            .listing
            .snapshot(items, run_timestamp, CollectionSource::Rendered))
    }

    /// First rendered document larger than [`MIN_DOCUMENT_BYTES`], else the
    /// last one that loaded at all.
    async fn render_listing(&self, fetcher: &dyn PageFetcher) -> Result<FetchResponse> {
        let site = self.site();
        let mut fallback: Option<FetchResponse> = None;
        let mut last_error = None;

        for url in site.listing_urls() {
            match fetcher.fetch(&self.listing.request(url)).await {
                Ok(response) if response.body.len() > MIN_DOCUMENT_BYTES => return Ok(response),
                Ok(response) => {
                    log::warn!(
                        "{}: {} rendered only {} bytes, trying next URL",
                        site.key,
                        url,
                        response.body.len()
                    );
                    fallback = Some(response);
                }
                Err(error) => {
                    log::warn!("{}: {} failed: {}, trying next URL", site.key, url, error);
                    last_error = Some(error);
                }
            }
        }

        match (fallback, last_error) {
            (Some(response), _) => Ok(response),
            (None, Some(error)) => Err(error.into()),
            (None, None) => Err(AppError::config(format!("site '{}' has no listing URL", site.key))),
        }
    }
}

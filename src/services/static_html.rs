// src/services/static_html.rs

//! Server-rendered listing pages.

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::fetch::PageFetcher;
use crate::models::{CollectionSource, SiteConfig, Snapshot};
use crate::services::AdapterOptions;
use crate::services::listing::ListingScraper;

/// Scrapes one listing page and optionally each item's detail page.
pub struct StaticHtmlAdapter {
    listing: ListingScraper,
}

impl StaticHtmlAdapter {
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
        let items = self
            .listing
            .fetch_listing(fetcher, &self.site().listing_url)
            .await?;
        let items = self.listing.enrich(fetcher, items).await;
        Ok(self
            .listing
            .snapshot(items, run_timestamp, CollectionSource::Listing))
    }
}

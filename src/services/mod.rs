// src/services/mod.rs

//! Site adapters.
//!
//! Each monitored site is collected by one variant of [`Adapter`], chosen
//! from its configured [`SiteKind`]:
//! - Server-rendered listing pages (`StaticHtmlAdapter`)
//! - JSON endpoint with listing-page fallback (`JsonApiAdapter`)
//! - Script-rendered listing pages (`BrowserAdapter`)
//! - Arbitrary start URLs crawled one level deep (`GenericAdapter`)

mod browser;
pub mod extract;
mod generic;
mod json_api;
mod listing;
mod static_html;

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::fetch::PageFetcher;
use crate::models::{ChangeSet, MonitorConfig, ScreenshotTarget, SiteConfig, SiteKind, Snapshot};

pub use browser::BrowserAdapter;
pub use generic::{DEFAULT_MAX_DETAIL_PAGES, GenericAdapter};
pub use json_api::{ApiFallback, JsonApiAdapter};
pub use static_html::StaticHtmlAdapter;

/// New-item pages listed as screenshot targets per site.
pub const MAX_SCREENSHOT_ITEMS: usize = 9;

/// Run-wide defaults applied to every adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdapterOptions {
    /// Used for sites that do not set `fetch_details`
    pub fetch_details: bool,
    /// Concurrent detail-page fetches within one site
    pub max_concurrent_details: usize,
}

impl AdapterOptions {
    pub fn from_config(config: &MonitorConfig) -> Self {
        Self {
            fetch_details: config.run.fetch_details,
            max_concurrent_details: config.fetch.max_concurrent_details,
        }
    }
}

impl Default for AdapterOptions {
    fn default() -> Self {
        Self {
            fetch_details: true,
            max_concurrent_details: 4,
        }
    }
}

/// A configured site, ready to collect.
pub enum Adapter {
    StaticHtml(StaticHtmlAdapter),
    JsonApi(JsonApiAdapter),
    Browser(BrowserAdapter),
    Generic(GenericAdapter),
}

impl Adapter {
    /// Build the variant named by the site's `kind`.
    pub fn from_config(site: &SiteConfig, options: &AdapterOptions) -> Result<Self> {
        site.validate()?;
        Ok(match site.kind {
            SiteKind::StaticHtml => Self::StaticHtml(StaticHtmlAdapter::new(site, options)?),
            SiteKind::JsonApi => Self::JsonApi(JsonApiAdapter::new(site, options)?),
            SiteKind::Browser => Self::Browser(BrowserAdapter::new(site, options)?),
            SiteKind::Generic => Self::Generic(GenericAdapter::new(site, options)?),
        })
    }

    pub fn site(&self) -> &SiteConfig {
        match self {
            Self::StaticHtml(adapter) => adapter.site(),
            Self::JsonApi(adapter) => adapter.site(),
            Self::Browser(adapter) => adapter.site(),
            Self::Generic(adapter) => adapter.site(),
        }
    }

    /// Observe the site now; zero items is a valid result.
    pub async fn collect(
        &self,
        fetcher: &dyn PageFetcher,
        run_timestamp: DateTime<Utc>,
    ) -> Result<Snapshot> {
        match self {
            Self::StaticHtml(adapter) => adapter.collect(fetcher, run_timestamp).await,
            Self::JsonApi(adapter) => adapter.collect(fetcher, run_timestamp).await,
            Self::Browser(adapter) => adapter.collect(fetcher, run_timestamp).await,
            Self::Generic(adapter) => adapter.collect(fetcher, run_timestamp).await,
        }
    }
}

/// Pages the screenshot collaborator should capture for a site.
///
/// Every listing page comes first, then up to [`MAX_SCREENSHOT_ITEMS`] new
/// items. Sites without `screenshots` get none.
pub fn screenshot_targets(site: &SiteConfig, change_set: &ChangeSet) -> Vec<ScreenshotTarget> {
    if !site.screenshots {
        return Vec::new();
    }

    let listings = site.listing_urls().enumerate().map(|(idx, url)| ScreenshotTarget {
        url: url.to_string(),
        file_name: if idx == 0 {
            "listing.png".to_string()
        } else {
            format!("listing_{idx}.png")
        },
        label: format!("{} - listing page", site.display_name()),
    });

    let new_items = change_set
        .new_items
        .iter()
        .take(MAX_SCREENSHOT_ITEMS)
        .enumerate()
        .map(|(idx, changed)| ScreenshotTarget {
            url: changed.item.url.clone(),
            file_name: format!("new_{idx}.png"),
            label: if changed.item.title.is_empty() {
                changed.item.url.clone()
            } else {
                changed.item.title.clone()
            },
        });

    listings.chain(new_items).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    use crate::fetch::fixture::FixtureFetcher;
    use crate::models::{ChangedItem, CollectionSource, Item};

    fn change_set(new: usize) -> ChangeSet {
        ChangeSet {
            site_key: "skytel".into(),
            new_items: (0..new)
                .map(|i| ChangedItem {
                    item: Item::new(format!("https://www.skytel.mn/news/{i}"), if i == 0 { "" } else { "Promo" }),
                    changed_fields: Vec::new(),
                })
                .collect(),
            ..ChangeSet::default()
        }
    }

    #[test]
    fn test_adapter_dispatch_follows_kind() {
        let options = AdapterOptions::default();
        for site in crate::models::MonitorConfig::default().sites {
            let adapter = Adapter::from_config(&site, &options).unwrap();
            let matches_kind = matches!(
                (&adapter, site.kind),
                (Adapter::StaticHtml(_), SiteKind::StaticHtml)
                    | (Adapter::JsonApi(_), SiteKind::JsonApi)
                    | (Adapter::Browser(_), SiteKind::Browser)
                    | (Adapter::Generic(_), SiteKind::Generic)
            );
            assert!(matches_kind, "wrong adapter for {}", site.key);
            assert_eq!(adapter.site().key, site.key);
        }
    }

    #[test]
    fn test_invalid_site_rejected() {
        let site = SiteConfig::new("Bad Key", SiteKind::StaticHtml, "https://example.com");
        assert!(Adapter::from_config(&site, &AdapterOptions::default()).is_err());
    }

    #[tokio::test]
    async fn test_collect_through_enum() {
        let mut site = SiteConfig::new("blog", SiteKind::StaticHtml, "https://blog.example.com/");
        site.fetch_details = Some(false);
        let adapter = Adapter::from_config(&site, &AdapterOptions::default()).unwrap();
        let fetcher = FixtureFetcher::new().page(
            "https://blog.example.com/",
            r#"<article><a href="/posts/1">Hello</a></article>"#,
        );

        let ts = Utc.with_ymd_and_hms(2026, 2, 3, 6, 0, 0).unwrap();
        let snapshot = adapter.collect(&fetcher, ts).await.unwrap();
        assert_eq!(snapshot.source, CollectionSource::Listing);
        assert_eq!(snapshot.len(), 1);
    }

    #[test]
    fn test_screenshot_targets() {
        let mut site = SiteConfig::new("skytel", SiteKind::Browser, "https://www.skytel.mn/news/archiveNew");
        site.name = "Skytel".into();
        site.alternate_urls = vec!["https://www.skytel.mn/skytel".into()];
        site.screenshots = true;

        let targets = screenshot_targets(&site, &change_set(12));
        assert_eq!(targets.len(), 2 + MAX_SCREENSHOT_ITEMS);
        assert_eq!(targets[0].file_name, "listing.png");
        assert_eq!(targets[0].label, "Skytel - listing page");
        assert_eq!(targets[1].file_name, "listing_1.png");
        assert_eq!(targets[2].file_name, "new_0.png");
        assert_eq!(targets[2].label, "https://www.skytel.mn/news/0");
        assert_eq!(targets[3].label, "Promo");
    }

    #[test]
    fn test_screenshots_disabled() {
        let site = SiteConfig::new("blog", SiteKind::StaticHtml, "https://blog.example.com/");
        assert!(screenshot_targets(&site, &change_set(3)).is_empty());
    }
}

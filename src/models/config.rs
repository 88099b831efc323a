// src/models/config.rs

//! Application configuration structures.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use regex::Regex;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{AppError, Result};
use crate::fetch::RetryPolicy;
use crate::utils::site_key_from_host;

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// HTTP client and retry settings
    #[serde(default)]
    pub fetch: FetchConfig,

    /// Headless browser settings
    #[serde(default)]
    pub browser: BrowserConfig,

    /// Run-wide scheduling settings
    #[serde(default)]
    pub run: RunConfig,

    /// Storage and output locations
    #[serde(default)]
    pub paths: PathsConfig,

    /// Monitored sites
    #[serde(default = "defaults::sites")]
    pub sites: Vec<SiteConfig>,
}

impl MonitorConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.fetch.user_agent.trim().is_empty() {
            return Err(AppError::validation("fetch.user_agent is empty"));
        }
        if self.fetch.timeout_secs == 0 {
            return Err(AppError::validation("fetch.timeout_secs must be > 0"));
        }
        if self.fetch.max_attempts == 0 {
            return Err(AppError::validation("fetch.max_attempts must be > 0"));
        }
        if self.fetch.backoff_max_secs < self.fetch.backoff_base_secs {
            return Err(AppError::validation(
                "fetch.backoff_max_secs must be >= fetch.backoff_base_secs",
            ));
        }
        if self.fetch.max_concurrent_details == 0 {
            return Err(AppError::validation(
                "fetch.max_concurrent_details must be > 0",
            ));
        }
        if self.run.max_concurrent_sites == 0 {
            return Err(AppError::validation("run.max_concurrent_sites must be > 0"));
        }
        if self.sites.is_empty() {
            return Err(AppError::validation("No sites defined"));
        }

        validate_sites(&self.sites)
    }

    /// Enabled sites, optionally restricted to the given keys.
    pub fn selected_sites(&self, only: &[String]) -> Vec<SiteConfig> {
        self.sites
            .iter()
            .filter(|site| site.enabled)
            .filter(|site| only.is_empty() || only.iter().any(|k| k.eq_ignore_ascii_case(&site.key)))
            .cloned()
            .collect()
    }
}

/// Validate each site and reject repeated keys.
///
/// Run this on the final site list, after ad-hoc sites have been added.
pub fn validate_sites(sites: &[SiteConfig]) -> Result<()> {
    let mut keys = HashSet::new();
    for site in sites {
        site.validate()?;
        if !keys.insert(site.key.as_str()) {
            return Err(AppError::validation(format!(
                "duplicate site key '{}'",
                site.key
            )));
        }
    }
    Ok(())
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            fetch: FetchConfig::default(),
            browser: BrowserConfig::default(),
            run: RunConfig::default(),
            paths: PathsConfig::default(),
            sites: defaults::sites(),
        }
    }
}

/// HTTP client and retry settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Whole-request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Connect timeout in seconds
    #[serde(default = "defaults::connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Total attempts per request, including the first
    #[serde(default = "defaults::max_attempts")]
    pub max_attempts: u32,

    /// Delay before the first retry; doubles per retry
    #[serde(default = "defaults::backoff_base")]
    pub backoff_base_secs: u64,

    /// Upper bound for a single backoff delay
    #[serde(default = "defaults::backoff_max")]
    pub backoff_max_secs: u64,

    /// Concurrent detail-page fetches within one site
    #[serde(default = "defaults::max_concurrent_details")]
    pub max_concurrent_details: usize,
}

impl FetchConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.max_attempts,
            Duration::from_secs(self.backoff_base_secs),
            Duration::from_secs(self.backoff_max_secs),
        )
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            connect_timeout_secs: defaults::connect_timeout(),
            max_attempts: defaults::max_attempts(),
            backoff_base_secs: defaults::backoff_base(),
            backoff_max_secs: defaults::backoff_max(),
            max_concurrent_details: defaults::max_concurrent_details(),
        }
    }
}

/// Headless browser settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserConfig {
    /// Allow script-executing renders at all
    #[serde(default = "defaults::enabled")]
    pub enabled: bool,

    /// Run Chrome without a window
    #[serde(default = "defaults::enabled")]
    pub headless: bool,

    /// Wait after navigation for dynamic content, in milliseconds
    #[serde(default = "defaults::settle_ms")]
    pub settle_ms: u64,

    /// Navigation and selector wait timeout in seconds
    #[serde(default = "defaults::navigation_timeout")]
    pub navigation_timeout_secs: u64,

    #[serde(default = "defaults::window_width")]
    pub window_width: u32,

    #[serde(default = "defaults::window_height")]
    pub window_height: u32,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            headless: true,
            settle_ms: defaults::settle_ms(),
            navigation_timeout_secs: defaults::navigation_timeout(),
            window_width: defaults::window_width(),
            window_height: defaults::window_height(),
        }
    }
}

/// Run-wide scheduling settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Sites processed in parallel
    #[serde(default = "defaults::max_concurrent_sites")]
    pub max_concurrent_sites: usize,

    /// Abandon unfinished sites after this many seconds (0 disables)
    #[serde(default = "defaults::run_timeout")]
    pub run_timeout_secs: u64,

    /// Default for sites that do not set `fetch_details`
    #[serde(default = "defaults::enabled")]
    pub fetch_details: bool,

    /// Replace an existing snapshot for the same site and date
    #[serde(default)]
    pub overwrite: bool,
}

impl RunConfig {
    pub fn run_timeout(&self) -> Option<Duration> {
        (self.run_timeout_secs > 0).then(|| Duration::from_secs(self.run_timeout_secs))
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            max_concurrent_sites: defaults::max_concurrent_sites(),
            run_timeout_secs: defaults::run_timeout(),
            fetch_details: true,
            overwrite: false,
        }
    }
}

/// Storage and output locations. Relative paths resolve against the base dir.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Snapshot store root
    #[serde(default = "defaults::data_dir")]
    pub data_dir: PathBuf,

    /// Run summaries are written to `{output_dir}/{run_date}/`
    #[serde(default = "defaults::output_dir")]
    pub output_dir: PathBuf,
}

impl PathsConfig {
    pub fn data_dir(&self, base: &Path) -> PathBuf {
        base.join(&self.data_dir)
    }

    pub fn output_dir(&self, base: &Path) -> PathBuf {
        base.join(&self.output_dir)
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            data_dir: defaults::data_dir(),
            output_dir: defaults::output_dir(),
        }
    }
}

/// Adapter variant used for a site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SiteKind {
    /// Server-rendered listing page
    StaticHtml,
    /// Structured endpoint with listing-page fallback
    JsonApi,
    /// Script-rendered listing page
    Browser,
    /// Arbitrary start URL, same-origin links at depth 1
    Generic,
}

/// Configuration for one monitored site.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Short identifier, also the store namespace (e.g. "nt")
    pub key: String,

    /// Human-readable name
    #[serde(default)]
    pub name: String,

    pub kind: SiteKind,

    /// Primary listing page
    pub listing_url: String,

    /// Further listing pages tried in order when the primary renders empty
    #[serde(default)]
    pub alternate_urls: Vec<String>,

    /// Structured endpoint for `json_api` sites
    #[serde(default)]
    pub api_url: String,

    /// Item URL for API records that only carry an id or slug (`{id}`)
    #[serde(default)]
    pub item_url_template: Option<String>,

    #[serde(default = "defaults::enabled")]
    pub enabled: bool,

    /// Follow each item's own URL for a fuller excerpt
    #[serde(default)]
    pub fetch_details: Option<bool>,

    /// Cap on detail pages fetched per run
    #[serde(default)]
    pub max_detail_pages: Option<usize>,

    /// List screenshot targets in the run summary
    #[serde(default)]
    pub screenshots: bool,

    /// Anchor candidates on the listing page; built-in list when empty
    #[serde(default)]
    pub link_selectors: Vec<String>,

    /// Keep only links whose URL contains one of these substrings
    #[serde(default)]
    pub include_patterns: Vec<String>,

    /// Links never treated as items (besides the listing pages)
    #[serde(default)]
    pub exclude_urls: Vec<String>,

    /// Content containers on detail pages; built-in list when empty
    #[serde(default)]
    pub detail_selectors: Vec<String>,

    /// Accept-Language header sent with every request
    #[serde(default)]
    pub accept_language: Option<String>,

    /// Element to wait for after a browser navigation
    #[serde(default)]
    pub wait_for_selector: Option<String>,

    /// Override whether pages are browser-rendered
    #[serde(default)]
    pub render: Option<bool>,
}

impl SiteConfig {
    /// Minimal configuration for a site of the given kind.
    pub fn new(key: impl Into<String>, kind: SiteKind, listing_url: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            name: String::new(),
            kind,
            listing_url: listing_url.into(),
            alternate_urls: Vec::new(),
            api_url: String::new(),
            item_url_template: None,
            enabled: true,
            fetch_details: None,
            max_detail_pages: None,
            screenshots: false,
            link_selectors: Vec::new(),
            include_patterns: Vec::new(),
            exclude_urls: Vec::new(),
            detail_selectors: Vec::new(),
            accept_language: None,
            wait_for_selector: None,
            render: None,
        }
    }

    /// Generic site for an arbitrary URL; the key is derived from the host.
    pub fn generic(url: &str, name: Option<&str>) -> Result<Self> {
        let parsed = Url::parse(url)?;
        let host = parsed
            .host_str()
            .ok_or_else(|| AppError::config(format!("URL has no host: {url}")))?;

        let mut site = Self::new(site_key_from_host(host), SiteKind::Generic, url);
        site.name = name.map_or_else(|| host.to_string(), str::to_string);
        Ok(site)
    }

    /// Name for display, falling back to the key.
    pub fn display_name(&self) -> &str {
        if self.name.trim().is_empty() {
            &self.key
        } else {
            &self.name
        }
    }

    /// Whether pages of this site are browser-rendered.
    pub fn renders(&self) -> bool {
        self.render
            .unwrap_or(matches!(self.kind, SiteKind::Browser | SiteKind::Generic))
    }

    /// Primary listing URL followed by the alternates.
    pub fn listing_urls(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.listing_url.as_str()).chain(self.alternate_urls.iter().map(String::as_str))
    }

    pub fn validate(&self) -> Result<()> {
        if !is_valid_site_key(&self.key) {
            return Err(AppError::validation(format!(
                "site key '{}' must match [a-z0-9_-]+",
                self.key
            )));
        }
        for url in self.listing_urls() {
            validate_http_url(&self.key, url)?;
        }
        if self.kind == SiteKind::JsonApi {
            if self.api_url.trim().is_empty() {
                return Err(AppError::validation(format!(
                    "site '{}': json_api sites need api_url",
                    self.key
                )));
            }
            validate_http_url(&self.key, &self.api_url)?;
        }
        for selector in self.link_selectors.iter().chain(&self.detail_selectors) {
            scraper::Selector::parse(selector)
                .map_err(|e| AppError::selector(selector.as_str(), format!("{e:?}")))?;
        }
        Ok(())
    }
}

/// Site keys name store directories, so they are restricted.
pub fn is_valid_site_key(key: &str) -> bool {
    static PATTERN: std::sync::OnceLock<Option<Regex>> = std::sync::OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^[a-z0-9_-]+$").ok())
        .as_ref()
        .is_some_and(|re| re.is_match(key))
}

fn validate_http_url(site_key: &str, url: &str) -> Result<()> {
    let parsed = Url::parse(url)
        .map_err(|e| AppError::validation(format!("site '{site_key}': bad URL '{url}': {e}")))?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(AppError::validation(format!(
            "site '{site_key}': unsupported scheme '{other}' in {url}"
        ))),
    }
}

mod defaults {
    use std::path::PathBuf;

    use super::{SiteConfig, SiteKind};

    // Fetch defaults
    pub fn user_agent() -> String {
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) \
         Chrome/124.0.0.0 Safari/537.36"
            .into()
    }
    pub fn timeout() -> u64 {
        30
    }
    pub fn connect_timeout() -> u64 {
        15
    }
    pub fn max_attempts() -> u32 {
        3
    }
    pub fn backoff_base() -> u64 {
        2
    }
    pub fn backoff_max() -> u64 {
        10
    }
    pub fn max_concurrent_details() -> usize {
        4
    }

    // Browser defaults
    pub fn enabled() -> bool {
        true
    }
    pub fn settle_ms() -> u64 {
        2000
    }
    pub fn navigation_timeout() -> u64 {
        30
    }
    pub fn window_width() -> u32 {
        1280
    }
    pub fn window_height() -> u32 {
        900
    }

    // Run defaults
    pub fn max_concurrent_sites() -> usize {
        3
    }
    pub fn run_timeout() -> u64 {
        1800
    }

    // Path defaults
    pub fn data_dir() -> PathBuf {
        PathBuf::from("data")
    }
    pub fn output_dir() -> PathBuf {
        PathBuf::from("output")
    }

    // Site defaults
    pub fn sites() -> Vec<SiteConfig> {
        let mut nt = SiteConfig::new("nt", SiteKind::StaticHtml, "https://www.ntplc.co.th/en/news");
        nt.name = "NT (National Telecom Thailand)".into();
        nt.include_patterns = vec!["/news/".into(), "/en/news".into()];
        nt.accept_language = Some("en".into());
        nt.screenshots = true;

        let mut unitel =
            SiteConfig::new("unitel", SiteKind::JsonApi, "https://www.unitel.mn/unitel/");
        unitel.name = "Unitel (Mongolia)".into();
        unitel.api_url = "https://www.unitel.mn/api.php/main/get_news/promo".into();
        unitel.item_url_template = Some("https://www.unitel.mn/unitel/news/{id}".into());
        unitel.link_selectors = vec![
            "a[href*='/news/']".into(),
            "a[href*='/promo/']".into(),
            "[class*=news] a[href]".into(),
            "[class*=promo] a[href]".into(),
            ".card a[href]".into(),
            "article a[href]".into(),
        ];
        unitel.screenshots = true;

        let mut skytel =
            SiteConfig::new("skytel", SiteKind::Browser, "https://www.skytel.mn/news/archiveNew");
        skytel.name = "Skytel (Mongolia)".into();
        skytel.alternate_urls = vec!["https://www.skytel.mn/skytel".into()];
        skytel.link_selectors = vec![
            "a[href*='/news/']".into(),
            "a[href*='/skytel/']".into(),
            "[class*=news] a[href]".into(),
            "[class*=promo] a[href]".into(),
            ".card a[href]".into(),
            "article a[href]".into(),
            "[class*=post] a[href]".into(),
            "[class*=article] a[href]".into(),
        ];
        skytel.detail_selectors = vec![
            "article".into(),
            ".content".into(),
            "[class*=detail]".into(),
            "main".into(),
            "body".into(),
        ];
        skytel.screenshots = true;

        vec![nt, unitel, skytel]
    }
}

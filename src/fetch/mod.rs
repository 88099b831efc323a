// src/fetch/mod.rs

//! Resilient page fetching.
//!
//! [`ResilientClient`] wraps a static HTTP transport and an optional
//! headless browser behind one retry policy. Adapters only ever see the
//! [`PageFetcher`] trait, so tests can substitute canned responses.

#[cfg(feature = "browser")]
mod browser;
mod http;
mod retry;

#[cfg(test)]
pub(crate) mod fixture;

use async_trait::async_trait;

use crate::error::{FetchError, Result};
use crate::models::MonitorConfig;

#[cfg(feature = "browser")]
pub use browser::BrowserRenderer;
pub use http::HttpTransport;
pub use retry::RetryPolicy;

/// Media type requested from the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Accept {
    Html,
    Json,
}

/// One page or endpoint to load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub url: String,
    /// Load in a script-executing browser instead of a plain GET
    pub render: bool,
    pub accept: Accept,
    pub accept_language: Option<String>,
    /// Element to wait for after a browser navigation
    pub wait_for_selector: Option<String>,
}

impl FetchRequest {
    /// Plain HTML page request.
    pub fn page(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            render: false,
            accept: Accept::Html,
            accept_language: None,
            wait_for_selector: None,
        }
    }

    /// JSON endpoint request.
    pub fn json(url: impl Into<String>) -> Self {
        Self {
            accept: Accept::Json,
            ..Self::page(url)
        }
    }

    pub fn rendered(mut self, render: bool) -> Self {
        self.render = render;
        self
    }

    pub fn language(mut self, language: Option<&str>) -> Self {
        self.accept_language = language.map(str::to_string);
        self
    }

    pub fn wait_for(mut self, selector: Option<&str>) -> Self {
        self.wait_for_selector = selector.map(str::to_string);
        self
    }
}

/// A successfully loaded document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResponse {
    /// Final URL after redirects
    pub url: String,
    pub status: u16,
    pub body: String,
}

/// Loads documents for site adapters.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, request: &FetchRequest) -> std::result::Result<FetchResponse, FetchError>;

    /// Whether `render = true` requests can be served.
    fn can_render(&self) -> bool {
        true
    }
}

/// HTTP transport plus optional browser under one retry policy.
#[derive(Clone)]
pub struct ResilientClient {
    http: HttpTransport,
    #[cfg(feature = "browser")]
    browser: Option<BrowserRenderer>,
    policy: RetryPolicy,
}

impl ResilientClient {
    /// Client without a browser; rendered requests fail with `Render`.
    pub fn new(http: HttpTransport, policy: RetryPolicy) -> Self {
        Self {
            http,
            #[cfg(feature = "browser")]
            browser: None,
            policy,
        }
    }

    /// Build the client described by the configuration.
    pub fn from_config(config: &MonitorConfig) -> Result<Self> {
        let http = HttpTransport::new(&config.fetch)?;
        let client = Self::new(http, config.fetch.retry_policy());

        #[cfg(feature = "browser")]
        let client = if config.browser.enabled {
            client.with_browser(BrowserRenderer::new(&config.browser, &config.fetch.user_agent))
        } else {
            client
        };

        #[cfg(not(feature = "browser"))]
        if config.browser.enabled {
            log::warn!("Browser rendering requested but the `browser` feature is disabled");
        }

        Ok(client)
    }

    #[cfg(feature = "browser")]
    pub fn with_browser(mut self, browser: BrowserRenderer) -> Self {
        self.browser = Some(browser);
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    async fn fetch_once(&self, request: &FetchRequest) -> std::result::Result<FetchResponse, FetchError> {
        if !request.render {
            return self.http.get(request).await;
        }

        #[cfg(feature = "browser")]
        if let Some(browser) = &self.browser {
            return browser.render(request).await;
        }

        Err(FetchError::render(&request.url, "no browser available"))
    }
}

#[async_trait]
impl PageFetcher for ResilientClient {
    async fn fetch(&self, request: &FetchRequest) -> std::result::Result<FetchResponse, FetchError> {
        if request.render && !self.can_render() {
            return Err(FetchError::render(&request.url, "no browser available"));
        }

        log::debug!(
            "Fetching {} ({})",
            request.url,
            if request.render { "rendered" } else { "static" }
        );
        self.policy.run(|_| self.fetch_once(request)).await
    }

    fn can_render(&self) -> bool {
        #[cfg(feature = "browser")]
        {
            self.browser.is_some()
        }
        #[cfg(not(feature = "browser"))]
        {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_builders() {
        let request = FetchRequest::json("https://example.com/api")
            .language(Some("en"))
            .rendered(false);
        assert_eq!(request.accept, Accept::Json);
        assert_eq!(request.accept_language.as_deref(), Some("en"));
        assert!(!request.render);
        assert!(request.wait_for_selector.is_none());
    }

    #[tokio::test]
    async fn test_render_without_browser_fails_fast() {
        let transport = HttpTransport::new(&crate::models::FetchConfig::default()).unwrap();
        let client = ResilientClient::new(transport, RetryPolicy::immediate(3));

        let error = client
            .fetch(&FetchRequest::page("http://127.0.0.1:9/").rendered(true))
            .await
            .unwrap_err();
        assert!(matches!(error, FetchError::Render { .. }));
        assert!(!client.can_render());
    }
}

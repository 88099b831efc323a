// src/fetch/browser.rs

//! Script-executing page loads through headless Chrome.
//!
//! The `headless_chrome` API is blocking, so every render runs on the
//! blocking thread pool. One browser process is launched lazily and shared
//! by all renders; it is relaunched after a failure.

use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use headless_chrome::{Browser, LaunchOptions, Tab};

use crate::error::FetchError;
use crate::fetch::{FetchRequest, FetchResponse};
use crate::models::BrowserConfig;

/// Keeps the shared browser alive between renders of a long run.
const IDLE_BROWSER_TIMEOUT: Duration = Duration::from_secs(600);

/// Renders pages in a shared headless Chrome instance.
#[derive(Clone)]
pub struct BrowserRenderer {
    config: BrowserConfig,
    user_agent: String,
    browser: Arc<Mutex<Option<Arc<Browser>>>>,
}

impl BrowserRenderer {
    pub fn new(config: &BrowserConfig, user_agent: &str) -> Self {
        Self {
            config: config.clone(),
            user_agent: user_agent.to_string(),
            browser: Arc::new(Mutex::new(None)),
        }
    }

    /// Load the page, wait for it to settle and return the rendered DOM.
    pub async fn render(&self, request: &FetchRequest) -> Result<FetchResponse, FetchError> {
        let renderer = self.clone();
        let owned = request.clone();
        tokio::task::spawn_blocking(move || renderer.render_blocking(&owned))
            .await
            .map_err(|e| FetchError::render(&request.url, e))?
    }

    fn render_blocking(&self, request: &FetchRequest) -> Result<FetchResponse, FetchError> {
        let browser = self.browser(&request.url)?;
        let tab = match browser.new_tab() {
            Ok(tab) => tab,
            Err(e) => {
                self.discard_browser();
                return Err(FetchError::render(&request.url, e));
            }
        };

        let outcome = self.load(&tab, request);
        if let Err(e) = tab.close(true) {
            log::debug!("Failed to close tab for {}: {}", request.url, e);
        }
        outcome
    }

    fn load(&self, tab: &Tab, request: &FetchRequest) -> Result<FetchResponse, FetchError> {
        let url = request.url.as_str();
        let navigation_timeout = Duration::from_secs(self.config.navigation_timeout_secs);
        tab.set_default_timeout(navigation_timeout);

        tab.set_user_agent(&self.user_agent, request.accept_language.as_deref(), None)
            .map_err(|e| FetchError::render(url, e))?;
        tab.navigate_to(url).map_err(|e| FetchError::render(url, e))?;
        tab.wait_until_navigated().map_err(|e| {
            if e.to_string().to_lowercase().contains("timeout") {
                FetchError::Timeout { url: url.to_string() }
            } else {
                FetchError::render(url, e)
            }
        })?;

        if let Some(selector) = &request.wait_for_selector {
            if let Err(e) = tab.wait_for_element_with_custom_timeout(selector, navigation_timeout) {
                log::debug!("'{}' never appeared on {}: {}", selector, url, e);
            }
        }

        // Bounded settle time for late client-side rendering
        thread::sleep(Duration::from_millis(self.config.settle_ms));

        let html = tab.get_content().map_err(|e| FetchError::render(url, e))?;
        if html.trim().is_empty() {
            return Err(FetchError::render(url, "rendered document is empty"));
        }

        Ok(FetchResponse {
            url: tab.get_url(),
            status: 200,
            body: html,
        })
    }

    fn browser(&self, url: &str) -> Result<Arc<Browser>, FetchError> {
        let mut slot = self
            .browser
            .lock()
            .map_err(|_| FetchError::render(url, "browser lock poisoned"))?;

        if let Some(browser) = slot.as_ref() {
            return Ok(Arc::clone(browser));
        }

        log::info!("Launching headless Chrome (headless: {})", self.config.headless);
        let options = LaunchOptions::default_builder()
            .headless(self.config.headless)
            .window_size(Some((self.config.window_width, self.config.window_height)))
            .idle_browser_timeout(IDLE_BROWSER_TIMEOUT)
            .build()
            .map_err(|e| FetchError::render(url, format!("invalid launch options: {e}")))?;
        let browser = Arc::new(Browser::new(options).map_err(|e| FetchError::render(url, e))?);

        *slot = Some(Arc::clone(&browser));
        Ok(browser)
    }

    fn discard_browser(&self) {
        if let Ok(mut slot) = self.browser.lock() {
            *slot = None;
        }
    }
}

// src/fetch/fixture.rs

//! Canned-response fetcher for tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::FetchError;
use crate::fetch::{FetchRequest, FetchResponse, PageFetcher};

#[derive(Debug, Clone)]
enum Route {
    Page(String),
    Status(u16),
    Error(FetchError),
    /// Never completes within any realistic test deadline
    Hang,
}

/// Serves fixed bodies or failures by URL and records every request.
///
/// Unknown URLs answer with HTTP 404.
#[derive(Debug, Default)]
pub struct FixtureFetcher {
    routes: HashMap<String, Route>,
    requests: Mutex<Vec<FetchRequest>>,
    no_render: bool,
}

impl FixtureFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, url: &str, body: impl Into<String>) -> Self {
        self.routes.insert(url.to_string(), Route::Page(body.into()));
        self
    }

    pub fn status(mut self, url: &str, status: u16) -> Self {
        self.routes.insert(url.to_string(), Route::Status(status));
        self
    }

    pub fn error(mut self, url: &str, error: FetchError) -> Self {
        self.routes.insert(url.to_string(), Route::Error(error));
        self
    }

    pub fn hang(mut self, url: &str) -> Self {
        self.routes.insert(url.to_string(), Route::Hang);
        self
    }

    /// Refuse rendered requests, like a client built without a browser.
    pub fn without_browser(mut self) -> Self {
        self.no_render = true;
        self
    }

    pub fn requests(&self) -> Vec<FetchRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    pub fn requested_urls(&self) -> Vec<String> {
        self.requests().into_iter().map(|r| r.url).collect()
    }

    pub fn request_count(&self, url: &str) -> usize {
        self.requests().iter().filter(|r| r.url == url).count()
    }
}

#[async_trait]
impl PageFetcher for FixtureFetcher {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, FetchError> {
        if let Ok(mut log) = self.requests.lock() {
            log.push(request.clone());
        }
        if request.render && self.no_render {
            return Err(FetchError::render(&request.url, "no browser available"));
        }

        match self.routes.get(&request.url).cloned() {
            Some(Route::Page(body)) => Ok(FetchResponse {
                url: request.url.clone(),
                status: 200,
                body,
            }),
            Some(Route::Status(status)) => Err(FetchError::HttpStatus {
                url: request.url.clone(),
                status,
            }),
            Some(Route::Error(error)) => Err(error),
            Some(Route::Hang) => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err(FetchError::Timeout {
                    url: request.url.clone(),
                })
            }
            None => Err(FetchError::HttpStatus {
                url: request.url.clone(),
                status: 404,
            }),
        }
    }

    fn can_render(&self) -> bool {
        !self.no_render
    }
}

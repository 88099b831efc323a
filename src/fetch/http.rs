// src/fetch/http.rs

//! Static HTTP transport.

use std::time::Duration;

use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE};

use crate::error::{AppError, FetchError, Result};
use crate::fetch::{Accept, FetchRequest, FetchResponse};
use crate::models::FetchConfig;

/// Single-attempt HTTP GET on a shared connection pool.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Create a configured asynchronous HTTP client.
    pub fn new(config: &FetchConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()
            .map_err(|e| AppError::config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }

    /// Fetch a page once; non-2xx statuses become `HttpStatus` errors.
    pub async fn get(&self, request: &FetchRequest) -> std::result::Result<FetchResponse, FetchError> {
        let mut builder = self
            .client
            .get(&request.url)
            .header(ACCEPT, request.accept.header_value());
        if let Some(language) = &request.accept_language {
            builder = builder.header(ACCEPT_LANGUAGE, language);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| classify(&request.url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus {
                url: request.url.clone(),
                status: status.as_u16(),
            });
        }

        let final_url = response.url().to_string();
        let body = response
            .text()
            .await
            .map_err(|e| classify(&request.url, e))?;

        Ok(FetchResponse {
            url: final_url,
            status: status.as_u16(),
            body,
        })
    }
}

impl Accept {
    fn header_value(self) -> &'static str {
        match self {
            Accept::Html => "text/html,application/xhtml+xml;q=0.9,*/*;q=0.8",
            Accept::Json => "application/json,text/plain;q=0.9,*/*;q=0.8",
        }
    }
}

fn classify(url: &str, error: reqwest::Error) -> FetchError {
    if error.is_timeout() {
        FetchError::Timeout { url: url.to_string() }
    } else if let Some(status) = error.status() {
        FetchError::HttpStatus {
            url: url.to_string(),
            status: status.as_u16(),
        }
    } else {
        FetchError::network(url, error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    use crate::fetch::{PageFetcher, ResilientClient, RetryPolicy};

    /// Serve the same raw response to every connection, counting requests.
    async fn stub_server(status_line: &'static str, body: &'static str) -> (String, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);

        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    break;
                };
                counter.fetch_add(1, Ordering::SeqCst);
                let mut buf = [0u8; 4096];
                let _ = socket.read(&mut buf).await;
                let response = format!(
                    "HTTP/1.1 {status_line}\r\nContent-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });

        (format!("http://{addr}/news"), hits)
    }

    fn client(attempts: u32) -> ResilientClient {
        let transport = HttpTransport::new(&FetchConfig::default()).unwrap();
        ResilientClient::new(transport, RetryPolicy::immediate(attempts))
    }

    #[tokio::test]
    async fn test_success_returns_body() {
        let (url, hits) = stub_server("200 OK", "<html><body>hi</body></html>").await;
        let response = client(3).fetch(&FetchRequest::page(&url)).await.unwrap();

        assert_eq!(response.status, 200);
        assert!(response.body.contains("hi"));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_server_error_retried_to_limit() {
        let (url, hits) = stub_server("503 Service Unavailable", "").await;
        let error = client(3).fetch(&FetchRequest::page(&url)).await.unwrap_err();

        assert_eq!(error, FetchError::HttpStatus { url, status: 503 });
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_not_found_fails_immediately() {
        let (url, hits) = stub_server("404 Not Found", "").await;
        let error = client(3).fetch(&FetchRequest::page(&url)).await.unwrap_err();

        assert!(!error.is_transient());
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_connection_refused_is_network_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let error = client(2)
            .fetch(&FetchRequest::page(&format!("http://{addr}/")))
            .await
            .unwrap_err();
        assert!(matches!(error, FetchError::Network { .. }));
    }
}

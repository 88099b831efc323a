// src/error.rs

//! Unified error handling for the monitor.
//!
//! Network-level failures live in [`FetchError`] so the retry layer can
//! classify them; everything else is an [`AppError`]. The orchestrator turns
//! both into a serializable [`FailureKind`] when a site fails.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for monitor operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Failure of a single fetch (HTTP request or browser render).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// Connection refused, reset, DNS failure, broken body stream
    #[error("network error for {url}: {message}")]
    Network { url: String, message: String },

    /// Request or navigation exceeded its deadline
    #[error("timed out fetching {url}")]
    Timeout { url: String },

    /// Server answered with a non-success status
    #[error("HTTP {status} from {url}")]
    HttpStatus { url: String, status: u16 },

    /// Browser launch, navigation or script evaluation failed
    #[error("render failed for {url}: {message}")]
    Render { url: String, message: String },
}

impl FetchError {
    pub fn network(url: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Network {
            url: url.into(),
            message: message.to_string(),
        }
    }

    pub fn render(url: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Render {
            url: url.into(),
            message: message.to_string(),
        }
    }

    /// Whether another attempt may succeed.
    ///
    /// Client errors are final, except request-timeout and rate-limit codes.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Network { .. } | Self::Timeout { .. } | Self::Render { .. } => true,
            Self::HttpStatus { status, .. } => {
                *status >= 500 || *status == 408 || *status == 429
            }
        }
    }

    /// The URL this failure refers to.
    pub fn url(&self) -> &str {
        match self {
            Self::Network { url, .. }
            | Self::Timeout { url }
            | Self::HttpStatus { url, .. }
            | Self::Render { url, .. } => url,
        }
    }
}

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// Fetch failed after retries were exhausted
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// Page or payload structure was not what the adapter expects
    #[error("Parse error for {context}: {message}")]
    Parse { context: String, message: String },

    /// A snapshot already exists for this key and overwrite was not requested
    #[error("Snapshot for '{site_key}' on {run_date} already exists")]
    StoreConflict { site_key: String, run_date: NaiveDate },

    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// CSS selector parsing failed
    #[error("Invalid selector '{selector}': {message}")]
    Selector { selector: String, message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),
}

impl AppError {
    /// Create a selector parsing error.
    pub fn selector(selector: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Selector {
            selector: selector.into(),
            message: message.to_string(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a parse error with context.
    pub fn parse(context: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Parse {
            context: context.into(),
            message: message.to_string(),
        }
    }

    /// Classify this error for the run summary.
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Fetch(FetchError::Network { .. }) => FailureKind::Network,
            Self::Fetch(FetchError::Timeout { .. }) => FailureKind::Timeout,
            Self::Fetch(FetchError::HttpStatus { .. }) => FailureKind::HttpStatus,
            Self::Fetch(FetchError::Render { .. }) => FailureKind::Render,
            Self::Parse { .. } | Self::Url(_) => FailureKind::Parse,
            Self::StoreConflict { .. } => FailureKind::StoreConflict,
            Self::Io(_) | Self::Json(_) => FailureKind::Storage,
            Self::Toml(_) | Self::Selector { .. } | Self::Config(_) | Self::Validation(_) => {
                FailureKind::Config
            }
        }
    }

    /// HTTP status code, when the failure carries one.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Fetch(FetchError::HttpStatus { status, .. }) => Some(*status),
            _ => None,
        }
    }
}

/// Serializable failure classification reported per site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Network,
    Timeout,
    HttpStatus,
    Render,
    Parse,
    StoreConflict,
    Config,
    Storage,
    /// Abandoned by the run deadline or an external shutdown
    Cancelled,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Network => "network",
            Self::Timeout => "timeout",
            Self::HttpStatus => "http_status",
            Self::Render => "render",
            Self::Parse => "parse",
            Self::StoreConflict => "store_conflict",
            Self::Config => "config",
            Self::Storage => "storage",
            Self::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

//! Error taxonomy for the refresh pipeline
//!
//! Per-page and per-record errors are absorbed by the pipeline and only show
//! up as counters in the refresh report. `RefreshError` is the only type that
//! reaches callers of the service.

use std::time::Duration;
use thiserror::Error;

/// Failure while fetching a single listing or detail page
#[derive(Error, Debug, Clone)]
pub enum FetchError {
    #[error("HTTP request failed for {url}: {message}")]
    Network { url: String, message: String },

    #[error("Request timed out after {timeout:?}: {url}")]
    Timeout { url: String, timeout: Duration },

    #[error("HTTP error {status}: {url}")]
    Status { status: u16, url: String },

    #[error("Empty response body from {url}")]
    EmptyBody { url: String },

    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
}

impl FetchError {
    pub fn network(url: &str, err: impl std::fmt::Display) -> Self {
        Self::Network {
            url: url.to_string(),
            message: err.to_string(),
        }
    }

    /// Map a reqwest error onto the taxonomy, keeping timeouts distinct
    pub fn from_reqwest(url: &str, err: &reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            Self::Timeout {
                url: url.to_string(),
                timeout,
            }
        } else {
            Self::network(url, err)
        }
    }

    /// Server-side and timeout failures may succeed on a later attempt
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Network { .. } | Self::Timeout { .. } | Self::EmptyBody { .. } => true,
            Self::Status { status, .. } => *status >= 500 || *status == 429,
            Self::InvalidUrl { .. } => false,
        }
    }
}

/// A raw record field that failed normalization
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Title is empty")]
    EmptyTitle,

    #[error("Category is empty")]
    EmptyCategory,

    #[error("Price is missing")]
    MissingPrice,

    #[error("Unparsable price: '{0}'")]
    UnparsablePrice(String),

    #[error("Negative price: '{0}'")]
    NegativePrice(String),

    #[error("Unrecognized rating: '{0}'")]
    UnrecognizedRating(String),
}

impl ValidationError {
    /// Name of the field that caused the rejection, for diagnostics
    pub fn field(&self) -> &'static str {
        match self {
            Self::EmptyTitle => "title",
            Self::EmptyCategory => "category",
            Self::MissingPrice | Self::UnparsablePrice(_) | Self::NegativePrice(_) => "price",
            Self::UnrecognizedRating(_) => "rating",
        }
    }
}

/// Refresh-level failure surfaced to the caller
#[derive(Error, Debug, Clone)]
pub enum RefreshError {
    #[error("Refresh already in progress")]
    InProgress,

    #[error("First listing page could not be fetched: {0}")]
    FirstPageFailed(FetchError),

    #[error("Refresh exceeded the {0:?} time limit")]
    TimedOut(Duration),

    #[error("Refresh setup failed: {0}")]
    Setup(String),
}

impl RefreshError {
    /// A conflicting or timed-out refresh can simply be requested again
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::InProgress | Self::TimedOut(_) => true,
            Self::FirstPageFailed(e) => e.is_recoverable(),
            Self::Setup(_) => false,
        }
    }
}

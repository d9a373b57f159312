//! HTTP client for polite scraping
//!
//! Wraps reqwest with a process-wide request rate ceiling, a small random
//! delay before each request and an optional retry budget for recoverable
//! failures.

use std::num::NonZeroU32;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use governor::{
    Quota, RateLimiter,
    clock::DefaultClock,
    state::{InMemoryState, direct::NotKeyed},
};
use reqwest::{
    Client,
    header::{HeaderMap, HeaderValue, USER_AGENT},
};
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::error::FetchError;
use crate::infrastructure::config::FetchConfig;

/// Anything that can turn a URL into page text.
///
/// The refresh pipeline only talks to this trait, so tests can serve pages
/// from memory.
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn fetch_page(&self, url: &str) -> Result<String, FetchError>;
}

/// HTTP client configuration
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    pub user_agent: String,
    pub timeout: Duration,
    pub max_requests_per_second: u32,
    pub max_retries: u32,
    pub jitter_ms: u64,
    pub follow_redirects: bool,
}

impl HttpClientConfig {
    pub fn from_fetch_config(fetch: &FetchConfig) -> Self {
        Self {
            user_agent: fetch.user_agent.clone(),
            timeout: fetch.request_timeout(),
            max_requests_per_second: fetch.max_requests_per_second,
            max_retries: fetch.max_retries,
            jitter_ms: fetch.request_jitter_ms,
            follow_redirects: fetch.follow_redirects,
        }
    }
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self::from_fetch_config(&FetchConfig::default())
    }
}

/// HTTP client with rate limiting
pub struct HttpClient {
    client: Client,
    rate_limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,
    config: HttpClientConfig,
}

impl HttpClient {
    pub fn new(config: HttpClientConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&config.user_agent).context("Invalid user agent")?,
        );

        let client = Client::builder()
            .timeout(config.timeout)
            .default_headers(headers)
            .gzip(true)
            .brotli(true)
            .redirect(if config.follow_redirects {
                reqwest::redirect::Policy::limited(10)
            } else {
                reqwest::redirect::Policy::none()
            })
            .build()
            .context("Failed to create HTTP client")?;

        let quota = Quota::per_second(
            NonZeroU32::new(config.max_requests_per_second)
                .context("Rate limit must be greater than 0")?,
        );

        Ok(Self {
            client,
            rate_limiter: RateLimiter::direct(quota),
            config,
        })
    }

    pub fn from_fetch_config(fetch: &FetchConfig) -> Result<Self> {
        Self::new(HttpClientConfig::from_fetch_config(fetch))
    }

    pub fn config(&self) -> &HttpClientConfig {
        &self.config
    }

    async fn wait_turn(&self) {
        self.rate_limiter.until_ready().await;
        if self.config.jitter_ms > 0 {
            let jitter = fastrand::u64(0..=self.config.jitter_ms);
            sleep(Duration::from_millis(jitter)).await;
        }
    }

    /// Single GET attempt
    async fn fetch_once(&self, url: &str) -> Result<String, FetchError> {
        self.wait_turn().await;
        debug!("HTTP GET {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(url, &e, self.config.timeout))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| FetchError::from_reqwest(url, &e, self.config.timeout))?;

        if body.trim().is_empty() {
            return Err(FetchError::EmptyBody {
                url: url.to_string(),
            });
        }

        Ok(body)
    }
}

/// Exponential backoff starting at 500 ms; saturates instead of overflowing
fn retry_delay(attempt: u32) -> Duration {
    let factor = 2_u64.saturating_pow(attempt.saturating_sub(1));
    Duration::from_millis(factor.saturating_mul(500))
}

#[async_trait]
impl PageSource for HttpClient {
    async fn fetch_page(&self, url: &str) -> Result<String, FetchError> {
        reqwest::Url::parse(url).map_err(|e| FetchError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        let mut attempt = 0;
        loop {
            match self.fetch_once(url).await {
                Ok(body) => return Ok(body),
                Err(e) if e.is_recoverable() && attempt < self.config.max_retries => {
                    attempt += 1;
                    let delay = retry_delay(attempt);
                    warn!("Attempt {} failed for {}: {}; retrying in {:?}", attempt, url, e, delay);
                    sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

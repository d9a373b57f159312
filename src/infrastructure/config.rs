//! Configuration infrastructure
//!
//! Settings are grouped by concern:
//! 1. Scraper settings (which site, how many pages, detail enrichment)
//! 2. Fetch settings (timeouts, concurrency, politeness)
//! 3. Logging settings
//!
//! `ConfigManager` keeps a JSON file in the user config directory;
//! `AppConfig::from_file` layers a config file and `BOOKCAT__*` environment
//! variables for deployments.

#![allow(clippy::uninlined_format_args)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::fs;
use tracing::{info, warn};

use crate::infrastructure::parsing::ParsingConfig;

/// Complete application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub scraper: ScraperConfig,
    pub fetch: FetchConfig,
    pub parsing: ParsingConfig,
    pub logging: LoggingConfig,
}

/// What to scrape
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScraperConfig {
    /// Site root, e.g. `http://books.toscrape.com`
    pub base_url: String,

    /// Listing page URL with `{base}` and `{page}` placeholders
    pub page_url_template: String,

    /// Upper bound on listing pages fetched per refresh
    pub max_pages: u32,

    /// Fetch each book's detail page to resolve category, description and UPC
    pub resolve_details: bool,
}

/// How to fetch
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Per-request timeout in seconds
    pub request_timeout_seconds: u64,

    /// Wall-clock ceiling for a whole refresh in seconds
    pub refresh_timeout_seconds: u64,

    /// Listing pages fetched concurrently after the first
    pub list_page_max_concurrent: usize,

    /// Detail pages fetched concurrently during enrichment
    pub detail_max_concurrent: usize,

    /// Global request rate ceiling
    pub max_requests_per_second: u32,

    /// Retries per page; the demo site is static so the default is none
    pub max_retries: u32,

    /// Random extra delay (0..=n ms) before each request
    pub request_jitter_ms: u64,

    pub user_agent: String,

    pub follow_redirects: bool,
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "error", "warn", "info", "debug", "trace"
    pub level: String,

    /// Enable JSON formatted logs
    pub json_format: bool,

    /// Enable console output
    pub console_output: bool,

    /// Enable file output
    pub file_output: bool,

    /// Log file name inside the log directory
    pub file_name: String,

    /// Module-specific log level filters (e.g., "reqwest": "warn")
    pub module_filters: HashMap<String, String>,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            base_url: books_to_scrape::BASE_URL.to_string(),
            page_url_template: books_to_scrape::PAGE_URL_TEMPLATE.to_string(),
            max_pages: defaults::MAX_PAGES,
            resolve_details: defaults::RESOLVE_DETAILS,
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            request_timeout_seconds: defaults::REQUEST_TIMEOUT_SECONDS,
            refresh_timeout_seconds: defaults::REFRESH_TIMEOUT_SECONDS,
            list_page_max_concurrent: defaults::LIST_PAGE_MAX_CONCURRENT,
            detail_max_concurrent: defaults::DETAIL_MAX_CONCURRENT,
            max_requests_per_second: defaults::MAX_REQUESTS_PER_SECOND,
            max_retries: defaults::MAX_RETRIES,
            request_jitter_ms: defaults::REQUEST_JITTER_MS,
            user_agent: defaults::USER_AGENT.to_string(),
            follow_redirects: true,
        }
    }
}

impl FetchConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    pub fn refresh_timeout(&self) -> Duration {
        Duration::from_secs(self.refresh_timeout_seconds)
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::LOG_LEVEL.to_string(),
            json_format: defaults::LOG_JSON_FORMAT,
            console_output: defaults::LOG_CONSOLE_OUTPUT,
            file_output: defaults::LOG_FILE_OUTPUT,
            file_name: defaults::LOG_FILE_NAME.to_string(),
            module_filters: {
                let mut filters = HashMap::new();
                filters.insert("reqwest".to_string(), "warn".to_string());
                filters.insert("hyper".to_string(), "warn".to_string());
                filters.insert("html5ever".to_string(), "error".to_string());
                filters.insert("selectors".to_string(), "warn".to_string());
                filters
            },
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] ::config::ConfigError),

    #[error("Invalid configuration: {message}")]
    Validation { message: String },
}

impl AppConfig {
    /// Load from a config file (any format the `config` crate knows) with
    /// `BOOKCAT__SECTION__KEY` environment overrides
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let settings = ::config::Config::builder()
            .add_source(::config::File::with_name(path))
            .add_source(
                ::config::Environment::with_prefix("BOOKCAT")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Self = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |message: &str| -> Result<(), ConfigError> {
            Err(ConfigError::Validation {
                message: message.to_string(),
            })
        };

        if url::Url::parse(&self.scraper.base_url).is_err() {
            return invalid("scraper.base_url must be an absolute URL");
        }
        if !self.scraper.page_url_template.contains("{page}") {
            return invalid("scraper.page_url_template must contain {page}");
        }
        if self.scraper.max_pages == 0 {
            return invalid("scraper.max_pages must be greater than 0");
        }
        if self.fetch.request_timeout_seconds == 0 || self.fetch.refresh_timeout_seconds == 0 {
            return invalid("fetch timeouts must be greater than 0");
        }
        if self.fetch.list_page_max_concurrent == 0 || self.fetch.detail_max_concurrent == 0 {
            return invalid("fetch concurrency limits must be greater than 0");
        }
        if self.fetch.max_requests_per_second == 0 {
            return invalid("fetch.max_requests_per_second must be greater than 0");
        }
        if self.fetch.max_retries > defaults::MAX_RETRIES_LIMIT {
            return invalid("fetch.max_retries must be at most 10");
        }
        Ok(())
    }
}

/// Configuration manager for loading and saving settings
pub struct ConfigManager {
    pub config_path: PathBuf,
}

impl ConfigManager {
    /// Get the application configuration directory
    pub fn get_config_dir() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get user config directory")?
            .join("book-catalog");

        Ok(config_dir)
    }

    /// Manager for the default config file location
    pub fn new() -> Result<Self> {
        let config_path = Self::get_config_dir()?.join("book_catalog_config.json");
        Ok(Self { config_path })
    }

    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: path.into(),
        }
    }

    /// Load configuration from file, creating default if it doesn't exist
    pub async fn load_config(&self) -> Result<AppConfig> {
        if !self.config_path.exists() {
            info!("Configuration file not found, creating default: {:?}", self.config_path);
            let default_config = AppConfig::default();
            self.save_config(&default_config).await?;
            return Ok(default_config);
        }

        let content = fs::read_to_string(&self.config_path)
            .await
            .context("Failed to read configuration file")?;

        match serde_json::from_str::<AppConfig>(&content) {
            Ok(config) => {
                if let Err(e) = config.validate() {
                    warn!("Configuration rejected ({}), using defaults for this run", e);
                    return Ok(AppConfig::default());
                }
                info!("Loaded configuration from: {:?}", self.config_path);
                Ok(config)
            }
            Err(parse_error) => {
                warn!("Configuration file is unreadable: {}", parse_error);

                let backup_path = self.config_path.with_extension("json.corrupted");
                if let Err(e) = fs::copy(&self.config_path, &backup_path).await {
                    warn!("Failed to create backup of corrupted config: {}", e);
                } else {
                    info!("Backed up corrupted config to: {:?}", backup_path);
                }

                let default_config = AppConfig::default();
                self.save_config(&default_config)
                    .await
                    .context("Failed to save default configuration")?;
                info!("Reset to default configuration");
                Ok(default_config)
            }
        }
    }

    /// Save configuration to file
    pub async fn save_config(&self, config: &AppConfig) -> Result<()> {
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)
                .await
                .context("Failed to create config directory")?;
        }

        let content =
            serde_json::to_string_pretty(config).context("Failed to serialize configuration")?;

        fs::write(&self.config_path, content)
            .await
            .context("Failed to write configuration file")?;

        info!("Saved configuration to: {:?}", self.config_path);
        Ok(())
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }
}

/// books.toscrape.com URLs
pub mod books_to_scrape {
    /// Site root
    pub const BASE_URL: &str = "http://books.toscrape.com";

    /// Listing pages; page 1 is also reachable under this pattern
    pub const PAGE_URL_TEMPLATE: &str = "{base}/catalogue/page-{page}.html";
}

/// Default configuration values
pub mod defaults {
    /// Listing pages fetched per refresh
    pub const MAX_PAGES: u32 = 5;

    pub const RESOLVE_DETAILS: bool = false;

    pub const REQUEST_TIMEOUT_SECONDS: u64 = 10;

    pub const REFRESH_TIMEOUT_SECONDS: u64 = 120;

    pub const LIST_PAGE_MAX_CONCURRENT: usize = 4;

    pub const DETAIL_MAX_CONCURRENT: usize = 8;

    pub const MAX_REQUESTS_PER_SECOND: u32 = 5;

    pub const MAX_RETRIES: u32 = 0;

    /// Upper bound accepted for `fetch.max_retries`
    pub const MAX_RETRIES_LIMIT: u32 = 10;

    pub const REQUEST_JITTER_MS: u64 = 200;

    pub const USER_AGENT: &str = "book-catalog/0.1 (+educational scraper)";

    pub const LOG_LEVEL: &str = "info";

    pub const LOG_JSON_FORMAT: bool = false;

    pub const LOG_CONSOLE_OUTPUT: bool = true;

    pub const LOG_FILE_OUTPUT: bool = false;

    pub const LOG_FILE_NAME: &str = "book-catalog.log";
}

/// URL building helpers
pub mod utils {
    /// Build the listing URL for a 1-based page number
    pub fn listing_page_url(base_url: &str, template: &str, page: u32) -> String {
        template
            .replace("{base}", base_url.trim_end_matches('/'))
            .replace("{page}", &page.to_string())
    }
}

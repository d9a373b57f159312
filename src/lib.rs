//! Book Catalog - scrape, normalize and search a book listing site
//!
//! A refresh walks the site's listing pages, turns each listing block into a
//! validated [`domain::BookRecord`] and swaps the result into an in-memory
//! catalog. Searches filter the current snapshot and summarize the matches.
//!
//! The presentation layer talks to [`application::CatalogService`] only.

pub mod application;
pub mod domain;
pub mod error;
pub mod infrastructure;

pub use application::{CatalogService, CatalogStats, RefreshResult, SearchResult};
pub use domain::{BookRecord, QuerySpec, SummaryMetrics};
pub use error::{FetchError, RefreshError, ValidationError};

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::infrastructure::config::{AppConfig, ConfigManager};
use crate::infrastructure::logging;

/// Environment variable naming an explicit config file
pub const CONFIG_FILE_ENV: &str = "BOOKCAT_CONFIG";

/// Load configuration from `config_file` when given (TOML, YAML or JSON,
/// with `BOOKCAT__SECTION__KEY` overrides), otherwise from the JSON file
/// in the user config directory, which is created with defaults if missing
pub async fn load_config(config_file: Option<&str>) -> Result<AppConfig> {
    match config_file {
        Some(path) => AppConfig::from_file(path)
            .with_context(|| format!("Failed to load configuration from {}", path)),
        None => {
            let config_manager = ConfigManager::new().context("Failed to locate config directory")?;
            config_manager
                .load_config()
                .await
                .context("Failed to load configuration")
        }
    }
}

/// Load configuration, initialize logging and run one refresh,
/// then log what the catalog holds.
///
/// Set `BOOKCAT_CONFIG` to read a specific config file instead of the
/// one in the user config directory.
pub async fn run() -> Result<()> {
    let config_file = std::env::var(CONFIG_FILE_ENV).ok();
    let config = load_config(config_file.as_deref()).await?;

    logging::init_logging_with_config(&config.logging).context("Failed to initialize logging")?;
    logging::log_system_info();
    match &config_file {
        Some(path) => info!("Using configuration file {}", path),
        None => info!("Using configuration from the user config directory"),
    }

    let service = CatalogService::from_config(&config).context("Failed to build catalog service")?;
    let result = service.trigger_refresh().await?;

    if result.failed {
        warn!(
            "Refresh failed: {}",
            result.error.as_deref().unwrap_or("unknown error")
        );
        return Ok(());
    }

    let stats = service.stats();
    info!(
        "Catalog holds {} books, average price {:.2}, average rating {:.2}",
        stats.metrics.count, stats.metrics.avg_price, stats.metrics.avg_rating
    );
    for entry in &stats.metrics.categories {
        info!("  {:<24} {}", entry.category, entry.count);
    }

    let categories: Vec<_> = service.list_categories().into_iter().collect();
    info!("Categories: {}", categories.join(", "));

    Ok(())
}

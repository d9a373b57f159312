//! Data transfer objects handed to the presentation layer

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{BookRecord, SummaryMetrics};

/// Completion report for one refresh
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RefreshResult {
    /// Correlates log lines of one refresh
    pub refresh_id: String,
    pub pages_fetched: usize,
    pub pages_failed: usize,
    pub records_accepted: usize,
    /// Listings dropped by the extractor or the normalizer
    pub records_rejected: usize,
    /// Share of `records_rejected` dropped for a missing title or price
    pub blocks_skipped: usize,
    /// Detail lookups that failed (only with detail enrichment on)
    pub details_failed: usize,
    /// True when the catalog was left untouched
    pub failed: bool,
    pub error: Option<String>,
    pub duration_ms: u64,
}

/// Matching records plus metrics over exactly those records
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub records: Vec<BookRecord>,
    pub metrics: SummaryMetrics,
}

/// Catalog status for dashboards and the CLI
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogStats {
    pub metrics: SummaryMetrics,
    pub refreshed_at: Option<DateTime<Utc>>,
    pub last_refresh: Option<RefreshResult>,
}

//! Catalog service
//!
//! Entry point for the presentation layer. Owns the catalog and the page
//! fetcher, runs refreshes one at a time and answers searches from whatever
//! snapshot is current.

#![allow(clippy::uninlined_format_args)]

use std::collections::BTreeSet;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::{Instrument, debug, error, info, info_span, warn};
use uuid::Uuid;

use super::catalog::Catalog;
use super::dto::{CatalogStats, RefreshResult, SearchResult};
use crate::domain::{BookRecord, QuerySpec, normalize_all, query, summarize};
use crate::error::RefreshError;
use crate::infrastructure::config::AppConfig;
use crate::infrastructure::fetcher::{PageFetcher, PageSet};
use crate::infrastructure::http_client::{HttpClient, PageSource};

pub struct CatalogService {
    catalog: Arc<Catalog>,
    fetcher: PageFetcher,
    refresh_lock: Mutex<()>,
    refresh_timeout: Duration,
    last_refresh: RwLock<Option<RefreshResult>>,
}

impl CatalogService {
    /// Service that scrapes over HTTP with the configured client settings
    pub fn from_config(config: &AppConfig) -> Result<Self, RefreshError> {
        let client = HttpClient::from_fetch_config(&config.fetch)
            .map_err(|e| RefreshError::Setup(format!("{:#}", e)))?;
        Self::with_source(Arc::new(client), config)
    }

    /// Service that reads pages from any `PageSource`
    pub fn with_source(source: Arc<dyn PageSource>, config: &AppConfig) -> Result<Self, RefreshError> {
        let fetcher = PageFetcher::new(
            source,
            config.scraper.clone(),
            config.fetch.clone(),
            &config.parsing,
        )?;

        Ok(Self {
            catalog: Arc::new(Catalog::new()),
            fetcher,
            refresh_lock: Mutex::new(()),
            refresh_timeout: config.fetch.refresh_timeout(),
            last_refresh: RwLock::new(None),
        })
    }

    /// Override the whole-refresh time limit
    pub fn with_refresh_timeout(mut self, limit: Duration) -> Self {
        self.refresh_timeout = limit;
        self
    }

    /// Shared handle to the underlying catalog
    pub fn catalog(&self) -> Arc<Catalog> {
        Arc::clone(&self.catalog)
    }

    /// Fetch, parse and normalize every listing page, then swap the catalog.
    ///
    /// Returns `Err(RefreshError::InProgress)` if another refresh is running.
    /// Any other refresh-level failure is reported through a `RefreshResult`
    /// with `failed` set, and the catalog keeps its previous snapshot.
    pub async fn trigger_refresh(&self) -> Result<RefreshResult, RefreshError> {
        let Ok(_guard) = self.refresh_lock.try_lock() else {
            warn!("Refresh requested while another refresh is running");
            return Err(RefreshError::InProgress);
        };

        let refresh_id = Uuid::new_v4().to_string();
        let span = info_span!("refresh", id = %refresh_id);
        let started = Instant::now();

        let outcome = async {
            info!("Refresh started");
            match timeout(self.refresh_timeout, self.fetcher.fetch_all_pages()).await {
                Ok(result) => result,
                Err(_) => Err(RefreshError::TimedOut(self.refresh_timeout)),
            }
        }
        .instrument(span.clone())
        .await;

        let mut result = RefreshResult {
            refresh_id,
            ..RefreshResult::default()
        };

        span.in_scope(|| match outcome {
            Ok(pages) => self.install(&pages, &mut result),
            Err(e) => {
                error!("Refresh failed, keeping previous catalog: {}", e);
                result.failed = true;
                result.error = Some(e.to_string());
            }
        });

        result.duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        info!(
            "Refresh {} finished in {} ms: {} accepted, {} rejected, {} pages failed",
            result.refresh_id,
            result.duration_ms,
            result.records_accepted,
            result.records_rejected,
            result.pages_failed
        );

        self.remember(result.clone());
        Ok(result)
    }

    fn install(&self, pages: &PageSet, result: &mut RefreshResult) {
        let batch = normalize_all(pages.records());

        for (field, count) in &batch.rejections_by_field {
            debug!("Rejected {} records on {}", count, field);
        }

        result.pages_fetched = pages.pages.len();
        result.pages_failed = pages.failures.len();
        result.blocks_skipped = pages.blocks_skipped();
        result.details_failed = pages.details_failed;
        result.records_accepted = batch.records.len();
        // Blocks the extractor dropped count as rejected listings too
        result.records_rejected = batch.rejected + result.blocks_skipped;

        self.catalog.replace(batch.records);
    }

    fn remember(&self, result: RefreshResult) {
        match self.last_refresh.write() {
            Ok(mut guard) => *guard = Some(result),
            Err(poisoned) => *poisoned.into_inner() = Some(result),
        }
    }

    /// Filter the current snapshot and summarize the matches
    pub fn search(&self, spec: &QuerySpec) -> SearchResult {
        let snapshot = self.catalog.snapshot();
        let records = query(&snapshot, spec);
        let metrics = summarize(&records);
        SearchResult { records, metrics }
    }

    pub fn list_categories(&self) -> BTreeSet<String> {
        self.catalog.categories()
    }

    /// Book by 1-based position in the current snapshot
    pub fn book(&self, id: usize) -> Option<BookRecord> {
        self.catalog.get(id)
    }

    pub fn last_refresh(&self) -> Option<RefreshResult> {
        match self.last_refresh.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn stats(&self) -> CatalogStats {
        CatalogStats {
            metrics: summarize(&self.catalog.snapshot()),
            refreshed_at: self.catalog.refreshed_at(),
            last_refresh: self.last_refresh(),
        }
    }
}

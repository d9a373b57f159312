//! Listing page fetcher
//!
//! Fetches the first listing page, learns the page count from its pagination
//! indicator and then pulls the remaining pages with bounded concurrency.
//! Results are reassembled in page order. Only a failure of the first page
//! aborts the refresh; later failures are recorded and skipped.

#![allow(clippy::uninlined_format_args)]

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tracing::{debug, info, warn};

use crate::domain::RawBookRecord;
use crate::error::{FetchError, RefreshError};
use crate::infrastructure::config::{FetchConfig, ScraperConfig, utils};
use crate::infrastructure::http_client::PageSource;
use crate::infrastructure::parsing::{
    BookDetailParser, BookDetails, BookListParser, ExtractedPage, PageParser, ParseContext,
    ParsingConfig,
};

/// One successfully fetched listing page
#[derive(Debug, Clone)]
pub struct ListingPage {
    pub page_number: u32,
    pub url: String,
    pub extracted: ExtractedPage,
}

/// A listing page that could not be fetched
#[derive(Debug, Clone)]
pub struct PageFailure {
    pub page_number: u32,
    pub error: FetchError,
}

/// Everything a refresh pulled from the listing pages, in page order
#[derive(Debug, Clone, Default)]
pub struct PageSet {
    pub pages: Vec<ListingPage>,
    pub failures: Vec<PageFailure>,
    /// Total pages reported by the site, if it said
    pub page_count: Option<u32>,
    /// Detail pages that failed during enrichment
    pub details_failed: usize,
}

impl PageSet {
    /// Raw records across all pages in discovery order
    pub fn records(&self) -> impl Iterator<Item = &RawBookRecord> {
        self.pages.iter().flat_map(|p| p.extracted.records.iter())
    }

    pub fn blocks_skipped(&self) -> usize {
        self.pages.iter().map(|p| p.extracted.skipped_blocks).sum()
    }
}

/// Drives a `PageSource` across the listing pages of one site
pub struct PageFetcher {
    source: Arc<dyn PageSource>,
    list_parser: BookListParser,
    detail_parser: BookDetailParser,
    scraper: ScraperConfig,
    fetch: FetchConfig,
}

impl PageFetcher {
    pub fn new(
        source: Arc<dyn PageSource>,
        scraper: ScraperConfig,
        fetch: FetchConfig,
        parsing: &ParsingConfig,
    ) -> Result<Self, RefreshError> {
        let list_parser = BookListParser::with_config(&parsing.book_list_selectors)
            .map_err(|e| RefreshError::Setup(e.to_string()))?;
        let detail_parser = BookDetailParser::with_config(&parsing.book_detail_selectors)
            .map_err(|e| RefreshError::Setup(e.to_string()))?;

        Ok(Self {
            source,
            list_parser,
            detail_parser,
            scraper,
            fetch,
        })
    }

    pub fn page_url(&self, page: u32) -> String {
        utils::listing_page_url(&self.scraper.base_url, &self.scraper.page_url_template, page)
    }

    /// Fetch every listing page up to the configured limit.
    ///
    /// Fails only when the first page cannot be fetched.
    pub async fn fetch_all_pages(&self) -> Result<PageSet, RefreshError> {
        let first = self
            .fetch_listing(1)
            .await
            .map_err(RefreshError::FirstPageFailed)?;

        let mut set = PageSet {
            page_count: first.extracted.page_count,
            ..PageSet::default()
        };
        let first_was_empty = first.extracted.records.is_empty();
        set.pages.push(first);

        let max_pages = self.scraper.max_pages.max(1);
        match set.page_count {
            Some(total) => {
                let last = total.min(max_pages);
                info!("Site reports {} pages, fetching {}", total, last);
                self.fetch_range(2, last, &mut set).await;
            }
            None if first_was_empty => {
                info!("First page has no listings and no page indicator; stopping");
            }
            None => {
                debug!("No page indicator, walking pages until one is empty");
                self.walk_pages(2, max_pages, &mut set).await;
            }
        }

        if self.scraper.resolve_details {
            self.enrich_details(&mut set).await;
        }

        Ok(set)
    }

    /// Pages `from..=to` with bounded concurrency, reassembled in order
    async fn fetch_range(&self, from: u32, to: u32, set: &mut PageSet) {
        if from > to {
            return;
        }

        let results: Vec<_> = stream::iter(from..=to)
            .map(|page| async move { (page, self.fetch_listing(page).await) })
            .buffered(self.fetch.list_page_max_concurrent.max(1))
            .collect()
            .await;

        for (page_number, result) in results {
            self.record(page_number, result, set);
        }
    }

    /// Pages one at a time until a page is empty or fails
    async fn walk_pages(&self, from: u32, to: u32, set: &mut PageSet) {
        for page_number in from..=to {
            let result = self.fetch_listing(page_number).await;
            let keep_going = matches!(&result, Ok(page) if !page.extracted.records.is_empty());
            self.record(page_number, result, set);
            if !keep_going {
                break;
            }
        }
    }

    fn record(&self, page_number: u32, result: Result<ListingPage, FetchError>, set: &mut PageSet) {
        match result {
            Ok(page) => set.pages.push(page),
            Err(error) => {
                warn!("Skipping page {}: {}", page_number, error);
                set.failures.push(PageFailure { page_number, error });
            }
        }
    }

    async fn fetch_listing(&self, page_number: u32) -> Result<ListingPage, FetchError> {
        let url = self.page_url(page_number);
        let body = self.source.fetch_page(&url).await?;
        let context = ParseContext::new(page_number, url.as_str());

        let extracted = self.list_parser.parse(&body, &context).unwrap_or_else(|e| {
            warn!("Page {} could not be parsed: {}", page_number, e);
            ExtractedPage::default()
        });

        debug!(
            "Page {}: {} listings, {} skipped",
            page_number,
            extracted.records.len(),
            extracted.skipped_blocks
        );

        Ok(ListingPage {
            page_number,
            url,
            extracted,
        })
    }

    /// Fill category and descriptive fields from each book's detail page
    async fn enrich_details(&self, set: &mut PageSet) {
        let targets: Vec<(usize, usize, String)> = set
            .pages
            .iter()
            .enumerate()
            .flat_map(|(page_idx, page)| {
                page.extracted
                    .records
                    .iter()
                    .enumerate()
                    .filter_map(move |(record_idx, record)| {
                        record
                            .product_url
                            .clone()
                            .map(|url| (page_idx, record_idx, url))
                    })
            })
            .collect();

        info!("Resolving {} detail pages", targets.len());

        let results: Vec<_> = stream::iter(targets)
            .map(|(page_idx, record_idx, url)| async move {
                (page_idx, record_idx, self.fetch_details(&url).await)
            })
            .buffer_unordered(self.fetch.detail_max_concurrent.max(1))
            .collect()
            .await;

        for (page_idx, record_idx, result) in results {
            let Some(record) = set
                .pages
                .get_mut(page_idx)
                .and_then(|p| p.extracted.records.get_mut(record_idx))
            else {
                continue;
            };

            match result {
                Ok(details) => apply_details(record, details),
                Err(e) => {
                    debug!("Detail lookup failed: {}", e);
                    set.details_failed += 1;
                }
            }
        }

        if set.details_failed > 0 {
            warn!("{} detail pages could not be fetched", set.details_failed);
        }
    }

    async fn fetch_details(&self, url: &str) -> Result<BookDetails, FetchError> {
        let body = self.source.fetch_page(url).await?;
        Ok(self
            .detail_parser
            .parse(&body, &ParseContext::detail(url))
            .unwrap_or_default())
    }
}

/// Listing values win over detail values, except for the category which
/// the listing usually lacks
fn apply_details(record: &mut RawBookRecord, details: BookDetails) {
    if record.category.is_none() {
        record.category = details.category;
    }
    if record.availability.is_none() {
        record.availability = details.availability;
    }
    record.description = record.description.take().or(details.description);
    record.upc = record.upc.take().or(details.upc);
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Serves canned bodies and records which URLs were requested
    #[derive(Default)]
    struct FixtureSource {
        pages: HashMap<String, String>,
        requested: Mutex<Vec<String>>,
    }

    impl FixtureSource {
        fn with_page(mut self, url: &str, body: String) -> Self {
            self.pages.insert(url.to_string(), body);
            self
        }

        fn requested(&self) -> Vec<String> {
            self.requested.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl PageSource for FixtureSource {
        async fn fetch_page(&self, url: &str) -> Result<String, FetchError> {
            self.requested.lock().unwrap().push(url.to_string());
            self.pages.get(url).cloned().ok_or_else(|| FetchError::Status {
                status: 404,
                url: url.to_string(),
            })
        }
    }

    const BASE: &str = "http://shop.test";

    fn url(page: u32) -> String {
        format!("{BASE}/catalogue/page-{page}.html")
    }

    fn listing_page(titles: &[&str], indicator: Option<&str>) -> String {
        let blocks: String = titles
            .iter()
            .map(|t| {
                format!(
                    r#"<article class="product_pod"><p class="star-rating Two"></p><h3><a href="{t}/index.html" title="{t}">{t}</a></h3><p class="price_color">£10.00</p></article>"#
                )
            })
            .collect();
        let pager = indicator
            .map(|i| format!(r#"<li class="current">{i}</li>"#))
            .unwrap_or_default();
        format!("<html><body>{blocks}{pager}</body></html>")
    }

    fn fetcher(source: Arc<FixtureSource>, max_pages: u32, resolve_details: bool) -> PageFetcher {
        let scraper = ScraperConfig {
            base_url: BASE.to_string(),
            max_pages,
            resolve_details,
            ..ScraperConfig::default()
        };
        PageFetcher::new(source, scraper, FetchConfig::default(), &ParsingConfig::default()).unwrap()
    }

    fn titles(set: &PageSet) -> Vec<String> {
        set.records().filter_map(|r| r.title.clone()).collect()
    }

    #[tokio::test]
    async fn pages_come_back_in_order_and_failures_are_skipped() {
        let source = Arc::new(
            FixtureSource::default()
                .with_page(&url(1), listing_page(&["a", "b"], Some("Page 1 of 4")))
                .with_page(&url(3), listing_page(&["e"], Some("Page 3 of 4")))
                .with_page(&url(4), listing_page(&["f", "g"], Some("Page 4 of 4"))),
        );

        let set = fetcher(source, 10, false).fetch_all_pages().await.unwrap();

        assert_eq!(titles(&set), vec!["a", "b", "e", "f", "g"]);
        assert_eq!(set.page_count, Some(4));
        assert_eq!(set.failures.len(), 1);
        assert_eq!(set.failures[0].page_number, 2);
    }

    #[tokio::test]
    async fn first_page_failure_aborts() {
        let source = Arc::new(FixtureSource::default());
        let err = fetcher(source, 5, false).fetch_all_pages().await.unwrap_err();
        assert!(matches!(err, RefreshError::FirstPageFailed(FetchError::Status { status: 404, .. })));
    }

    #[tokio::test]
    async fn page_limit_caps_reported_count() {
        let source = Arc::new(
            FixtureSource::default()
                .with_page(&url(1), listing_page(&["a"], Some("Page 1 of 50")))
                .with_page(&url(2), listing_page(&["b"], Some("Page 2 of 50"))),
        );

        let set = fetcher(source.clone(), 2, false).fetch_all_pages().await.unwrap();

        assert_eq!(titles(&set), vec!["a", "b"]);
        assert_eq!(source.requested().len(), 2);
    }

    #[tokio::test]
    async fn without_indicator_walks_until_empty_page() {
        let source = Arc::new(
            FixtureSource::default()
                .with_page(&url(1), listing_page(&["a"], None))
                .with_page(&url(2), listing_page(&["b"], None))
                .with_page(&url(3), listing_page(&[], None))
                .with_page(&url(4), listing_page(&["never"], None)),
        );

        let set = fetcher(source.clone(), 10, false).fetch_all_pages().await.unwrap();

        assert_eq!(titles(&set), vec!["a", "b"]);
        assert!(set.failures.is_empty());
        assert!(!source.requested().contains(&url(4)));
    }

    #[tokio::test]
    async fn details_fill_category_and_failures_are_counted() {
        let detail = r#"<ul class="breadcrumb"><li>Home</li><li>Books</li><li>Poetry</li><li>a</li></ul>
            <table><tr><th>UPC</th><td>abc123</td></tr></table>"#;
        let source = Arc::new(
            FixtureSource::default()
                .with_page(&url(1), listing_page(&["a", "b"], Some("Page 1 of 1")))
                .with_page(&format!("{BASE}/catalogue/a/index.html"), detail.to_string()),
        );

        let set = fetcher(source, 5, true).fetch_all_pages().await.unwrap();
        let records: Vec<_> = set.records().collect();

        assert_eq!(records[0].category.as_deref(), Some("Poetry"));
        assert_eq!(records[0].upc.as_deref(), Some("abc123"));
        assert_eq!(records[1].category, None);
        assert_eq!(set.details_failed, 1);
    }
}

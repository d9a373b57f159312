//! End-to-end refresh tests against a mock listing site.
//!
//! Uses wiremock to serve catalogue pages over real HTTP so the whole path
//! (HTTP client, fetcher, parser, normalizer, catalog) is exercised.

use std::sync::Arc;
use std::time::Duration;

use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, path},
};

use book_catalog_lib::infrastructure::config::AppConfig;
use book_catalog_lib::infrastructure::{HttpClient, PageFetcher};
use book_catalog_lib::{CatalogService, FetchError, QuerySpec, RefreshError};

/// One listing block in the site's markup
fn listing_block(title: &str, price: &str, rating: &str) -> String {
    format!(
        r#"
    <li class="col-xs-6 col-sm-4 col-md-3 col-lg-3">
        <article class="product_pod">
            <div class="image_container">
                <a href="book_{rating}/index.html"><img src="../media/cache/{rating}.jpg" alt="{title}" class="thumbnail"></a>
            </div>
            <p class="star-rating {rating}"><i class="icon-star"></i></p>
            <h3><a href="book_{rating}/index.html" title="{title}">{title}</a></h3>
            <div class="product_price">
                <p class="price_color">{price}</p>
                <p class="instock availability"><i class="icon-ok"></i> In stock</p>
            </div>
        </article>
    </li>"#
    )
}

fn listing_page(blocks: &[String], page: u32, total: u32) -> String {
    format!(
        r#"
<!DOCTYPE html>
<html>
<body>
    <ol class="row">{}</ol>
    <ul class="pager"><li class="current">Page {page} of {total}</li></ul>
</body>
</html>
        "#,
        blocks.concat()
    )
}

fn config_for(server: &MockServer) -> AppConfig {
    let mut config = AppConfig::default();
    config.scraper.base_url = server.uri();
    config.scraper.max_pages = 5;
    config.fetch.request_jitter_ms = 0;
    config.fetch.max_requests_per_second = 50;
    config
}

async fn mount_page(server: &MockServer, page: u32, body: String) {
    Mock::given(method("GET"))
        .and(path(format!("/catalogue/page-{page}.html")))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_single_page_with_one_bad_price() {
    let server = MockServer::start().await;
    let blocks = vec![
        listing_block("A Light in the Attic", "£51.77", "Three"),
        listing_block("Tipping the Velvet", "price on request", "One"),
        listing_block("Soumission", "£50.10", "Five"),
    ];
    mount_page(&server, 1, listing_page(&blocks, 1, 1)).await;

    let service = CatalogService::from_config(&config_for(&server)).unwrap();
    let result = service.trigger_refresh().await.unwrap();

    assert!(!result.failed);
    assert_eq!(result.records_accepted, 2);
    assert_eq!(result.records_rejected, 1);
    assert_eq!(result.pages_fetched, 1);

    let found = service.search(&QuerySpec::new().with_min_rating(4));
    let titles: Vec<_> = found.records.iter().map(|b| b.title.as_str()).collect();
    assert_eq!(titles, vec!["Soumission"]);
    assert_eq!(found.metrics.count, 1);
    assert_eq!(found.metrics.avg_price, 50.10);

    let all = service.search(&QuerySpec::default());
    assert_eq!(all.records[0].price, 51.77);
    assert_eq!(
        all.records[0].product_url.as_deref(),
        Some(format!("{}/catalogue/book_Three/index.html", server.uri()).as_str())
    );
}

#[tokio::test]
async fn test_blank_price_block_counts_as_rejected() {
    let server = MockServer::start().await;
    let blocks = vec![
        listing_block("A Light in the Attic", "£51.77", "Three"),
        listing_block("Tipping the Velvet", "   ", "One"),
        listing_block("Soumission", "£50.10", "Five"),
    ];
    mount_page(&server, 1, listing_page(&blocks, 1, 1)).await;

    let service = CatalogService::from_config(&config_for(&server)).unwrap();
    let result = service.trigger_refresh().await.unwrap();

    assert!(!result.failed);
    assert_eq!(result.records_accepted, 2);
    assert_eq!(result.records_rejected, 1);
    assert_eq!(result.blocks_skipped, 1);
    assert_eq!(service.catalog().len(), 2);
}

#[tokio::test]
async fn test_first_page_error_fails_refresh_and_keeps_catalog() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/catalogue/page-1.html"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let service = CatalogService::from_config(&config_for(&server)).unwrap();
    let result = service.trigger_refresh().await.unwrap();

    assert!(result.failed);
    assert!(result.error.is_some());
    assert_eq!(result.records_accepted, 0);
    assert!(service.catalog().is_empty());
    assert_eq!(service.last_refresh(), Some(result));
}

#[tokio::test]
async fn test_failed_later_page_is_skipped() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        1,
        listing_page(&[listing_block("One", "£1.00", "One")], 1, 3),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/catalogue/page-2.html"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    mount_page(
        &server,
        3,
        listing_page(&[listing_block("Three", "£3.00", "Three")], 3, 3),
    )
    .await;

    let service = CatalogService::from_config(&config_for(&server)).unwrap();
    let result = service.trigger_refresh().await.unwrap();

    assert!(!result.failed);
    assert_eq!(result.pages_fetched, 2);
    assert_eq!(result.pages_failed, 1);

    let titles: Vec<_> = service
        .search(&QuerySpec::default())
        .records
        .into_iter()
        .map(|b| b.title)
        .collect();
    assert_eq!(titles, vec!["One", "Three"]);
}

#[tokio::test]
async fn test_slow_later_page_times_out_and_is_skipped() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        1,
        listing_page(&[listing_block("Quick", "£1.00", "One")], 1, 2),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/catalogue/page-2.html"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(listing_page(&[listing_block("Slow", "£2.00", "Two")], 2, 2))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let mut config = config_for(&server);
    config.fetch.request_timeout_seconds = 1;

    let service = CatalogService::from_config(&config).unwrap();
    let result = service.trigger_refresh().await.unwrap();

    assert!(!result.failed);
    assert_eq!(result.pages_fetched, 1);
    assert_eq!(result.pages_failed, 1);
    assert_eq!(result.records_accepted, 1);
    assert_eq!(service.book(1).map(|b| b.title), Some("Quick".to_string()));

    let client = HttpClient::from_fetch_config(&config.fetch).unwrap();
    let fetcher = PageFetcher::new(
        Arc::new(client),
        config.scraper.clone(),
        config.fetch.clone(),
        &config.parsing,
    )
    .unwrap();
    let pages = fetcher.fetch_all_pages().await.unwrap();

    assert_eq!(pages.failures.len(), 1);
    assert_eq!(pages.failures[0].page_number, 2);
    assert!(matches!(pages.failures[0].error, FetchError::Timeout { .. }));
}

#[tokio::test]
async fn test_repeated_refresh_is_idempotent() {
    let server = MockServer::start().await;
    let blocks = vec![
        listing_block("Sharp Objects", "£47.82", "Four"),
        listing_block("Sapiens", "£54.23", "Five"),
    ];
    mount_page(&server, 1, listing_page(&blocks, 1, 1)).await;

    let service = CatalogService::from_config(&config_for(&server)).unwrap();

    service.trigger_refresh().await.unwrap();
    let first = service.catalog().snapshot();
    service.trigger_refresh().await.unwrap();
    let second = service.catalog().snapshot();

    assert_eq!(first.to_vec(), second.to_vec());
    assert!(!Arc::ptr_eq(&first, &second));
}

#[tokio::test]
async fn test_concurrent_refresh_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/catalogue/page-1.html"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(listing_page(&[listing_block("Slow", "£9.99", "Two")], 1, 1))
                .set_delay(Duration::from_millis(300)),
        )
        .mount(&server)
        .await;

    let service = CatalogService::from_config(&config_for(&server)).unwrap();

    let (first, second) = tokio::join!(service.trigger_refresh(), async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        service.trigger_refresh().await
    });

    assert!(!first.unwrap().failed);
    let err = second.unwrap_err();
    assert!(matches!(err, RefreshError::InProgress));
    assert!(err.is_retryable());
    assert_eq!(service.catalog().len(), 1);
}

#[tokio::test]
async fn test_detail_enrichment_resolves_categories() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        1,
        listing_page(
            &[
                listing_block("Sharp Objects", "£47.82", "Four"),
                listing_block("Orphan", "£10.00", "Two"),
            ],
            1,
            1,
        ),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/catalogue/book_Four/index.html"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<ul class="breadcrumb"><li>Home</li><li>Books</li><li>Mystery</li><li>Sharp Objects</li></ul>"#,
        ))
        .mount(&server)
        .await;

    let mut config = config_for(&server);
    config.scraper.resolve_details = true;
    let service = CatalogService::from_config(&config).unwrap();
    let result = service.trigger_refresh().await.unwrap();

    assert_eq!(result.records_accepted, 2);
    assert_eq!(result.details_failed, 1);
    assert_eq!(
        service.list_categories().into_iter().collect::<Vec<_>>(),
        vec!["Mystery".to_string(), "Unknown".to_string()]
    );

    let mystery = service.search(&QuerySpec::new().with_category("Mystery"));
    assert_eq!(mystery.records.len(), 1);
    assert_eq!(mystery.records[0].title, "Sharp Objects");
}

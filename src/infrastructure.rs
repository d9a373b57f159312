//! Infrastructure layer: configuration, logging, HTTP and HTML parsing
//!
//! Everything here touches the outside world (network, files, environment)
//! or the page markup. Pure catalog logic lives in `domain`.

pub mod config; // Configuration, defaults and site constants
pub mod fetcher; // Listing page traversal and detail enrichment
pub mod http_client;
pub mod logging;
pub mod parsing;
pub mod parsing_error;

pub use self::config::{AppConfig, ConfigManager, FetchConfig, LoggingConfig, ScraperConfig, books_to_scrape};
pub use fetcher::{ListingPage, PageFailure, PageFetcher, PageSet};
pub use http_client::{HttpClient, HttpClientConfig, PageSource};
pub use parsing::{
    BookDetailParser, BookListParser, ExtractedPage, PageParser, ParseContext, ParsingConfig,
    ParsingError, ParsingResult,
};

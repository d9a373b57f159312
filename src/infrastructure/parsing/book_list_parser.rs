//! Listing page parser
//!
//! Reads every listing block on a catalogue page into a `RawBookRecord`.
//! Blocks without a title or price are skipped and counted, and the
//! "Page N of M" indicator is read so the fetcher knows how many pages exist.

#![allow(clippy::uninlined_format_args)]

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};

use super::{
    BookListSelectors, PageParser, ParseContext, ParsingError, ParsingResult, compile_selectors,
    first_match, first_match_in, first_text,
};
use crate::domain::RawBookRecord;

static PAGE_OF_TOTAL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)page\s+(\d+)\s+of\s+(\d+)").expect("page indicator pattern is valid")
});

/// Class on the rating element that is not itself a rating word
const RATING_MARKER_CLASS: &str = "star-rating";

/// Result of parsing one listing page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedPage {
    /// Listing blocks in document order
    pub records: Vec<RawBookRecord>,
    /// Blocks that lacked a required field
    pub skipped_blocks: usize,
    /// Total page count from the pagination indicator, if present
    pub page_count: Option<u32>,
}

/// Parser for extracting book listings from catalogue pages
pub struct BookListParser {
    container_selectors: Vec<Selector>,
    title_link_selectors: Vec<Selector>,
    price_selectors: Vec<Selector>,
    rating_selectors: Vec<Selector>,
    category_selectors: Vec<Selector>,
    availability_selectors: Vec<Selector>,
    image_selectors: Vec<Selector>,
    pagination_selectors: Vec<Selector>,
}

impl BookListParser {
    /// Create a parser with the default selectors
    pub fn new() -> ParsingResult<Self> {
        Self::with_config(&BookListSelectors::default())
    }

    /// Create parser with custom selector configuration
    pub fn with_config(selectors: &BookListSelectors) -> ParsingResult<Self> {
        Ok(Self {
            container_selectors: compile_selectors("book_container", &selectors.book_container)?,
            title_link_selectors: compile_selectors("title_link", &selectors.title_link)?,
            price_selectors: compile_selectors("price", &selectors.price)?,
            rating_selectors: compile_selectors("rating", &selectors.rating)?,
            category_selectors: compile_selectors("category", &selectors.category)?,
            availability_selectors: compile_selectors("availability", &selectors.availability)?,
            image_selectors: compile_selectors("image", &selectors.image)?,
            pagination_selectors: compile_selectors(
                "pagination_current",
                &selectors.pagination_current,
            )?,
        })
    }

    /// Read the total page count from the "Page N of M" indicator
    pub fn page_count(&self, document: &Html) -> Option<u32> {
        let indicator = first_match_in(document, &self.pagination_selectors)?;
        let text = indicator.text().collect::<String>();
        PAGE_OF_TOTAL
            .captures(&text)
            .and_then(|caps| caps.get(2))
            .and_then(|m| m.as_str().parse().ok())
    }

    fn extract_block(&self, block: ElementRef<'_>, context: &ParseContext) -> ParsingResult<RawBookRecord> {
        let title_link = first_match(block, &self.title_link_selectors);

        // The visible link text is truncated on the listing; the title attribute is not
        let title = title_link
            .and_then(|a| a.value().attr("title").map(str::to_string))
            .filter(|t| !t.trim().is_empty())
            .or_else(|| title_link.and_then(super::element_text))
            .ok_or_else(|| ParsingError::required_field_missing("title", Some("listing block")))?;

        let price = first_text(block, &self.price_selectors)
            .ok_or_else(|| ParsingError::required_field_missing("price", Some("listing block")))?;

        let product_url = title_link
            .and_then(|a| a.value().attr("href"))
            .and_then(|href| self.resolve_optional(href, context));

        let image_url = first_match(block, &self.image_selectors)
            .and_then(|img| img.value().attr("src"))
            .and_then(|src| self.resolve_optional(src, context));

        Ok(RawBookRecord {
            title: Some(title),
            price: Some(price),
            rating: self.extract_rating(block),
            category: first_text(block, &self.category_selectors),
            product_url,
            image_url,
            availability: first_text(block, &self.availability_selectors),
            description: None,
            upc: None,
        })
    }

    /// The rating is the class word next to `star-rating`, e.g. `star-rating Three`
    fn extract_rating(&self, block: ElementRef<'_>) -> Option<String> {
        let element = first_match(block, &self.rating_selectors)?;
        element
            .value()
            .classes()
            .find(|class| !class.eq_ignore_ascii_case(RATING_MARKER_CLASS))
            .map(str::to_string)
    }

    fn resolve_optional(&self, href: &str, context: &ParseContext) -> Option<String> {
        match context.resolve(href) {
            Ok(url) => Some(url),
            Err(e) => {
                debug!("Dropping unresolvable link on page {}: {}", context.page_number, e);
                None
            }
        }
    }
}

impl PageParser for BookListParser {
    type Output = ExtractedPage;

    fn parse(&self, html: &str, context: &ParseContext) -> ParsingResult<ExtractedPage> {
        let document = Html::parse_document(html);
        let mut page = ExtractedPage {
            page_count: self.page_count(&document),
            ..ExtractedPage::default()
        };

        // Use the first container selector that matches anything
        let blocks: Vec<ElementRef> = self
            .container_selectors
            .iter()
            .map(|s| document.select(s).collect::<Vec<_>>())
            .find(|found| !found.is_empty())
            .unwrap_or_default();

        for (index, block) in blocks.into_iter().enumerate() {
            match self.extract_block(block, context) {
                Ok(record) => page.records.push(record),
                Err(e) if !e.is_recoverable() => return Err(e),
                Err(e) => {
                    warn!(
                        "Skipping listing block {} on page {}: {}",
                        index, context.page_number, e
                    );
                    page.skipped_blocks += 1;
                }
            }
        }

        debug!(
            "Extracted {} listings ({} skipped) from page {}",
            page.records.len(),
            page.skipped_blocks,
            context.page_number
        );

        Ok(page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE_URL: &str = "http://books.toscrape.com/catalogue/page-1.html";

    fn listing(title: &str, price: &str, rating: &str) -> String {
        format!(
            r#"<li class="col-xs-6"><article class="product_pod">
                <div class="image_container"><a href="{slug}/index.html"><img src="../media/cache/{slug}.jpg" class="thumbnail"></a></div>
                <p class="star-rating {rating}"><i class="icon-star"></i></p>
                <h3><a href="{slug}/index.html" title="{title}">{short}...</a></h3>
                <div class="product_price">
                    <p class="price_color">{price}</p>
                    <p class="instock availability"><i class="icon-ok"></i> In stock </p>
                </div>
            </article></li>"#,
            slug = title.to_lowercase().replace(' ', "-"),
            short = &title[..title.len().min(10)],
        )
    }

    fn page(blocks: &[String], indicator: Option<&str>) -> String {
        let pager = indicator
            .map(|text| format!(r#"<ul class="pager"><li class="current">{text}</li></ul>"#))
            .unwrap_or_default();
        format!(
            "<html><body><ol class=\"row\">{}</ol>{}</body></html>",
            blocks.join("\n"),
            pager
        )
    }

    #[test]
    fn test_parser_creation() {
        assert!(BookListParser::new().is_ok());
    }

    #[test]
    fn extracts_listing_fields() {
        let parser = BookListParser::new().unwrap();
        let html = page(&[listing("A Light in the Attic", "£51.77", "Three")], Some("Page 1 of 50"));

        let extracted = parser.parse(&html, &ParseContext::new(1, PAGE_URL)).unwrap();

        assert_eq!(extracted.page_count, Some(50));
        assert_eq!(extracted.skipped_blocks, 0);
        let record = &extracted.records[0];
        assert_eq!(record.title.as_deref(), Some("A Light in the Attic"));
        assert_eq!(record.price.as_deref(), Some("£51.77"));
        assert_eq!(record.rating.as_deref(), Some("Three"));
        assert_eq!(record.availability.as_deref(), Some("In stock"));
        assert_eq!(record.category, None);
        assert_eq!(
            record.product_url.as_deref(),
            Some("http://books.toscrape.com/catalogue/a-light-in-the-attic/index.html")
        );
        assert_eq!(
            record.image_url.as_deref(),
            Some("http://books.toscrape.com/media/cache/a-light-in-the-attic.jpg")
        );
    }

    #[test]
    fn block_without_price_is_skipped_and_counted() {
        let parser = BookListParser::new().unwrap();
        let broken = r#"<article class="product_pod"><h3><a href="x/index.html" title="No Price">No Price</a></h3></article>"#;
        let html = page(
            &[listing("First", "£1.00", "One"), broken.to_string(), listing("Third", "£3.00", "Two")],
            None,
        );

        let extracted = parser.parse(&html, &ParseContext::new(2, PAGE_URL)).unwrap();

        assert_eq!(extracted.records.len(), 2);
        assert_eq!(extracted.skipped_blocks, 1);
        assert_eq!(extracted.page_count, None);
        assert_eq!(extracted.records[1].title.as_deref(), Some("Third"));
    }

    #[test]
    fn title_falls_back_to_link_text() {
        let parser = BookListParser::new().unwrap();
        let block = r#"<article class="product_pod"><h3><a href="t/index.html">  Plain   Title </a></h3><p class="price_color">£2.00</p></article>"#;
        let extracted = parser
            .parse(&page(&[block.to_string()], None), &ParseContext::new(1, PAGE_URL))
            .unwrap();
        assert_eq!(extracted.records[0].title.as_deref(), Some("Plain Title"));
        assert_eq!(extracted.records[0].rating, None);
    }

    #[test]
    fn page_without_listings_is_empty_not_an_error() {
        let parser = BookListParser::new().unwrap();
        let extracted = parser
            .parse("<html><body><p>404</p></body></html>", &ParseContext::new(9, PAGE_URL))
            .unwrap();
        assert!(extracted.records.is_empty());
        assert_eq!(extracted.skipped_blocks, 0);
    }

    #[test]
    fn invalid_selectors_fail_construction() {
        let selectors = BookListSelectors {
            price: vec!["p[".to_string()],
            ..BookListSelectors::default()
        };
        assert!(matches!(
            BookListParser::with_config(&selectors),
            Err(ParsingError::NoUsableSelectors { .. })
        ));
    }
}

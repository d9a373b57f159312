//! Detail page parser
//!
//! Used only when detail enrichment is enabled. Pulls the category from the
//! breadcrumb trail along with a few descriptive fields.

use scraper::{Html, Selector};
use tracing::debug;

use super::{
    BookDetailSelectors, PageParser, ParseContext, ParsingResult, compile_selectors, element_text,
    first_match_in,
};

/// Breadcrumb position of the category: Home > Books > Category > Title
const CATEGORY_BREADCRUMB_INDEX: usize = 2;

/// Fields read from a book's detail page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookDetails {
    pub category: Option<String>,
    pub description: Option<String>,
    pub availability: Option<String>,
    pub upc: Option<String>,
}

pub struct BookDetailParser {
    breadcrumb_selectors: Vec<Selector>,
    description_selectors: Vec<Selector>,
    availability_selectors: Vec<Selector>,
    upc_selectors: Vec<Selector>,
}

impl BookDetailParser {
    pub fn new() -> ParsingResult<Self> {
        Self::with_config(&BookDetailSelectors::default())
    }

    pub fn with_config(selectors: &BookDetailSelectors) -> ParsingResult<Self> {
        Ok(Self {
            breadcrumb_selectors: compile_selectors("breadcrumb_items", &selectors.breadcrumb_items)?,
            description_selectors: compile_selectors("description", &selectors.description)?,
            availability_selectors: compile_selectors("availability", &selectors.availability)?,
            upc_selectors: compile_selectors("upc", &selectors.upc)?,
        })
    }

    fn extract_category(&self, document: &Html) -> Option<String> {
        self.breadcrumb_selectors.iter().find_map(|selector| {
            document
                .select(selector)
                .nth(CATEGORY_BREADCRUMB_INDEX)
                .and_then(element_text)
        })
    }

    fn extract_text(document: &Html, selectors: &[Selector]) -> Option<String> {
        first_match_in(document, selectors).and_then(element_text)
    }
}

impl PageParser for BookDetailParser {
    type Output = BookDetails;

    fn parse(&self, html: &str, context: &ParseContext) -> ParsingResult<BookDetails> {
        let document = Html::parse_document(html);

        let details = BookDetails {
            category: self.extract_category(&document),
            description: Self::extract_text(&document, &self.description_selectors),
            availability: Self::extract_text(&document, &self.availability_selectors),
            upc: Self::extract_text(&document, &self.upc_selectors),
        };

        debug!(
            "Detail page {}: category={:?} upc={:?}",
            context.page_url, details.category, details.upc
        );
        Ok(details)
    }
}

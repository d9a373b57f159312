//! HTML parsing for listing and detail pages
//!
//! Parsers are pure: they take page text and a `ParseContext` and return
//! raw, unvalidated fields. Normalization happens in the domain layer.

pub mod book_detail_parser;
pub mod book_list_parser;
pub mod config;
pub mod context;
pub mod error;

pub use book_detail_parser::{BookDetailParser, BookDetails};
pub use book_list_parser::{BookListParser, ExtractedPage};
pub use self::config::{BookDetailSelectors, BookListSelectors, ParsingConfig};
pub use context::ParseContext;
pub use error::{ParsingError, ParsingResult};

use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};

/// Parser for one kind of page
pub trait PageParser {
    type Output;

    /// Parse page text in the given context
    fn parse(&self, html: &str, context: &ParseContext) -> ParsingResult<Self::Output>;
}

/// Compile fallback selector strings, keeping the ones that parse
pub(crate) fn compile_selectors(field: &str, selector_strings: &[String]) -> ParsingResult<Vec<Selector>> {
    let mut selectors = Vec::new();
    let mut errors = Vec::new();

    for selector_str in selector_strings {
        match Selector::parse(selector_str) {
            Ok(selector) => selectors.push(selector),
            Err(e) => {
                warn!("Failed to compile selector '{}': {}", selector_str, e);
                errors.push(format!("'{selector_str}': {e}"));
            }
        }
    }

    if selectors.is_empty() {
        return Err(ParsingError::NoUsableSelectors {
            field: field.to_string(),
            errors: if errors.is_empty() {
                "no selectors configured".to_string()
            } else {
                errors.join(", ")
            },
        });
    }

    if !errors.is_empty() {
        debug!("Some '{}' selectors failed to compile: {}", field, errors.join(", "));
    }

    Ok(selectors)
}

/// First element matched by any selector, trying selectors in order
pub(crate) fn first_match<'a>(scope: ElementRef<'a>, selectors: &[Selector]) -> Option<ElementRef<'a>> {
    selectors.iter().find_map(|s| scope.select(s).next())
}

/// Same as [`first_match`] but over a whole document
pub(crate) fn first_match_in<'a>(document: &'a Html, selectors: &[Selector]) -> Option<ElementRef<'a>> {
    selectors.iter().find_map(|s| document.select(s).next())
}

/// Whitespace-collapsed text of an element, `None` when blank
pub(crate) fn element_text(element: ElementRef<'_>) -> Option<String> {
    let text = element.text().collect::<Vec<_>>().join(" ");
    let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
    (!text.is_empty()).then_some(text)
}

/// First non-blank text found by any selector
pub(crate) fn first_text(scope: ElementRef<'_>, selectors: &[Selector]) -> Option<String> {
    selectors
        .iter()
        .flat_map(|s| scope.select(s))
        .find_map(element_text)
}

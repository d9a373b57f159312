//! Context carried through a single page parse

use url::Url;

use super::{ParsingError, ParsingResult};

/// Where the page being parsed came from
#[derive(Debug, Clone)]
pub struct ParseContext {
    /// 1-based listing page number (0 for detail pages)
    pub page_number: u32,

    /// Absolute URL of the page, used to resolve relative links
    pub page_url: String,
}

impl ParseContext {
    pub fn new(page_number: u32, page_url: impl Into<String>) -> Self {
        Self {
            page_number,
            page_url: page_url.into(),
        }
    }

    /// Context for a detail page
    pub fn detail(page_url: impl Into<String>) -> Self {
        Self::new(0, page_url)
    }

    /// Resolve `href` against the page URL
    pub fn resolve(&self, href: &str) -> ParsingResult<String> {
        let base = Url::parse(&self.page_url)
            .map_err(|e| ParsingError::url_resolution_failed(href, e, &self.page_url))?;
        base.join(href.trim())
            .map(String::from)
            .map_err(|e| ParsingError::url_resolution_failed(href, e, &self.page_url))
    }
}

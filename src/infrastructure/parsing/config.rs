//! Parsing configuration for HTML extraction
//!
//! Centralized CSS selectors. Each field lists fallbacks tried in order.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ParsingConfig {
    pub book_list_selectors: BookListSelectors,
    pub book_detail_selectors: BookDetailSelectors,
}

/// CSS selectors for listing pages
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BookListSelectors {
    /// One element per listing block
    pub book_container: Vec<String>,

    /// Link carrying the title attribute and the detail page href
    pub title_link: Vec<String>,

    pub price: Vec<String>,

    /// Element whose class list holds the rating word
    pub rating: Vec<String>,

    /// Inline category label, when the listing has one
    pub category: Vec<String>,

    pub availability: Vec<String>,

    pub image: Vec<String>,

    /// Element with the "Page N of M" indicator
    pub pagination_current: Vec<String>,
}

impl Default for BookListSelectors {
    fn default() -> Self {
        Self {
            book_container: strings(&["article.product_pod", ".product_pod", "li article"]),
            title_link: strings(&["h3 a", ".product_title a", "a[title]"]),
            price: strings(&["p.price_color", ".price_color", ".price"]),
            rating: strings(&["p.star-rating", ".star-rating"]),
            category: strings(&[".book-category", ".category"]),
            availability: strings(&["p.availability", ".availability"]),
            image: strings(&["div.image_container img", "img.thumbnail", "img"]),
            pagination_current: strings(&["ul.pager li.current", "li.current", ".pager .current"]),
        }
    }
}

/// CSS selectors for book detail pages
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BookDetailSelectors {
    /// Breadcrumb items; the third one is the category
    pub breadcrumb_items: Vec<String>,

    pub description: Vec<String>,

    pub availability: Vec<String>,

    /// First product information cell holds the UPC
    pub upc: Vec<String>,
}

impl Default for BookDetailSelectors {
    fn default() -> Self {
        Self {
            breadcrumb_items: strings(&["ul.breadcrumb li", ".breadcrumb li"]),
            description: strings(&["#product_description ~ p", ".product_page > p"]),
            availability: strings(&[".product_main .availability", ".availability"]),
            upc: strings(&["table.table-striped tr:first-child td", "table tr:first-child td"]),
        }
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}

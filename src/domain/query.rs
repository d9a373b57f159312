//! Search/filter criteria and the stable filter over a snapshot

use serde::{Deserialize, Serialize};

use super::book::BookRecord;

/// Category value the presentation layer uses for "no category filter"
pub const ALL_CATEGORIES: &str = "All";

/// Filter criteria for one search request. All present filters must match.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuerySpec {
    /// Case-insensitive substring matched against the title
    pub keyword: Option<String>,
    /// Exact category label
    pub category: Option<String>,
    #[serde(rename = "minPrice")]
    pub min_price: Option<f64>,
    #[serde(rename = "maxPrice")]
    pub max_price: Option<f64>,
    #[serde(rename = "minRating")]
    pub min_rating: Option<u8>,
}

impl QuerySpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_keyword(mut self, keyword: impl Into<String>) -> Self {
        self.keyword = Some(keyword.into());
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_price_range(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.min_price = min;
        self.max_price = max;
        self
    }

    pub fn with_min_rating(mut self, stars: u8) -> Self {
        self.min_rating = Some(stars);
        self
    }

    /// Build a spec from raw request parameters.
    ///
    /// Blank values are treated as absent, `"All"` clears the category
    /// filter and numbers that fail to parse or are not finite are ignored.
    pub fn from_params(
        keyword: Option<&str>,
        category: Option<&str>,
        min_price: Option<&str>,
        max_price: Option<&str>,
        min_rating: Option<&str>,
    ) -> Self {
        fn non_blank(s: Option<&str>) -> Option<&str> {
            s.map(str::trim).filter(|s| !s.is_empty())
        }

        fn price_bound(s: Option<&str>) -> Option<f64> {
            non_blank(s)
                .and_then(|p| p.parse::<f64>().ok())
                .filter(|p| p.is_finite())
        }

        Self {
            keyword: non_blank(keyword).map(str::to_string),
            category: non_blank(category)
                .filter(|c| *c != ALL_CATEGORIES)
                .map(str::to_string),
            min_price: price_bound(min_price),
            max_price: price_bound(max_price),
            min_rating: non_blank(min_rating).and_then(|r| r.parse().ok()),
        }
    }

    /// True when no filter is set
    pub fn is_empty(&self) -> bool {
        self.keyword.is_none()
            && self.category.is_none()
            && self.min_price.is_none()
            && self.max_price.is_none()
            && self.min_rating.is_none()
    }

    /// Evaluate every present predicate against one record
    pub fn matches(&self, book: &BookRecord) -> bool {
        self.matches_keyword(book)
            && self.category.as_deref().is_none_or(|c| book.category == c)
            && self.min_price.is_none_or(|min| book.price >= min)
            && self.max_price.is_none_or(|max| book.price <= max)
            && self.min_rating.is_none_or(|min| book.rating.stars() >= min)
    }

    fn matches_keyword(&self, book: &BookRecord) -> bool {
        match self.keyword.as_deref() {
            None => true,
            Some(k) => book.title.to_lowercase().contains(&k.to_lowercase()),
        }
    }
}

/// Apply `spec` to `snapshot`, keeping the snapshot's relative order
pub fn query(snapshot: &[BookRecord], spec: &QuerySpec) -> Vec<BookRecord> {
    if spec.is_empty() {
        return snapshot.to_vec();
    }
    snapshot.iter().filter(|b| spec.matches(b)).cloned().collect()
}

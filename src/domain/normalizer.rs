//! Raw listing fields → typed `BookRecord`
//!
//! Rejection is an ordinary outcome here: a record that fails any rule is
//! returned as a `ValidationError` and counted by the caller.

use std::collections::BTreeMap;

use tracing::debug;

use super::book::{BookRecord, Rating, RawBookRecord, UNKNOWN_CATEGORY};
use crate::error::ValidationError;

/// Records that survived normalization plus rejection diagnostics
#[derive(Debug, Clone, Default)]
pub struct NormalizedBatch {
    pub records: Vec<BookRecord>,
    pub rejected: usize,
    /// Rejection count keyed by the offending field
    pub rejections_by_field: BTreeMap<&'static str, usize>,
}

/// Normalize a single raw record
pub fn normalize(raw: &RawBookRecord) -> Result<BookRecord, ValidationError> {
    let title = raw
        .title
        .as_deref()
        .map(collapse_whitespace)
        .filter(|t| !t.is_empty())
        .ok_or(ValidationError::EmptyTitle)?;

    let price = parse_price(raw.price.as_deref().ok_or(ValidationError::MissingPrice)?)?;
    let rating = parse_rating(raw.rating.as_deref())?;

    let category = match raw.category.as_deref() {
        None => UNKNOWN_CATEGORY.to_string(),
        Some(c) => {
            let c = collapse_whitespace(c);
            if c.is_empty() {
                return Err(ValidationError::EmptyCategory);
            }
            c
        }
    };

    Ok(BookRecord {
        title,
        price,
        rating,
        category,
        product_url: optional_text(raw.product_url.as_deref()),
        image_url: optional_text(raw.image_url.as_deref()),
        availability: optional_text(raw.availability.as_deref()),
        description: optional_text(raw.description.as_deref()),
        upc: optional_text(raw.upc.as_deref()),
    })
}

/// Normalize a page's worth of records, preserving input order
pub fn normalize_all<'a, I>(raws: I) -> NormalizedBatch
where
    I: IntoIterator<Item = &'a RawBookRecord>,
{
    let mut batch = NormalizedBatch::default();
    for raw in raws {
        match normalize(raw) {
            Ok(record) => batch.records.push(record),
            Err(e) => {
                debug!("Rejected listing {:?}: {}", raw.title, e);
                batch.rejected += 1;
                *batch.rejections_by_field.entry(e.field()).or_insert(0) += 1;
            }
        }
    }
    batch
}

/// Parse a formatted price such as `£51.77` or `$1,299.00`.
///
/// Currency symbols, letters and whitespace are dropped and commas are
/// treated as thousands separators.
pub fn parse_price(text: &str) -> Result<f64, ValidationError> {
    let cleaned: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();

    let value: f64 = cleaned
        .parse()
        .map_err(|_| ValidationError::UnparsablePrice(text.to_string()))?;

    if !value.is_finite() {
        return Err(ValidationError::UnparsablePrice(text.to_string()));
    }
    if value < 0.0 {
        return Err(ValidationError::NegativePrice(text.to_string()));
    }
    Ok(value)
}

/// Map the source's rating representation onto `0..=5`.
///
/// The listing markup encodes stars as a class word (`star-rating Three`);
/// plain digits are accepted too. A missing or blank indicator is unrated.
pub fn parse_rating(text: Option<&str>) -> Result<Rating, ValidationError> {
    let Some(token) = text.map(str::trim).filter(|t| !t.is_empty()) else {
        return Ok(Rating::UNRATED);
    };

    let stars = match token.to_ascii_lowercase().as_str() {
        "zero" => Some(0),
        "one" => Some(1),
        "two" => Some(2),
        "three" => Some(3),
        "four" => Some(4),
        "five" => Some(5),
        digits => digits.parse::<u8>().ok(),
    };

    stars
        .and_then(Rating::new)
        .ok_or_else(|| ValidationError::UnrecognizedRating(token.to_string()))
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn optional_text(s: Option<&str>) -> Option<String> {
    s.map(collapse_whitespace).filter(|s| !s.is_empty())
}

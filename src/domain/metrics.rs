//! Summary metrics over a set of records. Always derived, never stored.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::book::BookRecord;

/// Aggregate view of a record set, rounded for display
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SummaryMetrics {
    pub count: usize,
    #[serde(rename = "avgPrice")]
    pub avg_price: f64,
    #[serde(rename = "avgRating")]
    pub avg_rating: f64,
    /// Books per category, largest first
    pub categories: Vec<CategoryCount>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryCount {
    pub category: String,
    pub count: usize,
}

/// Compute count, mean price and mean rating. Empty input yields zeros.
pub fn summarize(books: &[BookRecord]) -> SummaryMetrics {
    if books.is_empty() {
        return SummaryMetrics::default();
    }

    let count = books.len();
    let total_price: f64 = books.iter().map(|b| b.price).sum();
    let total_rating: f64 = books.iter().map(|b| f64::from(b.rating.stars())).sum();

    SummaryMetrics {
        count,
        avg_price: round2(total_price / count as f64),
        avg_rating: round2(total_rating / count as f64),
        categories: category_breakdown(books),
    }
}

fn category_breakdown(books: &[BookRecord]) -> Vec<CategoryCount> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for book in books {
        *counts.entry(book.category.as_str()).or_insert(0) += 1;
    }

    let mut breakdown: Vec<CategoryCount> = counts
        .into_iter()
        .map(|(category, count)| CategoryCount {
            category: category.to_string(),
            count,
        })
        .collect();
    breakdown.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.category.cmp(&b.category)));
    breakdown
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

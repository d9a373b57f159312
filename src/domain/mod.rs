//! Domain module - book records and the pure logic over them
//!
//! Normalization, filtering and aggregation live here; none of it performs
//! I/O.

pub mod book;
pub mod metrics;
pub mod normalizer;
pub mod query;

pub use book::{BookRecord, Rating, RawBookRecord, UNKNOWN_CATEGORY};
pub use metrics::{CategoryCount, SummaryMetrics, summarize};
pub use normalizer::{NormalizedBatch, normalize, normalize_all};
pub use query::{ALL_CATEGORIES, QuerySpec, query};

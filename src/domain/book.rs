use serde::{Deserialize, Serialize};

/// Label used when a listing's category cannot be resolved
pub const UNKNOWN_CATEGORY: &str = "Unknown";

/// Unvalidated field strings read from one listing block.
///
/// Every field is optional: the extractor records what it found and the
/// normalizer decides what is acceptable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawBookRecord {
    pub title: Option<String>,
    pub price: Option<String>,
    pub rating: Option<String>,
    pub category: Option<String>,
    #[serde(rename = "productUrl")]
    pub product_url: Option<String>,
    #[serde(rename = "imageUrl")]
    pub image_url: Option<String>,
    pub availability: Option<String>,
    pub description: Option<String>,
    pub upc: Option<String>,
}

/// Star rating in `0..=5`, where `0` means the source gave no rating
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Rating(u8);

impl Rating {
    pub const UNRATED: Rating = Rating(0);
    pub const MAX: u8 = 5;

    pub fn new(stars: u8) -> Option<Self> {
        (stars <= Self::MAX).then_some(Self(stars))
    }

    pub fn stars(self) -> u8 {
        self.0
    }
}

impl std::fmt::Display for Rating {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.0, Self::MAX)
    }
}

/// A normalized book listing. Only the normalizer constructs these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookRecord {
    pub title: String,
    pub price: f64,
    pub rating: Rating,
    pub category: String,
    #[serde(rename = "productUrl")]
    pub product_url: Option<String>,
    #[serde(rename = "imageUrl")]
    pub image_url: Option<String>,
    pub availability: Option<String>,
    pub description: Option<String>,
    pub upc: Option<String>,
}

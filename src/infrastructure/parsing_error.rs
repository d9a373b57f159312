//! Parsing error types for listing and detail pages
//!
//! A parsing error never aborts a refresh: block-level errors skip one
//! listing, page-level errors leave the page empty.

use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum ParsingError {
    #[error("Required field '{field}' not found in HTML")]
    RequiredFieldMissing {
        field: String,
        context: Option<String>,
    },

    #[error("No usable selectors for '{field}': {errors}")]
    NoUsableSelectors { field: String, errors: String },

    #[error("URL resolution failed: {url} - {reason}")]
    UrlResolutionFailed {
        url: String,
        reason: String,
        base_url: Option<String>,
    },
}

impl ParsingError {
    /// Create a required field missing error with context
    pub fn required_field_missing(field: &str, context: Option<&str>) -> Self {
        Self::RequiredFieldMissing {
            field: field.to_string(),
            context: context.map(str::to_string),
        }
    }

    pub fn url_resolution_failed(url: &str, reason: impl std::fmt::Display, base_url: &str) -> Self {
        Self::UrlResolutionFailed {
            url: url.to_string(),
            reason: reason.to_string(),
            base_url: Some(base_url.to_string()),
        }
    }

    /// Block-level problems are skipped; selector problems are configuration bugs
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::RequiredFieldMissing { .. } | Self::UrlResolutionFailed { .. } => true,
            Self::NoUsableSelectors { .. } => false,
        }
    }
}

pub type ParsingResult<T> = Result<T, ParsingError>;

//! Application layer - the catalog and the service that refreshes and queries it

pub mod catalog;
pub mod catalog_service;
pub mod dto;

pub use catalog::Catalog;
pub use catalog_service::CatalogService;
pub use dto::{CatalogStats, RefreshResult, SearchResult};

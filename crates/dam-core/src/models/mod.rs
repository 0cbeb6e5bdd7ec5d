//! Data models for the DAM client
//!
//! Wire types mirror the backend's JSON shapes; client types (`Pagination`,
//! `AssetFilters`, `PendingFile`, `UploadSummary`) are the normalized shapes the
//! state machines work with.

mod analytics;
mod asset;
mod filters;
mod pagination;
mod upload;

// Re-export all models for convenient imports
pub use analytics::*;
pub use asset::*;
pub use filters::*;
pub use pagination::*;
pub use upload::*;

//! Client-side state machines for the DAM client.
//!
//! - [`registry`]: out-of-band store for selected file payloads
//! - [`upload`]: upload session (selection, validation, progress, reconciliation)
//! - [`catalog`]: asset list, filters, pagination and debounced search
//! - [`stats`]: periodic realtime stats refresher
//!
//! Every state machine publishes its state through a `tokio::sync::watch`
//! channel and talks to the backend only through [`dam_api_client::AssetApi`].

pub mod catalog;
pub mod reconcile;
pub mod registry;
pub mod stats;
pub mod upload;

#[cfg(test)]
pub(crate) mod testing;

pub use catalog::{AssetCatalog, CatalogState, CatalogView};
pub use reconcile::{reconcile, UploadOutcome};
pub use registry::{FileRegistry, InMemoryFileRegistry};
pub use stats::{RealTimeSnapshot, StatsPoller};
pub use upload::{Selection, UploadCanceller, UploadPhase, UploadSession, UploadState};

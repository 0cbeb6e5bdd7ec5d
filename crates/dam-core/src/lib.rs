//! DAM Core Library
//!
//! This crate provides the domain models, error taxonomy, configuration and
//! upload validation rules shared by the DAM API client, the client-side state
//! machines and the CLI.

pub mod config;
pub mod error;
pub mod models;
pub mod validation;

// Re-export commonly used types
pub use config::{ClientConfig, RetryConfig, SearchConfig};
pub use error::{DamError, DamResult, ValidationError};
pub use validation::UploadRules;

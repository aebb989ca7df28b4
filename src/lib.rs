//! Catalog-Harvest: a batched catalog scraper
//!
//! This crate walks paginated catalog listing pages, collects the item-detail
//! URLs they link to, fetches every item page under a bounded worker pool and
//! extracts a structured record from each one. The records are aggregated
//! into a single tabular dataset.

pub mod config;
pub mod crawler;
pub mod dataset;
pub mod output;
pub mod pipeline;
pub mod state;
pub mod storage;

use thiserror::Error;

/// Main error type for Catalog-Harvest operations
///
/// Only run-level conditions end up here. Failures for a single listing page
/// or item page are recorded as [`state::HarvestFailure`] values instead.
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Output error: {0}")]
    Output(#[from] output::OutputError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid listing template: {0}")]
    InvalidTemplate(String),
}

/// Result type alias for Catalog-Harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{FetchClient, Harvester, HttpFetcher};
pub use dataset::{Dataset, FieldValue, Record};
pub use pipeline::{run_harvest, run_harvest_over_http, RunSummary};
pub use state::{FailureKind, HarvestFailure};

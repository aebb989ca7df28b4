//! Storage traits and error types

use crate::dataset::Dataset;
use crate::state::{FailureKind, HarvestFailure};
use crate::storage::{RunRecord, RunStatus};
use std::collections::BTreeMap;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("Corrupt row in {table}: {message}")]
    Corrupt { table: &'static str, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for storage backend implementations
///
/// The harvest core never talks to storage; the pipeline persists a finished
/// dataset and its failures once the harvest phase is over.
pub trait Storage {
    // ===== Run Management =====

    /// Creates a new harvest run in the `running` state
    ///
    /// # Arguments
    ///
    /// * `config_hash` - Hash of the configuration file
    ///
    /// # Returns
    ///
    /// The ID of the newly created run
    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64>;

    /// Gets a run by ID
    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord>;

    /// Gets the most recent run
    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>>;

    /// Updates the status of a run
    fn update_run_status(&mut self, run_id: i64, status: RunStatus) -> StorageResult<()>;

    /// Marks a run as completed with a finish timestamp
    fn complete_run(&mut self, run_id: i64) -> StorageResult<()>;

    // ===== Results =====

    /// Stores every record of a dataset, returning the number stored
    ///
    /// A field recorded without a value is stored as NULL, so a stored run
    /// rebuilds into the same records and the same header.
    fn save_dataset(&mut self, run_id: i64, dataset: &Dataset) -> StorageResult<usize>;

    /// Rebuilds the dataset stored for a run
    fn load_dataset(&self, run_id: i64) -> StorageResult<Dataset>;

    /// Stores the failures of a run
    fn save_failures(&mut self, run_id: i64, failures: &[HarvestFailure]) -> StorageResult<()>;

    /// Loads the failures of a run, sorted by URL
    fn load_failures(&self, run_id: i64) -> StorageResult<Vec<HarvestFailure>>;

    // ===== Statistics =====

    /// Counts the records stored for a run
    fn count_records(&self, run_id: i64) -> StorageResult<u64>;

    /// Counts failures of a run per kind
    fn count_failures_by_kind(&self, run_id: i64) -> StorageResult<BTreeMap<FailureKind, u64>>;

    /// Counts, per field, how many records of a run carry a value for it
    fn field_coverage(&self, run_id: i64) -> StorageResult<BTreeMap<String, u64>>;
}

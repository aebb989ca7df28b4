//! SQLite result sink
//!
//! Stores the dataset in long form next to the run that produced it, so a
//! later `--stats` invocation can report on it.

use crate::dataset::Dataset;
use crate::output::traits::{OutputResult, ResultSink};
use crate::state::HarvestFailure;
use crate::storage::{RunStatus, Storage};

/// Sink recording one run in a storage backend
///
/// The run is created in the `running` state when the sink is built and
/// moves to `completed` once everything has been stored.
pub struct SqliteSink<S: Storage> {
    storage: S,
    run_id: i64,
}

impl<S: Storage> SqliteSink<S> {
    /// Opens a new run in `storage`
    ///
    /// # Arguments
    ///
    /// * `storage` - The storage backend to record into
    /// * `config_hash` - Hash of the configuration the run uses
    pub fn new(mut storage: S, config_hash: &str) -> OutputResult<Self> {
        let run_id = storage.create_run(config_hash)?;
        tracing::debug!("Opened run {}", run_id);
        Ok(Self { storage, run_id })
    }

    pub fn run_id(&self) -> i64 {
        self.run_id
    }

    /// Marks the run as failed
    pub fn abandon(&mut self) -> OutputResult<()> {
        self.storage
            .update_run_status(self.run_id, RunStatus::Failed)?;
        Ok(())
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }
}

impl<S: Storage> ResultSink for SqliteSink<S> {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn emit(&mut self, dataset: &Dataset, failures: &[HarvestFailure]) -> OutputResult<()> {
        let stored = self.storage.save_dataset(self.run_id, dataset)?;
        self.storage.save_failures(self.run_id, failures)?;
        self.storage.complete_run(self.run_id)?;

        tracing::info!(
            "Stored run {}: {} records, {} failures",
            self.run_id,
            stored,
            failures.len()
        );
        Ok(())
    }
}

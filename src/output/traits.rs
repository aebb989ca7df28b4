//! Result sink trait and run summary types

use crate::dataset::Dataset;
use crate::state::{FailureKind, HarvestFailure};
use crate::storage::StorageError;
use std::collections::BTreeMap;
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Failed to write output: {0}")]
    Write(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Destination for a finished harvest
///
/// A sink receives the dataset and the failure list exactly once, after the
/// harvest phase is over.
pub trait ResultSink {
    /// Short name used in log messages
    fn name(&self) -> &str;

    /// Emits the dataset and the failures of one run
    fn emit(&mut self, dataset: &Dataset, failures: &[HarvestFailure]) -> OutputResult<()>;
}

/// Summary of one harvest run
#[derive(Debug, Clone, Default)]
pub struct HarvestSummary {
    // Run metadata
    pub run_id: Option<i64>,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub duration_seconds: Option<u64>,
    pub config_hash: String,

    // Discovery phase
    pub listing_pages_attempted: u64,
    pub listing_pages_failed: u64,
    pub urls_discovered: u64,
    pub frontier_size: u64,

    // Harvest phase
    pub items_attempted: u64,
    pub records: u64,
    pub batches: u64,

    // Failures per kind
    pub failures_by_kind: BTreeMap<FailureKind, u64>,

    // Dataset header and how many records carry a value per column
    pub columns: Vec<String>,
    pub field_coverage: BTreeMap<String, u64>,
}

impl HarvestSummary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Failures across every kind
    pub fn total_failures(&self) -> u64 {
        self.failures_by_kind.values().sum()
    }

    /// Item pages that produced no record
    pub fn item_failures(&self) -> u64 {
        self.failures_by_kind
            .iter()
            .filter(|(kind, _)| kind.is_item_failure())
            .map(|(_, count)| count)
            .sum()
    }

    /// Percentage of attempted item pages that produced a record
    pub fn success_rate(&self) -> f64 {
        if self.items_attempted == 0 {
            return 0.0;
        }
        (self.records as f64 / self.items_attempted as f64) * 100.0
    }

    /// Percentage of frontier entries lost to deduplication
    pub fn duplicate_rate(&self) -> f64 {
        if self.urls_discovered == 0 {
            return 0.0;
        }
        let duplicates = self.urls_discovered.saturating_sub(self.frontier_size);
        (duplicates as f64 / self.urls_discovered as f64) * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rates() {
        let mut summary = HarvestSummary::new();
        assert_eq!(summary.success_rate(), 0.0);
        assert_eq!(summary.duplicate_rate(), 0.0);

        summary.items_attempted = 4;
        summary.records = 3;
        summary.urls_discovered = 10;
        summary.frontier_size = 8;

        assert_eq!(summary.success_rate(), 75.0);
        assert_eq!(summary.duplicate_rate(), 20.0);
    }

    #[test]
    fn test_failure_totals() {
        let mut summary = HarvestSummary::new();
        summary.failures_by_kind.insert(FailureKind::ListingFetch, 2);
        summary.failures_by_kind.insert(FailureKind::ItemFetch, 3);
        summary.failures_by_kind.insert(FailureKind::ItemExtraction, 1);

        assert_eq!(summary.total_failures(), 6);
        assert_eq!(summary.item_failures(), 4);
    }
}

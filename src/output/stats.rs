//! Statistics generation from the harvest database
//!
//! This module provides functionality for extracting and displaying
//! statistics about the latest stored run.

use crate::output::traits::{HarvestSummary, OutputError, OutputResult};
use crate::state::FailureKind;
use crate::storage::{RunRecord, Storage};
use std::collections::BTreeMap;

/// Statistics of one stored run
#[derive(Debug, Clone)]
pub struct HarvestStatistics {
    /// The run the statistics describe
    pub run: RunRecord,

    /// Number of records stored
    pub records: u64,

    /// Count of failures by kind
    pub failures_by_kind: BTreeMap<FailureKind, u64>,

    /// Records carrying a value, per field
    pub field_coverage: BTreeMap<String, u64>,
}

impl HarvestStatistics {
    /// Item pages that were attempted: every record plus every item failure
    pub fn items_attempted(&self) -> u64 {
        self.records
            + self
                .failures_by_kind
                .iter()
                .filter(|(kind, _)| kind.is_item_failure())
                .map(|(_, count)| count)
                .sum::<u64>()
    }

    /// Converts the statistics into a run summary
    pub fn to_summary(&self) -> HarvestSummary {
        let duration_seconds = match (
            self.run.started_at.parse::<chrono::DateTime<chrono::Utc>>(),
            self.run
                .finished_at
                .as_deref()
                .map(str::parse::<chrono::DateTime<chrono::Utc>>),
        ) {
            (Ok(started), Some(Ok(finished))) => {
                Some((finished - started).num_seconds().max(0) as u64)
            }
            _ => None,
        };

        HarvestSummary {
            run_id: Some(self.run.id),
            started_at: self.run.started_at.clone(),
            finished_at: self.run.finished_at.clone(),
            duration_seconds,
            config_hash: self.run.config_hash.clone(),
            items_attempted: self.items_attempted(),
            records: self.records,
            failures_by_kind: self.failures_by_kind.clone(),
            columns: self.field_coverage.keys().cloned().collect(),
            field_coverage: self.field_coverage.clone(),
            ..HarvestSummary::default()
        }
    }
}

/// Loads statistics for the most recent run
///
/// # Arguments
///
/// * `storage` - The storage backend to query
///
/// # Returns
///
/// * `Ok(HarvestStatistics)` - Successfully loaded statistics
/// * `Err(OutputError)` - No run stored, or the query failed
pub fn load_statistics(storage: &dyn Storage) -> OutputResult<HarvestStatistics> {
    let run = storage
        .get_latest_run()?
        .ok_or_else(|| OutputError::Write("No harvest runs found in database".to_string()))?;

    let records = storage.count_records(run.id)?;
    let failures_by_kind = storage.count_failures_by_kind(run.id)?;
    let field_coverage = storage.field_coverage(run.id)?;

    Ok(HarvestStatistics {
        run,
        records,
        failures_by_kind,
        field_coverage,
    })
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &HarvestStatistics) {
    println!("=== Harvest Statistics ===\n");

    println!("Run:");
    println!("  ID: {}", stats.run.id);
    println!("  Status: {}", stats.run.status.to_db_string());
    println!("  Started: {}", stats.run.started_at);
    if let Some(finished) = &stats.run.finished_at {
        println!("  Finished: {}", finished);
    }
    println!("  Config hash: {}", stats.run.config_hash);
    println!();

    println!("Overview:");
    println!("  Records: {}", stats.records);
    println!("  Item pages attempted: {}", stats.items_attempted());
    println!();

    if !stats.failures_by_kind.is_empty() {
        println!("Failures:");
        for (kind, count) in &stats.failures_by_kind {
            println!("  {}: {}", kind, count);
        }
        println!();
    }

    if !stats.field_coverage.is_empty() {
        println!("Field Coverage:");
        for (field, count) in &stats.field_coverage {
            let percentage = if stats.records > 0 {
                (*count as f64 / stats.records as f64) * 100.0
            } else {
                0.0
            };
            println!("  {}: {} ({:.1}%)", field, count, percentage);
        }
        println!();
    }

    let attempted = stats.items_attempted();
    let success_rate = if attempted > 0 {
        (stats.records as f64 / attempted as f64) * 100.0
    } else {
        0.0
    };

    println!(
        "Success Rate: {:.1}% ({} / {} item pages harvested)",
        success_rate, stats.records, attempted
    );
}

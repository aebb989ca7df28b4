//! End-to-end harvest run
//!
//! A run is three strictly sequenced phases: discovery builds the frontier
//! from every listing page, harvest turns the frontier into a dataset, and
//! emission hands the dataset and the failure log to every configured sink.
//! Nothing is emitted before the harvest phase has drained completely.

use crate::config::Config;
use crate::crawler::{build_frontier, FetchClient, Harvester, HttpFetcher};
use crate::dataset::Dataset;
use crate::output::{generate_markdown_summary, CsvSink, HarvestSummary, ResultSink, SqliteSink};
use crate::state::{FailureKind, HarvestFailure};
use crate::storage::SqliteStorage;
use crate::Result;
use chrono::Utc;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Outcome of a complete run
#[derive(Debug)]
pub struct RunSummary {
    /// Counts and rates for reporting
    pub summary: HarvestSummary,

    /// The emitted dataset
    pub dataset: Dataset,

    /// Every listing and item failure of the run, sorted
    pub failures: Vec<HarvestFailure>,
}

/// Runs discovery, harvest and emission for `config`
///
/// Equivalent to [`run_harvest_with_hash`] with an empty config hash.
pub async fn run_harvest(config: &Config, client: Arc<dyn FetchClient>) -> Result<RunSummary> {
    run_harvest_with_hash(config, client, "").await
}

/// Builds the HTTP fetch client from `config` and runs the harvest with it
///
/// A client that cannot be built fails the run before any page is requested.
pub async fn run_harvest_over_http(config: &Config, config_hash: &str) -> Result<RunSummary> {
    let client = HttpFetcher::new(&config.client)?;
    run_harvest_with_hash(config, Arc::new(client), config_hash).await
}

/// Runs discovery, harvest and emission for `config`
///
/// # Arguments
///
/// * `config` - Validated configuration
/// * `client` - Fetch client used by both the discovery and the harvest phase
/// * `config_hash` - Hash of the configuration file, recorded with the run
///
/// # Returns
///
/// * `Ok(RunSummary)` - The run completed; per-page failures are inside it
/// * `Err(HarvestError)` - A sink could not be opened or written
pub async fn run_harvest_with_hash(
    config: &Config,
    client: Arc<dyn FetchClient>,
    config_hash: &str,
) -> Result<RunSummary> {
    let started_at = Utc::now();

    let mut sqlite_sink = match &config.output.database_path {
        Some(path) => {
            let storage = SqliteStorage::new(Path::new(path))?;
            Some(SqliteSink::new(storage, config_hash)?)
        }
        None => None,
    };

    tracing::info!(
        "Phase 1/3: discovering item URLs from {} listing pages",
        config.total_listing_pages()
    );
    let discovery = build_frontier(
        client.as_ref(),
        &config.listings,
        &config.site.base_url,
        config.harvester.request_timeout(),
    )
    .await;

    if discovery.frontier.is_empty() {
        tracing::warn!("No item URLs discovered; the dataset will be empty");
    }

    let mut summary = HarvestSummary {
        run_id: sqlite_sink.as_ref().map(SqliteSink::run_id),
        started_at: started_at.to_rfc3339(),
        config_hash: config_hash.to_string(),
        listing_pages_attempted: discovery.pages_attempted as u64,
        listing_pages_failed: discovery.pages_failed as u64,
        urls_discovered: discovery.urls_seen as u64,
        frontier_size: discovery.frontier.len() as u64,
        ..HarvestSummary::default()
    };

    tracing::info!(
        "Phase 2/3: harvesting {} item pages",
        discovery.frontier.len()
    );
    let harvester = Harvester::new(Arc::clone(&client), config.harvester.clone());
    let report = harvester.run(discovery.frontier.into_urls()).await;

    let mut failures = discovery.failures;
    failures.extend(report.failures);
    failures.sort();

    summary.items_attempted = report.attempted as u64;
    summary.records = report.dataset.len() as u64;
    summary.batches = report.batches as u64;
    summary.failures_by_kind = count_by_kind(&failures);
    summary.columns = report.dataset.header();
    summary.field_coverage = field_coverage(&report.dataset, &summary.columns);

    tracing::info!("Phase 3/3: emitting {} records", report.dataset.len());
    let mut csv_sink = CsvSink::new(
        &config.output.dataset_path,
        config.output.failure_log_path.as_ref().map(PathBuf::from),
    );

    if let Err(e) = emit_all(&mut csv_sink, sqlite_sink.as_mut(), &report.dataset, &failures) {
        if let Some(sink) = sqlite_sink.as_mut() {
            if let Err(abandon_error) = sink.abandon() {
                tracing::error!("Failed to mark run as failed: {}", abandon_error);
            }
        }
        return Err(e.into());
    }

    let finished_at = Utc::now();
    summary.finished_at = Some(finished_at.to_rfc3339());
    summary.duration_seconds = Some((finished_at - started_at).num_seconds().max(0) as u64);

    if let Some(path) = &config.output.summary_path {
        generate_markdown_summary(&summary, Path::new(path))?;
        tracing::info!("Wrote summary to {}", path);
    }

    tracing::info!(
        "Run complete: {} records, {} failures ({:.1}% of item pages harvested)",
        summary.records,
        summary.total_failures(),
        summary.success_rate()
    );

    Ok(RunSummary {
        summary,
        dataset: report.dataset,
        failures,
    })
}

/// Emits to the CSV sink and then to the database sink, if any
fn emit_all(
    csv_sink: &mut CsvSink,
    sqlite_sink: Option<&mut SqliteSink<SqliteStorage>>,
    dataset: &Dataset,
    failures: &[HarvestFailure],
) -> crate::output::OutputResult<()> {
    let mut sinks: Vec<&mut dyn ResultSink> = Vec::with_capacity(2);
    sinks.push(csv_sink);
    if let Some(sink) = sqlite_sink {
        sinks.push(sink);
    }

    for sink in sinks {
        tracing::debug!("Emitting to {} sink", sink.name());
        sink.emit(dataset, failures)?;
    }

    Ok(())
}

fn count_by_kind(failures: &[HarvestFailure]) -> BTreeMap<FailureKind, u64> {
    let mut counts = BTreeMap::new();
    for failure in failures {
        *counts.entry(failure.kind).or_insert(0) += 1;
    }
    counts
}

fn field_coverage(dataset: &Dataset, columns: &[String]) -> BTreeMap<String, u64> {
    columns
        .iter()
        .map(|column| {
            let count = dataset
                .records()
                .iter()
                .filter(|record| record.get(column).is_some())
                .count();
            (column.clone(), count as u64)
        })
        .collect()
}

//! Batched concurrent harvester
//!
//! The frontier is cut into batches of at most `batch_size` URLs. Within a
//! batch every URL gets its own task, and a semaphore keeps at most `workers`
//! of them fetching or extracting at any moment. A batch is fully drained
//! before the next one starts, and a fixed pause separates consecutive
//! batches.
//!
//! Every URL ends in exactly one place: a record in the dataset or an entry
//! in the failure list. A task that panics is reported as an extraction
//! failure for its URL.

use crate::config::HarvesterConfig;
use crate::crawler::extract::extract_record;
use crate::crawler::fetcher::{fetch_page, FetchClient};
use crate::dataset::{Dataset, DatasetCollector};
use crate::state::{FailureKind, HarvestFailure};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::{Id, JoinSet};

/// Result of the harvest phase
#[derive(Debug, Default)]
pub struct HarvestReport {
    /// One record per successfully harvested URL
    pub dataset: Dataset,

    /// One entry per URL that produced no record
    pub failures: Vec<HarvestFailure>,

    /// Number of URLs handed to the harvester
    pub attempted: usize,

    /// Number of batches processed
    pub batches: usize,
}

/// Cuts a work list into consecutive batches of at most `batch_size` URLs
///
/// A batch size of zero is treated as one.
pub fn partition_batches(urls: Vec<String>, batch_size: usize) -> Vec<Vec<String>> {
    let batch_size = batch_size.max(1);
    let mut batches = Vec::with_capacity(urls.len().div_ceil(batch_size));
    let mut current = Vec::with_capacity(batch_size.min(urls.len()));

    for url in urls {
        current.push(url);
        if current.len() == batch_size {
            batches.push(std::mem::replace(
                &mut current,
                Vec::with_capacity(batch_size),
            ));
        }
    }

    if !current.is_empty() {
        batches.push(current);
    }

    batches
}

/// Drives the harvest phase over a shared fetch client
pub struct Harvester {
    client: Arc<dyn FetchClient>,
    config: HarvesterConfig,
}

impl Harvester {
    /// Creates a harvester
    ///
    /// # Arguments
    ///
    /// * `client` - Fetch client shared by every worker
    /// * `config` - Worker count, batch size, pacing and timeout
    pub fn new(client: Arc<dyn FetchClient>, config: HarvesterConfig) -> Self {
        Self { client, config }
    }

    /// Harvests every URL in `urls`
    ///
    /// Per-URL problems never abort the run; they end up in
    /// [`HarvestReport::failures`].
    pub async fn run(&self, urls: Vec<String>) -> HarvestReport {
        let attempted = urls.len();
        let batches = partition_batches(urls, self.config.batch_size);
        let batch_count = batches.len();

        let collector = Arc::new(DatasetCollector::new());
        let semaphore = Arc::new(Semaphore::new(self.config.workers.max(1)));
        let mut failures = Vec::new();

        tracing::info!(
            "Harvesting {} URLs in {} batches ({} workers, batch size {})",
            attempted,
            batch_count,
            self.config.workers,
            self.config.batch_size
        );

        for (index, batch) in batches.into_iter().enumerate() {
            tracing::info!(
                "Starting batch {}/{} ({} URLs)",
                index + 1,
                batch_count,
                batch.len()
            );

            let batch_failures = self
                .run_batch(batch, Arc::clone(&semaphore), Arc::clone(&collector))
                .await;

            tracing::info!(
                "Finished batch {}/{}: {} records so far, {} failures in batch",
                index + 1,
                batch_count,
                collector.len(),
                batch_failures.len()
            );
            failures.extend(batch_failures);

            let more_remaining = index + 1 < batch_count;
            if more_remaining && !self.config.batch_pause().is_zero() {
                tracing::debug!("Pausing {:?} before next batch", self.config.batch_pause());
                tokio::time::sleep(self.config.batch_pause()).await;
            }
        }

        // All tasks have been joined, so this is the last reference
        let dataset = match Arc::try_unwrap(collector) {
            Ok(collector) => collector.into_dataset(),
            Err(shared) => shared.snapshot(),
        };

        tracing::info!(
            "Harvest complete: {} records, {} failures out of {} URLs",
            dataset.len(),
            failures.len(),
            attempted
        );

        HarvestReport {
            dataset,
            failures,
            attempted,
            batches: batch_count,
        }
    }

    /// Runs one batch to completion and returns its failures
    async fn run_batch(
        &self,
        batch: Vec<String>,
        semaphore: Arc<Semaphore>,
        collector: Arc<DatasetCollector>,
    ) -> Vec<HarvestFailure> {
        let timeout = self.config.request_timeout();
        let mut task_urls: HashMap<Id, String> = HashMap::with_capacity(batch.len());
        let mut tasks = JoinSet::new();

        for url in batch {
            let client = Arc::clone(&self.client);
            let semaphore = Arc::clone(&semaphore);
            let collector = Arc::clone(&collector);
            let task_url = url.clone();

            let handle = tasks.spawn(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => {
                        return Some(HarvestFailure::new(
                            url,
                            FailureKind::ItemFetch,
                            "worker pool closed",
                        ));
                    }
                };

                harvest_item(client.as_ref(), &url, timeout, &collector)
                    .await
                    .err()
            });
            task_urls.insert(handle.id(), task_url);
        }

        let mut failures = Vec::new();

        while let Some(joined) = tasks.join_next_with_id().await {
            match joined {
                Ok((id, failure)) => {
                    task_urls.remove(&id);
                    failures.extend(failure);
                }
                Err(e) => {
                    let Some(url) = task_urls.remove(&e.id()) else {
                        tracing::error!("Harvest task {} failed: {}", e.id(), e);
                        continue;
                    };
                    tracing::warn!("Harvest task for {} failed: {}", url, e);
                    failures.push(HarvestFailure::new(
                        url,
                        FailureKind::ItemExtraction,
                        "task panicked during fetch or extraction",
                    ));
                }
            }
        }

        failures
    }
}

/// Fetches and extracts one item, appending its record on success
async fn harvest_item(
    client: &dyn FetchClient,
    url: &str,
    timeout: Duration,
    collector: &DatasetCollector,
) -> Result<(), HarvestFailure> {
    tracing::debug!("Fetching item: {}", url);

    let html = fetch_page(client, url, timeout).await.map_err(|failure| {
        tracing::warn!("Failed to retrieve {}: {}", url, failure);
        HarvestFailure::new(url, FailureKind::ItemFetch, failure.to_string())
    })?;

    let record = extract_record(&html).map_err(|e| {
        tracing::warn!("Failed to extract {}: {}", url, e);
        HarvestFailure::new(url, FailureKind::ItemExtraction, e.to_string())
    })?;

    collector.append(record);
    tracing::debug!("Harvested {}", url);
    Ok(())
}

//! CSV dataset and failure-log sink
//!
//! The dataset header is the lexicographically sorted union of every field
//! name in the dataset, and a record without a field gets an empty cell.
//! Writing the same dataset twice produces the same bytes.

use crate::dataset::Dataset;
use crate::output::traits::{OutputResult, ResultSink};
use crate::state::HarvestFailure;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Header of the failure log
pub const FAILURE_LOG_HEADER: [&str; 3] = ["url", "kind", "reason"];

/// Writes a dataset as CSV
///
/// # Arguments
///
/// * `dataset` - The records to write
/// * `writer` - Destination for the CSV bytes
///
/// # Returns
///
/// * `Ok(())` - Header and every row were written
/// * `Err(OutputError)` - The writer failed
pub fn write_dataset<W: Write>(dataset: &Dataset, writer: W) -> OutputResult<()> {
    let header = dataset.header();
    let mut csv_writer = csv::Writer::from_writer(writer);

    if !header.is_empty() {
        csv_writer.write_record(&header)?;
    }

    for record in dataset.records() {
        csv_writer.write_record(header.iter().map(|field| record.cell(field)))?;
    }

    csv_writer.flush()?;
    Ok(())
}

/// Writes a dataset to a CSV file, replacing any previous content
pub fn write_dataset_to_path(dataset: &Dataset, path: &Path) -> OutputResult<()> {
    write_dataset(dataset, create_file(path)?)
}

/// Writes the failure log as CSV with columns `url,kind,reason`
///
/// Entries are sorted so the log does not depend on task completion order.
pub fn write_failure_log<W: Write>(failures: &[HarvestFailure], writer: W) -> OutputResult<()> {
    let mut sorted = failures.to_vec();
    sorted.sort();

    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(FAILURE_LOG_HEADER)?;

    for failure in &sorted {
        csv_writer.write_record([
            failure.url.as_str(),
            failure.kind.to_db_string(),
            failure.reason.as_str(),
        ])?;
    }

    csv_writer.flush()?;
    Ok(())
}

/// Writes the failure log to a file, replacing any previous content
pub fn write_failure_log_to_path(failures: &[HarvestFailure], path: &Path) -> OutputResult<()> {
    write_failure_log(failures, create_file(path)?)
}

fn create_file(path: &Path) -> OutputResult<File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    Ok(File::create(path)?)
}

/// File sink writing the dataset and, optionally, the failure log
pub struct CsvSink {
    dataset_path: PathBuf,
    failure_log_path: Option<PathBuf>,
}

impl CsvSink {
    pub fn new(dataset_path: impl Into<PathBuf>, failure_log_path: Option<PathBuf>) -> Self {
        Self {
            dataset_path: dataset_path.into(),
            failure_log_path,
        }
    }
}

impl ResultSink for CsvSink {
    fn name(&self) -> &str {
        "csv"
    }

    fn emit(&mut self, dataset: &Dataset, failures: &[HarvestFailure]) -> OutputResult<()> {
        write_dataset_to_path(dataset, &self.dataset_path)?;
        tracing::info!(
            "Wrote {} records to {}",
            dataset.len(),
            self.dataset_path.display()
        );

        if let Some(path) = &self.failure_log_path {
            write_failure_log_to_path(failures, path)?;
            tracing::info!("Wrote {} failures to {}", failures.len(), path.display());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{fields, FieldValue, Record};
    use crate::state::FailureKind;

    fn sample_dataset() -> Dataset {
        let mut first = Record::new();
        first.set(fields::NAME, FieldValue::text("Move to Heaven"));
        first.set(fields::RATING, Some(FieldValue::Decimal(9.2)));
        first.set(fields::COUNTRY, FieldValue::text("South Korea"));

        let mut second = Record::new();
        second.set(fields::NAME, FieldValue::text("Flower of Evil, The"));
        second.set(fields::NUM_WATCHERS, Some(FieldValue::Integer(61_000)));
        second.set(fields::DIRECTOR, None);

        vec![first, second].into_iter().collect()
    }

    fn to_string(dataset: &Dataset) -> String {
        let mut buffer = Vec::new();
        write_dataset(dataset, &mut buffer).unwrap();
        String::from_utf8(buffer).unwrap()
    }

    #[test]
    fn test_header_is_sorted_union() {
        let csv = to_string(&sample_dataset());
        let mut lines = csv.lines();

        assert_eq!(
            lines.next(),
            Some("Name,country,director,num_watchers,rating")
        );
        assert_eq!(lines.next(), Some("Move to Heaven,South Korea,,,9.2"));
        assert_eq!(lines.next(), Some("\"Flower of Evil, The\",,,61000,"));
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn test_emission_is_idempotent() {
        let dataset = sample_dataset();
        assert_eq!(to_string(&dataset), to_string(&dataset));

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dataset.csv");
        write_dataset_to_path(&dataset, &path).unwrap();
        let first = fs::read(&path).unwrap();
        write_dataset_to_path(&dataset, &path).unwrap();
        let second = fs::read(&path).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_empty_dataset_writes_nothing() {
        assert_eq!(to_string(&Dataset::new()), "");
    }

    #[test]
    fn test_failure_log_is_sorted() {
        let failures = vec![
            HarvestFailure::new("https://example.com/c", FailureKind::ItemFetch, "HTTP 500"),
            HarvestFailure::new(
                "https://example.com/top?page=2",
                FailureKind::ListingFetch,
                "HTTP 503",
            ),
            HarvestFailure::new("https://example.com/a", FailureKind::ItemExtraction, "no title"),
        ];

        let mut buffer = Vec::new();
        write_failure_log(&failures, &mut buffer).unwrap();
        let log = String::from_utf8(buffer).unwrap();

        assert_eq!(
            log,
            "url,kind,reason\n\
             https://example.com/a,item_extraction,no title\n\
             https://example.com/c,item_fetch,HTTP 500\n\
             https://example.com/top?page=2,listing_fetch,HTTP 503\n"
        );
    }

    #[test]
    fn test_sink_writes_both_files() {
        let dir = tempfile::tempdir().unwrap();
        let dataset_path = dir.path().join("out").join("dataset.csv");
        let failure_path = dir.path().join("out").join("failures.csv");

        let mut sink = CsvSink::new(&dataset_path, Some(failure_path.clone()));
        let failures = vec![HarvestFailure::new(
            "https://example.com/c",
            FailureKind::ItemFetch,
            "HTTP 500",
        )];
        sink.emit(&sample_dataset(), &failures).unwrap();

        assert_eq!(fs::read_to_string(&dataset_path).unwrap().lines().count(), 3);
        assert_eq!(fs::read_to_string(&failure_path).unwrap().lines().count(), 2);
    }
}

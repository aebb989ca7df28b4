//! Output module for emitting harvest results and reports
//!
//! This module handles:
//! - Writing the dataset and the failure log as CSV
//! - Recording runs in the SQLite database
//! - Generating markdown summaries and printing statistics

mod csv_output;
mod markdown;
mod sqlite_output;
pub mod stats;
mod traits;

pub use csv_output::{
    write_dataset, write_dataset_to_path, write_failure_log, write_failure_log_to_path, CsvSink,
    FAILURE_LOG_HEADER,
};
pub use markdown::{format_markdown_summary, generate_markdown_summary};
pub use sqlite_output::SqliteSink;
pub use stats::{load_statistics, print_statistics, HarvestStatistics};
pub use traits::{HarvestSummary, OutputError, OutputResult, ResultSink};

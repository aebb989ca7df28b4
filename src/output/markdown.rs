//! Markdown summary generation
//!
//! This module generates a human-readable markdown report of a harvest run,
//! including phase statistics, the failure breakdown and field coverage.

use crate::output::traits::{HarvestSummary, OutputResult};
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

/// Writes a markdown summary of a run
///
/// # Arguments
///
/// * `summary` - The run summary data
/// * `output_path` - Path where the markdown file should be written
///
/// # Returns
///
/// * `Ok(())` - Successfully wrote markdown summary
/// * `Err(OutputError)` - Failed to write summary
pub fn generate_markdown_summary(summary: &HarvestSummary, output_path: &Path) -> OutputResult<()> {
    if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(output_path, format_markdown_summary(summary))?;
    Ok(())
}

/// Formats a run summary as markdown
pub fn format_markdown_summary(summary: &HarvestSummary) -> String {
    let mut md = String::new();

    md.push_str("# Catalog Harvest Summary\n\n");

    md.push_str("## Run Information\n\n");
    if let Some(run_id) = summary.run_id {
        let _ = writeln!(md, "- **Run ID**: {}", run_id);
    }
    let _ = writeln!(md, "- **Started**: {}", summary.started_at);
    if let Some(finished) = &summary.finished_at {
        let _ = writeln!(md, "- **Finished**: {}", finished);
    }
    if let Some(duration) = summary.duration_seconds {
        let _ = writeln!(
            md,
            "- **Duration**: {} seconds ({:.2} minutes)",
            duration,
            duration as f64 / 60.0
        );
    }
    let _ = writeln!(md, "- **Config Hash**: {}\n", summary.config_hash);

    md.push_str("## Discovery\n\n");
    let _ = writeln!(
        md,
        "- **Listing Pages**: {} ({} failed)",
        summary.listing_pages_attempted, summary.listing_pages_failed
    );
    let _ = writeln!(md, "- **Item Links Found**: {}", summary.urls_discovered);
    let _ = writeln!(md, "- **Unique Item URLs**: {}", summary.frontier_size);
    let _ = writeln!(md, "- **Duplicate Rate**: {:.2}%\n", summary.duplicate_rate());

    md.push_str("## Harvest\n\n");
    let _ = writeln!(md, "- **Item Pages Attempted**: {}", summary.items_attempted);
    let _ = writeln!(md, "- **Batches**: {}", summary.batches);
    let _ = writeln!(md, "- **Records**: {}", summary.records);
    let _ = writeln!(md, "- **Success Rate**: {:.2}%\n", summary.success_rate());

    if summary.total_failures() > 0 {
        md.push_str("## Failures\n\n");
        md.push_str("| Kind | Count |\n");
        md.push_str("|------|-------|\n");
        for (kind, count) in &summary.failures_by_kind {
            let _ = writeln!(md, "| {} | {} |", kind, count);
        }
        md.push('\n');
    }

    if !summary.columns.is_empty() {
        md.push_str("## Field Coverage\n\n");
        md.push_str("| Field | Records | Coverage |\n");
        md.push_str("|-------|---------|----------|\n");
        for column in &summary.columns {
            let count = summary.field_coverage.get(column).copied().unwrap_or(0);
            let coverage = if summary.records > 0 {
                (count as f64 / summary.records as f64) * 100.0
            } else {
                0.0
            };
            let _ = writeln!(md, "| {} | {} | {:.1}% |", column, count, coverage);
        }
        md.push('\n');
    }

    md
}

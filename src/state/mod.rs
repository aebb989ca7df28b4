//! Outcome tracking for a harvest run
//!
//! This module defines how soft failures are classified and recorded.
//!
//! # Components
//!
//! - `FailureKind`: Which phase a failure happened in (listing fetch, item fetch, extraction)
//! - `HarvestFailure`: One failure-log entry (URL, kind, reason)

mod outcome;

pub use outcome::{FailureKind, HarvestFailure};

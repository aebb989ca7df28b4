//! Dataset module: records, field values and the aggregation point
//!
//! Records are produced by the item extractor, submitted by harvest workers
//! through a [`DatasetCollector`], and frozen into a [`Dataset`] that the
//! output sinks consume.

mod collector;
mod record;

pub use collector::{Dataset, DatasetCollector};
pub use record::{fields, FieldValue, Record, LIST_SEPARATOR};

//! Dataset and its synchronized aggregation point

use crate::dataset::record::Record;
use std::collections::BTreeSet;
use std::sync::{Mutex, PoisonError};

/// Ordered sequence of records produced by one run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    records: Vec<Record>,
}

impl Dataset {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: Record) {
        self.records.push(record);
    }

    /// Union of all field names across all records, in lexicographic order
    pub fn header(&self) -> Vec<String> {
        let names: BTreeSet<&str> = self
            .records
            .iter()
            .flat_map(|record| record.field_names())
            .collect();
        names.into_iter().map(str::to_string).collect()
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl FromIterator<Record> for Dataset {
    fn from_iter<I: IntoIterator<Item = Record>>(iter: I) -> Self {
        Self {
            records: iter.into_iter().collect(),
        }
    }
}

/// The single point through which concurrent workers submit records
///
/// Workers share it behind an `Arc` and only ever call [`append`]; the
/// dataset itself is handed out once, after every worker is done.
///
/// [`append`]: DatasetCollector::append
#[derive(Debug, Default)]
pub struct DatasetCollector {
    inner: Mutex<Dataset>,
}

impl DatasetCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one completed record under the collector's lock
    pub fn append(&self, record: Record) {
        // Vec::push never leaves a partial element behind, so a poisoned
        // lock still guards a consistent dataset.
        let mut dataset = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        dataset.push(record);
    }

    /// Number of records appended so far
    pub fn len(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copies the records appended so far
    pub fn snapshot(&self) -> Dataset {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Freezes the collector and hands the dataset to its consumer
    pub fn into_dataset(self) -> Dataset {
        self.inner.into_inner().unwrap_or_else(PoisonError::into_inner)
    }
}

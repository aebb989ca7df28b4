/// Failure taxonomy for a harvest run
///
/// Every failure recorded here is soft: it degrades one listing page or one
/// item URL and never aborts the run.
use std::fmt;

/// Which phase a soft failure happened in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FailureKind {
    /// A listing page could not be retrieved during discovery
    ListingFetch,

    /// An item page could not be retrieved (non-2xx status or transport error)
    ItemFetch,

    /// An item page was retrieved but no usable record could be extracted
    ItemExtraction,
}

impl FailureKind {
    /// Returns true if the failure happened while harvesting item pages
    pub fn is_item_failure(&self) -> bool {
        matches!(self, Self::ItemFetch | Self::ItemExtraction)
    }

    /// Converts the kind to its database / failure-log representation
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::ListingFetch => "listing_fetch",
            Self::ItemFetch => "item_fetch",
            Self::ItemExtraction => "item_extraction",
        }
    }

    /// Parses a kind from its database representation
    ///
    /// Returns None if the string doesn't match any known kind.
    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "listing_fetch" => Some(Self::ListingFetch),
            "item_fetch" => Some(Self::ItemFetch),
            "item_extraction" => Some(Self::ItemExtraction),
            _ => None,
        }
    }

    /// Returns all failure kinds
    pub fn all_kinds() -> [Self; 3] {
        [Self::ListingFetch, Self::ItemFetch, Self::ItemExtraction]
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}

/// One entry of the failure log
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct HarvestFailure {
    /// The listing or item URL that failed
    pub url: String,

    /// The phase it failed in
    pub kind: FailureKind,

    /// Human-readable reason (status code, transport error, missing fields)
    pub reason: String,
}

impl HarvestFailure {
    pub fn new(url: impl Into<String>, kind: FailureKind, reason: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            kind,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for HarvestFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.kind, self.url, self.reason)
    }
}

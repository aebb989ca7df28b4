use serde::Deserialize;
use std::time::Duration;

/// Placeholder substituted with the page number in listing templates
pub const PAGE_PLACEHOLDER: &str = "{page}";

/// Main configuration structure for Catalog-Harvest
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub harvester: HarvesterConfig,
    #[serde(default)]
    pub client: ClientConfig,
    pub site: SiteConfig,
    #[serde(rename = "listing", default)]
    pub listings: Vec<ListingConfig>,
    pub output: OutputConfig,
}

impl Config {
    /// Total number of listing pages the discovery phase will request
    pub fn total_listing_pages(&self) -> u64 {
        self.listings.iter().map(|l| u64::from(l.pages)).sum()
    }
}

/// Harvest phase behavior
#[derive(Debug, Clone, Deserialize)]
pub struct HarvesterConfig {
    /// Maximum number of fetch+extract tasks active at once (W)
    pub workers: usize,

    /// Number of item URLs per batch (B)
    #[serde(rename = "batch-size")]
    pub batch_size: usize,

    /// Fixed pause between batches (milliseconds)
    #[serde(rename = "batch-pause-ms", default = "default_batch_pause_ms")]
    pub batch_pause_ms: u64,

    /// Timeout applied to every single fetch (seconds)
    #[serde(rename = "request-timeout-secs", default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl HarvesterConfig {
    pub fn batch_pause(&self) -> Duration {
        Duration::from_millis(self.batch_pause_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn default_batch_pause_ms() -> u64 {
    2000
}

fn default_request_timeout_secs() -> u64 {
    30
}

/// HTTP client identity and connection settings
#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,

    #[serde(rename = "connect-timeout-secs", default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

fn default_user_agent() -> String {
    format!("catalog-harvest/{}", env!("CARGO_PKG_VERSION"))
}

fn default_connect_timeout_secs() -> u64 {
    10
}

/// The site whose listing pages link to item pages
#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
    /// Base URL that relative item links are resolved against
    #[serde(rename = "base-url")]
    pub base_url: String,
}

/// A paginated listing, e.g. `https://example.com/shows/top?page={page}`
#[derive(Debug, Clone, Deserialize)]
pub struct ListingConfig {
    pub template: String,

    /// Pages 1..=pages are requested
    pub pages: u32,
}

impl ListingConfig {
    /// Expands the template into one URL per page, in page order
    pub fn page_urls(&self) -> Vec<String> {
        (1..=self.pages)
            .map(|page| self.template.replace(PAGE_PLACEHOLDER, &page.to_string()))
            .collect()
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the CSV dataset
    #[serde(rename = "dataset-path")]
    pub dataset_path: String,

    /// Path to the CSV failure log
    #[serde(rename = "failure-log-path", default)]
    pub failure_log_path: Option<String>,

    /// Path to the SQLite database file
    #[serde(rename = "database-path", default)]
    pub database_path: Option<String>,

    /// Path to the markdown run summary
    #[serde(rename = "summary-path", default)]
    pub summary_path: Option<String>,
}

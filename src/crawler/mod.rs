//! Harvest core
//!
//! This module contains everything between a listing template and a record:
//! - The fetch client capability and its HTTP implementation
//! - Link discovery on listing pages
//! - Field extraction on item pages
//! - Frontier construction (discovery phase)
//! - Batched concurrent harvesting (harvest phase)

mod extract;
mod fetcher;
mod frontier;
mod harvester;
mod listing;

pub use extract::{extract_record, value_by_label, ExtractError};
pub use fetcher::{
    build_http_client, fetch_page, FetchClient, FetchError, FetchFailure, FetchResponse,
    HttpFetcher,
};
pub use frontier::{build_frontier, DiscoveryReport, Frontier};
pub use harvester::{partition_batches, HarvestReport, Harvester};
pub use listing::{discover_item_urls, ITEM_HEADING_SELECTOR};

//! URL frontier construction
//!
//! The discovery phase requests every (listing template, page number) pair
//! exactly once, runs the link discoverer over each page that came back, and
//! folds all item URLs into one deduplicated frontier. A listing page that
//! cannot be fetched is logged and contributes nothing; it never stops the
//! remaining pages.

use crate::config::ListingConfig;
use crate::crawler::fetcher::{fetch_page, FetchClient};
use crate::crawler::listing::discover_item_urls;
use crate::state::{FailureKind, HarvestFailure};
use std::collections::HashSet;
use std::time::Duration;

/// Deduplicated set of item URLs, remembering first-seen order
///
/// Order is not part of the frontier's contract, but keeping it makes batch
/// partitioning reproducible for a given set of listing pages.
#[derive(Debug, Clone, Default)]
pub struct Frontier {
    seen: HashSet<String>,
    urls: Vec<String>,
}

impl Frontier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a URL, returning false if it was already present
    pub fn insert(&mut self, url: String) -> bool {
        if self.seen.contains(&url) {
            return false;
        }
        self.seen.insert(url.clone());
        self.urls.push(url);
        true
    }

    pub fn contains(&self, url: &str) -> bool {
        self.seen.contains(url)
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }

    pub fn urls(&self) -> &[String] {
        &self.urls
    }

    /// Hands the work list over to the harvest phase
    pub fn into_urls(self) -> Vec<String> {
        self.urls
    }
}

impl Extend<String> for Frontier {
    fn extend<I: IntoIterator<Item = String>>(&mut self, iter: I) {
        for url in iter {
            self.insert(url);
        }
    }
}

/// Result of the discovery phase
#[derive(Debug, Default)]
pub struct DiscoveryReport {
    /// Deduplicated item URLs
    pub frontier: Frontier,

    /// Listing pages requested
    pub pages_attempted: usize,

    /// Listing pages that could not be fetched
    pub pages_failed: usize,

    /// Item URLs discovered before deduplication
    pub urls_seen: usize,

    /// One entry per failed listing page
    pub failures: Vec<HarvestFailure>,
}

/// Builds the frontier from every page of every listing
///
/// # Arguments
///
/// * `client` - Fetch client used for listing pages
/// * `listings` - Listing templates with their page bounds
/// * `base_url` - Site base URL item hrefs are resolved against
/// * `timeout` - Per-request timeout
///
/// # Returns
///
/// A report holding the frontier and the per-page failures. Failed pages are
/// recorded, not returned as errors.
pub async fn build_frontier(
    client: &dyn FetchClient,
    listings: &[ListingConfig],
    base_url: &str,
    timeout: Duration,
) -> DiscoveryReport {
    let mut report = DiscoveryReport::default();

    for listing in listings {
        for page_url in listing.page_urls() {
            report.pages_attempted += 1;
            tracing::debug!("Fetching listing page: {}", page_url);

            match fetch_page(client, &page_url, timeout).await {
                Ok(html) => {
                    let item_urls = discover_item_urls(&html, base_url);
                    if item_urls.is_empty() {
                        tracing::debug!("No item links found on {}", page_url);
                    }

                    report.urls_seen += item_urls.len();
                    report.frontier.extend(item_urls);
                }
                Err(failure) => {
                    tracing::warn!("Failed to retrieve listing page {}: {}", page_url, failure);
                    report.pages_failed += 1;
                    report.failures.push(HarvestFailure::new(
                        page_url,
                        FailureKind::ListingFetch,
                        failure.to_string(),
                    ));
                }
            }
        }
    }

    tracing::info!(
        "Discovery complete: {} unique item URLs from {} listing pages ({} failed)",
        report.frontier.len(),
        report.pages_attempted,
        report.pages_failed
    );

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::fetcher::{FetchError, FetchResponse};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Serves canned listing pages and counts requests per URL
    struct ListingServer {
        pages: HashMap<String, (u16, String)>,
        requests: Mutex<HashMap<String, usize>>,
    }

    impl ListingServer {
        fn new(pages: Vec<(&str, u16, String)>) -> Self {
            Self {
                pages: pages
                    .into_iter()
                    .map(|(url, status, body)| (url.to_string(), (status, body)))
                    .collect(),
                requests: Mutex::new(HashMap::new()),
            }
        }

        fn request_count(&self, url: &str) -> usize {
            self.requests.lock().unwrap().get(url).copied().unwrap_or(0)
        }
    }

    #[async_trait]
    impl FetchClient for ListingServer {
        async fn fetch(&self, url: &str, _timeout: Duration) -> Result<FetchResponse, FetchError> {
            *self.requests.lock().unwrap().entry(url.to_string()).or_insert(0) += 1;

            match self.pages.get(url) {
                Some((status, body)) => Ok(FetchResponse {
                    status: *status,
                    final_url: url.to_string(),
                    body: body.clone(),
                }),
                None => Err(FetchError::Connect {
                    url: url.to_string(),
                    message: "connection refused".to_string(),
                }),
            }
        }
    }

    fn listing_html(hrefs: &[&str]) -> String {
        hrefs
            .iter()
            .map(|href| format!(r#"<h6 class="text-primary title"><a href="{}">t</a></h6>"#, href))
            .collect()
    }

    fn listing(template: &str, pages: u32) -> ListingConfig {
        ListingConfig {
            template: template.to_string(),
            pages,
        }
    }

    const BASE: &str = "https://example.com";
    const TIMEOUT: Duration = Duration::from_secs(1);

    #[test]
    fn test_frontier_deduplicates() {
        let mut frontier = Frontier::new();
        assert!(frontier.insert("https://example.com/a".to_string()));
        assert!(frontier.insert("https://example.com/b".to_string()));
        assert!(!frontier.insert("https://example.com/a".to_string()));

        assert_eq!(frontier.len(), 2);
        assert!(frontier.contains("https://example.com/b"));
        assert_eq!(
            frontier.into_urls(),
            vec!["https://example.com/a", "https://example.com/b"]
        );
    }

    #[tokio::test]
    async fn test_build_frontier_dedups_across_pages_and_listings() {
        let server = ListingServer::new(vec![
            ("https://example.com/shows?page=1", 200, listing_html(&["/1", "/2"])),
            ("https://example.com/shows?page=2", 200, listing_html(&["/2", "/3"])),
            ("https://example.com/movies?page=1", 200, listing_html(&["/3", "/4", "/4"])),
        ]);
        let listings = vec![
            listing("https://example.com/shows?page={page}", 2),
            listing("https://example.com/movies?page={page}", 1),
        ];

        let report = build_frontier(&server, &listings, BASE, TIMEOUT).await;

        assert_eq!(report.pages_attempted, 3);
        assert_eq!(report.pages_failed, 0);
        assert_eq!(report.urls_seen, 7);
        assert_eq!(report.frontier.len(), 4);
        assert!(report.frontier.len() <= report.urls_seen);

        let unique: HashSet<&String> = report.frontier.urls().iter().collect();
        assert_eq!(unique.len(), report.frontier.len());
    }

    #[tokio::test]
    async fn test_failed_listing_pages_are_skipped() {
        let server = ListingServer::new(vec![
            ("https://example.com/top?page=1", 200, listing_html(&["/1"])),
            ("https://example.com/top?page=2", 503, String::new()),
            // page 3 is not served: transport error
            ("https://example.com/top?page=4", 200, listing_html(&["/4"])),
        ]);
        let listings = vec![listing("https://example.com/top?page={page}", 4)];

        let report = build_frontier(&server, &listings, BASE, TIMEOUT).await;

        assert_eq!(report.pages_attempted, 4);
        assert_eq!(report.pages_failed, 2);
        assert_eq!(
            report.frontier.urls(),
            &["https://example.com/1".to_string(), "https://example.com/4".to_string()]
        );

        assert_eq!(report.failures.len(), 2);
        assert!(report
            .failures
            .iter()
            .all(|f| f.kind == FailureKind::ListingFetch));
        assert_eq!(report.failures[0].url, "https://example.com/top?page=2");
        assert_eq!(report.failures[0].reason, "HTTP 503");
    }

    #[tokio::test]
    async fn test_each_listing_page_requested_once() {
        let server = ListingServer::new(vec![
            ("https://example.com/top?page=1", 200, listing_html(&["/1"])),
            ("https://example.com/top?page=2", 200, String::new()),
        ]);
        let listings = vec![listing("https://example.com/top?page={page}", 2)];

        let report = build_frontier(&server, &listings, BASE, TIMEOUT).await;

        assert_eq!(server.request_count("https://example.com/top?page=1"), 1);
        assert_eq!(server.request_count("https://example.com/top?page=2"), 1);
        assert_eq!(report.frontier.len(), 1);
    }
}

//! Listing-page link discovery
//!
//! A listing page wraps every catalog entry's title link in a heading. This
//! module pulls those links out and turns them into absolute item URLs. It
//! never deduplicates and never checks that a URL resolves; both are left to
//! the frontier and the harvester.

use scraper::{Html, Selector};
use url::Url;

/// Heading element that wraps an item's title link on a listing page
pub const ITEM_HEADING_SELECTOR: &str = "h6.text-primary.title";

/// Extracts the item URLs linked from one listing page, in document order
///
/// # Arguments
///
/// * `html` - The listing page HTML
/// * `base_url` - The site base URL relative hrefs are resolved against
///
/// # Returns
///
/// One absolute URL per heading that wraps a link with an `href`. A page
/// without any matching heading yields an empty vector.
///
/// # Example
///
/// ```
/// use catalog_harvest::crawler::discover_item_urls;
///
/// let html = r#"<h6 class="text-primary title"><a href="/1-move-to-heaven">Move to Heaven</a></h6>"#;
/// let urls = discover_item_urls(html, "https://example.com");
/// assert_eq!(urls, vec!["https://example.com/1-move-to-heaven"]);
/// ```
pub fn discover_item_urls(html: &str, base_url: &str) -> Vec<String> {
    let document = Html::parse_document(html);

    let (Ok(heading_selector), Ok(link_selector)) =
        (Selector::parse(ITEM_HEADING_SELECTOR), Selector::parse("a"))
    else {
        return Vec::new();
    };

    document
        .select(&heading_selector)
        .filter_map(|heading| heading.select(&link_selector).next())
        .filter_map(|link| link.value().attr("href"))
        .filter_map(|href| resolve_item_href(href, base_url))
        .collect()
}

/// Turns an item href into an absolute URL
///
/// Relative hrefs are appended to the base URL; absolute http(s) hrefs are
/// kept as they are. Empty hrefs and fragment-only anchors are dropped.
fn resolve_item_href(href: &str, base_url: &str) -> Option<String> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    if let Ok(absolute) = Url::parse(href) {
        return match absolute.scheme() {
            "http" | "https" => Some(href.to_string()),
            _ => None,
        };
    }

    let base = base_url.trim_end_matches('/');
    if href.starts_with('/') {
        Some(format!("{}{}", base, href))
    } else {
        Some(format!("{}/{}", base, href))
    }
}

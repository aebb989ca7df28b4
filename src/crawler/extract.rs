//! Item-page field extraction
//!
//! Turns one item page into a [`Record`]. Every field is looked up on its
//! own and comes back as an `Option`: a missing container, attribute or
//! sibling leaves that one field unset and never stops the others. Only the
//! item title is required; without it there is no record.
//!
//! # Page regions
//!
//! | Field(s) | Located by |
//! |----------|------------|
//! | `Name` | `h1.film-title` |
//! | `rating` | first `div` inside `div.col-film-rating` |
//! | `url` | `src` of `img[itempropx=image]` |
//! | `num_raters` | "from N users" inside a `div.hfs` |
//! | `genre_names`, `tag_names` | links in `div.show-detailsxss` |
//! | `category`, `country`, `num_episodes`, `aired`, `original_network`, `duration` | bold labels in `div.box-body.light-b` |
//! | `director`, `screenwriter` | links in the list item of a bold label |
//! | `num_watchers` | bold "Watchers:" label |
//! | `synopsis` | `div.show-synopsis` |
//! | `cast_names` | `title` of `a.text-primary.text-ellipsis` |

use crate::dataset::{fields, FieldValue, Record};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;
use thiserror::Error;

/// Matches "from 22,605 users" / "rated by 1,024 users"
static USER_COUNT_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:from|by)\s+([0-9][0-9,]*)\s+users?\b")
        .expect("hardcoded regex pattern is valid")
});

/// Sidebar labels read with [`value_by_label`], and the field each one fills
const SIDEBAR_LABELS: [(&str, &str); 6] = [
    (fields::CATEGORY, "Type:"),
    (fields::COUNTRY, "Country:"),
    (fields::NUM_EPISODES, "Episodes:"),
    (fields::AIRED, "Aired:"),
    (fields::ORIGINAL_NETWORK, "Original Network:"),
    (fields::DURATION, "Duration:"),
];

/// Errors that stop a whole item page from producing a record
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExtractError {
    #[error("Document is empty or not navigable; could not resolve: {}", .fields.join(", "))]
    MalformedDocument { fields: Vec<String> },

    #[error("Could not resolve required field(s): {}", .fields.join(", "))]
    MissingRequired { fields: Vec<String> },
}

/// Extracts a record from one item page
///
/// # Arguments
///
/// * `html` - The item page HTML
///
/// # Returns
///
/// * `Ok(Record)` - The title plus whatever optional fields could be resolved
/// * `Err(ExtractError)` - The page has no usable title
///
/// # Example
///
/// ```
/// use catalog_harvest::crawler::extract_record;
///
/// let record = extract_record(r#"<h1 class="film-title">Quiet Film</h1>"#).unwrap();
/// assert_eq!(record.name(), Some("Quiet Film"));
/// assert!(record.get("director").is_none());
/// ```
pub fn extract_record(html: &str) -> Result<Record, ExtractError> {
    if html.trim().is_empty() {
        return Err(ExtractError::MalformedDocument {
            fields: vec![fields::NAME.to_string()],
        });
    }

    let document = Html::parse_document(html);

    let name = extract_title(&document).ok_or_else(|| ExtractError::MissingRequired {
        fields: vec![fields::NAME.to_string()],
    })?;

    let mut record = Record::new();
    record.set(fields::NAME, Some(FieldValue::Text(name)));
    record.set(fields::RATING, extract_rating(&document));
    record.set(fields::IMAGE_URL, extract_image_url(&document));
    record.set(fields::NUM_RATERS, extract_num_raters(&document));

    if let Some(details) = first_match(&document, "div.show-detailsxss") {
        record.set(fields::GENRES, link_texts(details, "li.show-genres a"));
        record.set(fields::TAGS, link_texts(details, "li.show-tags a.text-primary"));
    }

    let sidebars = all_matches(&document, "div.box-body.light-b");
    if !sidebars.is_empty() {
        for (field, label) in SIDEBAR_LABELS {
            let value = sidebars
                .iter()
                .find_map(|section| value_by_label(*section, label));
            record.set(field, value.and_then(FieldValue::text));
        }

        // Some layouts wrap the type in a span next to its label
        if let Some(category) = sidebars
            .iter()
            .find_map(|section| category_from_span(*section))
        {
            record.set(fields::CATEGORY, Some(category));
        }
    }

    let root = document.root_element();
    record.set(fields::DIRECTOR, people_by_label(root, "Director:"));
    record.set(fields::SCREENWRITER, people_by_label(root, "Screenwriter:"));
    record.set(
        fields::NUM_WATCHERS,
        value_by_label(root, "Watchers:").and_then(|v| parse_count(&v).map(FieldValue::Integer)),
    );
    record.set(fields::SYNOPSIS, extract_synopsis(&document));
    record.set(fields::CAST, extract_cast(&document));

    tracing::trace!(
        "Extracted '{}' with {} of {} fields set",
        record.name().unwrap_or_default(),
        fields::ALL.iter().filter(|f| record.get(f).is_some()).count(),
        fields::ALL.len()
    );

    Ok(record)
}

/// Extracts the item title, the only required field
fn extract_title(document: &Html) -> Option<String> {
    let title = first_match(document, "h1.film-title")?;
    let text = collapse_whitespace(&element_text(title));
    (!text.is_empty()).then_some(text)
}

/// Rating lives in the first `div` of the rating box
fn extract_rating(document: &Html) -> Option<FieldValue> {
    let rating = first_match(document, "div.col-film-rating div")?;
    let text = element_text(rating);
    let text = text.trim();

    match text.parse::<f64>() {
        Ok(value) if value.is_finite() => Some(FieldValue::Decimal(value)),
        _ => FieldValue::text(text),
    }
}

fn extract_image_url(document: &Html) -> Option<FieldValue> {
    let image = first_match(document, r#"img[itempropx="image"]"#)?;
    image.value().attr("src").and_then(FieldValue::text)
}

/// Finds the "from N users" sentence in any rating-summary block
fn extract_num_raters(document: &Html) -> Option<FieldValue> {
    let selector = Selector::parse("div.hfs").ok()?;

    document.select(&selector).find_map(|block| {
        let text = block.text().collect::<Vec<_>>().join(" ");
        let captures = USER_COUNT_REGEX.captures(&text)?;
        parse_count(captures.get(1)?.as_str()).map(FieldValue::Integer)
    })
}

fn extract_synopsis(document: &Html) -> Option<FieldValue> {
    let synopsis = first_match(document, "div.show-synopsis")?;
    FieldValue::text(collapse_whitespace(&element_text(synopsis)))
}

/// Cast members carry their full name in the link's `title` attribute
fn extract_cast(document: &Html) -> Option<FieldValue> {
    let selector = Selector::parse("a.text-primary.text-ellipsis[title]").ok()?;
    let names: Vec<&str> = document
        .select(&selector)
        .filter_map(|link| link.value().attr("title"))
        .collect();
    FieldValue::joined(names)
}

/// Reads the value that follows a bold label inside `scope`
///
/// The value is the text of the first `<a>` sibling after the label if there
/// is one, otherwise the text node directly after the label.
///
/// ```text
/// <li><b>Country:</b> South Korea</li>
/// <li><b>Original Network:</b> <a href="...">Netflix</a></li>
/// ```
pub fn value_by_label(scope: ElementRef<'_>, label: &str) -> Option<String> {
    let label_node = find_label(scope, label)?;

    let linked = label_node
        .next_siblings()
        .filter_map(ElementRef::wrap)
        .find(|sibling| sibling.value().name() == "a");

    let text = match linked {
        Some(link) => element_text(link),
        None => {
            let next = label_node.next_sibling()?;
            next.value().as_text()?.trim().to_string()
        }
    };

    let text = collapse_whitespace(&text);
    (!text.is_empty()).then_some(text)
}

/// Reads every linked name in the list item that holds a bold label
///
/// ```text
/// <li><b>Screenwriter:</b> <a>Yoon Ji Ryun</a>, <a>Kim Sae Byul</a></li>
/// ```
fn people_by_label(scope: ElementRef<'_>, label: &str) -> Option<FieldValue> {
    let label_node = find_label(scope, label)?;
    let item = enclosing(label_node, "li")?;
    link_texts(item, "a")
}

/// Category override: a `<span>` in the same list item as the "Type:" label
fn category_from_span(scope: ElementRef<'_>) -> Option<FieldValue> {
    let label_node = find_label(scope, "Type:")?;
    let item = enclosing(label_node, "li")?;
    let span = first_child_match(item, "span")?;
    FieldValue::text(collapse_whitespace(&element_text(span)))
}

/// Finds the `<b>` whose trimmed text is exactly `label`
fn find_label<'a>(scope: ElementRef<'a>, label: &str) -> Option<ElementRef<'a>> {
    let selector = Selector::parse("b").ok()?;
    scope
        .select(&selector)
        .find(|bold| element_text(*bold).trim() == label)
}

/// Nearest ancestor element with the given tag name
fn enclosing<'a>(element: ElementRef<'a>, tag: &str) -> Option<ElementRef<'a>> {
    element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .find(|ancestor| ancestor.value().name() == tag)
}

/// Joins the text of every element matching `selector` below `scope`
fn link_texts(scope: ElementRef<'_>, selector: &str) -> Option<FieldValue> {
    let selector = Selector::parse(selector).ok()?;
    let texts: Vec<String> = scope.select(&selector).map(element_text).collect();
    FieldValue::joined(texts)
}

fn first_match<'a>(document: &'a Html, selector: &str) -> Option<ElementRef<'a>> {
    let selector = Selector::parse(selector).ok()?;
    document.select(&selector).next()
}

fn first_child_match<'a>(scope: ElementRef<'a>, selector: &str) -> Option<ElementRef<'a>> {
    let selector = Selector::parse(selector).ok()?;
    scope.select(&selector).next()
}

fn all_matches<'a>(document: &'a Html, selector: &str) -> Vec<ElementRef<'a>> {
    match Selector::parse(selector) {
        Ok(selector) => document.select(&selector).collect(),
        Err(_) => Vec::new(),
    }
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect()
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Parses "22,605" style counts
fn parse_count(text: &str) -> Option<u64> {
    text.trim().replace(',', "").parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL_PAGE: &str = include_str!("../../tests/fixtures/item_full.html");
    const SPARSE_PAGE: &str = include_str!("../../tests/fixtures/item_sparse.html");

    fn text(record: &Record, field: &str) -> Option<String> {
        record.get(field).map(ToString::to_string)
    }

    #[test]
    fn test_full_page_extracts_every_field() {
        let record = extract_record(FULL_PAGE).unwrap();

        assert_eq!(record.name(), Some("Move to Heaven (2021)"));
        assert_eq!(record.get(fields::RATING), Some(&FieldValue::Decimal(9.2)));
        assert_eq!(
            text(&record, fields::IMAGE_URL).as_deref(),
            Some("https://img.example.com/covers/49231.jpg")
        );
        assert_eq!(record.get(fields::NUM_RATERS), Some(&FieldValue::Integer(22605)));
        assert_eq!(text(&record, fields::GENRES).as_deref(), Some("Life, Drama, Family"));
        assert_eq!(text(&record, fields::TAGS).as_deref(), Some("Autism, Trauma Cleaner"));
        assert_eq!(text(&record, fields::CATEGORY).as_deref(), Some("Drama"));
        assert_eq!(text(&record, fields::COUNTRY).as_deref(), Some("South Korea"));
        assert_eq!(text(&record, fields::NUM_EPISODES).as_deref(), Some("10"));
        assert_eq!(text(&record, fields::AIRED).as_deref(), Some("May 14, 2021"));
        assert_eq!(text(&record, fields::ORIGINAL_NETWORK).as_deref(), Some("Netflix"));
        assert_eq!(text(&record, fields::DURATION).as_deref(), Some("52 min."));
        assert_eq!(text(&record, fields::DIRECTOR).as_deref(), Some("Kim Sung Ho"));
        assert_eq!(
            text(&record, fields::SCREENWRITER).as_deref(),
            Some("Yoon Ji Ryun, Kim Sae Byul")
        );
        assert_eq!(record.get(fields::NUM_WATCHERS), Some(&FieldValue::Integer(87430)));
        assert_eq!(
            text(&record, fields::SYNOPSIS).as_deref(),
            Some("Han Geu Ru is an autistic 20-year-old. He works for his father's business \"Move To Heaven\".")
        );
        assert_eq!(
            text(&record, fields::CAST).as_deref(),
            Some("Lee Je Hoon, Tang Jun Sang, Hong Seung Hee")
        );

        for field in fields::ALL {
            assert!(record.get(field).is_some(), "expected {} to be set", field);
        }
    }

    #[test]
    fn test_missing_director_only_unsets_director() {
        let page = FULL_PAGE.replace(
            r#"<li class="list-item"><b class="inline">Director:</b> <a class="text-primary" href="/people/1">Kim Sung Ho</a></li>"#,
            "",
        );
        assert!(!page.contains("Director:"));

        let record = extract_record(&page).unwrap();
        assert!(record.get(fields::DIRECTOR).is_none());
        assert!(record.has_field(fields::DIRECTOR));

        for field in fields::ALL.iter().filter(|f| **f != fields::DIRECTOR) {
            assert!(record.get(field).is_some(), "expected {} to be set", field);
        }
    }

    #[test]
    fn test_sparse_page_degrades_to_partial_record() {
        let record = extract_record(SPARSE_PAGE).unwrap();

        assert_eq!(record.name(), Some("Quiet Film"));
        assert_eq!(text(&record, fields::COUNTRY).as_deref(), Some("Japan"));
        assert_eq!(text(&record, fields::CATEGORY).as_deref(), Some("Movie"));

        // Sidebar present, value missing
        assert!(record.has_field(fields::AIRED));
        assert!(record.get(fields::AIRED).is_none());

        // Details section missing entirely
        assert!(!record.has_field(fields::GENRES));
        assert!(!record.has_field(fields::TAGS));

        // Blank synopsis is normalized to unset
        assert!(record.get(fields::SYNOPSIS).is_none());

        assert!(record.get(fields::RATING).is_none());
        assert!(record.get(fields::IMAGE_URL).is_none());
        assert!(record.get(fields::NUM_RATERS).is_none());
        assert!(record.get(fields::CAST).is_none());
    }

    #[test]
    fn test_missing_title_is_extraction_failure() {
        let page = FULL_PAGE.replace("film-title", "film-subtitle");
        let error = extract_record(&page).unwrap_err();

        assert_eq!(
            error,
            ExtractError::MissingRequired {
                fields: vec!["Name".to_string()]
            }
        );
        assert_eq!(error.to_string(), "Could not resolve required field(s): Name");
    }

    #[test]
    fn test_blank_title_is_extraction_failure() {
        let result = extract_record(r#"<h1 class="film-title">   </h1>"#);
        assert!(matches!(result, Err(ExtractError::MissingRequired { .. })));
    }

    #[test]
    fn test_empty_document_is_malformed() {
        let expected = ExtractError::MalformedDocument {
            fields: vec!["Name".to_string()],
        };
        assert_eq!(extract_record(""), Err(expected.clone()));
        assert_eq!(extract_record(" \n\t"), Err(expected.clone()));
        assert_eq!(
            expected.to_string(),
            "Document is empty or not navigable; could not resolve: Name"
        );
    }

    #[test]
    fn test_non_numeric_rating_kept_as_text() {
        let html = r#"<h1 class="film-title">X</h1><div class="col-film-rating"><div>N/A</div></div>"#;
        let record = extract_record(html).unwrap();
        assert_eq!(record.get(fields::RATING), Some(&FieldValue::Text("N/A".to_string())));
    }

    #[test]
    fn test_num_raters_rated_by_phrasing() {
        let html = r#"<h1 class="film-title">X</h1><div class="hfs">Rated by 1,024 users</div>"#;
        let record = extract_record(html).unwrap();
        assert_eq!(record.get(fields::NUM_RATERS), Some(&FieldValue::Integer(1024)));
    }

    #[test]
    fn test_num_raters_without_match_is_unset() {
        let html = r#"<h1 class="film-title">X</h1><div class="hfs">Ratings: N/A</div>"#;
        let record = extract_record(html).unwrap();
        assert!(record.get(fields::NUM_RATERS).is_none());
    }

    #[test]
    fn test_value_by_label_prefers_link_sibling() {
        let document = Html::parse_document(
            r#"<ul><li><b>Original Network:</b> <a href="/c/1">tvN</a>, <a href="/c/2">Netflix</a></li>
                   <li><b>Country:</b>  South   Korea </li>
                   <li><b>Aired:</b></li></ul>"#,
        );
        let root = document.root_element();

        assert_eq!(value_by_label(root, "Original Network:").as_deref(), Some("tvN"));
        assert_eq!(value_by_label(root, "Country:").as_deref(), Some("South Korea"));
        assert_eq!(value_by_label(root, "Aired:"), None);
        assert_eq!(value_by_label(root, "Duration:"), None);
    }

    #[test]
    fn test_label_match_is_exact() {
        let document = Html::parse_document(r#"<li><b>Original Country:</b> Nowhere</li>"#);
        assert_eq!(value_by_label(document.root_element(), "Country:"), None);
    }

    #[test]
    fn test_parse_count() {
        assert_eq!(parse_count("22,605"), Some(22605));
        assert_eq!(parse_count(" 1,234,567 "), Some(1234567));
        assert_eq!(parse_count("12"), Some(12));
        assert_eq!(parse_count("many"), None);
        assert_eq!(parse_count(""), None);
    }
}

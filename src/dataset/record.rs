//! Record and field value types
//!
//! A record is what the extractor produces for one item page: an ordered
//! mapping from field name to an optional single value.

use std::collections::btree_map;
use std::collections::BTreeMap;
use std::fmt;

/// Field names produced by the item extractor
///
/// These names are the dataset's column header, so they must stay stable
/// across runs.
pub mod fields {
    pub const NAME: &str = "Name";
    pub const RATING: &str = "rating";
    pub const IMAGE_URL: &str = "url";
    pub const NUM_RATERS: &str = "num_raters";
    pub const GENRES: &str = "genre_names";
    pub const TAGS: &str = "tag_names";
    pub const CATEGORY: &str = "category";
    pub const COUNTRY: &str = "country";
    pub const NUM_EPISODES: &str = "num_episodes";
    pub const AIRED: &str = "aired";
    pub const ORIGINAL_NETWORK: &str = "original_network";
    pub const DURATION: &str = "duration";
    pub const DIRECTOR: &str = "director";
    pub const SCREENWRITER: &str = "screenwriter";
    pub const NUM_WATCHERS: &str = "num_watchers";
    pub const SYNOPSIS: &str = "synopsis";
    pub const CAST: &str = "cast_names";

    /// Every field the extractor knows about
    pub const ALL: [&str; 17] = [
        NAME,
        RATING,
        IMAGE_URL,
        NUM_RATERS,
        GENRES,
        TAGS,
        CATEGORY,
        COUNTRY,
        NUM_EPISODES,
        AIRED,
        ORIGINAL_NETWORK,
        DURATION,
        DIRECTOR,
        SCREENWRITER,
        NUM_WATCHERS,
        SYNOPSIS,
        CAST,
    ];
}

/// Separator used when a list-valued field is flattened into one cell
pub const LIST_SEPARATOR: &str = ", ";

/// A single cell value
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Integer(u64),
    Decimal(f64),
}

impl FieldValue {
    /// Builds a text value, treating blank text as absent
    pub fn text(value: impl Into<String>) -> Option<Self> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else if trimmed.len() == value.len() {
            Some(Self::Text(value))
        } else {
            Some(Self::Text(trimmed.to_string()))
        }
    }

    /// Flattens a list into one separator-joined text value
    ///
    /// Blank items are dropped; a list with nothing left is absent.
    pub fn joined<I, S>(items: I) -> Option<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let parts: Vec<String> = items
            .into_iter()
            .map(|s| s.as_ref().trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        if parts.is_empty() {
            None
        } else {
            Some(Self::Text(parts.join(LIST_SEPARATOR)))
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => f.write_str(s),
            Self::Integer(n) => write!(f, "{}", n),
            Self::Decimal(x) => write!(f, "{}", x),
        }
    }
}

/// Structured output of extracting one item page
///
/// A field can be missing from the map entirely (its page section was not
/// there) or present with `None` (the section was there but the value was
/// not). Both render as an empty cell; only present keys contribute to the
/// dataset header.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    fields: BTreeMap<String, Option<FieldValue>>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a field, replacing any previous value
    pub fn set(&mut self, name: &str, value: Option<FieldValue>) {
        self.fields.insert(name.to_string(), value);
    }

    /// Returns the value of a field, or None if absent or unset
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name).and_then(Option::as_ref)
    }

    /// Returns true if the field key was recorded, even without a value
    pub fn has_field(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// The item's title, the only field a record cannot exist without
    pub fn name(&self) -> Option<&str> {
        self.get(fields::NAME).and_then(FieldValue::as_text)
    }

    /// Field names recorded on this record, in lexicographic order
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Renders a field as a cell: empty for absent or unset fields
    pub fn cell(&self, name: &str) -> String {
        self.get(name).map(ToString::to_string).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, Option<FieldValue>> {
        self.fields.iter()
    }
}

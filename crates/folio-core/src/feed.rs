//! Feed index: a timestamp-keyed log of published content.
//!
//! Keys are `YYYY-MM-DD HH:MM:SS` strings, so lexicographic order is
//! chronological order and a reverse walk of the map is newest-first.
//! Writing an existing key replaces the earlier entry; two publishes in the
//! same second therefore collide and the later one wins.
//!
//! # Query algorithm
//!
//! 1. Walk entries in descending key order.
//! 2. Keep entries passing the [`FeedFilter`], counting them.
//! 3. Entries whose 1-based passing rank falls in
//!    `((page-1)*page_size, page*page_size]` form the page.
//! 4. `page_count = ceil(matching / page_size)`.
//!
//! A page past the end is an empty page with valid pagination fields.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDateTime;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::content::{clean_name, clean_tags, ContentRecord};
use crate::error::{ContentError, Result};
use crate::frontmatter::Metadata;
use crate::store::Document;

/// Default number of entries per feed page.
pub const PAGE_SIZE: usize = 10;

/// `chrono` format of a feed key.
pub const FEED_KEY_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A validated, canonically formatted feed timestamp.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeedKey(String);

impl FeedKey {
    pub fn parse(value: &str) -> Result<Self> {
        let dt = NaiveDateTime::parse_from_str(value.trim(), FEED_KEY_FORMAT)
            .map_err(|_| ContentError::InvalidFeedKey(value.to_string()))?;
        Ok(Self::from_datetime(&dt))
    }

    /// Second resolution; sub-second parts are dropped.
    pub fn from_datetime(dt: &NaiveDateTime) -> Self {
        FeedKey(dt.format(FEED_KEY_FORMAT).to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for FeedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One published item: the record's metadata plus where it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedEntry {
    #[serde(flatten)]
    pub metadata: Metadata,
    /// Blob path of the source document.
    pub location: String,
    pub clean_collection: String,
}

impl FeedEntry {
    pub fn from_record(record: &ContentRecord, location: &str) -> Self {
        Self::from_metadata(record.metadata.clone(), location)
    }

    pub fn from_metadata(metadata: Metadata, location: &str) -> Self {
        let clean_collection = metadata.get("collection").map(clean_name).unwrap_or_default();
        FeedEntry {
            metadata,
            location: location.to_string(),
            clean_collection,
        }
    }

    pub fn url(&self) -> Option<&str> {
        self.metadata.get("url")
    }

    pub fn cleaned_tags(&self) -> BTreeSet<String> {
        self.metadata.get("tags").map(clean_tags).unwrap_or_default()
    }

    /// Look up a filterable field: `location`, `clean_collection`, or any
    /// metadata key.
    pub fn field(&self, name: &str) -> Option<&str> {
        match name {
            "location" => Some(&self.location),
            "clean_collection" => Some(&self.clean_collection),
            _ => self.metadata.get(name),
        }
    }
}

/// Field name → accepted values.
///
/// `tags` passes when the entry's cleaned tags intersect the (cleaned)
/// accepted set; `collection` compares against `clean_collection`; every
/// other field needs exact membership. An empty filter passes everything;
/// a field with an empty accepted set passes nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedFilter {
    fields: BTreeMap<String, BTreeSet<String>>,
}

impl FeedFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with<I, S>(mut self, field: &str, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.insert(field, values);
        self
    }

    pub fn insert<I, S>(&mut self, field: &str, values: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields
            .entry(field.to_string())
            .or_default()
            .extend(values.into_iter().map(Into::into));
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn matches(&self, entry: &FeedEntry) -> bool {
        self.fields.iter().all(|(field, accepted)| match field.as_str() {
            "tags" => {
                let tags = entry.cleaned_tags();
                accepted.iter().any(|a| tags.contains(&clean_name(a)))
            }
            "collection" => accepted
                .iter()
                .any(|a| clean_name(a) == entry.clean_collection),
            other => entry
                .field(other)
                .map(|value| accepted.contains(value))
                .unwrap_or(false),
        })
    }
}

/// A feed entry together with its key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeedItem {
    pub key: FeedKey,
    #[serde(flatten)]
    pub entry: FeedEntry,
}

/// One page of feed results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeedPage {
    pub entries: Vec<FeedItem>,
    pub page: usize,
    pub page_count: usize,
    pub has_prev: bool,
    pub has_next: bool,
}

/// The whole feed log, ordered by key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedLog {
    entries: BTreeMap<FeedKey, FeedEntry>,
}

impl FeedLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode a stored feed document, validating every key.
    pub fn from_document(doc: Document) -> Result<Self> {
        let mut entries = BTreeMap::new();
        for (key, value) in doc {
            let key = FeedKey::parse(&key)?;
            let entry: FeedEntry = serde_json::from_value(value)?;
            entries.insert(key, entry);
        }
        Ok(FeedLog { entries })
    }

    pub fn to_document(&self) -> Result<Document> {
        let mut doc = Document::new();
        for (key, entry) in &self.entries {
            doc.insert(key.as_str().to_string(), serde_json::to_value(entry)?);
        }
        Ok(doc)
    }

    /// Insert or replace the entry at `key`. Returns the replaced entry.
    pub fn upsert(&mut self, key: FeedKey, entry: FeedEntry) -> Option<FeedEntry> {
        self.entries.insert(key, entry)
    }

    pub fn get(&self, key: &FeedKey) -> Option<&FeedEntry> {
        self.entries.get(key)
    }

    /// Newest entry whose `location` equals `location`.
    pub fn find_by_location(&self, location: &str) -> Option<(&FeedKey, &FeedEntry)> {
        self.entries.iter().rev().find(|(_, e)| e.location == location)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in ascending key order.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = (&FeedKey, &FeedEntry)> {
        self.entries.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&FeedKey, &mut FeedEntry)> {
        self.entries.iter_mut()
    }

    /// Filtered, paginated, newest-first query. `page` is 1-based; 0 is
    /// treated as 1.
    pub fn query(&self, filter: &FeedFilter, page: usize, page_size: usize) -> FeedPage {
        let page = page.max(1);
        let page_size = page_size.max(1);
        let lower = (page - 1).saturating_mul(page_size);
        let upper = page.saturating_mul(page_size);

        let mut matching = 0usize;
        let mut entries = Vec::new();
        for (key, entry) in self.entries.iter().rev() {
            if !filter.matches(entry) {
                continue;
            }
            matching += 1;
            if matching > lower && matching <= upper {
                entries.push(FeedItem {
                    key: key.clone(),
                    entry: entry.clone(),
                });
            }
        }

        let page_count = matching.div_ceil(page_size);
        FeedPage {
            entries,
            page,
            page_count,
            has_prev: page > 1,
            has_next: page < page_count,
        }
    }

    pub fn remove(&mut self, key: &FeedKey) -> Option<FeedEntry> {
        self.entries.remove(key)
    }

    /// Uniformly random `url` over the current entries.
    pub fn random_url<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<String> {
        let urls: Vec<&str> = self.entries.values().filter_map(FeedEntry::url).collect();
        urls.choose(rng).map(|u| u.to_string())
    }
}

//! Front-matter splitter and metadata parser.
//!
//! A document is a sequence of lines cut into segments by delimiter lines
//! (a line whose trimmed content is exactly `---`):
//!
//! ```text
//! <preamble, ignored>
//! ---
//! title: Foo
//! date: 2024-01-01
//! ---
//! <markdown body>
//! ---                  (music only)
//! <track listing>      (music only)
//! ```
//!
//! Standard content has exactly 3 segments, music has exactly 4. Anything
//! else is rejected with [`ContentError::MalformedDocument`] rather than
//! truncated, so a stray `---` in a body surfaces as an error.
//!
//! # Example
//!
//! ```rust
//! use folio_core::frontmatter::{parse_document, SegmentLayout};
//!
//! let text = "---\ntitle: Foo\ndate: 2024-01-01\ntype: blog\ncollection: Misc\n---\nHello\n";
//! let doc = parse_document(text, "blogs/foo.md", SegmentLayout::Standard).unwrap();
//! assert_eq!(doc.metadata.get("url"), Some("blog/foo"));
//! assert_eq!(doc.body, "Hello\n");
//! ```

use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{ContentError, Result};

/// Line that separates segments.
pub const DELIMITER: &str = "---";

/// Ordered string-to-string metadata map.
///
/// Keeps insertion order so a parsed block re-serializes in the order the
/// author wrote it. Inserting an existing key replaces its value in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadata {
    entries: Vec<(String, String)>,
}

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        let pos = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(pos).1)
    }

    /// Copy every entry of `other` into `self`, replacing shared keys.
    pub fn merge(&mut self, other: &Metadata) {
        for (k, v) in other.iter() {
            self.insert(k, v);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Metadata {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut metadata = Metadata::new();
        for (k, v) in iter {
            metadata.insert(k, v);
        }
        metadata
    }
}

impl Serialize for Metadata {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (k, v) in &self.entries {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Metadata {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct MetadataVisitor;

        impl<'de> Visitor<'de> for MetadataVisitor {
            type Value = Metadata;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of string metadata values")
            }

            fn visit_map<A: MapAccess<'de>>(
                self,
                mut access: A,
            ) -> std::result::Result<Metadata, A::Error> {
                let mut metadata = Metadata::new();
                while let Some((k, v)) = access.next_entry::<String, String>()? {
                    metadata.insert(k, v);
                }
                Ok(metadata)
            }
        }

        deserializer.deserialize_map(MetadataVisitor)
    }
}

/// How many segments a document must have.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentLayout {
    /// Preamble, metadata, body.
    Standard,
    /// Preamble, metadata, body, track listing.
    WithTracks,
}

impl SegmentLayout {
    pub fn segment_count(self) -> usize {
        match self {
            SegmentLayout::Standard => 3,
            SegmentLayout::WithTracks => 4,
        }
    }

    /// Music documents live under `music/`; everything else is standard.
    pub fn for_path(path: &str) -> Self {
        match path.trim_start_matches('/').split('/').next() {
            Some("music") => SegmentLayout::WithTracks,
            _ => SegmentLayout::Standard,
        }
    }
}

/// One delimiter-separated slice of a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment<'a> {
    pub text: &'a str,
    /// 1-based line number of the segment's first line in the document.
    pub first_line: usize,
}

/// The result of [`parse_document`].
#[derive(Debug, Clone)]
pub struct ParsedDocument {
    pub path: String,
    pub metadata: Metadata,
    pub body: String,
    /// Raw fourth segment, present only for [`SegmentLayout::WithTracks`].
    pub tracks: Option<String>,
}

fn is_delimiter(line: &str) -> bool {
    line.trim() == DELIMITER
}

/// Cut `text` into delimiter-separated segments, checking the count.
pub fn split_segments<'a>(
    text: &'a str,
    path: &str,
    layout: SegmentLayout,
) -> Result<Vec<Segment<'a>>> {
    let mut segments = Vec::new();
    let mut start = 0usize;
    let mut first_line = 1usize;
    let mut offset = 0usize;

    for (idx, raw) in text.split_inclusive('\n').enumerate() {
        let line_no = idx + 1;
        if is_delimiter(raw) {
            segments.push(Segment {
                text: &text[start..offset],
                first_line,
            });
            start = offset + raw.len();
            first_line = line_no + 1;
        }
        offset += raw.len();
    }
    segments.push(Segment {
        text: &text[start..],
        first_line,
    });

    let expected = layout.segment_count();
    if segments.len() != expected {
        return Err(ContentError::MalformedDocument {
            path: path.to_string(),
            expected,
            found: segments.len(),
        });
    }
    Ok(segments)
}

/// Parse a metadata block into an ordered [`Metadata`] map.
///
/// Each non-blank line is split on its first `:`; key and value are
/// trimmed and a value wrapped in a pair of double quotes loses them.
/// `first_line` is only used to report the document line of a bad entry.
pub fn parse_metadata(block: &str, path: &str, first_line: usize) -> Result<Metadata> {
    let mut metadata = Metadata::new();
    for (idx, line) in block.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let bad_line = || ContentError::MetadataParseError {
            path: path.to_string(),
            line: first_line + idx,
            text: line.to_string(),
        };
        let (key, value) = line.split_once(':').ok_or_else(bad_line)?;
        let key = key.trim();
        if key.is_empty() {
            return Err(bad_line());
        }
        metadata.insert(key, unquote(value.trim()));
    }
    Ok(metadata)
}

fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
}

/// Basename of `path` up to its first `.`: `blogs/my.post.md` → `my`.
pub fn file_stem(path: &str) -> &str {
    let base = path.rsplit('/').next().unwrap_or(path);
    base.split('.').next().unwrap_or(base)
}

/// Add the derived `filename` and `url` (`type/filename`) keys.
pub fn derive_link_fields(metadata: &mut Metadata, path: &str) -> Result<()> {
    let filename = file_stem(path).to_string();
    let kind = metadata
        .get("type")
        .ok_or_else(|| ContentError::MissingRequiredField {
            path: path.to_string(),
            field: "type".to_string(),
        })?
        .to_string();
    metadata.insert("filename", filename.as_str());
    metadata.insert("url", format!("{}/{}", kind, filename));
    Ok(())
}

/// Split, parse metadata and derive link fields for one document.
pub fn parse_document(text: &str, path: &str, layout: SegmentLayout) -> Result<ParsedDocument> {
    let segments = split_segments(text, path, layout)?;
    let mut metadata = parse_metadata(segments[1].text, path, segments[1].first_line)?;
    derive_link_fields(&mut metadata, path)?;

    Ok(ParsedDocument {
        path: path.to_string(),
        metadata,
        body: segments[2].text.to_string(),
        tracks: segments.get(3).map(|s| s.text.to_string()),
    })
}

//! Content model builder.
//!
//! Turns a [`ParsedDocument`] plus its rendered body into a typed
//! [`ContentRecord`]. The content kind comes from the `type` metadata key
//! and is resolved once into [`Extras`]; everything downstream matches on
//! that enum instead of comparing type strings.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::error::{ContentError, Result};
use crate::frontmatter::{Metadata, ParsedDocument};
use crate::tracks::{parse_track_listing, Track};

/// Keys every publishable document must carry.
pub const REQUIRED_FIELDS: [&str; 4] = ["title", "date", "type", "collection"];

/// Metadata keys forwarded as Open Graph tags.
pub const OG_FIELDS: [&str; 4] = ["og_title", "og_description", "og_image", "og_type"];

/// The fixed set of content kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    Article,
    Comic,
    Music,
    Video,
    Game,
}

impl ContentKind {
    /// Resolve a `type` metadata value. Plural directory names are accepted.
    pub fn from_type(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "blog" | "blogs" | "article" | "articles" => Some(ContentKind::Article),
            "comic" | "comics" => Some(ContentKind::Comic),
            "music" => Some(ContentKind::Music),
            "video" | "videos" => Some(ContentKind::Video),
            "game" | "games" => Some(ContentKind::Game),
            _ => None,
        }
    }
}

/// Kind-specific payload of a [`ContentRecord`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Extras {
    Article,
    Comic { hover_text: Option<String> },
    Music { tracks: Vec<Track> },
    Video { video_id: String },
    Game { game_link: Option<String> },
}

impl Extras {
    pub fn kind(&self) -> ContentKind {
        match self {
            Extras::Article => ContentKind::Article,
            Extras::Comic { .. } => ContentKind::Comic,
            Extras::Music { .. } => ContentKind::Music,
            Extras::Video { .. } => ContentKind::Video,
            Extras::Game { .. } => ContentKind::Game,
        }
    }
}

/// A built, immutable piece of content.
#[derive(Debug, Clone, Serialize)]
pub struct ContentRecord {
    /// Source blob path, e.g. `blogs/foo.md`.
    pub path: String,
    pub title: String,
    pub date: String,
    pub collection: String,
    pub tags: BTreeSet<String>,
    pub og_tags: BTreeMap<String, String>,
    pub body_html: String,
    pub extras: Extras,
    /// Full metadata including the derived `filename` and `url`.
    pub metadata: Metadata,
}

impl ContentRecord {
    pub fn kind(&self) -> ContentKind {
        self.extras.kind()
    }

    /// File basename without extension.
    pub fn filename(&self) -> &str {
        self.metadata.get("filename").unwrap_or_default()
    }

    pub fn url(&self) -> &str {
        self.metadata.get("url").unwrap_or_default()
    }
}

/// Build a [`ContentRecord`] from a parsed document and its rendered body.
pub fn build_record(doc: &ParsedDocument, body_html: String) -> Result<ContentRecord> {
    let required = |field: &str| -> Result<String> {
        doc.metadata
            .get(field)
            .map(str::to_string)
            .ok_or_else(|| ContentError::MissingRequiredField {
                path: doc.path.clone(),
                field: field.to_string(),
            })
    };

    let title = required("title")?;
    let date = required("date")?;
    let type_value = required("type")?;
    let collection = required("collection")?;

    let kind =
        ContentKind::from_type(&type_value).ok_or_else(|| ContentError::UnknownContentKind {
            path: doc.path.clone(),
            kind: type_value.clone(),
        })?;

    let optional = |field: &str| doc.metadata.get(field).map(str::to_string);

    let extras = match kind {
        ContentKind::Article => Extras::Article,
        ContentKind::Comic => Extras::Comic {
            hover_text: optional("hover_text"),
        },
        ContentKind::Music => {
            let listing = doc
                .tracks
                .as_deref()
                .ok_or_else(|| ContentError::MalformedDocument {
                    path: doc.path.clone(),
                    expected: 4,
                    found: 3,
                })?;
            Extras::Music {
                tracks: parse_track_listing(listing, &doc.path)?,
            }
        }
        ContentKind::Video => Extras::Video {
            video_id: strip_paragraph(&body_html).to_string(),
        },
        ContentKind::Game => Extras::Game {
            game_link: optional("game_link"),
        },
    };

    let tags = doc
        .metadata
        .get("tags")
        .map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    Ok(ContentRecord {
        path: doc.path.clone(),
        title,
        date,
        collection,
        tags,
        og_tags: og_tags(&doc.metadata),
        body_html,
        extras,
        metadata: doc.metadata.clone(),
    })
}

/// Forward the recognised `og_*` keys as `og:*` tags.
pub fn og_tags(metadata: &Metadata) -> BTreeMap<String, String> {
    OG_FIELDS
        .iter()
        .filter_map(|key| {
            metadata
                .get(key)
                .map(|value| (key.replacen("og_", "og:", 1), value.to_string()))
        })
        .collect()
}

/// Recover a bare video embed id from a body rendered as `<p>id</p>`.
///
/// Only a single wrapping paragraph is removed; this is not sanitization.
fn strip_paragraph(html: &str) -> &str {
    let trimmed = html.trim();
    trimmed
        .strip_prefix("<p>")
        .and_then(|s| s.strip_suffix("</p>"))
        .unwrap_or(trimmed)
        .trim()
}

/// Normalize a collection or tag name: strip ASCII punctuation, lowercase,
/// spaces to underscores. `"Indie Game Reviews!"` → `"indie_game_reviews"`.
pub fn clean_name(name: &str) -> String {
    name.trim()
        .chars()
        .filter(|c| !c.is_ascii_punctuation())
        .collect::<String>()
        .trim()
        .to_lowercase()
        .replace(' ', "_")
}

/// Split a comma-separated tag list and normalize each tag.
pub fn clean_tags(raw: &str) -> BTreeSet<String> {
    raw.split(',')
        .map(clean_name)
        .filter(|t| !t.is_empty())
        .collect()
}

//! Storage abstraction for Folio.
//!
//! The core never talks to a concrete backend. It consumes two narrow
//! services through traits:
//!
//! | Trait | Operations | Used for |
//! |-------|------------|----------|
//! | [`BlobStore`] | `exists`, `get`, `put` | source documents and media, by `{kind}/{name}.{ext}` path |
//! | [`DocumentStore`] | `get`, `set` | the feed log, collection member lists, the recommendation table |
//!
//! Implementations must be `Send + Sync`. Timeouts and retries belong to the
//! implementation; callers only propagate failures as
//! [`ContentError::StoreUnavailable`](crate::error::ContentError::StoreUnavailable).

pub mod memory;

use async_trait::async_trait;

use crate::error::{ContentError, Result};

/// A JSON-like named document.
pub type Document = serde_json::Map<String, serde_json::Value>;

/// Document-store collection and id of the feed log.
pub const FEED_COLLECTION: &str = "feed";
pub const FEED_DOCUMENT: &str = "content-log";

/// Document-store collection holding one member list per content collection.
pub const COLLECTIONS_COLLECTION: &str = "collections";

/// Document-store collection and id of the precomputed neighbour table.
pub const RECOMMENDATIONS_COLLECTION: &str = "recommendations";
pub const RECOMMENDATIONS_DOCUMENT: &str = "recommendations";

/// Bytes of a stored blob plus their content type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

impl Blob {
    /// Decode the bytes as UTF-8. `path` only labels the error.
    pub fn text(&self, path: &str) -> Result<&str> {
        std::str::from_utf8(&self.bytes).map_err(|_| ContentError::InvalidEncoding {
            path: path.to_string(),
        })
    }
}

/// Path-addressed byte storage.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn exists(&self, path: &str) -> Result<bool>;

    /// Fetch a blob. `Ok(None)` when nothing is stored at `path`.
    async fn get(&self, path: &str) -> Result<Option<Blob>>;

    async fn put(&self, path: &str, bytes: &[u8], content_type: &str) -> Result<()>;
}

/// Named JSON document storage with single-document atomicity only.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetch `collection/doc_id`. `Ok(None)` when it was never set.
    async fn get(&self, collection: &str, doc_id: &str) -> Result<Option<Document>>;

    /// Replace `collection/doc_id` wholesale.
    async fn set(&self, collection: &str, doc_id: &str, doc: &Document) -> Result<()>;
}

/// Guess a content type from a path's extension.
pub fn content_type_for(path: &str) -> &'static str {
    let ext = path
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "md" | "markdown" => "text/markdown; charset=utf-8",
        "txt" => "text/plain; charset=utf-8",
        "json" => "application/json",
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "mp3" => "audio/mpeg",
        "ogg" => "audio/ogg",
        "wav" => "audio/wav",
        "mp4" => "video/mp4",
        _ => "application/octet-stream",
    }
}

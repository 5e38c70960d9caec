//! Error taxonomy for the content engine.
//!
//! Parse and build failures are never recovered locally: they carry the
//! offending path or field up to the caller so a route handler can decide
//! between a 404 and a 500. Only recommendation lookups and random-entry
//! selection degrade to "nothing" instead of failing.

use thiserror::Error;

/// Every failure the core can report.
#[derive(Debug, Error)]
pub enum ContentError {
    /// Wrong number of delimiter-separated segments.
    #[error("malformed document {path}: expected {expected} segments, found {found}")]
    MalformedDocument {
        path: String,
        expected: usize,
        found: usize,
    },

    /// A non-empty metadata line with no `:` separator.
    #[error("metadata parse error in {path} at line {line}: {text:?}")]
    MetadataParseError {
        path: String,
        line: usize,
        text: String,
    },

    #[error("missing required field `{field}` in {path}")]
    MissingRequiredField { path: String, field: String },

    #[error("malformed track listing in {path}: {reason}")]
    MalformedTrackListing { path: String, reason: String },

    #[error("unknown content kind `{kind}` in {path}")]
    UnknownContentKind { path: String, kind: String },

    #[error("`{id}` is not a member of collection `{collection}`")]
    NotInCollection { collection: String, id: String },

    #[error("blob not found: {path}")]
    BlobNotFound { path: String },

    #[error("blob {path} is not valid UTF-8")]
    InvalidEncoding { path: String },

    #[error("invalid feed key {0:?}: expected YYYY-MM-DD HH:MM:SS")]
    InvalidFeedKey(String),

    /// Propagated from a blob or document store backend.
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("document encoding error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ContentError {
    /// Wrap any backend failure as [`ContentError::StoreUnavailable`].
    pub fn store(err: impl std::fmt::Display) -> Self {
        ContentError::StoreUnavailable(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ContentError>;

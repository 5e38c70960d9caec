//! # Folio Core
//!
//! Storage-agnostic content engine for a personal site: front-matter
//! documents in, typed records, a paginated feed, collection navigation
//! and content-based recommendations out.
//!
//! This crate holds the pure logic and the two store traits. It performs
//! no filesystem or database I/O of its own; the `folio` application crate
//! supplies the SQLite and filesystem backends.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`frontmatter`] | Split a document into segments and parse its metadata block |
//! | [`tracks`] | Parse a music document's `title:`/`file:` track listing |
//! | [`markdown`] | Markdown to HTML with the `![audio:...]` extension |
//! | [`content`] | Typed [`ContentRecord`](content::ContentRecord) per content kind |
//! | [`feed`] | Timestamp-keyed feed log, filtering and pagination |
//! | [`collection`] | Ordered member lists and prev/next/first/last links |
//! | [`recommend`] | TF-IDF similarity table (offline) and lookup (online) |
//! | [`store`] | [`BlobStore`](store::BlobStore) / [`DocumentStore`](store::DocumentStore) traits and in-memory backends |
//! | [`site`] | [`Site`](site::Site), the caller-facing API over injected stores |
//! | [`error`] | [`ContentError`](error::ContentError) |

pub mod collection;
pub mod content;
pub mod error;
pub mod feed;
pub mod frontmatter;
pub mod markdown;
pub mod recommend;
pub mod site;
pub mod store;
pub mod tracks;

pub use error::{ContentError, Result};
pub use site::Site;

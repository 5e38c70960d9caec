//! # Folio
//!
//! Publishing and query front end for a personal content site.
//!
//! Markdown documents with a front-matter block are written into a staging
//! directory, validated and published into a content root on disk; the feed
//! log, collection lists and recommendation table live in SQLite. All
//! parsing, feed and recommendation logic comes from `folio-core`; this
//! crate supplies configuration, the two storage backends and the CLI.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────────┐   ┌───────────────────┐
//! │ staging/ │──▶│   publish    │──▶│ content root (fs) │
//! │  *.md    │   │ validate+copy│   │ SQLite documents  │
//! └──────────┘   └──────────────┘   └─────────┬─────────┘
//!                                             │
//!                          ┌──────────────────┤
//!                          ▼                  ▼
//!                    ┌───────────┐     ┌─────────────┐
//!                    │ feed/show │     │ recommend   │
//!                    │ nav/random│     │ build / get │
//!                    └───────────┘     └─────────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`db`] | Database connection and [`db::open_site`] |
//! | [`migrate`] | Schema migrations |
//! | [`sqlite_store`] | SQLite document store |
//! | [`blob_fs`] | Filesystem blob store |
//! | [`connector_fs`] | Staging and content-root scanning |
//! | [`publish`] | Publishing pipeline |
//! | [`feed_cmd`] | Feed, random and navigation commands |
//! | [`show`] | Single-page view |
//! | [`recommend_cmd`] | Recommendation build and lookup |
//! | [`refresh`] | Feed metadata refresh |

pub mod blob_fs;
pub mod config;
pub mod connector_fs;
pub mod db;
pub mod feed_cmd;
pub mod migrate;
pub mod publish;
pub mod recommend_cmd;
pub mod refresh;
pub mod show;
pub mod sqlite_store;

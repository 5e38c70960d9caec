use anyhow::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;

use folio_core::Site;

use crate::blob_fs::FsBlobStore;
use crate::config::Config;
use crate::migrate;
use crate::sqlite_store::SqliteDocumentStore;

/// The [`Site`] the CLI runs against: blobs on disk, documents in SQLite.
pub type FolioSite = Site<FsBlobStore, SqliteDocumentStore>;

pub async fn connect(config: &Config) -> Result<SqlitePool> {
    let db_path = &config.store.path;

    // Ensure parent directory exists
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", db_path.display()))?
        .create_if_missing(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    Ok(pool)
}

/// Connect, make sure the schema exists, and wire both stores into a [`Site`].
pub async fn open_site(config: &Config) -> Result<FolioSite> {
    let pool = connect(config).await?;
    migrate::create_schema(&pool).await?;

    Ok(Site::new(
        FsBlobStore::new(config.content.root.clone()),
        SqliteDocumentStore::new(pool),
    )
    .with_page_size(config.feed.page_size)
    .with_recommendation_target(config.recommendations.target))
}

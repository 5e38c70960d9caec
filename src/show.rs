//! `folio show <kind-dir> <name>`: everything a page render needs, as JSON.

use anyhow::Result;
use serde::Serialize;
use tracing::warn;

use folio_core::collection::NavLinks;
use folio_core::content::ContentRecord;
use folio_core::error::ContentError;
use folio_core::feed::FeedItem;

use crate::config::Config;
use crate::db::{self, FolioSite};
use crate::publish::related_media;

#[derive(Debug, Serialize)]
pub struct PageView {
    pub record: ContentRecord,
    pub navigation: Option<NavLinks>,
    pub recommendations: Vec<FeedItem>,
    /// Referenced `/assets/...` media with no blob behind them.
    pub missing_media: Vec<String>,
}

/// Assemble the view of `{kind_dir}/{name}.md`.
///
/// Parse and build failures propagate. Navigation for a record absent
/// from its collection list and a missing recommendation row both degrade
/// to nothing.
pub async fn page_view(site: &FolioSite, kind_dir: &str, name: &str) -> Result<PageView> {
    let path = format!("{}/{}.md", kind_dir.trim_matches('/'), name);
    let record = site.load_record(&path).await?;

    let navigation = match site.navigate(&record).await {
        Ok(links) => links,
        Err(e @ ContentError::NotInCollection { .. }) => {
            warn!(path = %path, error = %e, "record missing from its collection");
            None
        }
        Err(e) => return Err(e.into()),
    };

    let mut missing_media = Vec::new();
    for blob_path in related_media(&record.body_html) {
        match site.load_blob(&blob_path).await {
            Ok(_) => {}
            Err(ContentError::BlobNotFound { path }) => missing_media.push(path),
            Err(e) => return Err(e.into()),
        }
    }

    let recommendations = site
        .recommend(&path, &mut rand::thread_rng())
        .await?
        .unwrap_or_default();

    Ok(PageView {
        record,
        navigation,
        recommendations,
        missing_media,
    })
}

pub async fn run_show(config: &Config, kind_dir: &str, name: &str) -> Result<()> {
    let site = db::open_site(config).await?;
    let view = page_view(&site, kind_dir, name).await;
    site.docs().pool().close().await;

    println!("{}", serde_json::to_string_pretty(&view?)?);
    Ok(())
}

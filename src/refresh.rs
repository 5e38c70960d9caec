//! `folio refresh`: re-derive feed metadata from the current blobs after
//! documents were edited in place under the content root.

use anyhow::Result;

use crate::config::Config;
use crate::db;

pub async fn run_refresh(config: &Config) -> Result<()> {
    let site = db::open_site(config).await?;
    let refreshed = site.refresh_feed().await;
    site.docs().pool().close().await;
    let refreshed = refreshed?;

    println!("refresh feed");
    println!("  entries refreshed: {}", refreshed);
    println!("ok");
    Ok(())
}

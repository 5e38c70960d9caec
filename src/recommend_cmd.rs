//! `folio recommend build` / `folio recommend get`.
//!
//! The build step vectorizes every published markdown document under the
//! content root and replaces the stored neighbour table. Lookups read that
//! table; a document missing from it simply has no recommendations.

use anyhow::{Context, Result};
use tracing::info;

use folio_core::recommend::{build_similarity_index, SimilarityIndex};

use crate::config::Config;
use crate::connector_fs;
use crate::db::{self, FolioSite};

/// Rebuild the neighbour table from the content root and store it.
pub async fn build_and_store(config: &Config, site: &FolioSite) -> Result<SimilarityIndex> {
    let docs = connector_fs::scan_published(config)?;
    let corpus: Vec<(String, String)> = docs
        .into_iter()
        .map(|d| (d.relative_path, d.body))
        .collect();

    let index = build_similarity_index(&corpus, config.recommendations.top_k);
    site.store_similarity_index(&index).await?;

    if let Some(ref output) = config.recommendations.output {
        if let Some(parent) = output.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&index.to_document())?;
        std::fs::write(output, json)
            .with_context(|| format!("Failed to write {}", output.display()))?;
    }

    info!(documents = index.len(), "stored recommendation table");
    Ok(index)
}

pub async fn run_build(config: &Config) -> Result<()> {
    let site = db::open_site(config).await?;
    let index = build_and_store(config, &site).await?;

    println!("recommend build");
    println!("  documents: {}", index.len());
    println!("  neighbours per document: {}", config.recommendations.top_k);
    if let Some(ref output) = config.recommendations.output {
        println!("  output: {}", output.display());
    }
    println!("ok");

    site.docs().pool().close().await;
    Ok(())
}

pub async fn run_get(config: &Config, doc_id: &str) -> Result<()> {
    let site = db::open_site(config).await?;
    let recs = site.recommend(doc_id, &mut rand::thread_rng()).await?;
    site.docs().pool().close().await;

    let items = match recs {
        Some(items) if !items.is_empty() => items,
        _ => {
            println!("No recommendations.");
            return Ok(());
        }
    };

    for (i, item) in items.iter().enumerate() {
        println!(
            "{}. {}",
            i + 1,
            item.entry.metadata.get("title").unwrap_or("(untitled)")
        );
        println!("    url: {}", item.entry.url().unwrap_or_default());
        println!("    location: {}", item.entry.location);
        println!("    published: {}", item.key);
    }
    Ok(())
}

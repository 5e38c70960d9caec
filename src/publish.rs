//! Publishing pipeline.
//!
//! Coordinates the full publish flow: staging scan → validation → media
//! copy → blob write → feed/collection update → recommendation rebuild.
//! Every staged document is validated before anything is written, so one
//! malformed draft aborts the whole run with the stores untouched.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::{Context, Result};
use regex::Regex;
use tracing::info;

use folio_core::feed::FeedKey;
use folio_core::site::build_from_text;
use folio_core::store::{content_type_for, BlobStore};

use crate::blob_fs::is_safe_blob_path;
use crate::config::Config;
use crate::connector_fs::{self, StagedDocument};
use crate::db;
use crate::recommend_cmd;

fn media_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"/assets/((?:images|music)/[^\s)"'\]]+)"#).expect("media pattern is valid")
    })
}

/// Media referenced from a document body as `/assets/images/...` or
/// `/assets/music/...`, returned as blob paths (`images/x.png`).
pub fn related_media(body: &str) -> Vec<String> {
    let found: BTreeSet<&str> = media_pattern()
        .captures_iter(body)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str())
        .collect();
    found.into_iter().map(str::to_string).collect()
}

/// Staging file behind a media blob path. Fails when the path climbs out of
/// the staging directory or the file is missing.
pub fn staged_media_source(staging: &Path, blob_path: &str) -> Result<PathBuf> {
    if !is_safe_blob_path(blob_path) {
        anyhow::bail!("invalid media path: {}", blob_path);
    }
    let source = staging.join(blob_path);
    if !source.is_file() {
        anyhow::bail!("missing media: {}", source.display());
    }
    Ok(source)
}

/// Feed key of a staged document: its modification time in UTC.
pub fn feed_key_for(doc: &StagedDocument) -> FeedKey {
    FeedKey::from_datetime(&doc.modified.naive_utc())
}

pub async fn run_publish(config: &Config, dry_run: bool, rebuild_recommendations: bool) -> Result<()> {
    let staged = connector_fs::scan_staging(config)?;

    // Validate everything up front
    let mut media_total = 0usize;
    let mut plan = Vec::with_capacity(staged.len());
    for doc in &staged {
        build_from_text(&doc.body, &doc.relative_path)
            .with_context(|| format!("Failed to validate {}", doc.relative_path))?;

        let media = related_media(&doc.body);
        for blob_path in &media {
            staged_media_source(&config.content.staging, blob_path)
                .with_context(|| format!("{} references bad media", doc.relative_path))?;
        }
        media_total += media.len();
        plan.push((doc, media));
    }

    if dry_run {
        println!("publish staging (dry-run)");
        println!("  documents found: {}", staged.len());
        for (doc, media) in &plan {
            println!(
                "  {} [{}] media: {}",
                doc.relative_path,
                feed_key_for(doc),
                media.len()
            );
        }
        println!("  media referenced: {}", media_total);
        return Ok(());
    }

    let site = db::open_site(config).await?;

    let mut published = 0u64;
    let mut replaced = 0u64;
    let mut appended = 0u64;
    let mut media_copied = 0u64;

    for (doc, media) in &plan {
        for blob_path in media {
            let source = staged_media_source(&config.content.staging, blob_path)?;
            let bytes = std::fs::read(&source)
                .with_context(|| format!("Failed to read media: {}", source.display()))?;
            site.blobs()
                .put(blob_path, &bytes, content_type_for(blob_path))
                .await?;
            media_copied += 1;
        }

        let outcome = site
            .publish(&doc.relative_path, &doc.body, feed_key_for(doc))
            .await?;
        if outcome.replaced {
            replaced += 1;
        }
        if outcome.appended {
            appended += 1;
        }
        published += 1;
    }

    println!("publish staging");
    println!("  documents found: {}", staged.len());
    println!("  published: {}", published);
    println!("  feed entries replaced: {}", replaced);
    println!("  collection entries added: {}", appended);
    println!("  media copied: {}", media_copied);

    if rebuild_recommendations && published > 0 {
        let index = recommend_cmd::build_and_store(config, &site).await?;
        println!("  recommendations: {} documents", index.len());
    }
    println!("ok");

    info!(published, media_copied, "publish finished");
    site.docs().pool().close().await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_related_media() {
        let body = "![cover](/assets/images/cover.png)\n\
                    ![audio:/assets/music/one.mp3]\n\
                    <img src=\"/assets/images/cover.png\">\n\
                    /assets/videos/skip.mp4\n";
        assert_eq!(
            related_media(body),
            vec!["images/cover.png".to_string(), "music/one.mp3".to_string()]
        );
    }

    #[test]
    fn test_no_media() {
        assert!(related_media("plain text with /assets/ nothing").is_empty());
    }

    #[test]
    fn test_media_source_stays_in_staging() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("images")).unwrap();
        std::fs::write(dir.path().join("images/x.png"), b"png").unwrap();
        std::fs::write(dir.path().join("x.png"), b"png").unwrap();

        let source = staged_media_source(dir.path(), "images/x.png").unwrap();
        assert_eq!(source, dir.path().join("images/x.png"));

        let body = "![x](/assets/images/../x.png)";
        assert_eq!(related_media(body), vec!["images/../x.png".to_string()]);
        let err = staged_media_source(dir.path(), "images/../x.png").unwrap_err();
        assert!(err.to_string().contains("invalid media path"));

        let err = staged_media_source(dir.path(), "images/none.png").unwrap_err();
        assert!(err.to_string().contains("missing media"));
    }

    #[test]
    fn test_feed_key_uses_utc_mtime() {
        use chrono::{TimeZone, Utc};
        let doc = StagedDocument {
            relative_path: "blogs/a.md".into(),
            body: String::new(),
            modified: Utc.with_ymd_and_hms(2024, 3, 5, 7, 8, 9).unwrap(),
        };
        assert_eq!(feed_key_for(&doc).as_str(), "2024-03-05 07:08:09");
    }
}

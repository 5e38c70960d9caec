use anyhow::{bail, Result};
use chrono::{DateTime, TimeZone, Utc};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::Path;
use walkdir::WalkDir;

use crate::config::Config;

/// A markdown file found on disk, addressed by its `/`-separated path
/// relative to the scanned root (which doubles as its blob path).
#[derive(Debug, Clone)]
pub struct StagedDocument {
    pub relative_path: String,
    pub body: String,
    pub modified: DateTime<Utc>,
}

/// Scan the staging directory for documents ready to publish.
pub fn scan_staging(config: &Config) -> Result<Vec<StagedDocument>> {
    let content = &config.content;
    scan_markdown(
        &content.staging,
        &content.include_globs,
        &content.exclude_globs,
        content.follow_symlinks,
    )
}

/// Scan the published content root, e.g. for the recommendation build.
pub fn scan_published(config: &Config) -> Result<Vec<StagedDocument>> {
    let content = &config.content;
    scan_markdown(
        &content.root,
        &content.include_globs,
        &content.exclude_globs,
        content.follow_symlinks,
    )
}

pub fn scan_markdown(
    root: &Path,
    include_globs: &[String],
    exclude_globs: &[String],
    follow_symlinks: bool,
) -> Result<Vec<StagedDocument>> {
    if !root.exists() {
        bail!("Content directory does not exist: {}", root.display());
    }

    let include_set = build_globset(include_globs)?;

    let mut default_excludes = vec![
        "**/.git/**".to_string(),
        "wip/**".to_string(),
        "**/wip/**".to_string(),
        "assets/**".to_string(),
    ];
    default_excludes.extend(exclude_globs.iter().cloned());
    let exclude_set = build_globset(&default_excludes)?;

    let mut items = Vec::new();

    let walker = WalkDir::new(root).follow_links(follow_symlinks);
    for entry in walker {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let relative = path.strip_prefix(root).unwrap_or(path);
        let rel_str = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        if exclude_set.is_match(&rel_str) {
            continue;
        }

        if !include_set.is_match(&rel_str) {
            continue;
        }

        items.push(file_to_staged(path, rel_str)?);
    }

    // Sort for deterministic ordering
    items.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));

    Ok(items)
}

fn file_to_staged(path: &Path, relative_path: String) -> Result<StagedDocument> {
    let metadata = std::fs::metadata(path)?;
    let modified = metadata
        .modified()
        .unwrap_or(std::time::SystemTime::UNIX_EPOCH);
    let modified_secs = modified
        .duration_since(std::time::SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64;

    let body = std::fs::read_to_string(path)?;

    Ok(StagedDocument {
        relative_path,
        body,
        modified: Utc
            .timestamp_opt(modified_secs, 0)
            .single()
            .unwrap_or_default(),
    })
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}

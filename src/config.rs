use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub store: StoreConfig,
    pub content: ContentConfig,
    #[serde(default)]
    pub feed: FeedConfig,
    #[serde(default)]
    pub recommendations: RecommendationsConfig,
}

/// SQLite database holding the feed log, collection lists and the
/// recommendation table.
#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ContentConfig {
    /// Published blob root: `{root}/blogs/foo.md`, `{root}/images/...`.
    pub root: PathBuf,
    /// Drafts scanned by `folio publish`.
    pub staging: PathBuf,
    #[serde(default = "default_include_globs")]
    pub include_globs: Vec<String>,
    #[serde(default)]
    pub exclude_globs: Vec<String>,
    #[serde(default)]
    pub follow_symlinks: bool,
}

fn default_include_globs() -> Vec<String> {
    vec!["**/*.md".to_string()]
}

#[derive(Debug, Deserialize, Clone)]
pub struct FeedConfig {
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
        }
    }
}

fn default_page_size() -> usize {
    folio_core::feed::PAGE_SIZE
}

#[derive(Debug, Deserialize, Clone)]
pub struct RecommendationsConfig {
    /// Neighbours kept per document by the offline build.
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    /// Items returned per online lookup.
    #[serde(default = "default_top_k")]
    pub target: usize,
    /// Optional JSON file the neighbour table is also written to.
    #[serde(default)]
    pub output: Option<PathBuf>,
}

impl Default for RecommendationsConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            target: default_top_k(),
            output: None,
        }
    }
}

fn default_top_k() -> usize {
    folio_core::recommend::TOP_K
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    if config.feed.page_size == 0 {
        anyhow::bail!("feed.page_size must be > 0");
    }

    if config.recommendations.top_k == 0 {
        anyhow::bail!("recommendations.top_k must be > 0");
    }

    if config.content.root == config.content.staging {
        anyhow::bail!("content.root and content.staging must be different directories");
    }

    Ok(config)
}

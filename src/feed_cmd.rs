//! `folio feed`, `folio random` and `folio nav`.

use anyhow::{bail, Result};

use folio_core::feed::FeedFilter;

use crate::config::Config;
use crate::db;

/// Parse repeated `field=value` flags. Repeating a field widens its
/// accepted set; `tags=a,b` is shorthand for two `tags=` flags.
pub fn parse_filters(raw: &[String]) -> Result<FeedFilter> {
    let mut filter = FeedFilter::new();
    for item in raw {
        let Some((field, value)) = item.split_once('=') else {
            bail!("Invalid filter '{}': expected field=value", item);
        };
        let field = field.trim();
        if field.is_empty() {
            bail!("Invalid filter '{}': empty field name", item);
        }
        let values: Vec<String> = if field == "tags" {
            value
                .split(',')
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
                .collect()
        } else {
            vec![value.trim().to_string()]
        };
        filter.insert(field, values);
    }
    Ok(filter)
}

pub async fn run_feed(config: &Config, page: usize, filters: &[String]) -> Result<()> {
    let filter = parse_filters(filters)?;
    let site = db::open_site(config).await?;
    let result = site.query_feed(&filter, page).await?;
    site.docs().pool().close().await;

    if result.entries.is_empty() {
        println!("No results.");
    }

    for item in &result.entries {
        let meta = &item.entry.metadata;
        println!(
            "{} {} / {}",
            item.key,
            meta.get("type").unwrap_or("?"),
            meta.get("title").unwrap_or("(untitled)")
        );
        println!("    url: {}", item.entry.url().unwrap_or_default());
        println!("    collection: {}", item.entry.clean_collection);
        if let Some(tags) = meta.get("tags").filter(|t| !t.is_empty()) {
            println!("    tags: {}", tags);
        }
    }

    println!(
        "page {} of {}{}{}",
        result.page,
        result.page_count,
        if result.has_prev { " (prev)" } else { "" },
        if result.has_next { " (next)" } else { "" }
    );
    Ok(())
}

pub async fn run_random(config: &Config) -> Result<()> {
    let site = db::open_site(config).await?;
    let url = site.random_url(&mut rand::thread_rng()).await?;
    site.docs().pool().close().await;

    match url {
        Some(url) => println!("{}", url),
        None => println!("No results."),
    }
    Ok(())
}

pub async fn run_nav(config: &Config, collection: &str, id: &str) -> Result<()> {
    let site = db::open_site(config).await?;
    let links = site.navigate_in(collection, id).await;
    site.docs().pool().close().await;

    match links? {
        None => println!("{} is the only entry in {}", id, collection),
        Some(links) => {
            let show = |label: &str, value: &Option<String>| {
                if let Some(v) = value {
                    println!("{}: {}", label, v);
                }
            };
            show("first", &links.first);
            show("prev", &links.prev);
            show("next", &links.next);
            show("last", &links.last);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_core::feed::FeedEntry;
    use folio_core::frontmatter::Metadata;

    fn entry(collection: &str, tags: &str) -> FeedEntry {
        let metadata: Metadata = [
            ("title", "T"),
            ("type", "blog"),
            ("collection", collection),
            ("tags", tags),
        ]
        .into_iter()
        .collect();
        FeedEntry::from_metadata(metadata, "blogs/t.md")
    }

    #[test]
    fn test_parse_filters() {
        let filter = parse_filters(&[
            "tags=Devlog, Review".to_string(),
            "collection=Indie Game Reviews".to_string(),
        ])
        .unwrap();
        assert!(filter.matches(&entry("Indie Game Reviews", "review")));
        assert!(!filter.matches(&entry("Devlogs", "review")));
        assert!(!filter.matches(&entry("Indie Game Reviews", "music")));
    }

    #[test]
    fn test_parse_filters_rejects_bare_words() {
        assert!(parse_filters(&["devlog".to_string()]).is_err());
        assert!(parse_filters(&["=x".to_string()]).is_err());
        assert!(parse_filters(&[]).unwrap().is_empty());
    }
}

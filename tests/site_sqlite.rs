//! Drives the core `Site` over the real SQLite and filesystem backends.

use rand::rngs::StdRng;
use rand::SeedableRng;
use sqlx::sqlite::SqlitePoolOptions;
use tempfile::TempDir;

use folio::blob_fs::FsBlobStore;
use folio::migrate::create_schema;
use folio::sqlite_store::SqliteDocumentStore;
use folio_core::error::ContentError;
use folio_core::feed::{FeedFilter, FeedKey};
use folio_core::recommend::build_similarity_index;
use folio_core::store::{BlobStore, DocumentStore, FEED_COLLECTION, FEED_DOCUMENT};
use folio_core::Site;

const ALBUM: &str = "---
title: \"Night Drives\"
date: 2024-02-02
type: music
collection: Albums
tags: Synthwave, Album
og_title: Night Drives
---
Recorded over one winter.

![audio:/assets/music/intro.mp3]
---
title: Intro
file: intro.mp3
title: Highway
file: highway.mp3
";

const POST: &str = "---
title: Synth Setup
date: 2024-02-03
type: blog
collection: Devlogs
tags: Synthwave, Devlog
---
How the album was recorded, which synth, which highway recordings.
";

async fn site(tmp: &TempDir) -> Site<FsBlobStore, SqliteDocumentStore> {
    let db_path = tmp.path().join("folio.sqlite");
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect(&format!("sqlite:{}?mode=rwc", db_path.display()))
        .await
        .unwrap();
    create_schema(&pool).await.unwrap();
    Site::new(
        FsBlobStore::new(tmp.path().join("site")),
        SqliteDocumentStore::new(pool),
    )
    .with_page_size(1)
}

fn key(s: &str) -> FeedKey {
    FeedKey::parse(s).unwrap()
}

#[tokio::test]
async fn test_publish_music_and_blog_end_to_end() {
    let tmp = TempDir::new().unwrap();
    let site = site(&tmp).await;

    let outcome = site
        .publish("music/night-drives.md", ALBUM, key("2024-02-02 20:00:00"))
        .await
        .unwrap();
    assert_eq!(outcome.record.title, "Night Drives");
    assert!(outcome.record.body_html.contains("<audio src=\"/assets/music/intro.mp3\" controls></audio>"));
    site.publish("blogs/synth-setup.md", POST, key("2024-02-03 09:30:00"))
        .await
        .unwrap();

    assert!(tmp.path().join("site/music/night-drives.md").exists());

    let record = site.load_record("music/night-drives.md").await.unwrap();
    assert_eq!(record.url(), "music/night-drives");
    assert_eq!(
        record.og_tags.get("og:title").map(String::as_str),
        Some("Night Drives")
    );

    let page1 = site.query_feed(&FeedFilter::new(), 1).await.unwrap();
    assert_eq!(page1.page_count, 2);
    assert!(page1.has_next);
    assert_eq!(page1.entries[0].entry.location, "blogs/synth-setup.md");

    let synth = site
        .query_feed(&FeedFilter::new().with("tags", ["synthwave"]), 2)
        .await
        .unwrap();
    assert_eq!(synth.entries.len(), 1);
    assert_eq!(synth.entries[0].entry.location, "music/night-drives.md");

    let stored = site
        .docs()
        .get(FEED_COLLECTION, FEED_DOCUMENT)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored["2024-02-02 20:00:00"]["clean_collection"], "albums");
}

#[tokio::test]
async fn test_recommendations_round_trip_through_sqlite() {
    let tmp = TempDir::new().unwrap();
    let site = site(&tmp).await;
    site.publish("music/night-drives.md", ALBUM, key("2024-02-02 20:00:00"))
        .await
        .unwrap();
    site.publish("blogs/synth-setup.md", POST, key("2024-02-03 09:30:00"))
        .await
        .unwrap();

    let corpus = vec![
        ("music/night-drives.md".to_string(), ALBUM.to_string()),
        ("blogs/synth-setup.md".to_string(), POST.to_string()),
    ];
    let index = build_similarity_index(&corpus, 6);
    site.store_similarity_index(&index).await.unwrap();
    assert_eq!(site.similarity_index().await.unwrap(), index);

    let mut rng = StdRng::seed_from_u64(42);
    let recs = site
        .recommend("music/night-drives.md", &mut rng)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(recs.len(), 1);
    assert_eq!(recs[0].entry.location, "blogs/synth-setup.md");

    assert!(site
        .recommend("blogs/unknown.md", &mut rng)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_malformed_music_leaves_stores_untouched() {
    let tmp = TempDir::new().unwrap();
    let site = site(&tmp).await;

    let broken = ALBUM.replace("file: highway.mp3\n", "");
    let err = site
        .publish("music/broken.md", &broken, key("2024-02-02 20:00:00"))
        .await
        .unwrap_err();
    assert!(matches!(err, ContentError::MalformedTrackListing { .. }));
    assert!(!site.blobs().exists("music/broken.md").await.unwrap());
    assert!(site.feed_log().await.unwrap().is_empty());
}

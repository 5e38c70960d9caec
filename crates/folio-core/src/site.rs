//! The caller-facing API: parse, build, query, navigate, recommend, publish.
//!
//! [`Site`] owns one [`BlobStore`] and one [`DocumentStore`], injected at
//! construction. It keeps no cache: every call reads the stores afresh, so
//! concurrent readers need no locking and consistency is whatever the
//! document store's single-document atomicity gives. Writers are assumed
//! to be one at a time; two concurrent publishes can lose an update to the
//! feed log or a collection list.

use rand::Rng;
use serde::Serialize;
use tracing::{debug, info};

use crate::collection::{Collection, NavLinks};
use crate::content::{build_record, clean_name, ContentRecord};
use crate::error::{ContentError, Result};
use crate::feed::{FeedEntry, FeedFilter, FeedItem, FeedKey, FeedLog, FeedPage, PAGE_SIZE};
use crate::frontmatter::{parse_document, SegmentLayout};
use crate::markdown::render_markdown;
use crate::recommend::{recommend, SimilarityIndex, TOP_K};
use crate::store::{
    content_type_for, Blob, BlobStore, DocumentStore, COLLECTIONS_COLLECTION, FEED_COLLECTION,
    FEED_DOCUMENT, RECOMMENDATIONS_COLLECTION, RECOMMENDATIONS_DOCUMENT,
};

/// Parse, render and build one document held in memory.
pub fn build_from_text(text: &str, path: &str) -> Result<ContentRecord> {
    let doc = parse_document(text, path, SegmentLayout::for_path(path))?;
    let body_html = render_markdown(&doc.body);
    build_record(&doc, body_html)
}

/// What [`Site::publish`] did.
#[derive(Debug, Clone, Serialize)]
pub struct PublishOutcome {
    pub record: ContentRecord,
    pub key: FeedKey,
    /// An earlier feed entry for this path, or at this key, was overwritten.
    pub replaced: bool,
    /// The record was newly added to its collection list.
    pub appended: bool,
}

pub struct Site<B, D> {
    blobs: B,
    docs: D,
    page_size: usize,
    recommendation_target: usize,
}

impl<B: BlobStore, D: DocumentStore> Site<B, D> {
    pub fn new(blobs: B, docs: D) -> Self {
        Site {
            blobs,
            docs,
            page_size: PAGE_SIZE,
            recommendation_target: TOP_K,
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn with_recommendation_target(mut self, target: usize) -> Self {
        self.recommendation_target = target;
        self
    }

    pub fn blobs(&self) -> &B {
        &self.blobs
    }

    pub fn docs(&self) -> &D {
        &self.docs
    }

    /// Fetch a blob, failing with [`ContentError::BlobNotFound`] if absent.
    pub async fn load_blob(&self, path: &str) -> Result<Blob> {
        self.blobs
            .get(path)
            .await?
            .ok_or_else(|| ContentError::BlobNotFound {
                path: path.to_string(),
            })
    }

    /// Load and build the record stored at `path` (e.g. `blogs/foo.md`).
    pub async fn load_record(&self, path: &str) -> Result<ContentRecord> {
        let blob = self.load_blob(path).await?;
        build_from_text(blob.text(path)?, path)
    }

    pub async fn feed_log(&self) -> Result<FeedLog> {
        match self.docs.get(FEED_COLLECTION, FEED_DOCUMENT).await? {
            Some(doc) => FeedLog::from_document(doc),
            None => Ok(FeedLog::new()),
        }
    }

    pub async fn save_feed_log(&self, log: &FeedLog) -> Result<()> {
        self.docs
            .set(FEED_COLLECTION, FEED_DOCUMENT, &log.to_document()?)
            .await
    }

    /// One page of the filtered, newest-first feed. Never fails on empty.
    pub async fn query_feed(&self, filter: &FeedFilter, page: usize) -> Result<FeedPage> {
        let log = self.feed_log().await?;
        Ok(log.query(filter, page, self.page_size))
    }

    /// A uniformly random entry `url`, `None` when the feed is empty.
    pub async fn random_url<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Option<String>> {
        let log = self.feed_log().await?;
        Ok(log.random_url(rng))
    }

    /// Member list of a collection; a never-written collection is empty.
    pub async fn collection(&self, name: &str) -> Result<Collection> {
        let id = clean_name(name);
        Ok(match self.docs.get(COLLECTIONS_COLLECTION, &id).await? {
            Some(doc) => Collection::from_document(name, &doc),
            None => Collection::new(name),
        })
    }

    /// Prev/next/first/last links of `id` inside `collection`.
    pub async fn navigate_in(&self, collection: &str, id: &str) -> Result<Option<NavLinks>> {
        self.collection(collection).await?.navigate(id)
    }

    /// Navigation for a built record within its declared collection.
    pub async fn navigate(&self, record: &ContentRecord) -> Result<Option<NavLinks>> {
        self.navigate_in(&record.collection, record.filename()).await
    }

    pub async fn similarity_index(&self) -> Result<SimilarityIndex> {
        Ok(self
            .docs
            .get(RECOMMENDATIONS_COLLECTION, RECOMMENDATIONS_DOCUMENT)
            .await?
            .map(|doc| SimilarityIndex::from_document(&doc))
            .unwrap_or_default())
    }

    /// Replace the stored neighbour table wholesale.
    pub async fn store_similarity_index(&self, index: &SimilarityIndex) -> Result<()> {
        self.docs
            .set(
                RECOMMENDATIONS_COLLECTION,
                RECOMMENDATIONS_DOCUMENT,
                &index.to_document(),
            )
            .await
    }

    /// Recommendations for the document at blob path `doc_id`.
    ///
    /// `Ok(None)` when the document has no precomputed row.
    pub async fn recommend<R: Rng + ?Sized>(
        &self,
        doc_id: &str,
        rng: &mut R,
    ) -> Result<Option<Vec<FeedItem>>> {
        let index = self.similarity_index().await?;
        let log = self.feed_log().await?;
        let recs = recommend(&index, &log, doc_id, self.recommendation_target, rng);
        if recs.is_none() {
            debug!(doc_id, "no precomputed recommendations");
        }
        Ok(recs)
    }

    /// Validate and publish a document.
    ///
    /// The record is built before anything is written, so a malformed
    /// document leaves every store untouched. A path that is already in the
    /// feed keeps its existing key and its entry is overwritten; `key` is
    /// only used for first publication.
    pub async fn publish(&self, path: &str, text: &str, key: FeedKey) -> Result<PublishOutcome> {
        let record = build_from_text(text, path)?;

        self.blobs
            .put(path, text.as_bytes(), content_type_for(path))
            .await?;

        let mut log = self.feed_log().await?;
        let previous: Vec<FeedKey> = log
            .iter()
            .filter(|(_, entry)| entry.location == path)
            .map(|(k, _)| k.clone())
            .collect();
        let key = previous.last().cloned().unwrap_or(key);
        for stale in previous.iter().filter(|k| **k != key) {
            log.remove(stale);
        }
        let replaced = log
            .upsert(key.clone(), FeedEntry::from_record(&record, path))
            .is_some();
        self.save_feed_log(&log).await?;

        let mut collection = self.collection(&record.collection).await?;
        let appended = collection.append(record.filename());
        if appended {
            self.docs
                .set(
                    COLLECTIONS_COLLECTION,
                    &collection.name,
                    &collection.to_document(),
                )
                .await?;
        }

        info!(path, key = %key, replaced, appended, "published");
        Ok(PublishOutcome {
            record,
            key,
            replaced,
            appended,
        })
    }

    /// Re-derive every feed entry's metadata from its current blob.
    ///
    /// Returns the number of entries refreshed.
    pub async fn refresh_feed(&self) -> Result<usize> {
        let mut log = self.feed_log().await?;
        let mut refreshed = 0;
        for (key, entry) in log.iter_mut() {
            let blob = self.load_blob(&entry.location).await?;
            let doc = parse_document(
                blob.text(&entry.location)?,
                &entry.location,
                SegmentLayout::for_path(&entry.location),
            )?;
            entry.metadata.merge(&doc.metadata);
            entry.clean_collection = entry
                .metadata
                .get("collection")
                .map(clean_name)
                .unwrap_or_default();
            debug!(key = %key, location = %entry.location, "refreshed feed entry");
            refreshed += 1;
        }
        self.save_feed_log(&log).await?;
        Ok(refreshed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::{InMemoryBlobStore, InMemoryDocumentStore};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn site() -> Site<InMemoryBlobStore, InMemoryDocumentStore> {
        Site::new(InMemoryBlobStore::new(), InMemoryDocumentStore::new())
    }

    fn post(title: &str, collection: &str, tags: &str) -> String {
        format!(
            "---\ntitle: {}\ndate: 2024-01-01\ntype: blog\ncollection: {}\ntags: {}\n---\n# {}\n\nSome words about {}.\n",
            title, collection, tags, title, title
        )
    }

    fn key(s: &str) -> FeedKey {
        FeedKey::parse(s).unwrap()
    }

    #[tokio::test]
    async fn test_publish_then_load_and_query() {
        let site = site();
        let outcome = site
            .publish("blogs/first.md", &post("First", "Devlogs", "Devlog"), key("2024-01-01 09:00:00"))
            .await
            .unwrap();
        assert!(!outcome.replaced);
        assert!(outcome.appended);
        site.publish("blogs/second.md", &post("Second", "Devlogs", "Review"), key("2024-01-02 10:00:00"))
            .await
            .unwrap();

        let record = site.load_record("blogs/first.md").await.unwrap();
        assert_eq!(record.url(), "blog/first");

        let page = site.query_feed(&FeedFilter::new(), 1).await.unwrap();
        assert_eq!(page.entries.len(), 2);
        assert_eq!(page.entries[0].entry.location, "blogs/second.md");
        assert_eq!(page.entries[0].entry.clean_collection, "devlogs");

        let devlogs = site
            .query_feed(&FeedFilter::new().with("tags", ["devlog"]), 1)
            .await
            .unwrap();
        assert_eq!(devlogs.entries.len(), 1);
        assert_eq!(devlogs.entries[0].entry.location, "blogs/first.md");
    }

    #[tokio::test]
    async fn test_malformed_publish_writes_nothing() {
        let site = site();
        let err = site
            .publish("blogs/bad.md", "---\ntitle: Bad\n", key("2024-01-01 00:00:00"))
            .await
            .unwrap_err();
        assert!(matches!(err, ContentError::MalformedDocument { .. }));
        assert!(!site.blobs().exists("blogs/bad.md").await.unwrap());
        assert!(site.feed_log().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_navigation_after_publish() {
        let site = site();
        site.publish("blogs/a.md", &post("A", "Indie Game Reviews", ""), key("2024-01-01 00:00:00"))
            .await
            .unwrap();
        let a = site.load_record("blogs/a.md").await.unwrap();
        assert_eq!(site.navigate(&a).await.unwrap(), None);

        site.publish("blogs/b.md", &post("B", "Indie Game Reviews", ""), key("2024-01-02 00:00:00"))
            .await
            .unwrap();
        let links = site.navigate(&a).await.unwrap().unwrap();
        assert_eq!(links.next.as_deref(), Some("b"));
        assert_eq!(links.last.as_deref(), Some("b"));
        assert!(links.prev.is_none());
        assert!(links.first.is_none());

        let collection = site.collection("indie game reviews").await.unwrap();
        assert_eq!(collection.members(), ["a", "b"]);
    }

    #[tokio::test]
    async fn test_navigate_unknown_member() {
        let site = site();
        let err = site.navigate_in("Misc", "ghost").await.unwrap_err();
        assert!(matches!(err, ContentError::NotInCollection { .. }));
    }

    #[tokio::test]
    async fn test_republish_same_key_overwrites() {
        let site = site();
        let k = key("2024-01-01 00:00:00");
        site.publish("blogs/a.md", &post("A", "Misc", ""), k.clone())
            .await
            .unwrap();
        let outcome = site
            .publish("blogs/a.md", &post("A2", "Misc", ""), k)
            .await
            .unwrap();
        assert!(outcome.replaced);
        assert!(!outcome.appended);
        let log = site.feed_log().await.unwrap();
        assert_eq!(log.len(), 1);
    }

    #[tokio::test]
    async fn test_republish_edited_path_keeps_one_entry() {
        let site = site();
        site.publish("blogs/a.md", &post("A", "Misc", ""), key("2024-01-01 00:00:00"))
            .await
            .unwrap();
        let outcome = site
            .publish("blogs/a.md", &post("A edited", "Misc", ""), key("2024-02-01 00:00:00"))
            .await
            .unwrap();
        assert!(outcome.replaced);
        assert_eq!(outcome.key.as_str(), "2024-01-01 00:00:00");

        let page = site.query_feed(&FeedFilter::new(), 1).await.unwrap();
        assert_eq!(page.entries.len(), 1);
        assert_eq!(page.entries[0].key.as_str(), "2024-01-01 00:00:00");
        assert_eq!(page.entries[0].entry.metadata.get("title"), Some("A edited"));
        assert_eq!(site.collection("Misc").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_load_record_rejects_invalid_utf8() {
        let site = site();
        site.blobs()
            .put("blogs/bad.md", b"---\ntitle: \xff\n---\nbody\n", "text/markdown")
            .await
            .unwrap();
        let err = site.load_record("blogs/bad.md").await.unwrap_err();
        assert!(matches!(err, ContentError::InvalidEncoding { ref path } if path == "blogs/bad.md"));
    }

    #[tokio::test]
    async fn test_recommend_and_random() {
        let site = site().with_recommendation_target(2);
        let mut rng = StdRng::seed_from_u64(9);
        assert_eq!(site.random_url(&mut rng).await.unwrap(), None);

        for (i, name) in ["a", "b", "c"].iter().enumerate() {
            site.publish(
                &format!("blogs/{}.md", name),
                &post(name, "Misc", ""),
                key(&format!("2024-01-0{} 00:00:00", i + 1)),
            )
            .await
            .unwrap();
        }
        assert!(site.recommend("blogs/a.md", &mut rng).await.unwrap().is_none());

        let mut index = SimilarityIndex::new();
        index.insert("blogs/a.md", vec!["blogs/b.md".into()]);
        site.store_similarity_index(&index).await.unwrap();

        let recs = site.recommend("blogs/a.md", &mut rng).await.unwrap().unwrap();
        assert_eq!(recs.len(), 2);
        assert!(recs.iter().any(|r| r.entry.location == "blogs/b.md"));
        assert!(recs.iter().all(|r| r.entry.location != "blogs/a.md"));

        let url = site.random_url(&mut rng).await.unwrap().unwrap();
        assert!(url.starts_with("blog/"));
    }

    #[tokio::test]
    async fn test_refresh_feed_picks_up_edits() {
        let site = site();
        site.publish("blogs/a.md", &post("Old", "Misc", ""), key("2024-01-01 00:00:00"))
            .await
            .unwrap();
        let edited = post("New", "Other Things", "");
        site.blobs()
            .put("blogs/a.md", edited.as_bytes(), "text/markdown")
            .await
            .unwrap();

        assert_eq!(site.refresh_feed().await.unwrap(), 1);
        let log = site.feed_log().await.unwrap();
        let entry = log.get(&key("2024-01-01 00:00:00")).unwrap();
        assert_eq!(entry.metadata.get("title"), Some("New"));
        assert_eq!(entry.clean_collection, "other_things");
        assert_eq!(entry.location, "blogs/a.md");
    }

    #[tokio::test]
    async fn test_load_missing_blob() {
        let err = site().load_record("blogs/nope.md").await.unwrap_err();
        assert!(matches!(err, ContentError::BlobNotFound { .. }));
    }
}

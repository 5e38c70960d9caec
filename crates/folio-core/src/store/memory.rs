//! In-memory [`BlobStore`] and [`DocumentStore`] implementations for
//! testing and embedding.
//!
//! Both use `HashMap` behind `std::sync::RwLock`. A poisoned lock is
//! reported as [`ContentError::StoreUnavailable`].

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::error::{ContentError, Result};

use super::{Blob, BlobStore, Document, DocumentStore};

/// In-memory blob store keyed by path.
#[derive(Default)]
pub struct InMemoryBlobStore {
    blobs: RwLock<HashMap<String, Blob>>,
}

impl InMemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
    async fn exists(&self, path: &str) -> Result<bool> {
        let blobs = self.blobs.read().map_err(ContentError::store)?;
        Ok(blobs.contains_key(path))
    }

    async fn get(&self, path: &str) -> Result<Option<Blob>> {
        let blobs = self.blobs.read().map_err(ContentError::store)?;
        Ok(blobs.get(path).cloned())
    }

    async fn put(&self, path: &str, bytes: &[u8], content_type: &str) -> Result<()> {
        let mut blobs = self.blobs.write().map_err(ContentError::store)?;
        blobs.insert(
            path.to_string(),
            Blob {
                bytes: bytes.to_vec(),
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }
}

/// In-memory document store keyed by `(collection, doc_id)`.
#[derive(Default)]
pub struct InMemoryDocumentStore {
    docs: RwLock<HashMap<(String, String), Document>>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn get(&self, collection: &str, doc_id: &str) -> Result<Option<Document>> {
        let docs = self.docs.read().map_err(ContentError::store)?;
        Ok(docs
            .get(&(collection.to_string(), doc_id.to_string()))
            .cloned())
    }

    async fn set(&self, collection: &str, doc_id: &str, doc: &Document) -> Result<()> {
        let mut docs = self.docs.write().map_err(ContentError::store)?;
        docs.insert((collection.to_string(), doc_id.to_string()), doc.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_blob_put_get() {
        let store = InMemoryBlobStore::new();
        assert!(!store.exists("blogs/a.md").await.unwrap());
        store
            .put("blogs/a.md", b"hello", "text/markdown")
            .await
            .unwrap();
        assert!(store.exists("blogs/a.md").await.unwrap());
        let blob = store.get("blogs/a.md").await.unwrap().unwrap();
        assert_eq!(blob.text("blogs/a.md").unwrap(), "hello");
        assert_eq!(blob.content_type, "text/markdown");
        assert!(store.get("blogs/b.md").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_document_set_replaces() {
        let store = InMemoryDocumentStore::new();
        assert!(store.get("feed", "content-log").await.unwrap().is_none());

        let mut doc = Document::new();
        doc.insert("a".into(), json!(1));
        store.set("feed", "content-log", &doc).await.unwrap();

        let mut doc2 = Document::new();
        doc2.insert("b".into(), json!(2));
        store.set("feed", "content-log", &doc2).await.unwrap();

        let got = store.get("feed", "content-log").await.unwrap().unwrap();
        assert_eq!(got, doc2);
        assert!(store.get("feed", "other").await.unwrap().is_none());
    }
}

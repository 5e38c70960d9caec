//! SQLite-backed [`DocumentStore`] implementation.
//!
//! Every named document is one row of the `documents` table, its body
//! stored as a JSON string. `set` is a single upsert statement, which gives
//! the per-document atomicity the core expects and nothing more.

use async_trait::async_trait;
use sqlx::{Row, SqlitePool};

use folio_core::error::{ContentError, Result};
use folio_core::store::{Document, DocumentStore};

pub struct SqliteDocumentStore {
    pool: SqlitePool,
}

impl SqliteDocumentStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl DocumentStore for SqliteDocumentStore {
    async fn get(&self, collection: &str, doc_id: &str) -> Result<Option<Document>> {
        let row = sqlx::query("SELECT body FROM documents WHERE collection = ? AND doc_id = ?")
            .bind(collection)
            .bind(doc_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(ContentError::store)?;

        match row {
            Some(row) => {
                let body: String = row.get("body");
                Ok(Some(serde_json::from_str(&body)?))
            }
            None => Ok(None),
        }
    }

    async fn set(&self, collection: &str, doc_id: &str, doc: &Document) -> Result<()> {
        let body = serde_json::to_string(doc)?;
        let now = chrono::Utc::now().timestamp();

        sqlx::query(
            r#"
            INSERT INTO documents (collection, doc_id, body, updated_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(collection, doc_id) DO UPDATE SET
                body = excluded.body,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(collection)
        .bind(doc_id)
        .bind(&body)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(ContentError::store)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn store() -> SqliteDocumentStore {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        crate::migrate::create_schema(&pool).await.unwrap();
        SqliteDocumentStore::new(pool)
    }

    #[tokio::test]
    async fn test_get_missing_is_none() {
        let store = store().await;
        assert!(store.get("feed", "content-log").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_set_then_get_preserves_order() {
        let store = store().await;
        let mut doc = Document::new();
        doc.insert("zeta".into(), json!("last written first"));
        doc.insert("alpha".into(), json!(["a", "b"]));
        store.set("collections", "misc", &doc).await.unwrap();

        let got = store.get("collections", "misc").await.unwrap().unwrap();
        assert_eq!(got, doc);
        let keys: Vec<&String> = got.keys().collect();
        assert_eq!(keys, ["zeta", "alpha"]);
    }

    #[tokio::test]
    async fn test_set_replaces_wholesale() {
        let store = store().await;
        let mut first = Document::new();
        first.insert("a".into(), json!(1));
        store.set("recommendations", "recommendations", &first).await.unwrap();

        let mut second = Document::new();
        second.insert("b".into(), json!(2));
        store.set("recommendations", "recommendations", &second).await.unwrap();

        let got = store
            .get("recommendations", "recommendations")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(got, second);
    }
}

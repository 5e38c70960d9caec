//! Filesystem-backed [`BlobStore`]: blob paths resolve under one root
//! directory (`{root}/blogs/foo.md`, `{root}/images/x.png`).

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;

use folio_core::error::{ContentError, Result};
use folio_core::store::{content_type_for, Blob, BlobStore};

/// True when `path`, minus any leading `/`, stays below the directory it is
/// joined to.
pub fn is_safe_blob_path(path: &str) -> bool {
    let relative = Path::new(path.trim_start_matches('/'));
    !relative.as_os_str().is_empty()
        && relative
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a blob path under the root, rejecting absolute paths and `..`.
    fn resolve(&self, path: &str) -> Result<PathBuf> {
        if !is_safe_blob_path(path) {
            return Err(ContentError::store(format!("invalid blob path: {}", path)));
        }
        Ok(self.root.join(path.trim_start_matches('/')))
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn exists(&self, path: &str) -> Result<bool> {
        let full = self.resolve(path)?;
        tokio::fs::try_exists(&full)
            .await
            .map_err(ContentError::store)
    }

    async fn get(&self, path: &str) -> Result<Option<Blob>> {
        let full = self.resolve(path)?;
        match tokio::fs::read(&full).await {
            Ok(bytes) => Ok(Some(Blob {
                bytes,
                content_type: content_type_for(path).to_string(),
            })),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(ContentError::store(format!("{}: {}", full.display(), e))),
        }
    }

    async fn put(&self, path: &str, bytes: &[u8], _content_type: &str) -> Result<()> {
        let full = self.resolve(path)?;
        if let Some(parent) = full.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(ContentError::store)?;
        }
        tokio::fs::write(&full, bytes)
            .await
            .map_err(|e| ContentError::store(format!("{}: {}", full.display(), e)))
    }
}

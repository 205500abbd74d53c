//! Vector store abstraction.
//!
//! The [`VectorStore`] trait defines the persistence operations the
//! pipeline needs (add, search, delete, clear) so the ingestion and
//! query paths are written once against the trait and the backend is
//! swappable:
//!
//! - [`sqlite`]: a SQLite database managed with `sqlx` (the default).
//! - [`flat`]: a flat vector index file plus a JSON metadata sidecar.
//!
//! Both backends record the embedding model identity at first write;
//! ingestion and query verify the configured embedder against it, since
//! mixing models across the two paths silently breaks similarity scores.
//!
//! Stores hold unit-normalized vectors; similarity is cosine (equal to
//! the inner product for unit vectors), higher is more similar.

pub mod flat;
pub mod sqlite;

use anyhow::{bail, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::StoreConfig;
use crate::embedding::Embedder;
use crate::models::ChunkRecord;

/// The embedding model a store's vectors were produced with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbeddingIdentity {
    pub model: String,
    pub dims: usize,
}

/// A raw nearest-neighbor hit: a stored chunk and its similarity score.
#[derive(Debug, Clone)]
pub struct Hit {
    pub score: f32,
    pub record: ChunkRecord,
}

/// Persistent (vector, chunk, metadata) collection with k-NN search.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Insert chunk records with their vectors. Adding an existing chunk
    /// id replaces the previous record and vector (upsert).
    async fn add(&mut self, records: &[ChunkRecord], vectors: &[Vec<f32>]) -> Result<()>;

    /// Remove the given chunk ids. Unknown ids are ignored.
    async fn delete(&mut self, ids: &[String]) -> Result<()>;

    /// Remove everything, including the recorded embedding identity.
    async fn clear(&mut self) -> Result<()>;

    /// Top-`k` chunks by descending similarity to `query_vec`. Ties keep
    /// insertion order (stable sort).
    async fn search(&self, query_vec: &[f32], k: usize) -> Result<Vec<Hit>>;

    /// Number of stored chunks.
    async fn count(&self) -> Result<usize>;

    /// Flush buffered state to disk. A no-op for backends that write
    /// through.
    async fn persist(&mut self) -> Result<()>;

    async fn embedding_identity(&self) -> Result<Option<EmbeddingIdentity>>;

    async fn set_embedding_identity(&mut self, identity: &EmbeddingIdentity) -> Result<()>;
}

/// Open the backend selected by the configuration, creating the store
/// directory if needed.
pub async fn open_store(config: &StoreConfig) -> Result<Box<dyn VectorStore>> {
    std::fs::create_dir_all(&config.dir)?;
    match config.backend.as_str() {
        "sqlite" => Ok(Box::new(sqlite::SqliteStore::open(&config.dir).await?)),
        "flat" => Ok(Box::new(flat::FlatStore::open(&config.dir)?)),
        other => bail!("Unknown store backend: {}", other),
    }
}

/// Write path: record the embedder's identity on first use, verify it on
/// every later run.
pub async fn ensure_identity(store: &mut dyn VectorStore, embedder: &dyn Embedder) -> Result<()> {
    let configured = EmbeddingIdentity {
        model: embedder.model_name().to_string(),
        dims: embedder.dims(),
    };
    match store.embedding_identity().await? {
        Some(recorded) if recorded != configured => bail!(
            "Store was built with model '{}' ({} dims) but '{}' ({} dims) is configured; \
             rebuild the store or restore the original embedding settings",
            recorded.model,
            recorded.dims,
            configured.model,
            configured.dims
        ),
        Some(_) => Ok(()),
        None => store.set_embedding_identity(&configured).await,
    }
}

/// Read path: verify the embedder matches what the store was built with.
/// An empty store with no recorded identity passes.
pub async fn verify_identity(store: &dyn VectorStore, embedder: &dyn Embedder) -> Result<()> {
    if let Some(recorded) = store.embedding_identity().await? {
        let configured = EmbeddingIdentity {
            model: embedder.model_name().to_string(),
            dims: embedder.dims(),
        };
        if recorded != configured {
            bail!(
                "Store was built with model '{}' ({} dims) but '{}' ({} dims) is configured",
                recorded.model,
                recorded.dims,
                configured.model,
                configured.dims
            );
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::hash::HashEmbedder;
    use tempfile::TempDir;

    #[tokio::test]
    async fn identity_mismatch_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let mut store = flat::FlatStore::open(tmp.path()).unwrap();

        let small = HashEmbedder::new(64);
        ensure_identity(&mut store, &small).await.unwrap();
        verify_identity(&store, &small).await.unwrap();

        let big = HashEmbedder::new(128);
        assert!(ensure_identity(&mut store, &big).await.is_err());
        assert!(verify_identity(&store, &big).await.is_err());
    }

    #[tokio::test]
    async fn empty_store_passes_read_verification() {
        let tmp = TempDir::new().unwrap();
        let store = flat::FlatStore::open(tmp.path()).unwrap();
        let embedder = HashEmbedder::new(64);
        verify_identity(&store, &embedder).await.unwrap();
    }
}

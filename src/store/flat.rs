//! Flat-file vector store backend.
//!
//! On-disk layout inside the store directory:
//! - `vectors.bin`: contiguous little-endian f32 records, one fixed-width
//!   vector per chunk, in insertion order.
//! - `metadata.json`: sidecar with the embedding identity and one chunk
//!   record per vector, in the same order as `vectors.bin`.
//!
//! The whole collection is loaded into memory on open and searched by
//! brute-force cosine scan. Mutations buffer in memory; [`persist`]
//! rewrites both files atomically (temp file + rename).

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use super::{EmbeddingIdentity, Hit, VectorStore};
use crate::embedding::{blob_to_vec, cosine_similarity, vec_to_blob};
use crate::models::ChunkRecord;

const VECTORS_FILE: &str = "vectors.bin";
const METADATA_FILE: &str = "metadata.json";

#[derive(Debug, Default, Serialize, Deserialize)]
struct Sidecar {
    identity: Option<EmbeddingIdentity>,
    records: Vec<ChunkRecord>,
}

pub struct FlatStore {
    dir: PathBuf,
    identity: Option<EmbeddingIdentity>,
    records: Vec<ChunkRecord>,
    vectors: Vec<Vec<f32>>,
    index_by_id: HashMap<String, usize>,
}

impl FlatStore {
    /// Load the store from `dir`, or start empty if no files exist yet.
    pub fn open(dir: &Path) -> Result<Self> {
        let metadata_path = dir.join(METADATA_FILE);
        let vectors_path = dir.join(VECTORS_FILE);

        if !metadata_path.exists() {
            return Ok(Self {
                dir: dir.to_path_buf(),
                identity: None,
                records: Vec::new(),
                vectors: Vec::new(),
                index_by_id: HashMap::new(),
            });
        }

        let sidecar: Sidecar = serde_json::from_str(
            &std::fs::read_to_string(&metadata_path)
                .with_context(|| format!("Failed to read {}", metadata_path.display()))?,
        )
        .with_context(|| format!("Failed to parse {}", metadata_path.display()))?;

        let blob = if vectors_path.exists() {
            std::fs::read(&vectors_path)
                .with_context(|| format!("Failed to read {}", vectors_path.display()))?
        } else {
            Vec::new()
        };

        let dims = sidecar.identity.as_ref().map(|i| i.dims).unwrap_or(0);
        let expected = sidecar.records.len() * dims * 4;
        if blob.len() != expected {
            bail!(
                "Vector index {} is inconsistent with its sidecar: {} bytes, expected {}",
                vectors_path.display(),
                blob.len(),
                expected
            );
        }

        let vectors: Vec<Vec<f32>> = if dims == 0 {
            Vec::new()
        } else {
            blob.chunks_exact(dims * 4).map(blob_to_vec).collect()
        };

        let index_by_id = sidecar
            .records
            .iter()
            .enumerate()
            .map(|(i, r)| (r.id.clone(), i))
            .collect();

        Ok(Self {
            dir: dir.to_path_buf(),
            identity: sidecar.identity,
            records: sidecar.records,
            vectors,
            index_by_id,
        })
    }

    fn rebuild_index(&mut self) {
        self.index_by_id = self
            .records
            .iter()
            .enumerate()
            .map(|(i, r)| (r.id.clone(), i))
            .collect();
    }
}

#[async_trait]
impl VectorStore for FlatStore {
    async fn add(&mut self, records: &[ChunkRecord], vectors: &[Vec<f32>]) -> Result<()> {
        if records.len() != vectors.len() {
            bail!(
                "add: {} records but {} vectors",
                records.len(),
                vectors.len()
            );
        }
        if let Some(identity) = &self.identity {
            if let Some(bad) = vectors.iter().find(|v| v.len() != identity.dims) {
                bail!(
                    "add: vector of {} dims in a {}-dim store",
                    bad.len(),
                    identity.dims
                );
            }
        }

        for (record, vector) in records.iter().zip(vectors.iter()) {
            match self.index_by_id.get(&record.id) {
                Some(&i) => {
                    self.records[i] = record.clone();
                    self.vectors[i] = vector.clone();
                }
                None => {
                    self.index_by_id.insert(record.id.clone(), self.records.len());
                    self.records.push(record.clone());
                    self.vectors.push(vector.clone());
                }
            }
        }
        Ok(())
    }

    async fn delete(&mut self, ids: &[String]) -> Result<()> {
        let doomed: std::collections::HashSet<&String> = ids.iter().collect();
        if doomed.is_empty() {
            return Ok(());
        }

        let mut records = Vec::with_capacity(self.records.len());
        let mut vectors = Vec::with_capacity(self.vectors.len());
        for (record, vector) in self.records.drain(..).zip(self.vectors.drain(..)) {
            if !doomed.contains(&record.id) {
                records.push(record);
                vectors.push(vector);
            }
        }
        self.records = records;
        self.vectors = vectors;
        self.rebuild_index();
        Ok(())
    }

    async fn clear(&mut self) -> Result<()> {
        self.records.clear();
        self.vectors.clear();
        self.index_by_id.clear();
        self.identity = None;
        Ok(())
    }

    async fn search(&self, query_vec: &[f32], k: usize) -> Result<Vec<Hit>> {
        let mut hits: Vec<Hit> = self
            .records
            .iter()
            .zip(self.vectors.iter())
            .map(|(record, vector)| Hit {
                score: cosine_similarity(query_vec, vector),
                record: record.clone(),
            })
            .collect();

        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        hits.truncate(k);
        Ok(hits)
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.records.len())
    }

    async fn persist(&mut self) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;

        let sidecar = Sidecar {
            identity: self.identity.clone(),
            records: self.records.clone(),
        };
        let json = serde_json::to_string_pretty(&sidecar)?;

        let mut blob = Vec::new();
        for vector in &self.vectors {
            blob.extend_from_slice(&vec_to_blob(vector));
        }

        write_atomic(&self.dir.join(METADATA_FILE), json.as_bytes())?;
        write_atomic(&self.dir.join(VECTORS_FILE), &blob)?;
        Ok(())
    }

    async fn embedding_identity(&self) -> Result<Option<EmbeddingIdentity>> {
        Ok(self.identity.clone())
    }

    async fn set_embedding_identity(&mut self, identity: &EmbeddingIdentity) -> Result<()> {
        self.identity = Some(identity.clone());
        Ok(())
    }
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let tmp = path.with_extension("tmp");
    std::fs::write(&tmp, bytes)
        .with_context(|| format!("Failed to write {}", tmp.display()))?;
    std::fs::rename(&tmp, path)
        .with_context(|| format!("Failed to replace {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn record(id: &str, doc: &str, ordinal: i64, text: &str) -> ChunkRecord {
        ChunkRecord {
            id: id.to_string(),
            doc_path: doc.to_string(),
            ordinal,
            text: text.to_string(),
            chars: text.chars().count() as i64,
        }
    }

    fn identity(dims: usize) -> EmbeddingIdentity {
        EmbeddingIdentity {
            model: "feature-hash-v1-test".to_string(),
            dims,
        }
    }

    #[tokio::test]
    async fn add_search_roundtrip() {
        let tmp = TempDir::new().unwrap();
        let mut store = FlatStore::open(tmp.path()).unwrap();
        store.set_embedding_identity(&identity(2)).await.unwrap();

        store
            .add(
                &[record("c1", "a.txt", 0, "alpha"), record("c2", "b.txt", 0, "beta")],
                &[vec![1.0, 0.0], vec![0.0, 1.0]],
            )
            .await
            .unwrap();

        let hits = store.search(&[1.0, 0.0], 2).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].record.id, "c1");
        assert!(hits[0].score > hits[1].score);
    }

    #[tokio::test]
    async fn add_is_upsert_by_id() {
        let tmp = TempDir::new().unwrap();
        let mut store = FlatStore::open(tmp.path()).unwrap();
        store.set_embedding_identity(&identity(2)).await.unwrap();

        store
            .add(&[record("c1", "a.txt", 0, "old")], &[vec![1.0, 0.0]])
            .await
            .unwrap();
        store
            .add(&[record("c1", "a.txt", 0, "new")], &[vec![0.0, 1.0]])
            .await
            .unwrap();

        assert_eq!(store.count().await.unwrap(), 1);
        let hits = store.search(&[0.0, 1.0], 1).await.unwrap();
        assert_eq!(hits[0].record.text, "new");
        assert!((hits[0].score - 1.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn delete_removes_targeted_ids_only() {
        let tmp = TempDir::new().unwrap();
        let mut store = FlatStore::open(tmp.path()).unwrap();
        store.set_embedding_identity(&identity(2)).await.unwrap();

        store
            .add(
                &[
                    record("c1", "a.txt", 0, "one"),
                    record("c2", "a.txt", 1, "two"),
                    record("c3", "b.txt", 0, "three"),
                ],
                &[vec![1.0, 0.0], vec![0.0, 1.0], vec![1.0, 1.0]],
            )
            .await
            .unwrap();

        store
            .delete(&["c1".to_string(), "c2".to_string()])
            .await
            .unwrap();
        assert_eq!(store.count().await.unwrap(), 1);
        let hits = store.search(&[1.0, 1.0], 3).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].record.id, "c3");
    }

    #[tokio::test]
    async fn persist_and_reload() {
        let tmp = TempDir::new().unwrap();

        {
            let mut store = FlatStore::open(tmp.path()).unwrap();
            store.set_embedding_identity(&identity(3)).await.unwrap();
            store
                .add(&[record("c1", "a.txt", 0, "persisted")], &[vec![0.1, 0.2, 0.3]])
                .await
                .unwrap();
            store.persist().await.unwrap();
        }

        let store = FlatStore::open(tmp.path()).unwrap();
        assert_eq!(store.count().await.unwrap(), 1);
        assert_eq!(
            store.embedding_identity().await.unwrap().unwrap(),
            identity(3)
        );
        let hits = store.search(&[0.1, 0.2, 0.3], 1).await.unwrap();
        assert_eq!(hits[0].record.text, "persisted");
    }

    #[tokio::test]
    async fn inconsistent_files_fail_loudly() {
        let tmp = TempDir::new().unwrap();

        {
            let mut store = FlatStore::open(tmp.path()).unwrap();
            store.set_embedding_identity(&identity(2)).await.unwrap();
            store
                .add(&[record("c1", "a.txt", 0, "x")], &[vec![1.0, 0.0]])
                .await
                .unwrap();
            store.persist().await.unwrap();
        }

        // Truncate the index file behind the sidecar's back.
        std::fs::write(tmp.path().join(VECTORS_FILE), b"\x00\x00").unwrap();
        assert!(FlatStore::open(tmp.path()).is_err());
    }

    #[tokio::test]
    async fn clear_drops_identity_too() {
        let tmp = TempDir::new().unwrap();
        let mut store = FlatStore::open(tmp.path()).unwrap();
        store.set_embedding_identity(&identity(2)).await.unwrap();
        store
            .add(&[record("c1", "a.txt", 0, "x")], &[vec![1.0, 0.0]])
            .await
            .unwrap();

        store.clear().await.unwrap();
        assert_eq!(store.count().await.unwrap(), 0);
        assert!(store.embedding_identity().await.unwrap().is_none());
    }
}

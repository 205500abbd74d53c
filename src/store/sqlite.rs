//! SQLite vector store backend.
//!
//! The collection lives in `index.sqlite` inside the store directory:
//! a `chunks` table for text and metadata, a `vectors` table holding each
//! embedding as a little-endian f32 BLOB, and a `meta` table recording
//! the embedding model identity. Schema creation is idempotent and runs
//! on every open.
//!
//! Search is a brute-force cosine scan over all stored vectors, computed
//! in Rust.

use anyhow::{bail, Result};
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use std::path::Path;
use std::str::FromStr;

use super::{EmbeddingIdentity, Hit, VectorStore};
use crate::embedding::{blob_to_vec, cosine_similarity, vec_to_blob};
use crate::models::ChunkRecord;

const DB_FILE: &str = "index.sqlite";

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (or create) the database under `dir` and ensure the schema.
    pub async fn open(dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(dir)?;
        let db_path = dir.join(DB_FILE);

        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", db_path.display()))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.ensure_schema().await?;
        Ok(store)
    }

    async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS chunks (
                id TEXT PRIMARY KEY,
                doc_path TEXT NOT NULL,
                ordinal INTEGER NOT NULL,
                text TEXT NOT NULL,
                chars INTEGER NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS vectors (
                chunk_id TEXT PRIMARY KEY,
                embedding BLOB NOT NULL,
                created_at INTEGER NOT NULL,
                FOREIGN KEY (chunk_id) REFERENCES chunks(id)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS meta (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_chunks_doc_path ON chunks(doc_path)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    pub async fn close(self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl VectorStore for SqliteStore {
    async fn add(&mut self, records: &[ChunkRecord], vectors: &[Vec<f32>]) -> Result<()> {
        if records.len() != vectors.len() {
            bail!(
                "add: {} records but {} vectors",
                records.len(),
                vectors.len()
            );
        }

        let now = chrono::Utc::now().timestamp();
        let mut tx = self.pool.begin().await?;

        for (record, vector) in records.iter().zip(vectors.iter()) {
            sqlx::query(
                r#"
                INSERT INTO chunks (id, doc_path, ordinal, text, chars)
                VALUES (?, ?, ?, ?, ?)
                ON CONFLICT(id) DO UPDATE SET
                    doc_path = excluded.doc_path,
                    ordinal = excluded.ordinal,
                    text = excluded.text,
                    chars = excluded.chars
                "#,
            )
            .bind(&record.id)
            .bind(&record.doc_path)
            .bind(record.ordinal)
            .bind(&record.text)
            .bind(record.chars)
            .execute(&mut *tx)
            .await?;

            let blob = vec_to_blob(vector);
            sqlx::query(
                r#"
                INSERT INTO vectors (chunk_id, embedding, created_at)
                VALUES (?, ?, ?)
                ON CONFLICT(chunk_id) DO UPDATE SET
                    embedding = excluded.embedding,
                    created_at = excluded.created_at
                "#,
            )
            .bind(&record.id)
            .bind(&blob)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn delete(&mut self, ids: &[String]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;
        for id in ids {
            sqlx::query("DELETE FROM vectors WHERE chunk_id = ?")
                .bind(id)
                .execute(&mut *tx)
                .await?;
            sqlx::query("DELETE FROM chunks WHERE id = ?")
                .bind(id)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn clear(&mut self) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM vectors").execute(&mut *tx).await?;
        sqlx::query("DELETE FROM chunks").execute(&mut *tx).await?;
        sqlx::query("DELETE FROM meta").execute(&mut *tx).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn search(&self, query_vec: &[f32], k: usize) -> Result<Vec<Hit>> {
        let rows = sqlx::query(
            r#"
            SELECT c.id, c.doc_path, c.ordinal, c.text, c.chars, v.embedding
            FROM chunks c
            JOIN vectors v ON v.chunk_id = c.id
            ORDER BY c.doc_path, c.ordinal
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut hits: Vec<Hit> = rows
            .iter()
            .map(|row| {
                let blob: Vec<u8> = row.get("embedding");
                let vector = blob_to_vec(&blob);
                Hit {
                    score: cosine_similarity(query_vec, &vector),
                    record: ChunkRecord {
                        id: row.get("id"),
                        doc_path: row.get("doc_path"),
                        ordinal: row.get("ordinal"),
                        text: row.get("text"),
                        chars: row.get("chars"),
                    },
                }
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
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM chunks")
            .fetch_one(&self.pool)
            .await?;
        Ok(count as usize)
    }

    async fn persist(&mut self) -> Result<()> {
        // SQLite writes through; nothing buffered.
        Ok(())
    }

    async fn embedding_identity(&self) -> Result<Option<EmbeddingIdentity>> {
        let model: Option<String> =
            sqlx::query_scalar("SELECT value FROM meta WHERE key = 'embedding_model'")
                .fetch_optional(&self.pool)
                .await?;
        let dims: Option<String> =
            sqlx::query_scalar("SELECT value FROM meta WHERE key = 'embedding_dims'")
                .fetch_optional(&self.pool)
                .await?;

        match (model, dims) {
            (Some(model), Some(dims)) => Ok(Some(EmbeddingIdentity {
                model,
                dims: dims.parse()?,
            })),
            _ => Ok(None),
        }
    }

    async fn set_embedding_identity(&mut self, identity: &EmbeddingIdentity) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        for (key, value) in [
            ("embedding_model", identity.model.clone()),
            ("embedding_dims", identity.dims.to_string()),
        ] {
            sqlx::query(
                r#"
                INSERT INTO meta (key, value) VALUES (?, ?)
                ON CONFLICT(key) DO UPDATE SET value = excluded.value
                "#,
            )
            .bind(key)
            .bind(value)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }
}

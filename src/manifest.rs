//! Ingestion manifest: per-document bookkeeping for incremental runs.
//!
//! The manifest is a JSON object mapping each document's relative path to
//! its last-seen modification stamp, ingestion flag, chunk count, and
//! size:
//!
//! ```json
//! {"files": {"depo/smith.txt": {"stamp": 1724102400, "ingested": true, "chunks": 12, "size": 48123}}}
//! ```
//!
//! It is loaded once at the start of an ingestion run and saved atomically
//! (temp file + rename) at the end. A corrupt manifest is recovered by
//! falling back to an empty one, which forces full re-ingestion.
//!
//! Concurrent ingestion runs against the same manifest are unsafe: do not
//! run two ingestion jobs against the same corpus store simultaneously.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::models::SourceDocument;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ManifestEntry {
    /// Modification time at last ingestion, epoch seconds.
    pub stamp: i64,
    pub ingested: bool,
    pub chunks: i64,
    pub size: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Manifest {
    pub files: BTreeMap<String, ManifestEntry>,
}

impl Manifest {
    /// Load the manifest from disk.
    ///
    /// A missing file yields an empty manifest. An unreadable or invalid
    /// file also yields an empty manifest, with a warning, so a damaged
    /// manifest degrades to a full re-ingestion instead of a crash.
    pub fn load(path: &Path) -> Manifest {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Manifest::default(),
            Err(e) => {
                eprintln!(
                    "Warning: could not read manifest {}: {}; starting from an empty manifest",
                    path.display(),
                    e
                );
                return Manifest::default();
            }
        };

        match serde_json::from_str(&content) {
            Ok(manifest) => manifest,
            Err(e) => {
                eprintln!(
                    "Warning: manifest {} is corrupt ({}); starting from an empty manifest",
                    path.display(),
                    e
                );
                Manifest::default()
            }
        }
    }

    /// Save the manifest atomically: write a temp file alongside the
    /// target, then rename it into place.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let json = serde_json::to_string_pretty(self)?;
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, json)
            .with_context(|| format!("Failed to write manifest temp file {}", tmp.display()))?;
        std::fs::rename(&tmp, path)
            .with_context(|| format!("Failed to replace manifest {}", path.display()))?;
        Ok(())
    }

    /// True unless the document was already ingested at this exact stamp.
    pub fn should_ingest(&self, doc: &SourceDocument) -> bool {
        match self.files.get(&doc.rel_path) {
            Some(entry) => !(entry.ingested && entry.stamp == doc.stamp),
            None => true,
        }
    }

    /// Upsert the entry for a successfully ingested document.
    pub fn record_ingested(&mut self, doc: &SourceDocument, chunk_count: i64) {
        self.files.insert(
            doc.rel_path.clone(),
            ManifestEntry {
                stamp: doc.stamp,
                ingested: true,
                chunks: chunk_count,
                size: doc.size,
            },
        );
    }

    /// Chunk count recorded for a document, if any. Used to regenerate
    /// the ids of superseded chunks for targeted deletion.
    pub fn recorded_chunks(&self, rel_path: &str) -> Option<i64> {
        self.files.get(rel_path).map(|e| e.chunks)
    }
}

//! Core data models for the ingestion and retrieval pipeline.

use serde::{Deserialize, Serialize};

/// File type recognized by the normalizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Text,
    Word,
    Pdf,
}

impl DocumentKind {
    /// Map a file extension (lowercase, without dot) to a kind.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "txt" => Some(DocumentKind::Text),
            "docx" => Some(DocumentKind::Word),
            "pdf" => Some(DocumentKind::Pdf),
            _ => None,
        }
    }
}

/// A file discovered under the corpus root. Immutable once scanned;
/// re-read only when its modification stamp changes.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    /// Path relative to the corpus root (manifest key and document id).
    pub rel_path: String,
    /// Absolute path on disk, used for reading.
    pub abs_path: std::path::PathBuf,
    pub kind: DocumentKind,
    /// Modification time, epoch seconds.
    pub stamp: i64,
    /// File size in bytes.
    pub size: u64,
}

/// A chunk of one document's text, as stored in the vector store.
///
/// The id is the hex SHA-256 of `"{rel_path}#{ordinal}"`, so it is stable
/// across runs and unique within a corpus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkRecord {
    pub id: String,
    pub doc_path: String,
    pub ordinal: i64,
    pub text: String,
    pub chars: i64,
}

/// A ranked query match. Ephemeral; serialized to the CLI's JSON output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    /// 1-based rank position.
    pub rank: usize,
    pub score: f32,
    pub text: String,
    pub path: String,
    pub ordinal: i64,
    pub chars: i64,
}

//! # Transcript Index
//!
//! Incremental ingestion and semantic retrieval over a transcript corpus.
//!
//! The pipeline extracts plain text from heterogeneous source documents
//! (`.txt`, `.docx`, `.pdf`), splits it into bounded overlapping chunks,
//! embeds each chunk as a unit vector, and persists (vector, chunk,
//! metadata) triples in a swappable vector store. A JSON manifest tracks
//! per-document modification stamps so unchanged documents are skipped on
//! subsequent runs.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌───────────┐   ┌─────────┐   ┌──────────┐   ┌────────────┐
//! │  Scanner  │──▶│ Normalizer │──▶│ Chunker │──▶│ Embedder │──▶│ VectorStore │
//! │ (corpus)  │   │ txt/docx/  │   │ overlap │   │ hash /   │   │ sqlite /   │
//! └──────────┘   │    pdf     │   └─────────┘   │ openai   │   │   flat     │
//!       ▲        └───────────┘                  └────┬─────┘   └─────┬──────┘
//!       │                                           │               │
//!  ┌────┴─────┐                               query │          k-NN │
//!  │ Manifest  │                              ┌─────▼───────────────▼─────┐
//!  │ (JSON)    │                              │     Query façade (JSON)    │
//!  └──────────┘                               └───────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! tidx ingest --corpus ./transcripts --store ./data/index
//! tidx query "quick brown fox" --store ./data/index -k 5
//! tidx stats --store ./data/index
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing and validation |
//! | [`models`] | Core data types |
//! | [`scan`] | Corpus directory scanner |
//! | [`extract`] | Plain-text extraction (txt, docx, pdf) |
//! | [`chunk`] | Overlapping text chunker |
//! | [`embedding`] | Embedding provider abstraction |
//! | [`store`] | Vector store abstraction (sqlite, flat) |
//! | [`manifest`] | Incremental-ingestion bookkeeping |
//! | [`ingest`] | Batch ingestion orchestration |
//! | [`query`] | Ranked similarity queries |
//! | [`stats`] | Store statistics |
//!
//! ## Operational note
//!
//! The manifest and the flat-store files are regular files without
//! locking: do not run two ingestion jobs against the same corpus store
//! simultaneously.

pub mod chunk;
pub mod config;
pub mod embedding;
pub mod extract;
pub mod ingest;
pub mod manifest;
pub mod models;
pub mod query;
pub mod scan;
pub mod stats;
pub mod store;

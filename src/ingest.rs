//! Ingestion pipeline orchestration.
//!
//! Coordinates the full batch flow: corpus scan → manifest gate →
//! normalization → chunking → embedding → vector store. Per-document
//! extraction failures are isolated (warn and continue); embedding or
//! store failures abort the run. The manifest is saved atomically on
//! every exit path, so documents completed before an abort stay
//! correctly marked and the failing document stays unmarked.

use anyhow::Result;

use crate::chunk::{build_records, chunk_id, chunk_text};
use crate::config::Config;
use crate::embedding::{self, Embedder};
use crate::extract::extract_document;
use crate::manifest::Manifest;
use crate::models::SourceDocument;
use crate::scan::scan_corpus;
use crate::store::{self, VectorStore};

/// Counters reported at the end of a run.
#[derive(Debug, Default)]
struct RunStats {
    up_to_date: u64,
    extraction_skipped: u64,
    ingested: u64,
    chunks_written: u64,
}

pub async fn run_ingest(config: &Config, rebuild: bool, dry_run: bool) -> Result<()> {
    let docs = scan_corpus(&config.corpus)?;
    let manifest_path = config.store.dir.join("manifest.json");

    let mut manifest = if rebuild {
        Manifest::default()
    } else {
        Manifest::load(&manifest_path)
    };

    if dry_run {
        return report_dry_run(config, &docs, &manifest);
    }

    let embedder = embedding::create_embedder(&config.embedding)?;
    let mut store = store::open_store(&config.store).await?;
    if rebuild {
        store.clear().await?;
    }
    store::ensure_identity(store.as_mut(), embedder.as_ref()).await?;

    let mut stats = RunStats::default();
    let run_result = ingest_documents(
        config,
        &docs,
        &mut manifest,
        embedder.as_ref(),
        store.as_mut(),
        &mut stats,
    )
    .await;

    // Persist whatever completed, even when aborting: completed documents
    // are marked, the failing one is not, so a retry reprocesses it.
    store.persist().await?;
    manifest.save(&manifest_path)?;
    run_result?;

    println!("ingest");
    println!("  scanned: {} documents", docs.len());
    println!("  up to date: {}", stats.up_to_date);
    println!("  extraction skipped: {}", stats.extraction_skipped);
    println!("  ingested: {}", stats.ingested);
    println!("  chunks written: {}", stats.chunks_written);
    println!("ok");

    Ok(())
}

async fn ingest_documents(
    config: &Config,
    docs: &[SourceDocument],
    manifest: &mut Manifest,
    embedder: &dyn Embedder,
    store: &mut dyn VectorStore,
    stats: &mut RunStats,
) -> Result<()> {
    for doc in docs {
        if !manifest.should_ingest(doc) {
            stats.up_to_date += 1;
            continue;
        }

        let text = match extract_document(doc) {
            Ok(text) => text,
            Err(e) => {
                eprintln!("Warning: skipping {}: {}", doc.rel_path, e);
                stats.extraction_skipped += 1;
                continue;
            }
        };

        let texts = chunk_text(
            &text,
            config.chunking.max_chars,
            config.chunking.overlap_chars,
        );
        let records = build_records(&doc.rel_path, texts);

        let mut vectors = Vec::with_capacity(records.len());
        for batch in records.chunks(config.embedding.batch_size) {
            let batch_texts: Vec<String> = batch.iter().map(|r| r.text.clone()).collect();
            vectors.extend(embedder.embed(&batch_texts).await?);
        }

        // Supersede the document's previous chunks before inserting the
        // new ones; chunk ids are derived from path + ordinal, so the
        // recorded chunk count is enough to regenerate them.
        if let Some(old_count) = manifest.recorded_chunks(&doc.rel_path) {
            let old_ids: Vec<String> = (0..old_count)
                .map(|ordinal| chunk_id(&doc.rel_path, ordinal))
                .collect();
            store.delete(&old_ids).await?;
        }

        store.add(&records, &vectors).await?;

        manifest.record_ingested(doc, records.len() as i64);
        stats.ingested += 1;
        stats.chunks_written += records.len() as u64;
    }

    Ok(())
}

fn report_dry_run(config: &Config, docs: &[SourceDocument], manifest: &Manifest) -> Result<()> {
    let mut pending = 0u64;
    let mut estimated_chunks = 0u64;

    for doc in docs {
        if !manifest.should_ingest(doc) {
            continue;
        }
        pending += 1;
        if let Ok(text) = extract_document(doc) {
            estimated_chunks += chunk_text(
                &text,
                config.chunking.max_chars,
                config.chunking.overlap_chars,
            )
            .len() as u64;
        }
    }

    println!("ingest (dry-run)");
    println!("  scanned: {} documents", docs.len());
    println!("  pending: {}", pending);
    println!("  estimated chunks: {}", estimated_chunks);
    println!("ok");
    Ok(())
}

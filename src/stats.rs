//! Corpus and store statistics.
//!
//! Provides a quick summary of what's indexed: how many documents the
//! manifest tracks, how many chunks the vector store holds, and a
//! per-document breakdown. Used by `tidx stats` to confirm ingestion
//! runs are doing what's expected.

use anyhow::Result;

use crate::config::Config;
use crate::manifest::Manifest;
use crate::store;

/// Run the stats command: read the manifest and the store and print a
/// summary.
pub async fn run_stats(config: &Config) -> Result<()> {
    let manifest_path = config.store.dir.join("manifest.json");
    let manifest = Manifest::load(&manifest_path);

    let store = store::open_store(&config.store).await?;
    let chunk_count = store.count().await?;
    let identity = store.embedding_identity().await?;

    let store_size: u64 = std::fs::read_dir(&config.store.dir)
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .filter_map(|e| e.metadata().ok())
                .filter(|m| m.is_file())
                .map(|m| m.len())
                .sum()
        })
        .unwrap_or(0);

    let ingested_docs = manifest.files.values().filter(|e| e.ingested).count();
    let manifest_chunks: i64 = manifest.files.values().map(|e| e.chunks).sum();

    println!("Transcript Index — Store Stats");
    println!("==============================");
    println!();
    println!("  Store:       {} ({})", config.store.dir.display(), config.store.backend);
    println!("  Size:        {}", format_bytes(store_size));
    match identity {
        Some(id) => println!("  Model:       {} ({} dims)", id.model, id.dims),
        None => println!("  Model:       (empty store)"),
    }
    println!();
    println!("  Documents:   {} ingested", ingested_docs);
    println!("  Chunks:      {} in store / {} in manifest", chunk_count, manifest_chunks);

    if !manifest.files.is_empty() {
        println!();
        println!("  By document:");
        println!("  {:<40} {:>8} {:>12}   {}", "PATH", "CHUNKS", "SIZE", "LAST INGESTED");
        println!("  {}", "-".repeat(80));
        for (path, entry) in &manifest.files {
            println!(
                "  {:<40} {:>8} {:>12}   {}",
                path,
                entry.chunks,
                format_bytes(entry.size),
                format_ts_iso(entry.stamp)
            );
        }
    }

    println!();
    Ok(())
}

/// Format a byte count as a human-readable string.
fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}

fn format_ts_iso(ts: i64) -> String {
    chrono::DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| ts.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn byte_formatting() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(3 * 1024 * 1024), "3.0 MB");
    }
}

//! Query façade: free-text query → ranked JSON results.

use anyhow::{bail, Result};

use crate::config::Config;
use crate::embedding;
use crate::models::SearchResult;
use crate::store;

/// Run a similarity query and print a JSON array of ranked results to
/// stdout.
///
/// Results are sorted by non-increasing score; ties keep the store's
/// native return order. Returns the results for callers that want them
/// programmatically.
pub async fn run_query(config: &Config, query: &str, k: usize) -> Result<Vec<SearchResult>> {
    if k == 0 {
        bail!("Result count must be >= 1");
    }
    if query.trim().is_empty() {
        bail!("Query must not be empty");
    }

    let embedder = embedding::create_embedder(&config.embedding)?;
    let store = store::open_store(&config.store).await?;
    store::verify_identity(store.as_ref(), embedder.as_ref()).await?;

    let query_vec = embedding::embed_query(embedder.as_ref(), query).await?;
    let hits = store.search(&query_vec, k).await?;

    let results: Vec<SearchResult> = hits
        .into_iter()
        .enumerate()
        .map(|(i, hit)| SearchResult {
            rank: i + 1,
            score: hit.score,
            text: hit.record.text,
            path: hit.record.doc_path,
            ordinal: hit.record.ordinal,
            chars: hit.record.chars,
        })
        .collect();

    println!("{}", serde_json::to_string_pretty(&results)?);
    Ok(results)
}

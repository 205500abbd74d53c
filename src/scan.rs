//! Corpus scanner: walk the ingestion root and list source documents.

use anyhow::{bail, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use walkdir::WalkDir;

use crate::config::CorpusConfig;
use crate::models::{DocumentKind, SourceDocument};

/// Walk the corpus root, applying include/exclude globs, and return the
/// documents in deterministic (relative-path) order.
///
/// Files matching the globs but carrying an unrecognized extension are
/// skipped with a warning; they never fail the scan.
pub fn scan_corpus(corpus: &CorpusConfig) -> Result<Vec<SourceDocument>> {
    let root = &corpus.root;
    if !root.exists() {
        bail!("Corpus root does not exist: {}", root.display());
    }

    let include_set = build_globset(&corpus.include_globs)?;

    let mut default_excludes = vec!["**/.git/**".to_string()];
    default_excludes.extend(corpus.exclude_globs.clone());
    let exclude_set = build_globset(&default_excludes)?;

    let mut docs = Vec::new();

    let walker = WalkDir::new(root).follow_links(corpus.follow_symlinks);
    for entry in walker {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let relative = path.strip_prefix(root).unwrap_or(path);
        let rel_str = relative.to_string_lossy().to_string();

        if exclude_set.is_match(&rel_str) {
            continue;
        }
        if !include_set.is_match(&rel_str) {
            continue;
        }

        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        let kind = match DocumentKind::from_extension(&ext) {
            Some(kind) => kind,
            None => {
                eprintln!("Warning: skipping {} (unsupported format: {})", rel_str, ext);
                continue;
            }
        };

        let metadata = std::fs::metadata(path)?;
        let modified = metadata
            .modified()
            .unwrap_or(std::time::SystemTime::UNIX_EPOCH);
        let stamp = modified
            .duration_since(std::time::SystemTime::UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs() as i64;

        docs.push(SourceDocument {
            rel_path: rel_str,
            abs_path: path.to_path_buf(),
            kind,
            stamp,
            size: metadata.len(),
        });
    }

    docs.sort_by(|a, b| a.rel_path.cmp(&b.rel_path));

    Ok(docs)
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}

//! Overlapping text chunker.
//!
//! Splits normalized document text into bounded chunks for embedding.
//! The preferred strategy accumulates whole paragraphs (`\n\n` boundaries)
//! into a buffer up to `max_chars`; when a paragraph would overflow, the
//! buffer is flushed as a chunk and the next buffer is seeded with the
//! trailing `overlap` characters of the flushed chunk so context carries
//! across chunk boundaries.
//!
//! Oversized paragraphs, and text without paragraph boundaries, fall back
//! to a fixed window: slices of `max_chars` advancing by
//! `max_chars - overlap`, so consecutive windows share exactly `overlap`
//! characters.
//!
//! All limits are measured in characters, not bytes; multi-byte UTF-8
//! input never splits inside a code point.

use sha2::{Digest, Sha256};

use crate::models::ChunkRecord;

/// Split text into ordered, non-empty chunks.
///
/// Returns zero chunks for empty or whitespace-only input. The final
/// partial buffer is always flushed. Callers must ensure
/// `overlap < max_chars` (config validation enforces this); the value is
/// clamped defensively here.
pub fn chunk_text(text: &str, max_chars: usize, overlap: usize) -> Vec<String> {
    let overlap = overlap.min(max_chars.saturating_sub(1));

    if text.trim().is_empty() {
        return Vec::new();
    }

    let mut chunks: Vec<String> = Vec::new();
    // Buffer holds (seed_len, content): seed chars are carried context,
    // not counted as fresh coverage.
    let mut buf = String::new();
    let mut buf_is_seed_only = false;

    for para in text.split("\n\n") {
        let trimmed = para.trim();
        if trimmed.is_empty() {
            continue;
        }
        let para_chars = trimmed.chars().count();

        // A single paragraph larger than the budget is hard-split with
        // the fixed window; the buffer is flushed first.
        if para_chars > max_chars {
            if !buf.is_empty() && !buf_is_seed_only {
                chunks.push(std::mem::take(&mut buf));
            } else {
                buf.clear();
            }
            let windows = fixed_window(trimmed, max_chars, overlap);
            let last_tail = windows.last().map(|w| tail_chars(w, overlap));
            chunks.extend(windows);
            buf = last_tail.unwrap_or_default();
            buf_is_seed_only = true;
            continue;
        }

        let sep = if buf.is_empty() { 0 } else { 2 };
        let buf_chars = buf.chars().count();

        if !buf.is_empty() && buf_chars + sep + para_chars > max_chars {
            if !buf_is_seed_only {
                let tail = tail_chars(&buf, overlap);
                chunks.push(std::mem::take(&mut buf));
                buf = tail;
            } else {
                buf.clear();
            }
            buf_is_seed_only = true;

            // Shrink the seed if it would push the next chunk past the
            // budget with this paragraph included.
            let seed_budget = max_chars.saturating_sub(para_chars + 2);
            let seed_chars = buf.chars().count();
            if seed_chars > seed_budget {
                buf = tail_chars(&buf, seed_budget);
            }
        }

        if !buf.is_empty() {
            buf.push_str("\n\n");
        }
        buf.push_str(trimmed);
        buf_is_seed_only = false;
    }

    if !buf.is_empty() && !buf_is_seed_only {
        chunks.push(buf);
    }

    chunks
}

/// Fixed-window fallback: windows of `max_chars` characters advancing by
/// `max_chars - overlap`, so consecutive windows share exactly `overlap`
/// characters (the last window may be shorter).
pub fn fixed_window(text: &str, max_chars: usize, overlap: usize) -> Vec<String> {
    let overlap = overlap.min(max_chars.saturating_sub(1));
    let step = max_chars - overlap;

    let chars: Vec<char> = text.chars().collect();
    if chars.is_empty() {
        return Vec::new();
    }

    let mut out = Vec::new();
    let mut start = 0usize;
    loop {
        let end = (start + max_chars).min(chars.len());
        out.push(chars[start..end].iter().collect());
        if end == chars.len() {
            break;
        }
        start += step;
    }
    out
}

/// Last `n` characters of `s` (whole string if shorter).
fn tail_chars(s: &str, n: usize) -> String {
    let total = s.chars().count();
    if total <= n {
        return s.to_string();
    }
    let skip = total - n;
    let byte_start = s
        .char_indices()
        .nth(skip)
        .map(|(i, _)| i)
        .unwrap_or(s.len());
    s[byte_start..].to_string()
}

/// Stable chunk identifier: hex SHA-256 of `"{rel_path}#{ordinal}"`.
pub fn chunk_id(rel_path: &str, ordinal: i64) -> String {
    let mut hasher = Sha256::new();
    hasher.update(rel_path.as_bytes());
    hasher.update(b"#");
    hasher.update(ordinal.to_string().as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Build store records for a document's chunk texts, in order.
pub fn build_records(rel_path: &str, texts: Vec<String>) -> Vec<ChunkRecord> {
    texts
        .into_iter()
        .enumerate()
        .map(|(i, text)| {
            let chars = text.chars().count() as i64;
            ChunkRecord {
                id: chunk_id(rel_path, i as i64),
                doc_path: rel_path.to_string(),
                ordinal: i as i64,
                text,
                chars,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_yields_zero_chunks() {
        assert!(chunk_text("", 100, 20).is_empty());
        assert!(chunk_text("   \n\n  \t ", 100, 20).is_empty());
    }

    #[test]
    fn small_text_single_chunk() {
        let chunks = chunk_text("Hello, world!", 100, 20);
        assert_eq!(chunks, vec!["Hello, world!".to_string()]);
    }

    #[test]
    fn paragraphs_under_limit_accumulate() {
        let text = "First paragraph.\n\nSecond paragraph.\n\nThird paragraph.";
        let chunks = chunk_text(text, 200, 20);
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].contains("First paragraph."));
        assert!(chunks[0].contains("Third paragraph."));
    }

    #[test]
    fn overflow_flushes_and_seeds_overlap() {
        let text = "aaaaaaaaaaaaaaaaaaaa.\n\nbbbbbbbbbbbbbbbbbbbb.\n\ncccccccccccccccccccc.";
        let chunks = chunk_text(text, 30, 10);
        assert!(chunks.len() >= 2);
        // Each chunk after the first starts with the tail of its predecessor.
        for pair in chunks.windows(2) {
            let prev_tail = tail_chars(&pair[0], 10);
            assert!(
                pair[1].starts_with(&prev_tail) || pair[1].starts_with(prev_tail.trim()),
                "expected {:?} to start with tail of {:?}",
                pair[1],
                pair[0]
            );
        }
    }

    #[test]
    fn every_paragraph_is_covered() {
        let paras: Vec<String> = (0..20).map(|i| format!("Paragraph number {i}.")).collect();
        let text = paras.join("\n\n");
        let chunks = chunk_text(&text, 60, 15);
        let joined = chunks.join("\n");
        for p in &paras {
            assert!(joined.contains(p.as_str()), "missing paragraph: {p}");
        }
    }

    #[test]
    fn fixed_window_exact_overlap() {
        let text: String = ('a'..='z').cycle().take(100).collect();
        let max = 30;
        let overlap = 10;
        let windows = fixed_window(&text, max, overlap);
        assert!(windows.len() > 1);
        for pair in windows.windows(2) {
            let prev: Vec<char> = pair[0].chars().collect();
            let next: Vec<char> = pair[1].chars().collect();
            let shared: String = prev[prev.len() - overlap..].iter().collect();
            let prefix: String = next[..overlap.min(next.len())].iter().collect();
            assert_eq!(shared, prefix);
        }
    }

    #[test]
    fn fixed_window_covers_whole_input() {
        let text: String = ('a'..='z').cycle().take(137).collect();
        let max = 40;
        let overlap = 12;
        let windows = fixed_window(&text, max, overlap);
        // Dropping each subsequent window's overlap prefix reconstructs the input.
        let mut rebuilt = windows[0].clone();
        for w in &windows[1..] {
            let chars: Vec<char> = w.chars().collect();
            rebuilt.extend(chars[overlap.min(chars.len())..].iter());
        }
        assert_eq!(rebuilt, text);
    }

    #[test]
    fn fixed_window_handles_multibyte() {
        let text: String = "שלום עולם ".repeat(30);
        let windows = fixed_window(&text, 50, 10);
        let total: usize = text.chars().count();
        assert!(!windows.is_empty());
        for w in &windows {
            assert!(w.chars().count() <= 50);
        }
        let rebuilt: usize =
            windows[0].chars().count() + windows[1..].iter().map(|w| w.chars().count() - 10).sum::<usize>();
        assert_eq!(rebuilt, total);
    }

    #[test]
    fn oversized_paragraph_hard_split() {
        let big: String = "x".repeat(250);
        let chunks = chunk_text(&big, 100, 20);
        assert!(chunks.len() > 1);
        for c in &chunks {
            assert!(c.chars().count() <= 100);
        }
    }

    #[test]
    fn chunk_ids_stable_and_unique() {
        let a = chunk_id("depo/smith.txt", 0);
        let b = chunk_id("depo/smith.txt", 0);
        let c = chunk_id("depo/smith.txt", 1);
        let d = chunk_id("depo/jones.txt", 0);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, d);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn build_records_orders_and_counts() {
        let records = build_records("t.txt", vec!["ab".to_string(), "cdef".to_string()]);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].ordinal, 0);
        assert_eq!(records[1].ordinal, 1);
        assert_eq!(records[1].chars, 4);
        assert_eq!(records[0].id, chunk_id("t.txt", 0));
    }
}

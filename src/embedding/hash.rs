//! Deterministic feature-hashing embedder.
//!
//! Maps text to a bag-of-words vector via signed feature hashing: each
//! lowercased alphanumeric token is hashed into one of `dims` buckets
//! with a +1/-1 sign, and the accumulated vector is L2-normalized. Two
//! texts sharing tokens get a positive cosine similarity proportional to
//! their overlap; identical texts embed identically.
//!
//! This is not a learned model (it captures lexical overlap, not
//! semantics), but it is fully deterministic, offline, and uses the same
//! dimensionality and normalization contract as the remote providers,
//! which makes it the default provider and the backbone of the test
//! suites.

use anyhow::Result;
use async_trait::async_trait;
use sha2::{Digest, Sha256};

use super::{normalize, Embedder};

pub struct HashEmbedder {
    dims: usize,
    model: String,
}

impl HashEmbedder {
    pub fn new(dims: usize) -> Self {
        Self {
            dims,
            model: format!("feature-hash-v1-{}", dims),
        }
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut vec = vec![0.0f32; self.dims];

        for token in tokenize(text) {
            let digest = Sha256::digest(token.as_bytes());
            let bucket = u64::from_le_bytes(digest[0..8].try_into().unwrap()) % self.dims as u64;
            let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
            vec[bucket as usize] += sign;
        }

        normalize(&mut vec);
        vec
    }
}

#[async_trait]
impl Embedder for HashEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }

    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }
}

fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn embed(texts: &[&str]) -> Vec<Vec<f32>> {
        let embedder = HashEmbedder::new(128);
        let texts: Vec<String> = texts.iter().map(|t| t.to_string()).collect();
        tokio::runtime::Runtime::new()
            .unwrap()
            .block_on(embedder.embed(&texts))
            .unwrap()
    }

    #[test]
    fn deterministic_across_calls() {
        let a = embed(&["the quick brown fox"]);
        let b = embed(&["the quick brown fox"]);
        assert_eq!(a, b);
    }

    #[test]
    fn batch_size_does_not_change_vectors() {
        let together = embed(&["alpha beta", "gamma delta"]);
        let first = embed(&["alpha beta"]);
        let second = embed(&["gamma delta"]);
        assert_eq!(together[0], first[0]);
        assert_eq!(together[1], second[0]);
    }

    #[test]
    fn vectors_are_unit_normalized() {
        let vecs = embed(&["some transcript text about discovery"]);
        let norm: f32 = vecs[0].iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn empty_text_is_zero_vector() {
        let vecs = embed(&[""]);
        assert!(vecs[0].iter().all(|v| *v == 0.0));
    }

    #[test]
    fn shared_tokens_score_higher_than_disjoint() {
        let vecs = embed(&[
            "the quick brown fox jumps",
            "quick brown fox",
            "a completely unrelated sentence about law",
        ]);
        let sim_related = super::super::cosine_similarity(&vecs[0], &vecs[1]);
        let sim_unrelated = super::super::cosine_similarity(&vecs[0], &vecs[2]);
        assert!(
            sim_related > sim_unrelated,
            "related {} should beat unrelated {}",
            sim_related,
            sim_unrelated
        );
    }

    #[test]
    fn tokenization_is_case_and_punctuation_insensitive() {
        let vecs = embed(&["Quick, Brown FOX!", "quick brown fox"]);
        assert_eq!(vecs[0], vecs[1]);
    }
}

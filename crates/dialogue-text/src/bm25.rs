//! BM25 keyword model producing sparse vectors for hybrid search.
//!
//! Terms are hashed to 32-bit ids, so the vocabulary never has to be shipped
//! with the index. Documents are weighted by saturated term frequency with
//! length normalization; queries by normalized inverse document frequency.
//! The dot product of the two approximates a BM25 score.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::hash::Hasher;
use tantivy::tokenizer::TextAnalyzer;
use twox_hash::XxHash32;

use dialogue_core::error::Result;
use dialogue_core::traits::SparseEncoder;
use dialogue_core::types::SparseVector;

use crate::tantivy_utils::{analyze, keyword_analyzer};

pub const DEFAULT_K1: f32 = 1.2;
pub const DEFAULT_B: f32 = 0.75;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bm25Model {
    pub k1: f32,
    pub b: f32,
    pub n_docs: usize,
    pub avgdl: f32,
    /// Number of documents containing each term id.
    pub doc_freq: BTreeMap<u32, u32>,
}

impl Bm25Model {
    /// Fits document statistics over a corpus of chunk texts.
    pub fn fit(corpus: &[String]) -> Self {
        let mut analyzer = keyword_analyzer();
        let mut doc_freq: BTreeMap<u32, u32> = BTreeMap::new();
        let mut total_len = 0usize;
        for doc in corpus {
            let ids = term_ids(&mut analyzer, doc);
            total_len += ids.len();
            let unique: HashSet<u32> = ids.into_iter().collect();
            for id in unique {
                *doc_freq.entry(id).or_insert(0) += 1;
            }
        }
        let avgdl = if corpus.is_empty() { 0.0 } else { total_len as f32 / corpus.len() as f32 };
        Self { k1: DEFAULT_K1, b: DEFAULT_B, n_docs: corpus.len(), avgdl, doc_freq }
    }

    fn encode_document(&self, analyzer: &mut TextAnalyzer, text: &str) -> SparseVector {
        let (indices, tf) = term_frequencies(&term_ids(analyzer, text));
        let doc_len: f32 = tf.iter().sum();
        let rel_len = if self.avgdl > 0.0 { doc_len / self.avgdl } else { 1.0 };
        let norm = self.k1 * (1.0 - self.b + self.b * rel_len);
        let values = tf.iter().map(|f| f / (f + norm)).collect();
        SparseVector { indices, values }
    }

    fn idf(&self, term_id: u32) -> f32 {
        let df = self.doc_freq.get(&term_id).copied().unwrap_or(1) as f32;
        ((self.n_docs as f32 + 1.0) / (df + 0.5)).ln()
    }
}

impl SparseEncoder for Bm25Model {
    fn encode_documents(&self, texts: &[String]) -> Result<Vec<SparseVector>> {
        let mut analyzer = keyword_analyzer();
        Ok(texts.iter().map(|t| self.encode_document(&mut analyzer, t)).collect())
    }

    fn encode_query(&self, text: &str) -> Result<SparseVector> {
        let mut analyzer = keyword_analyzer();
        let (indices, _) = term_frequencies(&term_ids(&mut analyzer, text));
        let idf: Vec<f32> = indices.iter().map(|&id| self.idf(id)).collect();
        let sum: f32 = idf.iter().sum();
        let values = if sum > 0.0 { idf.iter().map(|v| v / sum).collect() } else { idf };
        Ok(SparseVector { indices, values })
    }
}

fn hash_term(term: &str) -> u32 {
    let mut hasher = XxHash32::with_seed(0);
    hasher.write(term.as_bytes());
    hasher.finish() as u32
}

fn term_ids(analyzer: &mut TextAnalyzer, text: &str) -> Vec<u32> {
    analyze(analyzer, text).iter().map(|t| hash_term(t)).collect()
}

/// Unique ids in ascending order with their counts.
fn term_frequencies(ids: &[u32]) -> (Vec<u32>, Vec<f32>) {
    let mut counts: BTreeMap<u32, f32> = BTreeMap::new();
    for &id in ids {
        *counts.entry(id).or_insert(0.0) += 1.0;
    }
    counts.into_iter().unzip()
}

use crate::error::Result;
use crate::types::{QueryMatch, QueryRequest, SparseVector, UpsertRecord};

/// Counts tokens of markup-free text under one fixed tokenizer.
pub trait TokenCounter: Send + Sync {
    fn count(&self, text: &str) -> usize;
}

/// Dense embedding service. Output is index-aligned with `texts`.
pub trait Embedder: Send + Sync {
    fn dim(&self) -> usize;
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// A fitted keyword-statistics model producing sparse vectors.
pub trait SparseEncoder: Send + Sync {
    fn encode_documents(&self, texts: &[String]) -> Result<Vec<SparseVector>>;
    fn encode_query(&self, text: &str) -> Result<SparseVector>;
}

pub trait VectorStore: Send + Sync {
    /// Writes all records in one call; returns how many were written.
    fn upsert(&self, namespace: &str, records: Vec<UpsertRecord>) -> Result<usize>;
    /// Ranked matches, best first.
    fn query(&self, request: &QueryRequest) -> Result<Vec<QueryMatch>>;
}

use std::sync::Arc;
use tracing::debug;

use dialogue_core::error::{Error, Result};
use dialogue_core::traits::{Embedder, SparseEncoder, TokenCounter};
use dialogue_core::types::SparseVector;

/// Input limit of the OpenAI embedding models, in tokens.
pub const DEFAULT_MAX_INPUT_TOKENS: usize = 8191;

/// Pairs the dense embedding service with a source's keyword model.
///
/// The token counter guards the embedding model's input limit: a batch with
/// an over-long text fails before any request is sent.
pub struct HybridEncoder {
    embedder: Arc<dyn Embedder>,
    counter: Arc<dyn TokenCounter>,
    max_input_tokens: usize,
}

impl HybridEncoder {
    pub fn new(embedder: Arc<dyn Embedder>, counter: Arc<dyn TokenCounter>) -> Self {
        Self { embedder, counter, max_input_tokens: DEFAULT_MAX_INPUT_TOKENS }
    }

    pub fn with_max_input_tokens(mut self, max_input_tokens: usize) -> Self {
        self.max_input_tokens = max_input_tokens.max(1);
        self
    }

    pub fn dim(&self) -> usize {
        self.embedder.dim()
    }

    fn check_input_lengths(&self, texts: &[String]) -> Result<usize> {
        let mut total = 0;
        for (i, text) in texts.iter().enumerate() {
            let tokens = self.counter.count(text);
            if tokens > self.max_input_tokens {
                return Err(Error::EncodingService(format!(
                    "text {i} has {tokens} tokens, above the embedding input limit of {}",
                    self.max_input_tokens
                )));
            }
            total += tokens;
        }
        Ok(total)
    }

    /// Dense and sparse vectors for `texts`, both index-aligned with it.
    ///
    /// One embedding call per batch. Any failure fails the whole batch.
    pub fn encode(&self, texts: &[String], model: &dyn SparseEncoder) -> Result<(Vec<Vec<f32>>, Vec<SparseVector>)> {
        if texts.is_empty() {
            return Ok((Vec::new(), Vec::new()));
        }
        let tokens = self.check_input_lengths(texts)?;
        debug!(texts = texts.len(), tokens, "encoding batch");

        let dense = self.embedder.embed_batch(texts)?;
        if dense.len() != texts.len() {
            return Err(Error::EncodingService(format!(
                "embedding service returned {} vectors for {} texts",
                dense.len(),
                texts.len()
            )));
        }
        let dim = self.embedder.dim();
        if let Some(bad) = dense.iter().find(|v| v.len() != dim) {
            return Err(Error::EncodingService(format!("expected {dim}-dim vectors, got {}", bad.len())));
        }
        let sparse = model.encode_documents(texts)?;
        if sparse.len() != texts.len() {
            return Err(Error::EncodingService(format!(
                "keyword model returned {} vectors for {} texts",
                sparse.len(),
                texts.len()
            )));
        }
        Ok((dense, sparse))
    }

    /// Query-side encoding: single-item dense batch, IDF-weighted sparse vector.
    pub fn encode_query(&self, text: &str, model: &dyn SparseEncoder) -> Result<(Vec<f32>, SparseVector)> {
        let batch = [text.to_string()];
        self.check_input_lengths(&batch)?;
        let dense = self
            .embedder
            .embed_batch(&batch)?
            .into_iter()
            .next()
            .ok_or_else(|| Error::EncodingService("embedding service returned no vector for query".into()))?;
        Ok((dense, model.encode_query(text)?))
    }
}

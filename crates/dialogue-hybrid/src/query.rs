use std::sync::Arc;
use tracing::{debug, info};

use dialogue_core::error::Result;
use dialogue_core::traits::VectorStore;
use dialogue_core::types::{Category, MetadataFilter, QueryMatch, QueryRequest};
use dialogue_text::KeywordModelStore;

use crate::batcher::DEFAULT_NAMESPACE;
use crate::encoder::HybridEncoder;

/// Hybrid search scoped to one source.
pub struct QueryEngine {
    encoder: Arc<HybridEncoder>,
    store: Arc<dyn VectorStore>,
    models: KeywordModelStore,
    namespace: String,
}

impl QueryEngine {
    pub fn new(encoder: Arc<HybridEncoder>, store: Arc<dyn VectorStore>, models: KeywordModelStore) -> Self {
        Self { encoder, store, models, namespace: DEFAULT_NAMESPACE.to_string() }
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Ranked matches for `query_text` within `source_id`, best first.
    ///
    /// Fails with `ModelNotFound` when the source was never trained.
    pub fn search(
        &self,
        query_text: &str,
        source_id: &str,
        top_k: usize,
        category: Option<Category>,
    ) -> Result<Vec<QueryMatch>> {
        let model = self.models.load(source_id)?;
        let (dense, sparse) = self.encoder.encode_query(query_text, &model)?;
        debug!(source = %source_id, terms = sparse.len(), "encoded query");
        let request = QueryRequest {
            namespace: self.namespace.clone(),
            dense,
            sparse,
            top_k,
            filter: MetadataFilter::for_source(source_id).with_category(category),
            include_metadata: true,
        };
        let matches = self.store.query(&request)?;
        info!(source = %source_id, top_k, hits = matches.len(), "query answered");
        Ok(matches)
    }
}

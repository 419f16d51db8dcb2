use std::sync::Arc;
use tracing::{debug, info};

use dialogue_core::error::Result;
use dialogue_core::traits::{SparseEncoder, VectorStore};
use dialogue_core::types::{ChunkRecord, UpsertRecord};

use crate::encoder::HybridEncoder;

pub const DEFAULT_BATCH_SIZE: usize = 100;
pub const DEFAULT_NAMESPACE: &str = "global";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchStats {
    pub records: usize,
    pub batches: usize,
}

/// Groups chunk records into fixed-size batches, encodes each batch and
/// writes it to the store in a single call.
pub struct UpsertBatcher {
    encoder: Arc<HybridEncoder>,
    store: Arc<dyn VectorStore>,
    namespace: String,
    batch_size: usize,
}

impl UpsertBatcher {
    pub fn new(encoder: Arc<HybridEncoder>, store: Arc<dyn VectorStore>) -> Self {
        Self { encoder, store, namespace: DEFAULT_NAMESPACE.to_string(), batch_size: DEFAULT_BATCH_SIZE }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Streams `records` through encode + upsert. The first failing batch
    /// stops the run; batches already written stay written.
    pub fn process<I>(&self, source_id: &str, records: I, model: &dyn SparseEncoder) -> Result<BatchStats>
    where
        I: IntoIterator<Item = ChunkRecord>,
    {
        let mut stats = BatchStats::default();
        let mut buffer: Vec<ChunkRecord> = Vec::with_capacity(self.batch_size);
        for record in records {
            buffer.push(record);
            if buffer.len() == self.batch_size {
                self.flush(source_id, &mut buffer, model, &mut stats)?;
            }
        }
        if !buffer.is_empty() {
            self.flush(source_id, &mut buffer, model, &mut stats)?;
        }
        info!(source = %source_id, records = stats.records, batches = stats.batches, "upserted source");
        Ok(stats)
    }

    fn flush(
        &self,
        source_id: &str,
        buffer: &mut Vec<ChunkRecord>,
        model: &dyn SparseEncoder,
        stats: &mut BatchStats,
    ) -> Result<()> {
        let texts: Vec<String> = buffer.iter().map(|r| r.text.clone()).collect();
        let (dense, sparse) = self.encoder.encode(&texts, model)?;
        let upserts: Vec<UpsertRecord> = buffer
            .drain(..)
            .zip(dense.into_iter().zip(sparse))
            .map(|(record, (dense, sparse))| UpsertRecord {
                id: record.id,
                dense,
                sparse,
                metadata: record.metadata.with_text(record.text),
            })
            .collect();
        let n = upserts.len();
        self.store.upsert(&self.namespace, upserts)?;
        stats.records += n;
        stats.batches += 1;
        debug!(source = %source_id, batch = stats.batches, records = n, "flushed batch");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dialogue_core::types::{Category, ChunkMetadata, Timestamp};
    use dialogue_embed::{FakeEmbedder, WordTokenCounter};
    use dialogue_text::Bm25Model;
    use dialogue_vector::MemoryStore;

    fn records(n: usize) -> Vec<ChunkRecord> {
        (0..n)
            .map(|i| ChunkRecord {
                id: format!("friends_Friends S01E01_C{i}"),
                text: format!("line number {i} about the coffee house"),
                metadata: ChunkMetadata::new(Category::Series, "friends", "Friends", Timestamp(0), Timestamp(1)).unwrap(),
            })
            .collect()
    }

    fn run(n: usize, batch_size: usize) -> (BatchStats, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let encoder = Arc::new(HybridEncoder::new(Arc::new(FakeEmbedder::new(8)), Arc::new(WordTokenCounter)));
        let batcher = UpsertBatcher::new(encoder, store.clone()).with_batch_size(batch_size);
        let input = records(n);
        let model = Bm25Model::fit(&input.iter().map(|r| r.text.clone()).collect::<Vec<_>>());
        let stats = batcher.process("friends", input, &model).unwrap();
        (stats, store)
    }

    #[test]
    fn exact_multiple_flushes_full_batches_only() {
        let (stats, store) = run(100, 100);
        assert_eq!(stats, BatchStats { records: 100, batches: 1 });
        assert_eq!(store.upsert_calls(), 1);
    }

    #[test]
    fn one_short_of_batch_size_flushes_once_at_end() {
        let (stats, store) = run(99, 100);
        assert_eq!(stats, BatchStats { records: 99, batches: 1 });
        assert_eq!(store.upsert_calls(), 1);
    }

    #[test]
    fn one_over_batch_size_adds_partial_batch() {
        let (stats, store) = run(101, 100);
        assert_eq!(stats, BatchStats { records: 101, batches: 2 });
        assert_eq!(store.upsert_calls(), 2);
        assert_eq!(store.len(), 101);
    }

    #[test]
    fn full_batch_is_written_before_more_input_is_pulled() {
        let store = Arc::new(MemoryStore::new());
        let encoder = Arc::new(HybridEncoder::new(Arc::new(FakeEmbedder::new(8)), Arc::new(WordTokenCounter)));
        let batcher = UpsertBatcher::new(encoder, store.clone()).with_batch_size(100);
        let input = records(201);
        let model = Bm25Model::fit(&input.iter().map(|r| r.text.clone()).collect::<Vec<_>>());

        // calls seen by the store at the moment each record is handed over
        let seen = std::cell::RefCell::new(Vec::new());
        let observed = input.into_iter().enumerate().map(|(i, r)| {
            seen.borrow_mut().push((i, store.upsert_calls()));
            r
        });
        let stats = batcher.process("friends", observed, &model).unwrap();
        assert_eq!(stats, BatchStats { records: 201, batches: 3 });

        let seen = seen.into_inner();
        assert_eq!(seen[99], (99, 0));
        assert_eq!(seen[100], (100, 1));
        assert_eq!(seen[199], (199, 1));
        assert_eq!(seen[200], (200, 2));
        assert_eq!(store.upsert_calls(), 3);
    }

    #[test]
    fn empty_input_writes_nothing() {
        let (stats, store) = run(0, 10);
        assert_eq!(stats, BatchStats::default());
        assert_eq!(store.upsert_calls(), 0);
    }

    #[test]
    fn text_is_attached_to_stored_metadata() {
        let (_, store) = run(3, 2);
        let stored = store.get("global", "friends_Friends S01E01_C2").unwrap();
        assert_eq!(stored.metadata.text.as_deref(), Some("line number 2 about the coffee house"));
        assert_eq!(stored.dense.len(), 8);
        assert!(!stored.sparse.is_empty());
    }
}

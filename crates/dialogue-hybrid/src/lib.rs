//! dialogue-hybrid
//!
//! Hybrid dense + keyword retrieval over subtitle chunks: batch encoding,
//! batched upserts, per-source queries and the train/ingest runs that tie
//! them to the media tree.

pub mod batcher;
pub mod encoder;
pub mod pipeline;
pub mod query;

pub use batcher::{BatchStats, UpsertBatcher, DEFAULT_BATCH_SIZE, DEFAULT_NAMESPACE};
pub use encoder::{HybridEncoder, DEFAULT_MAX_INPUT_TOKENS};
pub use pipeline::{ingest_sources, train_sources, RunReport, SourceOutcome, SourceReport};
pub use query::QueryEngine;

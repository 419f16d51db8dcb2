//! dialogue-text
//!
//! Keyword side of hybrid search: a BM25 model over tantivy-analyzed terms
//! that turns chunk texts and queries into sparse vectors, plus its on-disk
//! store keyed by source id.

pub mod bm25;
pub mod store;
pub mod tantivy_utils;

pub use bm25::Bm25Model;
pub use store::KeywordModelStore;

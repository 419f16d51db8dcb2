//! dialogue-vector
//!
//! Hybrid vector stores behind [`VectorStore`]: the hosted Pinecone index,
//! a local LanceDB table and an in-memory store for tests.

pub mod lance;
pub mod memory;
pub mod pinecone;
pub mod schema;
pub mod table;

use anyhow::Result;
use std::sync::Arc;
use tracing::info;

use dialogue_core::config::{Config, VectorBackend};
use dialogue_core::traits::VectorStore;

pub use lance::LanceStore;
pub use memory::MemoryStore;
pub use pinecone::PineconeStore;

/// Dense dot product over the shared prefix.
pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Store selected by `vector.backend`; `dim` sizes the local table's vector column.
pub fn open_store(config: &Config, dim: usize) -> Result<Arc<dyn VectorStore>> {
    let vector = config.vector()?;
    match vector.backend {
        VectorBackend::Pinecone => {
            info!(host = vector.pinecone_host.as_deref().unwrap_or("<unset>"), "using Pinecone store");
            Ok(Arc::new(PineconeStore::from_config(&vector)?))
        }
        VectorBackend::Lancedb => {
            let path = config.resolve_path(&vector.lancedb_dir);
            Ok(Arc::new(LanceStore::open(&path, &vector.lancedb_table, dim)?))
        }
    }
}

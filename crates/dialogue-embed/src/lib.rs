//! dialogue-embed
//!
//! Dense side of hybrid search: the OpenAI embeddings client, a hashed fake
//! for offline runs, and token counters used for chunk budgets.

pub mod fake;
pub mod openai;
pub mod tokenize;

use anyhow::Result;
use std::sync::Arc;
use tracing::info;

use dialogue_core::config::{EmbeddingConfig, EmbeddingProvider};
use dialogue_core::traits::Embedder;

pub use fake::FakeEmbedder;
pub use openai::OpenAiEmbedder;
pub use tokenize::{get_default_token_counter, BpeTokenCounter, HfTokenCounter, WordTokenCounter};

/// Embedder selected by config; `APP_USE_FAKE_EMBEDDINGS=1` forces the fake.
pub fn get_default_embedder(config: &EmbeddingConfig) -> Result<Arc<dyn Embedder>> {
    let use_fake = std::env::var("APP_USE_FAKE_EMBEDDINGS")
        .ok()
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false);
    if use_fake || config.provider == EmbeddingProvider::Fake {
        info!(dim = config.dimension, "using fake embedder");
        return Ok(Arc::new(FakeEmbedder::new(config.dimension)));
    }
    info!(model = %config.model, dim = config.dimension, "using OpenAI embedder");
    Ok(Arc::new(OpenAiEmbedder::from_config(config)?))
}

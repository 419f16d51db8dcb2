use anyhow::{anyhow, bail, Result};
use std::path::Path;
use std::sync::Arc;
use tiktoken_rs::CoreBPE;
use tokenizers::Tokenizer;
use tracing::{info, warn};

use dialogue_core::config::EmbeddingConfig;
use dialogue_core::traits::TokenCounter;

/// Token counts from a HuggingFace `tokenizer.json`, no special tokens added.
pub struct HfTokenCounter {
    tokenizer: Tokenizer,
}

impl HfTokenCounter {
    pub fn from_file(path: &Path) -> Result<Self> {
        let mut tokenizer = Tokenizer::from_file(path)
            .map_err(|e| anyhow!("Failed to load tokenizer from {}: {}", path.display(), e))?;
        // counts must cover the whole text
        tokenizer
            .with_truncation(None)
            .map_err(|e| anyhow!("Failed to disable truncation for {}: {}", path.display(), e))?;
        tokenizer.with_padding(None);
        Ok(Self { tokenizer })
    }
}

impl TokenCounter for HfTokenCounter {
    fn count(&self, text: &str) -> usize {
        match self.tokenizer.encode(text, false) {
            Ok(enc) => enc.get_ids().len(),
            Err(e) => {
                // every token spans at least one byte
                warn!(error = %e, "tokenization failed, counting bytes as an upper bound");
                text.len()
            }
        }
    }
}

/// OpenAI BPE encodings (`cl100k_base`, `o200k_base`).
pub struct BpeTokenCounter {
    name: &'static str,
    bpe: CoreBPE,
}

impl BpeTokenCounter {
    pub fn cl100k() -> Result<Self> {
        Ok(Self { name: "cl100k_base", bpe: tiktoken_rs::cl100k_base()? })
    }

    pub fn o200k() -> Result<Self> {
        Ok(Self { name: "o200k_base", bpe: tiktoken_rs::o200k_base()? })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl TokenCounter for BpeTokenCounter {
    fn count(&self, text: &str) -> usize {
        self.bpe.encode_ordinary(text).len()
    }
}

/// Word-count estimate: roughly 0.75 words per token.
#[derive(Debug, Default, Clone, Copy)]
pub struct WordTokenCounter;

impl TokenCounter for WordTokenCounter {
    fn count(&self, text: &str) -> usize {
        let words = text.split_whitespace().count();
        (words as f32 / 0.75) as usize
    }
}

/// Counter for `embedding.tokenizer_path`, else the named `embedding.tokenizer`.
///
/// A tokenizer that is configured but cannot be loaded is an error; chunk
/// boundaries never silently switch to another token metric.
pub fn get_default_token_counter(config: &EmbeddingConfig, base_dir: &Path) -> Result<Arc<dyn TokenCounter>> {
    if let Some(path) = config.tokenizer_path.as_deref() {
        let path = dialogue_core::config::resolve_with_base(base_dir, path);
        let counter = HfTokenCounter::from_file(&path)?;
        info!(path = %path.display(), "loaded tokenizer");
        return Ok(Arc::new(counter));
    }
    let counter: Arc<dyn TokenCounter> = match config.tokenizer.to_ascii_lowercase().as_str() {
        "cl100k" | "cl100k_base" => Arc::new(BpeTokenCounter::cl100k()?),
        "o200k" | "o200k_base" => Arc::new(BpeTokenCounter::o200k()?),
        "words" => Arc::new(WordTokenCounter),
        other => bail!("unknown tokenizer '{other}' (expected cl100k_base, o200k_base or words)"),
    };
    info!(tokenizer = %config.tokenizer, "using named tokenizer");
    Ok(counter)
}

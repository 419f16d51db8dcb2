//! Configuration loader, typed sections and path helpers.
//!
//! Uses Figment to merge `config.toml` + `config.<env>.toml` + `APP_*` env vars
//! (`APP_INGEST__BATCH_SIZE=50` sets `ingest.batch_size`). Provides helpers to
//! expand `~` and `${VAR}` and to resolve relative paths against a known base
//! directory.

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::chunker::ChunkingConfig;
use crate::error::{Error, Result};
use crate::types::Category;

pub struct Config {
    figment: Figment,
    base_dir: PathBuf,
}

impl Config {
    /// Loads `config.toml` and the env-specific overlay from `dir`.
    pub fn load_from(dir: &Path) -> Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::new().merge(Toml::file(dir.join("config.toml")));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file(dir.join("config.dev.toml"))),
            "prod" | "production" => figment = figment.merge(Toml::file(dir.join("config.prod.toml"))),
            "test" | "testing" => figment = figment.merge(Toml::file(dir.join("config.test.toml"))),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        let config = Self { figment, base_dir: dir.to_path_buf() };
        config.validate()?;
        Ok(config)
    }

    /// Builds a config from an in-memory TOML document.
    pub fn from_toml_str(toml: &str, base_dir: &Path) -> Result<Self> {
        let config = Self { figment: Figment::new().merge(Toml::string(toml)), base_dir: base_dir.to_path_buf() };
        config.validate()?;
        Ok(config)
    }

    pub fn get<T>(&self, key: &str) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| Error::InvalidConfig(format!("Failed to get '{key}': {e}")))
    }

    /// Section `key`, or its defaults when the section is missing entirely.
    pub fn section<T>(&self, key: &str) -> Result<T>
    where
        T: serde::de::DeserializeOwned + Default,
    {
        if self.figment.find_value(key).is_err() {
            return Ok(T::default());
        }
        self.get(key)
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn data(&self) -> Result<DataConfig> {
        self.section("data")
    }

    pub fn chunking(&self) -> Result<ChunkingConfig> {
        let section: ChunkingSection = self.section("chunking")?;
        Ok(ChunkingConfig { max_tokens: section.max_tokens, overlap_lines: section.overlap_lines })
    }

    pub fn embedding(&self) -> Result<EmbeddingConfig> {
        self.section("embedding")
    }

    pub fn vector(&self) -> Result<VectorConfig> {
        self.section("vector")
    }

    pub fn ingest(&self) -> Result<IngestConfig> {
        self.section("ingest")
    }

    pub fn query(&self) -> Result<QueryConfig> {
        self.section("query")
    }

    /// Category roots from `data.media_roots`, resolved against the base dir.
    pub fn media_roots(&self) -> Result<Vec<(PathBuf, Category)>> {
        Ok(self.data()?.media_roots.iter().map(|r| (self.resolve_path(&r.path), r.category)).collect())
    }

    /// Resolves a configured path against the directory the config came from.
    pub fn resolve_path<S: AsRef<str>>(&self, p: S) -> PathBuf {
        resolve_with_base(&self.base_dir, p)
    }

    fn validate(&self) -> Result<()> {
        let chunking = self.chunking()?;
        if chunking.max_tokens == 0 {
            return Err(Error::InvalidConfig("chunking.max_tokens must be > 0".into()));
        }
        if self.ingest()?.batch_size == 0 {
            return Err(Error::InvalidConfig("ingest.batch_size must be > 0".into()));
        }
        let embedding = self.embedding()?;
        if embedding.dimension == 0 {
            return Err(Error::InvalidConfig("embedding.dimension must be > 0".into()));
        }
        if embedding.max_input_tokens == 0 {
            return Err(Error::InvalidConfig("embedding.max_input_tokens must be > 0".into()));
        }
        Ok(())
    }
}

/// One category root: every subdirectory below `path` is a source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaRoot {
    pub path: String,
    pub category: Category,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    pub media_roots: Vec<MediaRoot>,
    /// Root of the per-source keyword model files (`<dir>/<source_id>/model.json`).
    pub keyword_model_dir: String,
    pub subtitle_extensions: Vec<String>,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            media_roots: vec![
                MediaRoot { path: "shows".into(), category: Category::Series },
                MediaRoot { path: "movies".into(), category: Category::Movies },
            ],
            keyword_model_dir: "bm25_dataset".into(),
            subtitle_extensions: vec!["srt".into()],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
struct ChunkingSection {
    max_tokens: usize,
    overlap_lines: usize,
}

impl Default for ChunkingSection {
    fn default() -> Self {
        let d = ChunkingConfig::default();
        Self { max_tokens: d.max_tokens, overlap_lines: d.overlap_lines }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProvider {
    Openai,
    Fake,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub provider: EmbeddingProvider,
    pub base_url: String,
    pub model: String,
    pub dimension: usize,
    /// Environment variable holding the API key.
    pub api_key_env: String,
    pub timeout_secs: u64,
    pub max_retries: usize,
    /// Largest number of inputs accepted per embeddings request.
    pub max_batch: usize,
    /// Named tokenizer for chunk budgets: `cl100k_base`, `o200k_base` or `words`.
    pub tokenizer: String,
    /// HuggingFace `tokenizer.json`; takes precedence over `tokenizer` when set.
    pub tokenizer_path: Option<String>,
    /// Longest input, in tokens, the embedding model accepts.
    pub max_input_tokens: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingProvider::Openai,
            base_url: "https://api.openai.com/v1".into(),
            model: "text-embedding-3-small".into(),
            dimension: 1536,
            api_key_env: "OPENAI_API_KEY".into(),
            timeout_secs: 60,
            max_retries: 5,
            max_batch: 256,
            tokenizer: "cl100k_base".into(),
            tokenizer_path: None,
            max_input_tokens: 8191,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VectorBackend {
    Pinecone,
    Lancedb,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorConfig {
    pub backend: VectorBackend,
    pub namespace: String,
    /// Data-plane host of the Pinecone index, e.g. `https://dialogue-detective-xxxx.svc.pinecone.io`.
    pub pinecone_host: Option<String>,
    pub api_key_env: String,
    pub timeout_secs: u64,
    pub max_retries: usize,
    pub lancedb_dir: String,
    pub lancedb_table: String,
}

impl Default for VectorConfig {
    fn default() -> Self {
        Self {
            backend: VectorBackend::Pinecone,
            namespace: "global".into(),
            pinecone_host: None,
            api_key_env: "PINECONE_API_KEY".into(),
            timeout_secs: 30,
            max_retries: 5,
            lancedb_dir: "indexes/lancedb".into(),
            lancedb_table: "dialogue".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    pub batch_size: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self { batch_size: 100 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    pub top_k: usize,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self { top_k: 5 }
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    // Expand env vars first
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    // Expand ~ at start
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

/// Resolve a possibly relative path against a given base directory after expansion.
/// If `p` is absolute, it's returned as-is; otherwise `base.join(p)` is returned.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, p: S) -> PathBuf {
    let p = expand_path(p);
    if p.is_absolute() { p } else { base.join(p) }
}

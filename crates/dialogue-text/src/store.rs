//! Per-source persistence of keyword models: `<root>/<source_id>/model.json`.

use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use dialogue_core::error::{Error, Result};

use crate::bm25::Bm25Model;

const MODEL_FILE: &str = "model.json";

#[derive(Debug, Clone)]
pub struct KeywordModelStore {
    root: PathBuf,
}

impl KeywordModelStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn model_path(&self, source_id: &str) -> PathBuf {
        self.root.join(source_id).join(MODEL_FILE)
    }

    pub fn exists(&self, source_id: &str) -> bool {
        self.model_path(source_id).is_file()
    }

    /// Loads the persisted model for `source_id`.
    ///
    /// A missing file is [`Error::ModelNotFound`]; an unreadable one is a
    /// decode error naming the file.
    pub fn load(&self, source_id: &str) -> Result<Bm25Model> {
        let path = self.model_path(source_id);
        if !path.is_file() {
            return Err(Error::ModelNotFound { source_id: source_id.to_string(), path });
        }
        let bytes = fs::read(&path)?;
        serde_json::from_slice(&bytes).map_err(|e| Error::Decode { path, reason: e.to_string() })
    }

    /// Fits a model on `corpus` and persists it, replacing any previous one.
    pub fn train(&self, source_id: &str, corpus: &[String]) -> Result<Bm25Model> {
        if corpus.is_empty() {
            warn!(source = %source_id, "empty corpus, no keyword model written");
            return Err(Error::EmptyCorpus(source_id.to_string()));
        }
        let model = Bm25Model::fit(corpus);
        let path = self.model_path(source_id);
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        let json = serde_json::to_vec(&model).map_err(|e| Error::Operation(format!("serialize keyword model: {e}")))?;
        fs::write(&path, json)?;
        info!(source = %source_id, docs = model.n_docs, terms = model.doc_freq.len(), path = %path.display(), "keyword model saved");
        Ok(model)
    }
}

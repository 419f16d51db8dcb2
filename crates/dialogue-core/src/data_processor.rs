//! Media discovery and chunk-record production.
//!
//! Layout: `<category root>/<source_id>/<subtitle files>`. Each source
//! directory yields a lazy stream of [`ChunkRecord`]s; files are read only as
//! the stream reaches them, and unreadable files are logged and skipped.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::chunker::{Chunker, ChunkingConfig};
use crate::error::Result;
use crate::identity;
use crate::subtitle;
use crate::traits::TokenCounter;
use crate::types::{Category, ChunkMetadata, ChunkRecord, EpisodeIdentity};

/// One media title: a directory of subtitle files under a category root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDir {
    pub source_id: String,
    pub category: Category,
    pub path: PathBuf,
}

/// How a subtitle file is labelled in the index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileLabel {
    pub display_title: String,
    /// Display title plus episode tag; keeps ids unique across episodes.
    pub logical_title: String,
    pub identity: Option<EpisodeIdentity>,
}

impl FileLabel {
    pub fn for_file(path: &Path) -> Self {
        let file_name = path.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_default();
        let stem = path.file_stem().map(|s| s.to_string_lossy().to_string()).unwrap_or_else(|| file_name.clone());
        match identity::parse(&file_name) {
            Some(identity) => {
                let display_title =
                    if identity.series_title.is_empty() { stem.clone() } else { identity.series_title.clone() };
                let logical_title = format!("{display_title} {}", identity.episode_tag());
                Self { display_title, logical_title, identity: Some(identity) }
            }
            None => {
                debug!(file = %file_name, "no episode pattern matched, using file stem");
                Self { display_title: stem.clone(), logical_title: stem, identity: None }
            }
        }
    }
}

#[derive(Clone)]
pub struct DataProcessor {
    counter: Arc<dyn TokenCounter>,
    chunking: ChunkingConfig,
    extensions: Vec<String>,
}

impl DataProcessor {
    pub fn new(counter: Arc<dyn TokenCounter>, chunking: ChunkingConfig) -> Self {
        Self { counter, chunking, extensions: vec!["srt".to_string()] }
    }

    pub fn with_extensions(mut self, extensions: Vec<String>) -> Self {
        self.extensions = extensions;
        self
    }

    /// Lists every source directory under the given roots, sorted by id.
    /// Missing roots are logged and skipped.
    pub fn discover_sources(&self, roots: &[(PathBuf, Category)]) -> Vec<SourceDir> {
        let mut sources = Vec::new();
        for (root, category) in roots {
            if !root.is_dir() {
                warn!(category = %category, path = %root.display(), "media root does not exist, skipping");
                continue;
            }
            let mut found: Vec<SourceDir> = walkdir::WalkDir::new(root)
                .min_depth(1)
                .max_depth(1)
                .into_iter()
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().is_dir())
                .map(|e| SourceDir {
                    source_id: e.file_name().to_string_lossy().to_string(),
                    category: *category,
                    path: e.path().to_path_buf(),
                })
                .collect();
            found.sort_by(|a, b| a.source_id.cmp(&b.source_id));
            info!(category = %category, sources = found.len(), "discovered sources");
            sources.extend(found);
        }
        sources
    }

    pub fn subtitle_files(&self, source: &SourceDir) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = walkdir::WalkDir::new(&source.path)
            .min_depth(1)
            .max_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| e.path().to_path_buf())
            .filter(|p| {
                p.extension()
                    .and_then(|s| s.to_str())
                    .is_some_and(|ext| self.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
            })
            .collect();
        files.sort();
        files
    }

    /// Lazily chunks every subtitle file of `source` into records.
    pub fn records<'a>(&'a self, source: &'a SourceDir) -> impl Iterator<Item = ChunkRecord> + 'a {
        let files = self.subtitle_files(source);
        info!(source = %source.source_id, files = files.len(), "processing {}", source.category);
        files.into_iter().flat_map(move |path| self.file_records(source, &path))
    }

    /// Chunk texts of a whole source: the training corpus for its keyword model.
    pub fn corpus(&self, source: &SourceDir) -> Vec<String> {
        self.records(source).map(|r| r.text).collect()
    }

    fn file_records(&self, source: &SourceDir, path: &Path) -> Vec<ChunkRecord> {
        let lines = match subtitle::read_file(path) {
            Ok(lines) => lines,
            Err(e) => {
                warn!(source = %source.source_id, error = %e, "skipping unreadable subtitle file");
                return Vec::new();
            }
        };
        let label = FileLabel::for_file(path);
        let mut records = Vec::new();
        for (index, chunk) in Chunker::new(lines, Arc::clone(&self.counter), self.chunking).enumerate() {
            match build_record(source, &label, index, chunk.start, chunk.end, chunk.text) {
                Ok(record) => records.push(record),
                Err(e) => warn!(source = %source.source_id, error = %e, "dropping chunk with invalid metadata"),
            }
        }
        debug!(file = %path.display(), chunks = records.len(), "chunked subtitle file");
        records
    }
}

fn build_record(
    source: &SourceDir,
    label: &FileLabel,
    index: usize,
    start: crate::types::Timestamp,
    end: crate::types::Timestamp,
    text: String,
) -> Result<ChunkRecord> {
    let mut metadata = ChunkMetadata::new(source.category, &source.source_id, &label.display_title, start, end)?;
    if let (Category::Series, Some(identity)) = (source.category, &label.identity) {
        metadata = metadata.with_episode(identity)?;
    }
    Ok(ChunkRecord { id: format!("{}_{}_C{}", source.source_id, label.logical_title, index), text, metadata })
}

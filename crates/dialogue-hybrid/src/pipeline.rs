//! Per-source train and ingest runs.
//!
//! Sources are handled one at a time. A failure is contained to its source:
//! the run records it and moves on, so the report always has one entry per
//! source in input order.

use std::fmt;
use tracing::{error, info, warn};

use dialogue_core::data_processor::{DataProcessor, SourceDir};
use dialogue_core::types::Category;
use dialogue_text::KeywordModelStore;

use crate::batcher::UpsertBatcher;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceOutcome {
    Trained { documents: usize, terms: usize },
    Processed { records: usize, batches: usize },
    Skipped { reason: String },
    Aborted { error: String },
}

impl fmt::Display for SourceOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Trained { documents, terms } => write!(f, "trained on {documents} chunks ({terms} terms)"),
            Self::Processed { records, batches } => write!(f, "processed {records} records in {batches} batches"),
            Self::Skipped { reason } => write!(f, "skipped: {reason}"),
            Self::Aborted { error } => write!(f, "aborted: {error}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceReport {
    pub source_id: String,
    pub category: Category,
    pub outcome: SourceOutcome,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub sources: Vec<SourceReport>,
}

impl RunReport {
    pub fn skipped(&self) -> usize {
        self.sources.iter().filter(|s| matches!(s.outcome, SourceOutcome::Skipped { .. })).count()
    }

    pub fn aborted(&self) -> usize {
        self.sources.iter().filter(|s| matches!(s.outcome, SourceOutcome::Aborted { .. })).count()
    }

    pub fn succeeded(&self) -> usize {
        self.sources.len() - self.skipped() - self.aborted()
    }

    pub fn outcome(&self, source_id: &str) -> Option<&SourceOutcome> {
        self.sources.iter().find(|s| s.source_id == source_id).map(|s| &s.outcome)
    }
}

/// Fits and persists one keyword model per source.
pub fn train_sources(
    processor: &DataProcessor,
    models: &KeywordModelStore,
    sources: &[SourceDir],
    on_source: &mut dyn FnMut(&SourceReport),
) -> RunReport {
    let mut report = RunReport::default();
    for source in sources {
        let corpus = processor.corpus(source);
        let outcome = match models.train(&source.source_id, &corpus) {
            Ok(model) => SourceOutcome::Trained { documents: model.n_docs, terms: model.doc_freq.len() },
            Err(e) if e.is_skippable() => SourceOutcome::Skipped { reason: e.to_string() },
            Err(e) => {
                error!(source = %source.source_id, error = %e, "training failed");
                SourceOutcome::Aborted { error: e.to_string() }
            }
        };
        push(&mut report, source, outcome, on_source);
    }
    info!(sources = report.sources.len(), skipped = report.skipped(), aborted = report.aborted(), "training run finished");
    report
}

/// Encodes and upserts every chunk of every trained source.
pub fn ingest_sources(
    processor: &DataProcessor,
    models: &KeywordModelStore,
    batcher: &UpsertBatcher,
    sources: &[SourceDir],
    on_source: &mut dyn FnMut(&SourceReport),
) -> RunReport {
    let mut report = RunReport::default();
    for source in sources {
        let outcome = match models.load(&source.source_id) {
            Err(e) if e.is_skippable() => {
                warn!(source = %source.source_id, error = %e, "no usable keyword model, skipping source");
                SourceOutcome::Skipped { reason: e.to_string() }
            }
            Err(e) => {
                error!(source = %source.source_id, error = %e, "failed to load keyword model");
                SourceOutcome::Aborted { error: e.to_string() }
            }
            Ok(model) => match batcher.process(&source.source_id, processor.records(source), &model) {
                Ok(stats) => SourceOutcome::Processed { records: stats.records, batches: stats.batches },
                Err(e) => {
                    error!(source = %source.source_id, error = %e, "ingest aborted");
                    SourceOutcome::Aborted { error: e.to_string() }
                }
            },
        };
        push(&mut report, source, outcome, on_source);
    }
    info!(sources = report.sources.len(), skipped = report.skipped(), aborted = report.aborted(), "ingest run finished");
    report
}

fn push(report: &mut RunReport, source: &SourceDir, outcome: SourceOutcome, on_source: &mut dyn FnMut(&SourceReport)) {
    let entry = SourceReport { source_id: source.source_id.clone(), category: source.category, outcome };
    on_source(&entry);
    report.sources.push(entry);
}

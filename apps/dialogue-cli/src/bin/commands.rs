use std::path::Path;
use std::sync::Arc;

use anyhow::{Context as _, Result};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use dialogue_core::config::Config;
use dialogue_core::data_processor::{DataProcessor, SourceDir};
use dialogue_core::traits::TokenCounter;
use dialogue_core::types::QueryMatch;
use dialogue_embed::{get_default_embedder, get_default_token_counter};
use dialogue_hybrid::{
    ingest_sources, train_sources, HybridEncoder, QueryEngine, RunReport, SourceOutcome, SourceReport, UpsertBatcher,
};
use dialogue_text::KeywordModelStore;
use dialogue_vector::open_store;

use crate::cli::{QueryArgs, SourceArgs};

struct Context {
    config: Config,
    counter: Arc<dyn TokenCounter>,
    processor: DataProcessor,
    models: KeywordModelStore,
}

impl Context {
    fn load(config_dir: &Path) -> Result<Self> {
        let config = Config::load_from(config_dir)?;
        let data = config.data()?;
        let counter = get_default_token_counter(&config.embedding()?, config.base_dir())
            .context("chunk token budgets need a working tokenizer")?;
        let processor =
            DataProcessor::new(counter.clone(), config.chunking()?).with_extensions(data.subtitle_extensions);
        let models = KeywordModelStore::new(config.resolve_path(&data.keyword_model_dir));
        Ok(Self { config, counter, processor, models })
    }

    fn sources(&self, only: &[String]) -> Result<Vec<SourceDir>> {
        let mut sources = self.processor.discover_sources(&self.config.media_roots()?);
        if !only.is_empty() {
            sources.retain(|s| only.contains(&s.source_id));
        }
        if sources.is_empty() {
            anyhow::bail!("no sources found under the configured media roots");
        }
        Ok(sources)
    }

    fn encoder(&self) -> Result<Arc<HybridEncoder>> {
        let embedding = self.config.embedding()?;
        let embedder = get_default_embedder(&embedding)?;
        let encoder =
            HybridEncoder::new(embedder, self.counter.clone()).with_max_input_tokens(embedding.max_input_tokens);
        Ok(Arc::new(encoder))
    }
}

fn progress(len: usize, verb: &str) -> Result<ProgressBar> {
    let pb = ProgressBar::new(len as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} sources {msg}")?
            .progress_chars("#>-"),
    );
    pb.set_message(verb.to_string());
    Ok(pb)
}

fn tick(pb: &ProgressBar) -> impl FnMut(&SourceReport) + '_ {
    move |report: &SourceReport| {
        pb.inc(1);
        pb.set_message(report.source_id.clone());
    }
}

fn print_report(report: &RunReport) {
    for entry in &report.sources {
        println!("{:<32} {:<9} {}", entry.source_id, entry.category.as_str(), entry.outcome);
    }
    println!(
        "{} succeeded, {} skipped, {} aborted",
        report.succeeded(),
        report.skipped(),
        report.aborted()
    );
}

pub fn train(config_dir: &Path, args: SourceArgs) -> Result<()> {
    let ctx = Context::load(config_dir)?;
    let sources = ctx.sources(&args.sources)?;
    info!(sources = sources.len(), models = %ctx.models.root().display(), "training keyword models");

    let pb = progress(sources.len(), "training")?;
    let report = train_sources(&ctx.processor, &ctx.models, &sources, &mut tick(&pb));
    pb.finish_and_clear();
    print_report(&report);
    Ok(())
}

pub fn ingest(config_dir: &Path, args: SourceArgs) -> Result<()> {
    let ctx = Context::load(config_dir)?;
    let sources = ctx.sources(&args.sources)?;
    let encoder = ctx.encoder()?;
    let store = open_store(&ctx.config, encoder.dim())?;
    let vector = ctx.config.vector()?;
    let batcher = UpsertBatcher::new(encoder, store)
        .with_batch_size(ctx.config.ingest()?.batch_size)
        .with_namespace(vector.namespace);
    info!(sources = sources.len(), batch_size = batcher.batch_size(), "ingesting sources");

    let pb = progress(sources.len(), "ingesting")?;
    let report = ingest_sources(&ctx.processor, &ctx.models, &batcher, &sources, &mut tick(&pb));
    pb.finish_and_clear();
    print_report(&report);
    if report.sources.iter().all(|s| matches!(s.outcome, SourceOutcome::Aborted { .. })) {
        anyhow::bail!("every source aborted");
    }
    Ok(())
}

pub fn query(config_dir: &Path, args: QueryArgs) -> Result<()> {
    let ctx = Context::load(config_dir)?;
    let encoder = ctx.encoder()?;
    let store = open_store(&ctx.config, encoder.dim())?;
    let engine = QueryEngine::new(encoder, store, ctx.models.clone()).with_namespace(ctx.config.vector()?.namespace);
    let top_k = args.top_k.unwrap_or(ctx.config.query()?.top_k);

    let matches = engine.search(&args.text, &args.source, top_k, args.category)?;
    if matches.is_empty() {
        println!("No matches.");
    }
    for m in &matches {
        print_match(m);
    }
    Ok(())
}

fn print_match(m: &QueryMatch) {
    let Some(meta) = &m.metadata else {
        println!("[{:.3}] {}", m.score, m.id);
        return;
    };
    match (meta.season, meta.episode) {
        (Some(s), Some(e)) => println!("[{:.3}] {} (s{}e{})", m.score, meta.title, s, e),
        _ => println!("[{:.3}] {}", m.score, meta.title),
    }
    if let Some(text) = &meta.text {
        println!("    {text}");
    }
    println!("    {} --> {}", meta.start, meta.end);
}

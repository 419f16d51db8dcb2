use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use dialogue_core::types::Category;

#[derive(Parser, Debug)]
#[command(name = "dialogue", version, about = "Hybrid search over subtitle dialogue")]
pub struct Cli {
    /// Directory holding config.toml; relative paths resolve against it.
    #[arg(long, global = true, default_value = ".")]
    pub config_dir: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fit and save one keyword model per source.
    Train(SourceArgs),
    /// Chunk, encode and upsert every trained source.
    Ingest(SourceArgs),
    /// Hybrid search within one source.
    Query(QueryArgs),
}

#[derive(Args, Debug, Clone)]
pub struct SourceArgs {
    /// Limit the run to these source ids (repeatable).
    #[arg(long = "source")]
    pub sources: Vec<String>,
}

#[derive(Args, Debug, Clone)]
pub struct QueryArgs {
    pub text: String,

    #[arg(long)]
    pub source: String,

    #[arg(long)]
    pub top_k: Option<usize>,

    #[arg(long)]
    pub category: Option<Category>,
}

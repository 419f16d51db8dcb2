//! Domain types shared by the ingest and query paths.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

pub type ChunkId = String;

/// Offset into a subtitle stream, in milliseconds.
///
/// Renders in SubRip form (`HH:MM:SS,mmm`), which is also how it is stored in
/// chunk metadata.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(pub u64);

impl Timestamp {
    /// `None` when the total does not fit in a `u64` of milliseconds.
    pub fn from_parts(hours: u64, minutes: u64, seconds: u64, millis: u64) -> Option<Self> {
        let total = hours
            .checked_mul(60)?
            .checked_add(minutes)?
            .checked_mul(60)?
            .checked_add(seconds)?
            .checked_mul(1000)?
            .checked_add(millis)?;
        Some(Self(total))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ms = self.0 % 1000;
        let total_secs = self.0 / 1000;
        let (h, m, s) = (total_secs / 3600, (total_secs / 60) % 60, total_secs % 60);
        write!(f, "{h:02}:{m:02}:{s:02},{ms:03}")
    }
}

/// One caption event as read from a subtitle file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubtitleLine {
    pub start: Timestamp,
    pub end: Timestamp,
    pub text: String,
}

impl SubtitleLine {
    pub fn new(start: Timestamp, end: Timestamp, text: impl Into<String>) -> Self {
        Self { start, end, text: text.into() }
    }
}

/// A window of consecutive subtitle lines indexed as one retrievable unit.
///
/// `text` is the markup-free text of every line joined with a single space.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub lines: Vec<SubtitleLine>,
    pub start: Timestamp,
    pub end: Timestamp,
    pub text: String,
    /// Sum of per-line token counts at the moment the chunk was emitted.
    pub token_count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Series,
    Movies,
    Podcasts,
    Misc,
}

impl Category {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Series => "series",
            Self::Movies => "movies",
            Self::Podcasts => "podcasts",
            Self::Misc => "misc",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "series" | "shows" => Ok(Self::Series),
            "movies" => Ok(Self::Movies),
            "podcasts" => Ok(Self::Podcasts),
            "misc" => Ok(Self::Misc),
            other => Err(Error::InvalidConfig(format!("unknown category '{other}'"))),
        }
    }
}

/// Structured identity parsed from an episode filename.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpisodeIdentity {
    pub series_title: String,
    pub season: u32,
    pub episode: u32,
    pub episode_title: Option<String>,
}

impl EpisodeIdentity {
    /// `S01E02`-style tag used to keep chunk ids unique across episodes.
    pub fn episode_tag(&self) -> String {
        format!("S{:02}E{:02}", self.season, self.episode)
    }
}

/// Metadata stored next to every vector.
///
/// `season`/`episode` exist only for series content, which `with_episode`
/// enforces. `text` is attached by the batcher right before the upsert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub category: Category,
    pub source_id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub season: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub episode: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub episode_title: Option<String>,
    pub start: String,
    pub end: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl ChunkMetadata {
    pub fn new(
        category: Category,
        source_id: impl Into<String>,
        title: impl Into<String>,
        start: Timestamp,
        end: Timestamp,
    ) -> Result<Self> {
        let source_id = source_id.into();
        if source_id.trim().is_empty() {
            return Err(Error::InvalidMetadata("source_id must not be empty".into()));
        }
        Ok(Self {
            category,
            source_id,
            title: title.into(),
            season: None,
            episode: None,
            episode_title: None,
            start: start.to_string(),
            end: end.to_string(),
            text: None,
        })
    }

    pub fn with_episode(mut self, identity: &EpisodeIdentity) -> Result<Self> {
        if self.category != Category::Series {
            return Err(Error::InvalidMetadata(format!(
                "season/episode only apply to series, not {}",
                self.category
            )));
        }
        self.season = Some(identity.season);
        self.episode = Some(identity.episode);
        self.episode_title = identity.episode_title.clone();
        Ok(self)
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChunkRecord {
    pub id: ChunkId,
    pub text: String,
    pub metadata: ChunkMetadata,
}

/// Term-id/weight pairs; `indices` and `values` always have the same length.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SparseVector {
    pub indices: Vec<u32>,
    pub values: Vec<f32>,
}

impl SparseVector {
    pub fn new(indices: Vec<u32>, values: Vec<f32>) -> Result<Self> {
        if indices.len() != values.len() {
            return Err(Error::encoding(format!(
                "sparse vector has {} indices but {} values",
                indices.len(),
                values.len()
            )));
        }
        Ok(Self { indices, values })
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    /// Dot product against another sparse vector (term ids may be unsorted).
    pub fn dot(&self, other: &SparseVector) -> f32 {
        let mut score = 0.0;
        for (idx, value) in self.indices.iter().zip(&self.values) {
            if let Some(pos) = other.indices.iter().position(|o| o == idx) {
                score += value * other.values[pos];
            }
        }
        score
    }
}

/// Record handed to the vector store: one per chunk.
#[derive(Debug, Clone, PartialEq)]
pub struct UpsertRecord {
    pub id: ChunkId,
    pub dense: Vec<f32>,
    pub sparse: SparseVector,
    pub metadata: ChunkMetadata,
}

/// Equality filter applied to every hybrid query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataFilter {
    pub source_id: String,
    pub category: Option<Category>,
}

impl MetadataFilter {
    pub fn for_source(source_id: impl Into<String>) -> Self {
        Self { source_id: source_id.into(), category: None }
    }

    pub fn with_category(mut self, category: Option<Category>) -> Self {
        self.category = category;
        self
    }

    pub fn matches(&self, metadata: &ChunkMetadata) -> bool {
        metadata.source_id == self.source_id
            && self.category.map_or(true, |c| metadata.category == c)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct QueryRequest {
    pub namespace: String,
    pub dense: Vec<f32>,
    pub sparse: SparseVector,
    pub top_k: usize,
    pub filter: MetadataFilter,
    pub include_metadata: bool,
}

/// One ranked hit. Higher `score` is better.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryMatch {
    pub id: ChunkId,
    pub score: f32,
    pub metadata: Option<ChunkMetadata>,
}

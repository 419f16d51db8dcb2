//! Token-bounded, line-overlapping segmentation of subtitle streams.
//!
//! [`Chunker`] is a single forward pass over its input: it yields a chunk as
//! soon as the running token count exceeds `max_tokens`, then keeps the last
//! `overlap_lines` lines as the start of the next chunk. Lines are never split,
//! so one oversized line becomes its own chunk. Whatever is buffered when the
//! input runs out is yielded as the final chunk.

use std::sync::Arc;

use crate::subtitle::strip_markup;
use crate::traits::TokenCounter;
use crate::types::{Chunk, SubtitleLine};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkingConfig {
    pub max_tokens: usize,
    pub overlap_lines: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self { max_tokens: 500, overlap_lines: 3 }
    }
}

pub struct Chunker<I> {
    lines: I,
    counter: Arc<dyn TokenCounter>,
    config: ChunkingConfig,
    /// Buffered lines with their markup-free text and token count.
    buffer: Vec<(SubtitleLine, String, usize)>,
    running_tokens: usize,
    done: bool,
}

impl<I> Chunker<I>
where
    I: Iterator<Item = SubtitleLine>,
{
    pub fn new(lines: impl IntoIterator<IntoIter = I>, counter: Arc<dyn TokenCounter>, config: ChunkingConfig) -> Self {
        Self { lines: lines.into_iter(), counter, config, buffer: Vec::new(), running_tokens: 0, done: false }
    }

    fn build_chunk(&self) -> Chunk {
        let lines: Vec<SubtitleLine> = self.buffer.iter().map(|(line, _, _)| line.clone()).collect();
        let text = self.buffer.iter().map(|(_, plain, _)| plain.as_str()).collect::<Vec<_>>().join(" ");
        let start = lines.first().map(|l| l.start).unwrap_or_default();
        let end = lines.last().map(|l| l.end).unwrap_or_default();
        Chunk { lines, start, end, text, token_count: self.running_tokens }
    }

    fn retain_overlap(&mut self) {
        let keep = self.config.overlap_lines.min(self.buffer.len());
        self.buffer.drain(..self.buffer.len() - keep);
        self.running_tokens = self.buffer.iter().map(|(_, _, tokens)| tokens).sum();
    }
}

impl<I> Iterator for Chunker<I>
where
    I: Iterator<Item = SubtitleLine>,
{
    type Item = Chunk;

    fn next(&mut self) -> Option<Chunk> {
        if self.done {
            return None;
        }
        for line in self.lines.by_ref() {
            let plain = strip_markup(&line.text);
            let tokens = self.counter.count(&plain);
            self.buffer.push((line, plain, tokens));
            self.running_tokens += tokens;
            if self.running_tokens > self.config.max_tokens {
                let chunk = self.build_chunk();
                self.retain_overlap();
                return Some(chunk);
            }
        }
        self.done = true;
        if self.buffer.is_empty() {
            return None;
        }
        let chunk = self.build_chunk();
        self.buffer.clear();
        self.running_tokens = 0;
        Some(chunk)
    }
}

impl<I> std::iter::FusedIterator for Chunker<I> where I: Iterator<Item = SubtitleLine> {}

/// Convenience wrapper around [`Chunker::new`].
pub fn chunk<I>(lines: I, counter: Arc<dyn TokenCounter>, config: ChunkingConfig) -> Chunker<I::IntoIter>
where
    I: IntoIterator<Item = SubtitleLine>,
{
    Chunker::new(lines, counter, config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Timestamp;

    /// Every line costs its leading number of tokens ("60 ..." = 60).
    struct LeadingNumber;
    impl TokenCounter for LeadingNumber {
        fn count(&self, text: &str) -> usize {
            text.split_whitespace().next().and_then(|t| t.parse().ok()).unwrap_or(0)
        }
    }

    fn lines(costs: &[usize]) -> Vec<SubtitleLine> {
        costs
            .iter()
            .enumerate()
            .map(|(i, c)| {
                let ms = i as u64 * 1000;
                SubtitleLine::new(Timestamp(ms), Timestamp(ms + 900), format!("{c} line{}", i + 1))
            })
            .collect()
    }

    fn run(costs: &[usize], max_tokens: usize, overlap_lines: usize) -> Vec<Chunk> {
        chunk(lines(costs), Arc::new(LeadingNumber), ChunkingConfig { max_tokens, overlap_lines }).collect()
    }

    fn names(chunk: &Chunk) -> Vec<String> {
        chunk.lines.iter().map(|l| l.text.split_whitespace().nth(1).unwrap_or("").to_string()).collect()
    }

    #[test]
    fn ten_lines_of_sixty_tokens() {
        let chunks = run(&[60; 10], 500, 3);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].lines.len(), 9);
        assert_eq!(chunks[0].token_count, 540);
        assert_eq!(names(&chunks[1]), vec!["line7", "line8", "line9", "line10"]);
        assert_eq!(chunks[1].token_count, 240);
    }

    #[test]
    fn empty_input_yields_nothing() {
        assert!(run(&[], 500, 3).is_empty());
    }

    #[test]
    fn oversized_line_is_never_split() {
        let chunks = run(&[900], 500, 3);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].lines.len(), 1);
        assert_eq!(chunks[0].token_count, 900);
    }

    #[test]
    fn chunk_span_and_text() {
        let chunks = run(&[10, 20], 500, 3);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].start, Timestamp(0));
        assert_eq!(chunks[0].end, Timestamp(1900));
        assert_eq!(chunks[0].text, "10 line1 20 line2");
    }

    #[test]
    fn markup_is_stripped_before_counting_and_joining() {
        let input = vec![SubtitleLine::new(Timestamp(0), Timestamp(1), "<i>7</i> tagged\nline")];
        let chunks: Vec<Chunk> = chunk(input, Arc::new(LeadingNumber), ChunkingConfig::default()).collect();
        assert_eq!(chunks[0].text, "7 tagged line");
        assert_eq!(chunks[0].token_count, 7);
    }

    #[test]
    fn zero_overlap_partitions_the_input() {
        let chunks = run(&[300, 300, 300, 300, 10], 500, 0);
        let all: Vec<String> = chunks.iter().flat_map(names).collect();
        assert_eq!(all, vec!["line1", "line2", "line3", "line4", "line5"]);
    }

    #[test]
    fn invariants_hold_across_uneven_input() {
        let costs: Vec<usize> = (0..200).map(|i| (i * 37 % 97) + 1).collect();
        for overlap in [0usize, 1, 3, 5] {
            let chunks = run(&costs, 250, overlap);
            let mut rebuilt: Vec<String> = Vec::new();
            for (k, c) in chunks.iter().enumerate() {
                assert!(!c.lines.is_empty());
                if k + 1 < chunks.len() {
                    assert!(c.token_count > 250, "non-final chunk {k} must exceed the budget");
                }
                let skip = if k == 0 {
                    0
                } else {
                    let prev = &chunks[k - 1];
                    let shared = overlap.min(prev.lines.len());
                    assert_eq!(&c.lines[..shared], &prev.lines[prev.lines.len() - shared..]);
                    shared
                };
                rebuilt.extend(names(c).into_iter().skip(skip));
            }
            let expected: Vec<String> = (1..=costs.len()).map(|i| format!("line{i}")).collect();
            assert_eq!(rebuilt, expected, "overlap={overlap}");
        }
    }

    #[test]
    fn exhausted_chunker_stays_exhausted() {
        let mut chunker = chunk(lines(&[10]), Arc::new(LeadingNumber), ChunkingConfig::default());
        assert!(chunker.next().is_some());
        assert!(chunker.next().is_none());
        assert!(chunker.next().is_none());
    }
}

//! Character-budget chunking with sliding overlap.
//!
//! Each page is split on its own so every chunk carries a single page number. Splitting runs
//! in two passes:
//!
//! - `semchunk-rs` cuts the page at the most meaningful boundary available (paragraph, line,
//!   sentence, then word) with a budget of `chunk_size - overlap` characters. Whitespace-free
//!   runs longer than that budget (CJK text, long identifiers) are cut into fixed character
//!   windows first, and spans within budget are kept whole, so semchunk never reaches its
//!   per-character fallback.
//! - The tail of the previous chunk, up to `overlap` characters and starting on a word
//!   boundary, is prepended to each following chunk. The result is trimmed from the front
//!   when needed so no chunk exceeds `chunk_size`.
//!
//! Sizes are counted in Unicode scalar values, not bytes or tokens.

use std::ops::Range;

use semchunk_rs::Chunker;

use super::types::{ChunkingError, DocumentChunk, PageText};

/// Maximum characters per chunk.
pub const CHUNK_SIZE_CHARS: usize = 1000;
/// Characters shared between adjacent chunks of the same page.
pub const CHUNK_OVERLAP_CHARS: usize = 200;

/// Size and overlap budget for the splitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkingConfig {
    /// Hard upper bound on characters per chunk.
    pub chunk_size: usize,
    /// Characters carried over from the previous chunk.
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: CHUNK_SIZE_CHARS,
            overlap: CHUNK_OVERLAP_CHARS,
        }
    }
}

impl ChunkingConfig {
    fn validate(&self) -> Result<(), ChunkingError> {
        if self.chunk_size == 0 {
            return Err(ChunkingError::InvalidConfig(
                "chunk size must be greater than zero".into(),
            ));
        }
        if self.overlap >= self.chunk_size {
            return Err(ChunkingError::InvalidConfig(format!(
                "overlap {} must be smaller than chunk size {}",
                self.overlap, self.chunk_size
            )));
        }
        Ok(())
    }
}

/// Split every page into overlapping chunks, numbering them across the whole document.
///
/// Pages without text contribute nothing.
pub fn chunk_pages(
    pages: &[PageText],
    config: ChunkingConfig,
) -> Result<Vec<DocumentChunk>, ChunkingError> {
    config.validate()?;

    let mut chunks = Vec::new();
    for page in pages {
        for text in chunk_text(&page.text, config) {
            chunks.push(DocumentChunk {
                text,
                page: page.number,
                chunk_index: chunks.len(),
            });
        }
    }
    Ok(chunks)
}

fn char_count(segment: &str) -> usize {
    segment.chars().count()
}

/// Chunk one block of text. `config` must already be validated.
fn chunk_text(text: &str, config: ChunkingConfig) -> Vec<String> {
    if text.trim().is_empty() {
        return Vec::new();
    }

    let base_size = config.chunk_size - config.overlap;
    let chunker = Chunker::new(base_size, Box::new(char_count));

    let mut base_chunks = Vec::new();
    let mut cursor = 0;
    for run in oversized_runs(text, base_size) {
        base_chunks.extend(semantic_split(&chunker, &text[cursor..run.start], base_size));
        base_chunks.extend(char_windows(&text[run.clone()], base_size));
        cursor = run.end;
    }
    base_chunks.extend(semantic_split(&chunker, &text[cursor..], base_size));

    apply_overlap(base_chunks, config)
}

/// Split a span whose whitespace-free runs all fit in `budget`.
fn semantic_split(chunker: &Chunker, span: &str, budget: usize) -> Vec<String> {
    let span = span.trim();
    if span.is_empty() {
        return Vec::new();
    }
    if char_count(span) <= budget {
        return vec![span.to_string()];
    }
    chunker
        .chunk(span)
        .into_iter()
        .filter(|chunk| !chunk.trim().is_empty())
        .collect()
}

/// Byte ranges of whitespace-free runs longer than `limit` characters.
fn oversized_runs(text: &str, limit: usize) -> Vec<Range<usize>> {
    let mut runs = Vec::new();
    let mut start = None;
    let mut chars = 0;
    for (offset, ch) in text.char_indices() {
        if ch.is_whitespace() {
            if let Some(run_start) = start.take() {
                if chars > limit {
                    runs.push(run_start..offset);
                }
            }
            chars = 0;
        } else {
            start.get_or_insert(offset);
            chars += 1;
        }
    }
    if let Some(run_start) = start {
        if chars > limit {
            runs.push(run_start..text.len());
        }
    }
    runs
}

fn char_windows(run: &str, size: usize) -> Vec<String> {
    let chars: Vec<char> = run.chars().collect();
    chars
        .chunks(size)
        .map(|window| window.iter().collect())
        .collect()
}

fn apply_overlap(chunks: Vec<String>, config: ChunkingConfig) -> Vec<String> {
    if config.overlap == 0 || chunks.len() < 2 {
        return chunks;
    }

    let mut overlapped = Vec::with_capacity(chunks.len());
    let mut previous: Option<String> = None;
    for current in chunks {
        let combined = match &previous {
            None => current.clone(),
            Some(previous) => {
                let tail = tail_on_word_boundary(previous, config.overlap);
                let mut combined = String::with_capacity(tail.len() + current.len() + 1);
                if !tail.is_empty() {
                    combined.push_str(tail);
                    if !tail.ends_with(char::is_whitespace)
                        && !current.starts_with(char::is_whitespace)
                    {
                        combined.push(' ');
                    }
                }
                combined.push_str(&current);
                trim_front_to_budget(&combined, config.chunk_size)
            }
        };
        overlapped.push(combined);
        previous = Some(current);
    }
    overlapped
}

/// Last `limit` characters of `text`, advanced past any partial leading word.
fn tail_on_word_boundary(text: &str, limit: usize) -> &str {
    let total = char_count(text);
    if total <= limit {
        return text.trim_start();
    }

    let start = text
        .char_indices()
        .nth(total - limit)
        .map(|(offset, _)| offset)
        .unwrap_or(text.len());
    let tail = &text[start..];
    let split_word =
        !text[..start].ends_with(char::is_whitespace) && !tail.starts_with(char::is_whitespace);
    let tail = if split_word {
        tail.find(char::is_whitespace)
            .map(|offset| &tail[offset..])
            .unwrap_or("")
    } else {
        tail
    };
    tail.trim_start()
}

fn trim_front_to_budget(text: &str, budget: usize) -> String {
    let total = char_count(text);
    if total <= budget {
        return text.to_string();
    }
    let start = text
        .char_indices()
        .nth(total - budget)
        .map(|(offset, _)| offset)
        .unwrap_or(text.len());
    text[start..].trim_start().to_string()
}

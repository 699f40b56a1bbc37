//! # Text Chunker
//! Splits an item's text into scorer-sized, non-overlapping chunks.
//!
//! Cut preference inside the size budget: last sentence end, then last
//! whitespace, then a hard cut at the character limit. Every cut consumes at
//! least one character, so iteration always terminates.

use crate::model::{Chunk, ScoredItem};

#[derive(Debug, Clone, Copy)]
pub struct Chunker {
    max_chars: usize,
}

impl Chunker {
    /// `max_chars` of 0 is treated as 1.
    pub fn new(max_chars: usize) -> Self {
        Self {
            max_chars: max_chars.max(1),
        }
    }

    pub fn max_chars(&self) -> usize {
        self.max_chars
    }

    /// Lazy chunk sequence over arbitrary text.
    pub fn chunks(&self, text: impl Into<String>) -> Chunks {
        Chunks {
            text: text.into(),
            pos: 0,
            index: 0,
            max_chars: self.max_chars,
        }
    }

    /// Chunks for an item. Headline-only items yield a single headline chunk.
    pub fn chunk_item(&self, item: &ScoredItem) -> Chunks {
        self.chunks(item.text())
    }
}

/// Iterator over the chunks of one text. Owns the text it slices.
#[derive(Debug, Clone)]
pub struct Chunks {
    text: String,
    pos: usize,
    index: usize,
    max_chars: usize,
}

impl Iterator for Chunks {
    type Item = Chunk;

    fn next(&mut self) -> Option<Chunk> {
        let rest = &self.text[self.pos..];
        self.pos += rest.len() - rest.trim_start().len();
        let rest = &self.text[self.pos..];
        if rest.is_empty() {
            return None;
        }

        let limit = rest
            .char_indices()
            .nth(self.max_chars)
            .map(|(i, _)| i)
            .unwrap_or(rest.len());
        let cut = if limit == rest.len() {
            rest.len()
        } else {
            find_cut(rest, limit)
        };

        let piece = rest[..cut].trim_end();
        let chunk = Chunk {
            chunk_index: self.index,
            text: piece.to_string(),
            char_length: piece.chars().count(),
        };
        self.pos += cut;
        self.index += 1;
        Some(chunk)
    }
}

/// Byte offset (within `rest[..limit]`, > 0) where the next chunk should end.
fn find_cut(rest: &str, limit: usize) -> usize {
    let window = &rest[..limit];
    let mut sentence_end = None;
    let mut last_ws = None;

    for (i, c) in window.char_indices() {
        let after = i + c.len_utf8();
        match c {
            '\n' => sentence_end = Some(after),
            '.' | '!' | '?' => {
                if rest[after..].chars().next().map_or(true, char::is_whitespace) {
                    sentence_end = Some(after);
                }
            }
            c if c.is_whitespace() && i > 0 => last_ws = Some(i),
            _ => {}
        }
    }

    sentence_end.or(last_ws).unwrap_or(limit)
}

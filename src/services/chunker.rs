//! Text chunking with overlap for embedding-size constraints.

use crate::models::ChunkingConfig;

/// Text chunker that splits record text into overlapping chunks.
#[derive(Debug, Clone)]
pub struct TextChunker {
    /// Maximum chunk size in characters.
    chunk_size: usize,
    /// Overlap size in characters.
    overlap: usize,
}

impl TextChunker {
    pub fn new(config: &ChunkingConfig) -> Self {
        Self {
            chunk_size: config.chunk_size as usize,
            overlap: config.chunk_overlap as usize,
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(&ChunkingConfig::default())
    }

    /// Split text into overlapping chunks.
    ///
    /// Text at or under the chunk size comes back as a single chunk equal
    /// to the input. Empty text produces no chunks.
    pub fn split(&self, text: &str) -> Vec<String> {
        if text.is_empty() {
            return Vec::new();
        }

        if text.chars().count() <= self.chunk_size {
            return vec![text.to_string()];
        }

        self.split_with_overlap(text)
    }

    fn split_with_overlap(&self, text: &str) -> Vec<String> {
        let chars: Vec<char> = text.chars().collect();
        let total_chars = chars.len();
        let mut chunks = Vec::new();

        // An overlap at or above the chunk size cannot be honored; chunks
        // are emitted back to back instead.
        let back = if self.overlap < self.chunk_size {
            self.overlap
        } else {
            0
        };

        let mut start = 0;
        while start < total_chars {
            let end = (start + self.chunk_size).min(total_chars);
            let adjusted_end = self.find_break_point(&chars, end, total_chars);

            chunks.push(chars[start..adjusted_end].iter().collect());

            if adjusted_end >= total_chars {
                break;
            }

            // Step from the emitted end, not the nominal one: a break
            // point that pulled the end back must never open a gap of
            // unchunked text before the next chunk.
            start = adjusted_end.saturating_sub(back).max(start + 1);
        }

        chunks
    }

    /// Find a natural break point near the target end position.
    /// Priority: paragraph break > newline > sentence end > space.
    fn find_break_point(&self, chars: &[char], target_end: usize, total: usize) -> usize {
        if target_end >= total {
            return total;
        }

        // Only search the last 20% of the chunk.
        let search_start = target_end.saturating_sub(self.chunk_size / 5);
        let search_range = &chars[search_start..target_end];

        let mut paragraph = None;
        let mut newline = None;
        let mut sentence = None;
        let mut space = None;

        for (i, c) in search_range.iter().enumerate() {
            let pos = search_start + i;
            match c {
                '\n' => {
                    if i > 0 && search_range.get(i - 1) == Some(&'\n') {
                        paragraph = Some(pos + 1);
                    }
                    newline = Some(pos + 1);
                }
                '.' | '!' | '?' => {
                    if search_range.get(i + 1).is_some_and(|c| c.is_whitespace()) {
                        sentence = Some(pos + 1);
                    }
                }
                ' ' | '\t' => {
                    space = Some(pos + 1);
                }
                _ => {}
            }
        }

        paragraph
            .or(newline)
            .or(sentence)
            .or(space)
            .unwrap_or(target_end)
    }
}

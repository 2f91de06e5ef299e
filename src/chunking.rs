use crate::error::{RagError, Result};
use log::{debug, warn};

/// Settings for splitting extracted text into overlapping windows
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkingConfig {
    /// Text is only cut right after this separator
    pub separator: String,
    /// Maximum chunk length in characters
    pub chunk_size: usize,
    /// Maximum number of characters shared by neighbouring chunks
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        ChunkingConfig {
            separator: "\n".to_string(),
            chunk_size: 1000,
            chunk_overlap: 200,
        }
    }
}

impl ChunkingConfig {
    /// Reject settings that could not make progress
    pub fn validate(&self) -> Result<()> {
        if self.separator.is_empty() {
            return Err(RagError::InvalidChunking(
                "separator must not be empty".to_string(),
            ));
        }
        if self.chunk_size == 0 {
            return Err(RagError::InvalidChunking(
                "chunk size must be greater than zero".to_string(),
            ));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(RagError::InvalidChunking(format!(
                "overlap ({}) must be smaller than chunk size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        Ok(())
    }
}

/// Represents a text chunk with its position in the source text
#[derive(Debug, Clone, PartialEq)]
pub struct TextChunk {
    /// The chunk text, an exact substring of the source
    pub text: String,
    /// Byte offset of this chunk in the source text
    pub start_position: usize,
}

impl TextChunk {
    /// Byte offset one past the last byte of this chunk
    pub fn end_position(&self) -> usize {
        self.start_position + self.text.len()
    }
}

/// Split text into overlapping chunks of at most `chunk_size` characters
///
/// Units end right after each separator occurrence. Units are packed greedily
/// into a window; the following window starts at the earliest unit boundary
/// within `chunk_overlap` characters of the previous end. A single unit longer
/// than `chunk_size` becomes its own oversized chunk. Chunks are returned
/// as-is, whitespace-only windows included, so they always tile the input.
pub fn split_into_chunks(text: &str, config: &ChunkingConfig) -> Result<Vec<TextChunk>> {
    config.validate()?;

    if text.is_empty() {
        return Ok(Vec::new());
    }

    // Unit boundaries as (byte offset, char offset)
    let mut boundaries = vec![(0usize, 0usize)];
    let mut chars_seen = 0;
    let mut last_byte = 0;
    for (idx, matched) in text.match_indices(config.separator.as_str()) {
        let end = idx + matched.len();
        chars_seen += text[last_byte..end].chars().count();
        last_byte = end;
        if end < text.len() {
            boundaries.push((end, chars_seen));
        }
    }
    let total_chars = chars_seen + text[last_byte..].chars().count();
    boundaries.push((text.len(), total_chars));

    let unit_count = boundaries.len() - 1;
    let mut chunks = Vec::new();
    let mut first = 0;

    loop {
        let (start_byte, start_char) = boundaries[first];

        // Always take at least one unit
        let mut last = first + 1;
        while last < unit_count && boundaries[last + 1].1 - start_char <= config.chunk_size {
            last += 1;
        }
        let (end_byte, end_char) = boundaries[last];

        let window = &text[start_byte..end_byte];
        if end_char - start_char > config.chunk_size {
            warn!(
                "Created a chunk of {} characters, longer than the configured {}",
                end_char - start_char,
                config.chunk_size
            );
        }
        chunks.push(TextChunk {
            text: window.to_string(),
            start_position: start_byte,
        });

        if last == unit_count {
            break;
        }

        // Step back over whole units while they fit in the overlap and still
        // leave room for the next unit
        let next_end = boundaries[last + 1].1;
        let mut next = last;
        while next > first + 1
            && end_char - boundaries[next - 1].1 <= config.chunk_overlap
            && next_end - boundaries[next - 1].1 <= config.chunk_size
        {
            next -= 1;
        }
        first = next;
    }

    debug!(
        "Split {} characters into {} chunks",
        total_chars,
        chunks.len()
    );
    Ok(chunks)
}

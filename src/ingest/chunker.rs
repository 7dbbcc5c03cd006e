//! Text chunking.
//!
//! Windows of at most `chunk_size` bytes. A window is cut at the last blank
//! line, newline or space found in its second half, and the next window
//! starts up to `overlap` bytes before the cut.

use crate::core::config::ChunkingConfig;

/// Separators tried in order when looking for a cut.
const BREAKS: [&str; 3] = ["\n\n", "\n", " "];

/// Splits text into overlapping chunks.
#[derive(Clone, Copy, Debug)]
pub struct TextChunker {
    chunk_size: usize,
    overlap: usize,
}

impl Default for TextChunker {
    fn default() -> Self {
        Self::from_config(&ChunkingConfig::default())
    }
}

impl TextChunker {
    /// Create a chunker. A zero size is raised to one byte and the overlap
    /// is kept below the size.
    #[must_use]
    pub fn new(chunk_size: usize, overlap: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            chunk_size,
            overlap: overlap.min(chunk_size - 1),
        }
    }

    /// Create a chunker from configuration.
    #[must_use]
    pub fn from_config(config: &ChunkingConfig) -> Self {
        Self::new(config.chunk_size, config.overlap)
    }

    /// Split `text` into trimmed, non-empty chunks.
    #[must_use]
    pub fn chunk(&self, text: &str) -> Vec<String> {
        let text = text.trim();
        if text.is_empty() {
            return Vec::new();
        }
        if text.len() <= self.chunk_size {
            return vec![text.to_string()];
        }

        let mut chunks = Vec::new();
        let mut start = 0;
        while start < text.len() {
            if text.len() - start <= self.chunk_size {
                push_trimmed(&mut chunks, &text[start..]);
                break;
            }

            let mut end = floor_boundary(text, start + self.chunk_size);
            if end <= start {
                end = ceil_boundary(text, start + 1);
            }
            let window = &text[start..end];
            let cut = start + break_point(window);
            push_trimmed(&mut chunks, &text[start..cut]);

            start = self.next_start(text, start, cut);
        }
        chunks
    }

    /// Where the window after `[start, cut)` begins.
    fn next_start(&self, text: &str, start: usize, cut: usize) -> usize {
        let back = floor_boundary(text, cut.saturating_sub(self.overlap));
        if back <= start || self.overlap == 0 {
            return cut;
        }
        // Begin the overlap on a word if one starts inside it.
        let candidate = text[back..cut]
            .find(char::is_whitespace)
            .map_or(back, |pos| back + pos);
        ceil_boundary(text, candidate.clamp(start + 1, cut))
    }
}

/// Byte index just past the preferred separator in the window's second half,
/// or the window's length when there is none.
fn break_point(window: &str) -> usize {
    let min = window.len() / 2;
    for sep in BREAKS {
        if let Some(pos) = window.rfind(sep) {
            if pos >= min && pos > 0 {
                return pos + sep.len();
            }
        }
    }
    window.len()
}

fn push_trimmed(chunks: &mut Vec<String>, piece: &str) {
    let piece = piece.trim();
    if !piece.is_empty() {
        chunks.push(piece.to_string());
    }
}

fn floor_boundary(text: &str, mut index: usize) -> usize {
    if index >= text.len() {
        return text.len();
    }
    while index > 0 && !text.is_char_boundary(index) {
        index -= 1;
    }
    index
}

fn ceil_boundary(text: &str, mut index: usize) -> usize {
    while index < text.len() && !text.is_char_boundary(index) {
        index += 1;
    }
    index.min(text.len())
}

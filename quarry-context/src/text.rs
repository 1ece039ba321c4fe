//! Word-window chunking for corpus text.
//!
//! Corpus files are turned into retrieval passages by splitting on whitespace
//! and grouping the resulting words into consecutive, non-overlapping windows.
//! Each window becomes one passage, re-joined with single spaces, so the
//! original line breaks and runs of whitespace are not preserved.
//!
//! The module defines:
//! - [`split_into_chunks`]: the plain entry point returning passage strings.
//! - [`TextChunker`]: a configured chunker that also reports sequence numbers
//!   and word counts through [`TextChunk`].
//!
//! # Example
//!
//! ```
//! use quarry_context::text::split_into_chunks;
//!
//! let chunks = split_into_chunks("one two three four five", 2);
//! assert_eq!(chunks, vec!["one two", "three four", "five"]);
//! ```

use serde::Serialize;

/// Default number of words per passage.
pub const DEFAULT_MAX_WORDS: usize = 250;

/// A single passage produced by [`TextChunker`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TextChunk {
    /// Position of this chunk within the source text (0-indexed).
    pub sequence: usize,
    /// Number of words in the chunk. Never exceeds the chunker's window size.
    pub word_count: usize,
    /// The chunk text, words joined by a single space.
    pub text: String,
}

/// Splits text into word windows of a fixed maximum size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextChunker {
    max_words: usize,
}

impl Default for TextChunker {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_WORDS)
    }
}

impl TextChunker {
    /// Create a chunker producing windows of at most `max_words` words.
    ///
    /// A window size of zero is treated as one so that every word still
    /// lands in exactly one chunk.
    pub fn new(max_words: usize) -> Self {
        Self {
            max_words: max_words.max(1),
        }
    }

    /// The effective window size.
    pub fn max_words(&self) -> usize {
        self.max_words
    }

    /// Split `text` into ordered chunks.
    ///
    /// Whitespace of any kind separates words. Empty or whitespace-only input
    /// produces no chunks. All chunks except possibly the last contain exactly
    /// `max_words` words.
    pub fn get_chunks(&self, text: &str) -> Vec<TextChunk> {
        let words: Vec<&str> = text.split_whitespace().collect();

        words
            .chunks(self.max_words)
            .enumerate()
            .map(|(sequence, window)| TextChunk {
                sequence,
                word_count: window.len(),
                text: window.join(" "),
            })
            .collect()
    }
}

/// Split `text` into passages of at most `max_words` words each.
///
/// Convenience wrapper around [`TextChunker::get_chunks`] that only keeps the
/// passage text.
pub fn split_into_chunks(text: &str, max_words: usize) -> Vec<String> {
    TextChunker::new(max_words)
        .get_chunks(text)
        .into_iter()
        .map(|chunk| chunk.text)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_exact_windows() {
        let text = (0..10).map(|i| format!("w{i}")).collect::<Vec<_>>().join(" ");
        let chunks = split_into_chunks(&text, 5);

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0], "w0 w1 w2 w3 w4");
        assert_eq!(chunks[1], "w5 w6 w7 w8 w9");
    }

    #[test]
    fn test_last_chunk_may_be_short() {
        let chunks = split_into_chunks("a b c d e f g", 3);
        assert_eq!(chunks, vec!["a b c", "d e f", "g"]);
    }

    #[test]
    fn test_empty_and_whitespace_input() {
        assert!(split_into_chunks("", 250).is_empty());
        assert!(split_into_chunks("   \n\t  \r\n", 250).is_empty());
    }

    #[test]
    fn test_whitespace_is_normalized() {
        let chunks = split_into_chunks("The sky\n\nis   blue.\tCats are mammals.", 250);
        assert_eq!(chunks, vec!["The sky is blue. Cats are mammals."]);
    }

    #[test]
    fn test_zero_window_is_treated_as_one() {
        let chunker = TextChunker::new(0);
        assert_eq!(chunker.max_words(), 1);
        assert_eq!(split_into_chunks("x y", 0), vec!["x", "y"]);
    }

    #[test]
    fn test_chunk_metadata() {
        let chunks = TextChunker::new(2).get_chunks("alpha beta gamma");

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].sequence, 0);
        assert_eq!(chunks[0].word_count, 2);
        assert_eq!(chunks[1].sequence, 1);
        assert_eq!(chunks[1].word_count, 1);
        assert_eq!(chunks[1].text, "gamma");
    }

    #[test]
    fn test_every_word_is_kept_in_order() {
        let text = (0..1003).map(|i| format!("word{i}")).collect::<Vec<_>>().join(" ");
        let chunks = TextChunker::default().get_chunks(&text);

        assert_eq!(chunks.len(), 5);
        assert!(chunks.iter().all(|c| c.word_count <= DEFAULT_MAX_WORDS));
        let rejoined = chunks
            .iter()
            .map(|c| c.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        assert_eq!(rejoined, text);
    }
}

pub mod text;

// Re-export the chunking entry points for external use
pub use text::{DEFAULT_MAX_WORDS, TextChunk, TextChunker, split_into_chunks};

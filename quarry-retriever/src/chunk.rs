//! Passage records returned by retrievers

use serde::{Deserialize, Serialize};

/// One passage of the loaded corpus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chunk {
    /// Unique within one corpus load.
    pub id: String,
    pub text: String,
    /// Position of the passage within its source.
    pub source_index: usize,
    /// Where the passage came from, normally the corpus file path.
    pub source_file: String,
}

/// A chunk paired with its similarity to the query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredChunk {
    #[serde(flatten)]
    pub chunk: Chunk,
    pub score: f32,
}

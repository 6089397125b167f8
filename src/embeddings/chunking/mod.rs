#[cfg(test)]
mod tests;

use itertools::Itertools;
use tracing::debug;

/// A window of source text prepared for retrieval indexing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KnowledgeChunk {
    /// Stable id within the knowledge index
    pub id: String,
    /// The window text
    pub content: String,
}

/// Configuration for knowledge chunking
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkingConfig {
    /// Window size in words
    pub chunk_size: usize,
    /// Words shared between consecutive windows
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    #[inline]
    fn default() -> Self {
        Self {
            chunk_size: 512,
            overlap: 64,
        }
    }
}

impl From<&crate::config::RagConfig> for ChunkingConfig {
    #[inline]
    fn from(rag: &crate::config::RagConfig) -> Self {
        Self {
            chunk_size: rag.chunk_size,
            overlap: rag.chunk_overlap,
        }
    }
}

/// Collapse every run of whitespace into a single space and trim the ends
#[inline]
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().join(" ")
}

/// Split text into word windows of `config.chunk_size` words.
///
/// Consecutive windows share `config.overlap` words so that a passage spanning
/// a boundary is still retrievable in one piece. The last window always ends
/// at the final word.
#[inline]
pub fn chunk_words(text: &str, config: &ChunkingConfig) -> Vec<String> {
    let words: Vec<&str> = text.split_whitespace().collect();
    let chunk_size = config.chunk_size.max(1);
    let mut chunks = Vec::new();
    let mut start = 0;

    while start < words.len() {
        let end = (start + chunk_size).min(words.len());
        chunks.push(words[start..end].join(" "));

        start = if end < words.len() {
            // always advance, even with a degenerate overlap
            end.saturating_sub(config.overlap).max(start + 1)
        } else {
            words.len()
        };
    }

    debug!(
        "Chunked {} words into {} windows (size {}, overlap {})",
        words.len(),
        chunks.len(),
        chunk_size,
        config.overlap
    );

    chunks
}

/// Normalize and chunk a batch of documents, numbering chunks `c0..cN`
/// across the whole batch in document order
#[inline]
pub fn chunk_documents<'a, I>(documents: I, config: &ChunkingConfig) -> Vec<KnowledgeChunk>
where
    I: IntoIterator<Item = &'a str>,
{
    documents
        .into_iter()
        .flat_map(|document| chunk_words(&normalize_whitespace(document), config))
        .enumerate()
        .map(|(index, content)| KnowledgeChunk {
            id: format!("c{index}"),
            content,
        })
        .collect()
}

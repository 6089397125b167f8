// LanceDB vector database module
// Persistent vector storage for the curated corpus and the knowledge base


pub mod vector_store;

pub use vector_store::LanceIndex;

/// Table holding the curated Q/A corpus embeddings
pub const DATASET_TABLE: &str = "curated_samples";

/// Table holding knowledge chunk embeddings
pub const KNOWLEDGE_TABLE: &str = "knowledge_chunks";

/// Name of `base` scoped to one embedding model.
///
/// Vectors from different models never share a table, so changing the
/// configured model starts from an empty index instead of a stale one.
#[inline]
pub fn model_table(base: &str, model_id: &str) -> String {
    let suffix: String = model_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("{base}__{suffix}")
}

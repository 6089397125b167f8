// Database module
// Vector search capability shared by the dataset matcher and the knowledge retriever

pub mod lancedb;
pub mod memory;

use async_trait::async_trait;

pub use self::lancedb::LanceIndex;
pub use self::memory::MemoryIndex;

/// A single nearest-neighbour result
#[derive(Debug, Clone, PartialEq)]
pub struct IndexHit {
    /// Id the entry was stored under
    pub id: String,
    /// Cosine distance to the query vector (0.0 = identical direction)
    pub distance: f32,
    /// Document text stored alongside the vector
    pub document: String,
}

/// Nearest-neighbour search over stored vectors.
///
/// Methods take `&self` so one index can be shared behind an `Arc` between
/// concurrent requests; implementations synchronize writes internally.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Insert or replace entries. The three slices must have equal length.
    async fn upsert(
        &self,
        ids: &[String],
        vectors: &[Vec<f32>],
        documents: &[String],
    ) -> crate::Result<()>;

    /// Up to `k` entries ranked by ascending cosine distance
    async fn query(&self, vector: &[f32], k: usize) -> crate::Result<Vec<IndexHit>>;

    /// Number of stored entries; an index that was never written counts as empty
    async fn count(&self) -> crate::Result<usize>;

    /// Remove every entry
    async fn clear(&self) -> crate::Result<()>;
}

fn check_upsert_lengths(
    ids: &[String],
    vectors: &[Vec<f32>],
    documents: &[String],
) -> crate::Result<()> {
    if ids.len() != vectors.len() || ids.len() != documents.len() {
        return Err(crate::AssistError::Index(format!(
            "Mismatched upsert lengths: {} ids, {} vectors, {} documents",
            ids.len(),
            vectors.len(),
            documents.len()
        )));
    }
    Ok(())
}


use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use super::{IndexHit, VectorIndex, check_upsert_lengths};
use crate::AssistError;

#[derive(Debug, Clone)]
struct Entry {
    id: String,
    vector: Vec<f32>,
    document: String,
}

/// Brute-force in-memory index using cosine distance.
///
/// Ties keep insertion order, so results are reproducible for a fixed set of
/// upserts.
#[derive(Debug, Default)]
pub struct MemoryIndex {
    entries: RwLock<Vec<Entry>>,
}

impl MemoryIndex {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }
}

/// `1 - cosine_similarity(a, b)`; a zero vector is treated as orthogonal to everything
#[inline]
pub fn cosine_distance(a: &[f32], b: &[f32]) -> crate::Result<f32> {
    if a.len() != b.len() {
        return Err(AssistError::Index(format!(
            "Vector dimension mismatch: {} vs {}",
            a.len(),
            b.len()
        )));
    }

    let (dot, norm_a, norm_b) = a.iter().zip(b).fold(
        (0.0_f32, 0.0_f32, 0.0_f32),
        |(dot, na, nb), (x, y)| (x.mul_add(*y, dot), x.mul_add(*x, na), y.mul_add(*y, nb)),
    );

    if norm_a == 0.0 || norm_b == 0.0 {
        return Ok(1.0);
    }

    Ok(1.0 - dot / (norm_a.sqrt() * norm_b.sqrt()))
}

#[async_trait]
impl VectorIndex for MemoryIndex {
    async fn upsert(
        &self,
        ids: &[String],
        vectors: &[Vec<f32>],
        documents: &[String],
    ) -> crate::Result<()> {
        check_upsert_lengths(ids, vectors, documents)?;

        let mut entries = self.entries.write().await;
        for ((id, vector), document) in ids.iter().zip(vectors).zip(documents) {
            let entry = Entry {
                id: id.clone(),
                vector: vector.clone(),
                document: document.clone(),
            };
            match entries.iter_mut().find(|existing| existing.id == *id) {
                Some(existing) => *existing = entry,
                None => entries.push(entry),
            }
        }

        debug!("Memory index now holds {} entries", entries.len());
        Ok(())
    }

    async fn query(&self, vector: &[f32], k: usize) -> crate::Result<Vec<IndexHit>> {
        let entries = self.entries.read().await;

        let mut hits = entries
            .iter()
            .map(|entry| {
                cosine_distance(vector, &entry.vector).map(|distance| IndexHit {
                    id: entry.id.clone(),
                    distance,
                    document: entry.document.clone(),
                })
            })
            .collect::<crate::Result<Vec<_>>>()?;

        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        hits.truncate(k);
        Ok(hits)
    }

    async fn count(&self) -> crate::Result<usize> {
        Ok(self.entries.read().await.len())
    }

    async fn clear(&self) -> crate::Result<()> {
        self.entries.write().await.clear();
        Ok(())
    }
}

// Retrieval module
// Tier 3 support: fetch knowledge chunks that ground a generated answer

#[cfg(test)]
mod tests;

use itertools::Itertools;
use std::sync::Arc;
use tracing::{debug, error, warn};

use crate::database::VectorIndex;
use crate::embeddings::{Embedder, embed_one};

/// Nearest-chunk lookup over the knowledge index.
///
/// An empty string means "no grounding available"; callers fall back to
/// ungrounded generation.
pub struct ContextRetriever {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
    top_k: usize,
}

impl ContextRetriever {
    #[inline]
    pub fn new(embedder: Arc<dyn Embedder>, index: Arc<dyn VectorIndex>, top_k: usize) -> Self {
        Self {
            embedder,
            index,
            top_k,
        }
    }

    /// Up to `top_k` chunk texts, closest first, joined by blank lines
    #[inline]
    pub async fn retrieve(&self, query: &str) -> String {
        let query = query.trim();
        if query.is_empty() {
            return String::new();
        }

        let available = match self.index.count().await {
            Ok(count) => count,
            Err(e) => {
                warn!("Knowledge index unavailable: {}", e);
                return String::new();
            }
        };

        let n = self.top_k.min(available);
        if n == 0 {
            warn!("Knowledge index is empty; run `banking-assist ingest` to populate it");
            return String::new();
        }

        match self.fetch(query, n).await {
            Ok(context) => context,
            Err(e) => {
                error!("Context retrieval failed: {}", e);
                String::new()
            }
        }
    }

    async fn fetch(&self, query: &str, n: usize) -> crate::Result<String> {
        let vector = embed_one(self.embedder.as_ref(), query).await?;
        let hits = self.index.query(&vector, n).await?;
        debug!(requested = n, returned = hits.len(), "Retrieved knowledge chunks");

        Ok(hits.iter().map(|hit| hit.document.as_str()).join("\n\n"))
    }
}

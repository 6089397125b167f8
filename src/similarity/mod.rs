// Similarity module
// Tier 1: answer straight from the curated corpus when a query is close enough


use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{Mutex, OnceCell};
use tracing::{debug, error, info, warn};

use crate::AssistError;
use crate::dataset::{CuratedSample, load_samples, validate_samples};
use crate::database::VectorIndex;
use crate::embeddings::{Embedder, embed_one};

/// Result of a Tier 1 lookup.
///
/// `answer` is set only when the best similarity reached the threshold;
/// `score` is the best similarity seen, if the lookup got that far.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatchOutcome {
    pub answer: Option<String>,
    pub score: Option<f32>,
}

/// Embedding similarity lookup over the curated corpus.
///
/// The corpus is loaded on first use; a failed load is retried by the next
/// query. A corpus with a blank instruction or output is refused as a whole.
/// The index is valid while its row count equals the corpus size and is
/// rebuilt from scratch otherwise.
pub struct DatasetMatcher {
    source: CorpusSource,
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
    threshold: f32,
    top_k: usize,
    samples: OnceCell<Arc<Vec<CuratedSample>>>,
    build_lock: Mutex<()>,
}

enum CorpusSource {
    File(PathBuf),
    Preloaded,
    Rejected(String),
}

impl DatasetMatcher {
    #[inline]
    pub fn new(
        dataset_path: impl Into<PathBuf>,
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn VectorIndex>,
        threshold: f32,
        top_k: usize,
    ) -> Self {
        Self {
            source: CorpusSource::File(dataset_path.into()),
            embedder,
            index,
            threshold,
            top_k: top_k.max(1),
            samples: OnceCell::new(),
            build_lock: Mutex::new(()),
        }
    }

    /// Matcher over an already loaded corpus
    #[inline]
    pub fn from_samples(
        samples: Vec<CuratedSample>,
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn VectorIndex>,
        threshold: f32,
        top_k: usize,
    ) -> Self {
        let (source, samples) = match validate_samples(&samples, 1) {
            Ok(_) => (
                CorpusSource::Preloaded,
                OnceCell::new_with(Some(Arc::new(samples))),
            ),
            Err(e) => {
                warn!("Refusing curated corpus: {}", e);
                (CorpusSource::Rejected(e.to_string()), OnceCell::new())
            }
        };

        Self {
            source,
            embedder,
            index,
            threshold,
            top_k: top_k.max(1),
            samples,
            build_lock: Mutex::new(()),
        }
    }

    /// Look up `text`; never fails, problems are logged and read as no match
    #[inline]
    pub async fn query(&self, text: &str) -> MatchOutcome {
        let text = text.trim();
        if text.is_empty() {
            return MatchOutcome::default();
        }

        match self.try_query(text).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("Similarity lookup failed: {}", e);
                MatchOutcome::default()
            }
        }
    }

    /// Load the corpus and build the index if it is missing or stale.
    /// Returns the number of indexed samples.
    #[inline]
    pub async fn ensure_index(&self) -> crate::Result<usize> {
        let samples = self.samples().await?;
        self.ensure_index_for(&samples).await
    }

    async fn try_query(&self, text: &str) -> crate::Result<MatchOutcome> {
        let samples = self.samples().await?;
        self.ensure_index_for(&samples).await?;

        let vector = embed_one(self.embedder.as_ref(), text).await?;
        let k = self.top_k.min(samples.len());
        let hits = self.index.query(&vector, k).await?;

        let Some(best) = hits.first() else {
            debug!("Similarity index returned no hits");
            return Ok(MatchOutcome::default());
        };

        let similarity = (1.0 - best.distance).max(0.0);
        let position: usize = best
            .id
            .parse()
            .map_err(|_| AssistError::Index(format!("Unexpected sample id: {}", best.id)))?;
        let sample = samples.get(position).ok_or_else(|| {
            AssistError::Index(format!("Sample id {} is outside the corpus", position))
        })?;

        if similarity >= self.threshold {
            info!(similarity, "Tier 1 match");
            Ok(MatchOutcome {
                answer: Some(sample.output.clone()),
                score: Some(similarity),
            })
        } else {
            info!(
                similarity,
                threshold = self.threshold,
                "Tier 1 near miss"
            );
            Ok(MatchOutcome {
                answer: None,
                score: Some(similarity),
            })
        }
    }

    async fn samples(&self) -> crate::Result<Arc<Vec<CuratedSample>>> {
        self.samples
            .get_or_try_init(|| async {
                let path = match &self.source {
                    CorpusSource::File(path) => path,
                    CorpusSource::Rejected(reason) => {
                        return Err(AssistError::Dataset(reason.clone()));
                    }
                    CorpusSource::Preloaded => {
                        return Err(AssistError::Dataset("Corpus was not loaded".to_string()));
                    }
                };
                let samples = load_samples(path)?;
                validate_samples(&samples, 1)?;
                Ok(Arc::new(samples))
            })
            .await
            .cloned()
    }

    async fn ensure_index_for(&self, samples: &[CuratedSample]) -> crate::Result<usize> {
        let expected = samples.len();
        if self.index.count().await? == expected {
            return Ok(expected);
        }

        let _guard = self.build_lock.lock().await;

        // Another request may have rebuilt while we waited
        let stored = self.index.count().await?;
        if stored == expected {
            return Ok(expected);
        }

        info!(
            stored,
            expected,
            model = self.embedder.model_id(),
            "Rebuilding similarity index"
        );

        self.index.clear().await?;

        let texts: Vec<String> = samples.iter().map(CuratedSample::embedding_text).collect();
        let vectors = self.embedder.embed(&texts).await?;
        if vectors.len() != texts.len() {
            return Err(AssistError::Embedding(format!(
                "Expected {} embeddings, got {}",
                texts.len(),
                vectors.len()
            )));
        }

        let ids: Vec<String> = (0..expected).map(|i| i.to_string()).collect();
        self.index.upsert(&ids, &vectors, &texts).await?;

        info!("Built similarity index with {} vectors", expected);
        Ok(expected)
    }
}

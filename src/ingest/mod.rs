// Ingest module
// Builds the knowledge index from a directory of markdown documents


use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::AssistError;
use crate::database::VectorIndex;
use crate::embeddings::chunking::{ChunkingConfig, KnowledgeChunk, chunk_documents};
use crate::embeddings::Embedder;

const DEFAULT_EMBED_BATCH: usize = 32;

/// What an ingest run stored
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub files: usize,
    pub chunks: usize,
}

/// Replaces the contents of the knowledge index with chunks of every
/// `*.md` file under a directory
pub struct KnowledgeIngestor {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
    chunking: ChunkingConfig,
    batch_size: usize,
}

impl KnowledgeIngestor {
    #[inline]
    pub fn new(
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn VectorIndex>,
        chunking: ChunkingConfig,
    ) -> Self {
        Self {
            embedder,
            index,
            chunking,
            batch_size: DEFAULT_EMBED_BATCH,
        }
    }

    #[inline]
    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Clear the index, then chunk, embed and store every markdown file
    /// under `dir`
    #[inline]
    pub async fn ingest(&self, dir: &Path) -> crate::Result<IngestReport> {
        if self.chunking.overlap >= self.chunking.chunk_size {
            return Err(AssistError::Config(format!(
                "Chunk overlap {} must be smaller than chunk size {}",
                self.chunking.overlap, self.chunking.chunk_size
            )));
        }

        self.index.clear().await?;

        let files = markdown_files(dir)?;
        if files.is_empty() {
            warn!("No .md files found under {}", dir.display());
            return Ok(IngestReport::default());
        }

        let mut documents = Vec::with_capacity(files.len());
        for path in &files {
            debug!("Reading {}", path.display());
            documents.push(std::fs::read_to_string(path)?);
        }

        let chunks = chunk_documents(documents.iter().map(String::as_str), &self.chunking);
        if chunks.is_empty() {
            warn!("Markdown files under {} contain no text", dir.display());
            return Ok(IngestReport {
                files: files.len(),
                chunks: 0,
            });
        }

        self.store(&chunks).await?;

        info!(
            "Ingested {} chunks from {} files into the knowledge index",
            chunks.len(),
            files.len()
        );
        Ok(IngestReport {
            files: files.len(),
            chunks: chunks.len(),
        })
    }

    async fn store(&self, chunks: &[KnowledgeChunk]) -> crate::Result<()> {
        let bar = if console::user_attended_stderr() {
            ProgressBar::new(chunks.len() as u64).with_style(
                ProgressStyle::with_template("{bar:40} [{pos}/{len}] Embedding {msg}")
                    .map_err(|e| AssistError::Other(e.into()))?,
            )
        } else {
            ProgressBar::hidden()
        };

        for batch in chunks.chunks(self.batch_size) {
            let ids: Vec<String> = batch.iter().map(|c| c.id.clone()).collect();
            let texts: Vec<String> = batch.iter().map(|c| c.content.clone()).collect();

            let vectors = self.embedder.embed(&texts).await?;
            if vectors.len() != texts.len() {
                bar.abandon();
                return Err(AssistError::Embedding(format!(
                    "Expected {} embeddings, got {}",
                    texts.len(),
                    vectors.len()
                )));
            }

            self.index.upsert(&ids, &vectors, &texts).await?;
            bar.inc(batch.len() as u64);
        }

        bar.finish_and_clear();
        Ok(())
    }
}

/// Every `*.md` file below `dir`, in sorted path order. A missing directory
/// has no files.
#[inline]
pub fn markdown_files(dir: &Path) -> crate::Result<Vec<PathBuf>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(dir) {
        let entry = entry.map_err(|e| AssistError::Other(e.into()))?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        if path.extension().is_some_and(|ext| ext == "md") {
            files.push(path.to_path_buf());
        }
    }

    files.sort();
    Ok(files)
}

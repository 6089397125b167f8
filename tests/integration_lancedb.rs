#![expect(
    clippy::tests_outside_test_module,
    reason = "integration tests are only compiled in test mode"
)]

// LanceDB-backed indexes used through the same pipeline as production

mod common;

use banking_assist::dataset::CuratedSample;
use banking_assist::database::lancedb::{DATASET_TABLE, KNOWLEDGE_TABLE, model_table};
use banking_assist::database::{LanceIndex, VectorIndex};
use banking_assist::embeddings::ChunkingConfig;
use banking_assist::ingest::KnowledgeIngestor;
use banking_assist::similarity::DatasetMatcher;
use common::KeywordEmbedder;
use std::sync::Arc;
use tempfile::TempDir;

fn corpus() -> Vec<CuratedSample> {
    vec![
        CuratedSample::new("How is EMI calculated?", "From principal, rate and tenure."),
        CuratedSample::new("How do I update my KYC details?", "Visit any branch."),
        CuratedSample::new("What is NEFT?", "An electronic funds transfer system.")
            .with_input("payments"),
    ]
}

#[tokio::test]
async fn dataset_index_persists_across_instances() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let db_path = temp_dir.path().join("vectors");

    let embedder = Arc::new(KeywordEmbedder::default());
    let first = DatasetMatcher::from_samples(
        corpus(),
        embedder.clone(),
        Arc::new(LanceIndex::new(&db_path, DATASET_TABLE)),
        0.88,
        1,
    );
    assert_eq!(first.ensure_index().await.expect("should build index"), 3);
    assert_eq!(embedder.batch_calls(), 1);

    // A fresh process over the same directory reuses the stored vectors
    let second = DatasetMatcher::from_samples(
        corpus(),
        embedder.clone(),
        Arc::new(LanceIndex::new(&db_path, DATASET_TABLE)),
        0.88,
        1,
    );
    let outcome = second.query("How is EMI calculated?").await;

    assert_eq!(outcome.answer.as_deref(), Some("From principal, rate and tenure."));
    let score = outcome.score.expect("should report a score");
    assert!(score > 0.999, "exact question should score ~1.0, got {score}");
    assert_eq!(embedder.batch_calls(), 1);
}

#[tokio::test]
async fn growing_corpus_rebuilds_index() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let db_path = temp_dir.path().join("vectors");
    let embedder = Arc::new(KeywordEmbedder::default());

    let small = DatasetMatcher::from_samples(
        corpus()[..2].to_vec(),
        embedder.clone(),
        Arc::new(LanceIndex::new(&db_path, DATASET_TABLE)),
        0.88,
        1,
    );
    assert_eq!(small.ensure_index().await.expect("should build index"), 2);

    let index = Arc::new(LanceIndex::new(&db_path, DATASET_TABLE));
    let full = DatasetMatcher::from_samples(corpus(), embedder.clone(), index.clone(), 0.88, 1);
    let outcome = full.query("What is NEFT? payments").await;

    assert_eq!(
        outcome.answer.as_deref(),
        Some("An electronic funds transfer system.")
    );
    assert_eq!(index.count().await.expect("should count"), 3);
    assert_eq!(embedder.batch_calls(), 2);
}

#[tokio::test]
async fn knowledge_ingest_and_search() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let knowledge = temp_dir.path().join("knowledge");
    std::fs::create_dir_all(knowledge.join("loans")).expect("should create knowledge dir");
    std::fs::write(
        knowledge.join("loans/prepayment.md"),
        "Prepayment penalty on fixed rate loans is two percent.",
    )
    .expect("should write doc");
    std::fs::write(
        knowledge.join("cards.md"),
        "Credit card statements are generated monthly.",
    )
    .expect("should write doc");

    let index = Arc::new(LanceIndex::new(
        temp_dir.path().join("vectors"),
        KNOWLEDGE_TABLE,
    ));
    let report = KnowledgeIngestor::new(
        Arc::new(KeywordEmbedder::default()),
        index.clone(),
        ChunkingConfig::default(),
    )
    .ingest(&knowledge)
    .await
    .expect("should ingest");

    assert_eq!(report.files, 2);
    assert_eq!(report.chunks, 2);

    let hits = index
        .query(&KeywordEmbedder::vector("prepayment penalty"), 2)
        .await
        .expect("should search");

    assert_eq!(hits.len(), 2);
    // cards.md sorts before loans/prepayment.md
    assert_eq!(hits[0].id, "c1");
    assert_eq!(
        hits[0].document,
        "Prepayment penalty on fixed rate loans is two percent."
    );
    assert!(hits[0].distance < hits[1].distance);
}

#[tokio::test]
async fn query_on_missing_table_is_an_error() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let index = LanceIndex::new(temp_dir.path().join("vectors"), KNOWLEDGE_TABLE);

    assert_eq!(index.count().await.expect("should count"), 0);
    assert!(index.query(&[1.0, 0.0], 1).await.is_err());
}

#[tokio::test]
async fn switching_embedding_model_rebuilds_into_its_own_table() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let db_path = temp_dir.path().join("vectors");
    let embedder = Arc::new(KeywordEmbedder::default());

    let old_table = model_table(DATASET_TABLE, "all-minilm:latest");
    let new_table = model_table(DATASET_TABLE, "nomic-embed-text:latest");

    let old = DatasetMatcher::from_samples(
        corpus(),
        embedder.clone(),
        Arc::new(LanceIndex::new(&db_path, old_table.as_str())),
        0.88,
        1,
    );
    assert_eq!(old.ensure_index().await.expect("should build index"), 3);

    // Same corpus size, different model: the old vectors must not count as fresh
    let new_index = Arc::new(LanceIndex::new(&db_path, new_table.as_str()));
    assert_eq!(new_index.count().await.expect("should count"), 0);

    let new = DatasetMatcher::from_samples(corpus(), embedder.clone(), new_index.clone(), 0.88, 1);
    assert_eq!(new.ensure_index().await.expect("should build index"), 3);
    assert_eq!(embedder.batch_calls(), 2);

    let old_index = LanceIndex::new(&db_path, old_table.as_str());
    assert_eq!(old_index.count().await.expect("should count"), 3);
}

use super::*;
use crate::database::MemoryIndex;
use crate::test_support::{BrokenIndex, KeywordEmbedder};

async fn knowledge_index(chunks: &[&str]) -> Arc<MemoryIndex> {
    let index = Arc::new(MemoryIndex::new());
    let ids: Vec<String> = (0..chunks.len()).map(|i| format!("c{i}")).collect();
    let documents: Vec<String> = chunks.iter().map(ToString::to_string).collect();
    let vectors: Vec<Vec<f32>> = documents.iter().map(|d| KeywordEmbedder::vector(d)).collect();
    index
        .upsert(&ids, &vectors, &documents)
        .await
        .expect("should store chunks");
    index
}

#[tokio::test]
async fn joins_closest_chunks_in_relevance_order() {
    let index = knowledge_index(&[
        "savings account opening needs KYC",
        "prepayment penalty is two percent of outstanding principal",
        "penalty waived after five years",
    ])
    .await;
    let retriever = ContextRetriever::new(Arc::new(KeywordEmbedder::default()), index, 2);

    let context = retriever
        .retrieve("prepayment penalty on outstanding principal")
        .await;

    assert_eq!(
        context,
        "prepayment penalty is two percent of outstanding principal\n\npenalty waived after five years"
    );
}

#[tokio::test]
async fn top_k_is_capped_by_index_size() {
    let index = knowledge_index(&["only chunk about penalty"]).await;
    let retriever = ContextRetriever::new(Arc::new(KeywordEmbedder::default()), index, 3);

    assert_eq!(retriever.retrieve("penalty").await, "only chunk about penalty");
}

#[tokio::test]
async fn empty_index_gives_no_context() {
    let embedder = Arc::new(KeywordEmbedder::default());
    let retriever = ContextRetriever::new(embedder.clone(), Arc::new(MemoryIndex::new()), 3);

    assert_eq!(retriever.retrieve("penalty").await, "");
    assert_eq!(embedder.calls.load(std::sync::atomic::Ordering::SeqCst), 0);
}

#[tokio::test]
async fn blank_query_gives_no_context() {
    let index = knowledge_index(&["penalty chunk"]).await;
    let retriever = ContextRetriever::new(Arc::new(KeywordEmbedder::default()), index, 3);

    assert_eq!(retriever.retrieve(" \t ").await, "");
}

#[tokio::test]
async fn broken_index_gives_no_context() {
    let retriever =
        ContextRetriever::new(Arc::new(KeywordEmbedder::default()), Arc::new(BrokenIndex), 3);

    assert_eq!(retriever.retrieve("penalty").await, "");
}

use knowledge_chat::services::embedding_provider::{
    EmbeddingProvider, MockProvider, OpenAiEmbeddingProvider, ProviderError,
};
use knowledge_chat::services::EmbeddingService;
use serde_json::json;
use std::sync::Arc;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn openai(server: &MockServer) -> OpenAiEmbeddingProvider {
    OpenAiEmbeddingProvider::new(
        reqwest::Client::new(),
        server.uri(),
        "sk-test".into(),
        "text-embedding-ada-002".into(),
    )
}

#[tokio::test]
async fn test_openai_embedding() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/embeddings"))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_partial_json(json!({ "model": "text-embedding-ada-002", "input": "hello" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{ "embedding": [0.1, 0.2, 0.3], "index": 0 }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let embedding = openai(&server).generate_embedding("hello").await.unwrap();
    assert_eq!(embedding, vec![0.1, 0.2, 0.3]);
}

#[tokio::test]
async fn test_openai_empty_data_is_no_embeddings() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/embeddings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": [] })))
        .mount(&server)
        .await;

    let err = openai(&server).generate_embedding("hello").await.unwrap_err();
    assert!(matches!(err, ProviderError::NoEmbeddings));
}

#[tokio::test]
async fn test_openai_api_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/embeddings"))
        .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
        .mount(&server)
        .await;

    let err = openai(&server).generate_embedding("hello").await.unwrap_err();
    assert!(matches!(err, ProviderError::Api { status: 401, .. }));
}

#[tokio::test]
async fn test_service_counts_provider_calls() {
    let provider = Arc::new(MockProvider::new_success(vec![0.5; 4]));
    let service = EmbeddingService::new(provider.clone());

    let texts = vec!["a".to_string(), "b".to_string(), "c".to_string()];
    let batch = service.generate_embeddings_batch(&texts, 2).await.unwrap();

    assert_eq!(batch.len(), 3);
    assert_eq!(provider.calls(), 3);
}

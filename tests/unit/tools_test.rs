use knowledge_chat::models::document::{META_FILE_ID, META_USER_ID};
use knowledge_chat::models::VectorRecord;
use knowledge_chat::services::embedding_provider::MockProvider;
use knowledge_chat::services::knowledge_ingestion::parse_webhook;
use knowledge_chat::services::weather_client::WeatherClient;
use knowledge_chat::services::{EmbeddingService, KnowledgeIngestor};
use knowledge_chat::storage::{InMemoryVectorStore, VectorStore};
use knowledge_chat::tools::document_qa::DocumentQaTool;
use knowledge_chat::tools::knowledge_search::{KnowledgeSearcher, SlackSearchTool};
use knowledge_chat::tools::weather::WeatherTool;
use knowledge_chat::tools::{DynTool, ToolContext};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn ctx(user: &str) -> ToolContext {
    ToolContext {
        user_id: user.into(),
        file_id: None,
    }
}

fn embeddings() -> Arc<EmbeddingService> {
    Arc::new(EmbeddingService::new(Arc::new(MockProvider::new_success(vec![1.0, 0.0, 0.0]))))
}

fn chunk(id: &str, file_id: &str, user_id: &str, text: &str) -> VectorRecord {
    let mut metadata = Map::new();
    metadata.insert(META_FILE_ID.into(), json!(file_id));
    metadata.insert(META_USER_ID.into(), json!(user_id));
    metadata.insert("chunkIndex".into(), json!(0));
    VectorRecord {
        id: id.into(),
        embedding: vec![1.0, 0.0, 0.0],
        document: text.into(),
        metadata,
    }
}

#[tokio::test]
async fn test_weather_tool_wraps_report() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/weather"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "Oslo",
            "sys": { "country": "NO" },
            "main": { "temp": 3.2, "feels_like": 0.1, "temp_min": 2.0, "temp_max": 4.0, "humidity": 80 },
            "weather": [{ "main": "Snow", "description": "light snow" }],
            "wind": { "speed": 5.0 }
        })))
        .mount(&server)
        .await;

    let tool = WeatherTool::new(WeatherClient::new(
        reqwest::Client::new(),
        server.uri(),
        Some("key".into()),
        "metric".into(),
    ));

    let result = tool.invoke(json!({ "city": "Oslo" }), &ctx("u")).await;
    assert!(result.success);
    let data = result.data.unwrap();
    assert_eq!(data["temperature"]["current"], 3);
    assert_eq!(data["location"]["name"], "Oslo");
    assert_eq!(result.metadata["city"], "Oslo");
    assert!(result.metadata.contains_key("timestamp"));
}

#[tokio::test]
async fn test_weather_tool_failure_is_in_band() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let tool = WeatherTool::new(WeatherClient::new(
        reqwest::Client::new(),
        server.uri(),
        Some("key".into()),
        "metric".into(),
    ));

    let result = tool.invoke(json!({ "city": "Nowhere" }), &ctx("u")).await;
    assert!(!result.success);
    assert!(result.error.unwrap().contains("Nowhere"));

    let missing = tool.invoke(json!({}), &ctx("u")).await;
    assert!(!missing.success);
}

#[tokio::test]
async fn test_document_qa_only_sees_the_callers_chunks() {
    let store = Arc::new(InMemoryVectorStore::new());
    store
        .upsert(vec![
            chunk("f1-chunk-0", "f1", "alice", "Alice's quarterly numbers"),
            chunk("f1-chunk-x", "f1", "mallory", "Planted text"),
        ])
        .await
        .unwrap();

    let tool = DocumentQaTool::new(embeddings(), store);

    let alice = tool
        .invoke(json!({ "query": "numbers", "fileId": "f1" }), &ctx("alice"))
        .await;
    let results = alice.data.unwrap()["results"].as_array().unwrap().clone();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["content"], "Alice's quarterly numbers");

    let bob = tool
        .invoke(json!({ "query": "numbers", "fileId": "f1" }), &ctx("bob"))
        .await;
    let data = bob.data.unwrap();
    assert_eq!(data["results"], json!([]));
    assert_eq!(data["message"], "No relevant content found in this document.");
}

#[tokio::test]
async fn test_document_qa_rejects_out_of_range_max_results() {
    let tool = DocumentQaTool::new(embeddings(), Arc::new(InMemoryVectorStore::new()));
    let result = tool
        .invoke(json!({ "query": "q", "fileId": "f1", "maxResults": 50 }), &ctx("alice"))
        .await;
    assert!(!result.success);
    assert!(result.error.unwrap().starts_with("Invalid arguments"));
}

#[tokio::test]
async fn test_slack_search_finds_ingested_messages() {
    let store: Arc<InMemoryVectorStore> = Arc::new(InMemoryVectorStore::new());
    let ingestor = KnowledgeIngestor::new(embeddings(), store.clone());

    let items = parse_webhook(
        "Slack",
        Some(&json!({ "text": "We ship on Friday", "user": "maria", "ts": "1700000000.0001" })),
    )
    .unwrap();
    let report = ingestor.ingest(items).await.unwrap();
    assert_eq!(report.stored.len(), 1);
    assert!(report.stored[0].starts_with("slack-knowledge-chatbot-"));

    let tool = SlackSearchTool::new(KnowledgeSearcher::new(embeddings(), store));
    let result = tool.invoke(json!({ "query": "release date" }), &ctx("u")).await;
    let summary = result.data.unwrap()["summary"].as_str().unwrap().to_string();
    assert!(summary.contains("maria: We ship on Friday"));
    assert_eq!(result.metadata["resultCount"], Value::from(1));
}

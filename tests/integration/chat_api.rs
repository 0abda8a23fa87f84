use super::{json, json_request, ScriptedModel, TestApp};
use axum::http::StatusCode;
use knowledge_chat::models::{Message, ToolCall};
use knowledge_chat::orchestrator::router::UNSUPPORTED_MESSAGE;

// ============================================
// Chat API Tests
// ============================================

#[tokio::test]
async fn test_blank_message_is_rejected() {
    let app = TestApp::open(ScriptedModel::answering("unused"));

    for body in [json!({ "message": "   " }), json!({})] {
        let res = app.send(json_request("POST", "/api/chat", body, None)).await;
        assert_eq!(res.status, StatusCode::BAD_REQUEST);
        assert_eq!(res.body["success"], false);
        assert_eq!(res.body["error"], "Message is required and must be a non-empty string");
    }
}

#[tokio::test]
async fn test_oversized_message_is_rejected() {
    let app = TestApp::open(ScriptedModel::answering("unused"));
    let res = app
        .send(json_request("POST", "/api/chat", json!({ "message": "a".repeat(1001) }), None))
        .await;

    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.body["error"], "Message must be 1000 characters or less");
}

#[tokio::test]
async fn test_malformed_json_is_a_bad_request() {
    let app = TestApp::open(ScriptedModel::answering("unused"));
    let request = axum::http::Request::builder()
        .method("POST")
        .uri("/api/chat")
        .header("content-type", "application/json")
        .body(axum::body::Body::from("{not json"))
        .unwrap();

    let res = app.send(request).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.body["success"], false);
}

#[tokio::test]
async fn test_unsupported_query_gets_fixed_reply_and_new_conversation() {
    let app = TestApp::open(ScriptedModel::answering("should not be used"));
    let res = app
        .send(json_request("POST", "/api/chat", json!({ "message": "Hello" }), None))
        .await;

    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["success"], true);
    assert_eq!(res.body["data"]["message"], UNSUPPORTED_MESSAGE);
    assert_eq!(res.body["data"]["user"]["id"], "anonymous");
    let conversation_id = res.body["data"]["metadata"]["conversationId"].as_str().unwrap();
    assert_eq!(conversation_id.len(), 36);
    assert!(res.body["data"].get("toolsUsed").is_none());
}

#[tokio::test]
async fn test_conversation_id_is_echoed() {
    let app = TestApp::open(ScriptedModel::answering("unused"));
    let res = app
        .send(json_request(
            "POST",
            "/api/chat",
            json!({ "message": "Hello", "conversationId": "conv-123" }),
            None,
        ))
        .await;

    assert_eq!(res.body["data"]["metadata"]["conversationId"], "conv-123");
}

#[tokio::test]
async fn test_weather_query_runs_weather_tool() {
    let model = ScriptedModel::new(
        vec![Message::ai_with_tool_calls(
            "",
            vec![ToolCall {
                id: "call_1".into(),
                name: "weatherLookup".into(),
                arguments: json!({ "city": "Paris" }),
            }],
        )],
        Message::ai("I could not reach the weather service."),
    );
    let app = TestApp::open(model);

    let res = app
        .send(json_request(
            "POST",
            "/api/chat",
            json!({ "message": "What's the weather in Paris?" }),
            None,
        ))
        .await;

    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["data"]["message"], "I could not reach the weather service.");
    assert_eq!(res.body["data"]["toolsUsed"], json!(["weatherLookup"]));
}

#[tokio::test]
async fn test_document_query_echoes_file_id() {
    let app = TestApp::open(ScriptedModel::answering("The document is about rust."));
    let res = app
        .send(json_request(
            "POST",
            "/api/chat",
            json!({ "message": "What is this about?", "fileId": "file-1" }),
            None,
        ))
        .await;

    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["data"]["message"], "The document is about rust.");
    assert_eq!(res.body["data"]["metadata"]["fileId"], "file-1");
}

#[tokio::test]
async fn test_tool_loop_hits_recursion_limit() {
    let looping = Message::ai_with_tool_calls(
        "",
        vec![ToolCall {
            id: "again".into(),
            name: "weatherLookup".into(),
            arguments: json!({ "city": "Paris" }),
        }],
    );
    let app = TestApp::open(ScriptedModel::new(Vec::new(), looping));

    let res = app
        .send(json_request("POST", "/api/chat", json!({ "message": "weather forever" }), None))
        .await;

    assert_eq!(res.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(res.body["success"], false);
    assert_eq!(res.body["error"], "Failed to process chat message");
}

#[tokio::test]
async fn test_chat_requires_auth_when_configured() {
    let app = TestApp::new(super::create_test_config(), ScriptedModel::answering("hi"));

    let anonymous = app
        .send(json_request("POST", "/api/chat", json!({ "message": "Hello" }), None))
        .await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);
    assert_eq!(anonymous.body["authenticated"], false);

    let token = app.token_for("user-7", "u7@acme.com");
    let signed_in = app
        .send(json_request("POST", "/api/chat", json!({ "message": "Hello" }), Some(&token)))
        .await;
    assert_eq!(signed_in.status, StatusCode::OK);
    assert_eq!(signed_in.body["data"]["user"]["id"], "user-7");
}

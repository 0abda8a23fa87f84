use knowledge_chat::models::{Message, ToolSchema};
use knowledge_chat::services::llm_client::{ChatModel, GenerationSettings, LlmError, OpenAiChatClient};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer, project: Option<&str>) -> OpenAiChatClient {
    OpenAiChatClient::new(
        reqwest::Client::new(),
        server.uri(),
        "sk-test".into(),
        project.map(str::to_string),
        GenerationSettings {
            model: "gpt-4.1-mini".into(),
            temperature: 0.1,
            max_tokens: 1000,
        },
    )
}

fn weather_schema() -> ToolSchema {
    ToolSchema {
        name: "weatherLookup".into(),
        description: "Current weather".into(),
        parameters: json!({ "type": "object", "properties": { "city": { "type": "string" } } }),
    }
}

#[tokio::test]
async fn test_complete_returns_plain_answer() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .and(header("OpenAI-Project", "proj_1"))
        .and(body_partial_json(json!({ "model": "gpt-4.1-mini", "max_tokens": 1000 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{ "message": { "role": "assistant", "content": "Hi!" } }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let reply = client(&server, Some("proj_1"))
        .complete(&[Message::system("sys"), Message::human("hello")], &[])
        .await
        .unwrap();

    assert_eq!(reply.content, "Hi!");
    assert!(!reply.requests_tools());
}

#[tokio::test]
async fn test_tools_are_advertised_and_calls_parsed() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(json!({
            "tool_choice": "auto",
            "tools": [{ "type": "function", "function": { "name": "weatherLookup" } }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{
                "message": {
                    "content": null,
                    "tool_calls": [{
                        "id": "call_abc",
                        "type": "function",
                        "function": { "name": "weatherLookup", "arguments": "{\"city\":\"Lisbon\"}" }
                    }]
                }
            }]
        })))
        .mount(&server)
        .await;

    let reply = client(&server, None)
        .complete(&[Message::human("weather in Lisbon")], &[weather_schema()])
        .await
        .unwrap();

    assert!(reply.requests_tools());
    assert_eq!(reply.tool_calls[0].id, "call_abc");
    assert_eq!(reply.tool_calls[0].arguments, json!({ "city": "Lisbon" }));
}

#[tokio::test]
async fn test_api_error_status_is_surfaced() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
        .mount(&server)
        .await;

    let err = client(&server, None)
        .complete(&[Message::human("hello")], &[])
        .await
        .unwrap_err();

    match err {
        LlmError::ApiError { status, message } => {
            assert_eq!(status, 429);
            assert_eq!(message, "slow down");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_malformed_tool_call_is_invalid_response() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{
                "message": {
                    "content": null,
                    "tool_calls": [{
                        "type": "function",
                        "function": { "arguments": "{\"city\":\"Oslo\"}" }
                    }]
                }
            }]
        })))
        .mount(&server)
        .await;

    let err = client(&server, None)
        .complete(&[Message::human("weather in Oslo?")], &[weather_schema()])
        .await
        .unwrap_err();

    assert!(matches!(err, LlmError::InvalidResponse(_)), "got {err:?}");
}

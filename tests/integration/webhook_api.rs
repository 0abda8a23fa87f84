use super::{create_test_config, json, ScriptedModel, TestApp, Value, WEBHOOK_KEY};
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use knowledge_chat::Config;

// ============================================
// Webhook API Tests
// ============================================

fn webhook(body: Value, key: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/api/external/webhook")
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(key) = key {
        builder = builder.header("x-api-key", key);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn app() -> TestApp {
    TestApp::new(create_test_config(), ScriptedModel::answering("unused"))
}

#[tokio::test]
async fn test_slack_message_is_stored() {
    let app = app();
    let payload = json!({
        "Source": "Slack",
        "Data": { "text": "Release moved to Friday", "user": "maria", "channel": "eng", "ts": "1767350400.000100" }
    });

    let res = app.send(webhook(payload.clone(), Some(WEBHOOK_KEY))).await;
    assert_eq!(res.status, StatusCode::OK, "body: {}", res.body);
    assert_eq!(res.body["stored"], 1);
    assert_eq!(res.body["failed"], 0);
    let id = res.body["ids"][0].as_str().unwrap().to_string();
    assert!(id.starts_with("slack-eng-"));

    // Redelivery overwrites rather than duplicates
    let again = app.send(webhook(payload, Some(WEBHOOK_KEY))).await;
    assert_eq!(again.body["ids"][0], id.as_str());
}

#[tokio::test]
async fn test_github_push_stores_each_commit() {
    let payload = json!({
        "source": "github",
        "data": {
            "data": [{
                "user": "octocat",
                "commits": [
                    { "id": "a1", "message": "Fix login redirect", "repo": "web", "date": "2026-01-02T10:00:00Z" },
                    { "id": "b2", "message": "Bump deps", "repo": "web", "date": "2026-01-02T11:00:00Z" },
                    { "id": "c3", "repo": "web" }
                ]
            }]
        }
    });

    let res = app().send(webhook(payload, Some(WEBHOOK_KEY))).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["stored"], 2);
}

#[tokio::test]
async fn test_api_key_is_required() {
    let app = app();
    let payload = json!({ "Source": "Slack", "Data": { "text": "hi" } });

    let missing = app.send(webhook(payload.clone(), None)).await;
    assert_eq!(missing.status, StatusCode::UNAUTHORIZED);

    let wrong = app.send(webhook(payload, Some("guess"))).await;
    assert_eq!(wrong.status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong.body["message"], "Invalid API key");
}

#[tokio::test]
async fn test_unconfigured_key_refuses_everything() {
    let config = Config {
        webhook_api_key: None,
        ..create_test_config()
    };
    let app = TestApp::new(config, ScriptedModel::answering("unused"));

    let res = app
        .send(webhook(json!({ "Source": "Slack", "Data": { "text": "hi" } }), Some("anything")))
        .await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_missing_data_and_unknown_source() {
    let app = app();

    let no_data = app
        .send(webhook(json!({ "Source": "Slack" }), Some(WEBHOOK_KEY)))
        .await;
    assert_eq!(no_data.status, StatusCode::BAD_REQUEST);
    assert_eq!(no_data.body["error"], "Data missing");

    let unknown = app
        .send(webhook(json!({ "Source": "Trello", "Data": { "card": 1 } }), Some(WEBHOOK_KEY)))
        .await;
    assert_eq!(unknown.status, StatusCode::BAD_REQUEST);
    assert_eq!(unknown.body["error"], "Unknown webhook source");

    let empty_slack = app
        .send(webhook(json!({ "Source": "Slack", "Data": { "user": "x" } }), Some(WEBHOOK_KEY)))
        .await;
    assert_eq!(empty_slack.status, StatusCode::BAD_REQUEST);
}

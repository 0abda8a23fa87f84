use async_trait::async_trait;
use knowledge_chat::config::RoutingMode;
use knowledge_chat::models::{Message, ToolSchema};
use knowledge_chat::orchestrator::router::{self, UNSUPPORTED_MESSAGE};
use knowledge_chat::orchestrator::{AgentLoop, ChatOrchestrator, ConversationState, SelectedNode};
use knowledge_chat::services::llm_client::{ChatModel, LlmError};
use knowledge_chat::tools::{Tool, ToolContext, ToolError, ToolKind, ToolOutput, ToolRegistry};
use mockall::mock;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use validator::Validate;

mock! {
    pub Model {}

    #[async_trait]
    impl ChatModel for Model {
        async fn complete(&self, messages: &[Message], tools: &[ToolSchema]) -> Result<Message, LlmError>;
    }
}

#[derive(Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
struct DocArgs {
    #[validate(length(min = 1))]
    query: String,
    #[validate(length(min = 1))]
    file_id: String,
}

/// Echoes the owning user so tests can check the tool context.
struct FakeDocumentQa;

#[async_trait]
impl Tool for FakeDocumentQa {
    type Args = DocArgs;
    const KIND: ToolKind = ToolKind::DocumentQa;

    fn description(&self) -> &'static str {
        "Document search"
    }

    fn parameters(&self) -> Value {
        json!({ "type": "object" })
    }

    async fn run(&self, args: DocArgs, ctx: &ToolContext) -> Result<ToolOutput, ToolError> {
        Ok(ToolOutput::new(json!({
            "query": args.query,
            "fileId": args.file_id,
            "owner": ctx.user_id,
        })))
    }
}

fn orchestrator(model: MockModel, mode: RoutingMode) -> ChatOrchestrator {
    let registry = ToolRegistry::builder().register(FakeDocumentQa).build().unwrap();
    ChatOrchestrator::new(AgentLoop::new(Arc::new(model), registry, 5), mode)
}

#[test]
fn test_router_precedence() {
    let doc = router::route(ConversationState::new("c", "what's the weather in this file?", Some("f1".into())));
    assert_eq!(doc.selected_node, SelectedNode::Document);
    assert_eq!(doc.routing_metadata.unwrap().reason, router::REASON_DOCUMENT);

    let weather = router::route(ConversationState::new("c", "Is it RAINING in Oslo?", None));
    assert_eq!(weather.selected_node, SelectedNode::Weather);

    let blank_file = router::route(ConversationState::new("c", "hello", Some("   ".into())));
    assert_eq!(blank_file.selected_node, SelectedNode::Unsupported);
    assert_eq!(
        blank_file.routing_metadata.unwrap().message.as_deref(),
        Some(UNSUPPORTED_MESSAGE)
    );
}

#[tokio::test]
async fn test_unsupported_query_skips_the_model_in_strict_mode() {
    let mut model = MockModel::new();
    model.expect_complete().never();

    let turn = orchestrator(model, RoutingMode::Strict)
        .handle(ConversationState::new("conv-1", "Hello", None), "user-1")
        .await
        .unwrap();

    assert_eq!(turn.selected_node, SelectedNode::Unsupported);
    assert_eq!(turn.answer, UNSUPPORTED_MESSAGE);
    assert!(turn.tools_used.is_empty());
}

#[tokio::test]
async fn test_universal_mode_offers_every_registered_tool() {
    let mut model = MockModel::new();
    model
        .expect_complete()
        .withf(|_, tools| tools.iter().any(|t| t.name == "documentQA"))
        .times(1)
        .returning(|_, _| Ok(Message::ai("General answer")));

    let turn = orchestrator(model, RoutingMode::Universal)
        .handle(ConversationState::new("conv-2", "Hello", None), "user-1")
        .await
        .unwrap();

    assert_eq!(turn.answer, "General answer");
}

#[tokio::test]
async fn test_document_node_prefixes_file_and_scopes_tool_to_user() {
    let mut model = MockModel::new();
    let mut turn = 0;
    model.expect_complete().times(2).returning(move |messages, tools| {
        turn += 1;
        if turn == 1 {
            let human = messages.last().unwrap();
            assert_eq!(human.content, "[Using document: file-9] summarize it");
            assert_eq!(tools.len(), 1);
            return Ok(Message::ai_with_tool_calls(
                "",
                vec![knowledge_chat::models::ToolCall {
                    id: "c1".into(),
                    name: "documentQA".into(),
                    arguments: json!({ "query": "summary", "fileId": "file-9" }),
                }],
            ));
        }
        let payload: Value = serde_json::from_str(&messages.last().unwrap().content).unwrap();
        assert_eq!(payload["data"]["owner"], "user-42");
        Ok(Message::ai("It is a report."))
    });

    let turn = orchestrator(model, RoutingMode::Strict)
        .handle(
            ConversationState::new("conv-3", "summarize it", Some("file-9".into())),
            "user-42",
        )
        .await
        .unwrap();

    assert_eq!(turn.selected_node, SelectedNode::Document);
    assert_eq!(turn.tools_used, vec!["documentQA".to_string()]);
    assert_eq!(turn.conversation_id, "conv-3");
}

#[tokio::test]
async fn test_weather_node_binds_only_weather_lookup() {
    let mut model = MockModel::new();
    // Weather lookup is not registered here, so nothing is offered
    model
        .expect_complete()
        .withf(|_, tools| tools.is_empty())
        .times(1)
        .returning(|_, _| Ok(Message::ai("No weather service.")));

    let orch = orchestrator(model, RoutingMode::Strict);
    assert_eq!(orch.node_tools(SelectedNode::Weather), Some(vec![ToolKind::WeatherLookup]));
    assert_eq!(orch.node_tools(SelectedNode::Unsupported), None);

    let turn = orch
        .handle(ConversationState::new("conv-4", "weather in Rome", None), "user-1")
        .await
        .unwrap();
    assert_eq!(turn.selected_node, SelectedNode::Weather);
}

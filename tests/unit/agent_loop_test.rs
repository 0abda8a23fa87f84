use async_trait::async_trait;
use knowledge_chat::models::{Message, Role, ToolCall, ToolSchema};
use knowledge_chat::orchestrator::{AgentError, AgentLoop, ConversationState};
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
struct CityArgs {
    #[validate(length(min = 1))]
    city: String,
}

struct FakeWeather;

#[async_trait]
impl Tool for FakeWeather {
    type Args = CityArgs;
    const KIND: ToolKind = ToolKind::WeatherLookup;

    fn description(&self) -> &'static str {
        "Current weather"
    }

    fn parameters(&self) -> Value {
        json!({ "type": "object", "properties": { "city": { "type": "string" } } })
    }

    async fn run(&self, args: CityArgs, _ctx: &ToolContext) -> Result<ToolOutput, ToolError> {
        Ok(ToolOutput::new(json!({ "city": args.city, "temperature": 21 })))
    }
}

#[derive(Deserialize, Validate)]
struct QueryArgs {
    #[allow(dead_code)]
    query: String,
}

struct Exploding;

#[async_trait]
impl Tool for Exploding {
    type Args = QueryArgs;
    const KIND: ToolKind = ToolKind::WebSearch;

    fn description(&self) -> &'static str {
        "Always panics"
    }

    fn parameters(&self) -> Value {
        json!({ "type": "object" })
    }

    async fn run(&self, _args: QueryArgs, _ctx: &ToolContext) -> Result<ToolOutput, ToolError> {
        panic!("search backend exploded");
    }
}

fn registry() -> ToolRegistry {
    ToolRegistry::builder()
        .register(FakeWeather)
        .register(Exploding)
        .build()
        .unwrap()
}

fn ctx() -> ToolContext {
    ToolContext {
        user_id: "user-1".into(),
        file_id: None,
    }
}

fn call(id: &str, name: &str, arguments: Value) -> ToolCall {
    ToolCall {
        id: id.into(),
        name: name.into(),
        arguments,
    }
}

fn tool_messages(messages: &[Message]) -> Vec<&Message> {
    messages.iter().filter(|m| m.role == Role::Tool).collect()
}

#[tokio::test]
async fn test_final_answer_without_tools() {
    let mut model = MockModel::new();
    model
        .expect_complete()
        .times(1)
        .returning(|_, _| Ok(Message::ai("Hello there")));

    let agent = AgentLoop::new(Arc::new(model), registry(), 5);
    let run = agent
        .run(
            ConversationState::new("conv-1", "hi", None),
            Message::human("hi"),
            &[ToolKind::WeatherLookup],
            &ctx(),
        )
        .await
        .unwrap();

    assert_eq!(run.answer, "Hello there");
    assert_eq!(run.round_trips, 0);
    assert!(run.tools_used.is_empty());

    let roles: Vec<Role> = run.state.messages.iter().map(|m| m.role).collect();
    assert_eq!(roles, vec![Role::System, Role::Human, Role::Ai]);
}

#[tokio::test]
async fn test_only_bound_tools_are_offered() {
    let mut model = MockModel::new();
    model
        .expect_complete()
        .withf(|_, tools| tools.len() == 1 && tools[0].name == "weatherLookup")
        .times(1)
        .returning(|_, _| Ok(Message::ai("ok")));

    let agent = AgentLoop::new(Arc::new(model), registry(), 5);
    agent
        .run(
            ConversationState::new("conv-1", "weather?", None),
            Message::human("weather?"),
            &[ToolKind::WeatherLookup],
            &ctx(),
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn test_tool_round_trip_then_answer() {
    let mut model = MockModel::new();
    let mut turn = 0;
    model.expect_complete().times(2).returning(move |messages, _| {
        turn += 1;
        if turn == 1 {
            return Ok(Message::ai_with_tool_calls(
                "",
                vec![call("call_1", "weatherLookup", json!({ "city": "Paris" }))],
            ));
        }
        let results = tool_messages(messages);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].tool_call_id.as_deref(), Some("call_1"));
        let payload: Value = serde_json::from_str(&results[0].content).unwrap();
        assert_eq!(payload["success"], true);
        assert_eq!(payload["data"]["city"], "Paris");
        Ok(Message::ai("It is 21 degrees in Paris."))
    });

    let agent = AgentLoop::new(Arc::new(model), registry(), 5);
    let run = agent
        .run(
            ConversationState::new("conv-2", "weather in Paris", None),
            Message::human("weather in Paris"),
            &[ToolKind::WeatherLookup],
            &ctx(),
        )
        .await
        .unwrap();

    assert_eq!(run.answer, "It is 21 degrees in Paris.");
    assert_eq!(run.round_trips, 1);
    assert_eq!(run.tools_used, vec!["weatherLookup".to_string()]);
    assert_eq!(run.state.messages.len(), 5);
}

#[tokio::test]
async fn test_parallel_calls_keep_request_order() {
    let mut model = MockModel::new();
    let mut turn = 0;
    model.expect_complete().times(2).returning(move |messages, _| {
        turn += 1;
        if turn == 1 {
            return Ok(Message::ai_with_tool_calls(
                "",
                vec![
                    call("a", "weatherLookup", json!({ "city": "Paris" })),
                    call("b", "weatherLookup", json!({ "city": "Oslo" })),
                ],
            ));
        }
        let ids: Vec<_> = tool_messages(messages)
            .iter()
            .filter_map(|m| m.tool_call_id.clone())
            .collect();
        assert_eq!(ids, vec!["a".to_string(), "b".to_string()]);
        Ok(Message::ai("Paris is warmer."))
    });

    let agent = AgentLoop::new(Arc::new(model), registry(), 5);
    let run = agent
        .run(
            ConversationState::new("conv-3", "compare", None),
            Message::human("compare"),
            &[ToolKind::WeatherLookup],
            &ctx(),
        )
        .await
        .unwrap();

    assert_eq!(run.tools_used, vec!["weatherLookup".to_string()]);
}

#[tokio::test]
async fn test_recursion_limit_fails_the_turn() {
    let mut model = MockModel::new();
    model.expect_complete().times(6).returning(|_, _| {
        Ok(Message::ai_with_tool_calls(
            "",
            vec![call("loop", "weatherLookup", json!({ "city": "Paris" }))],
        ))
    });

    let agent = AgentLoop::new(Arc::new(model), registry(), 5);
    let err = agent
        .run(
            ConversationState::new("conv-4", "weather forever", None),
            Message::human("weather forever"),
            &[ToolKind::WeatherLookup],
            &ctx(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, AgentError::RecursionLimitExceeded { limit: 5 }));
}

#[tokio::test]
async fn test_unknown_or_unbound_tool_is_reported_in_band() {
    let mut model = MockModel::new();
    let mut turn = 0;
    model.expect_complete().times(2).returning(move |messages, _| {
        turn += 1;
        if turn == 1 {
            return Ok(Message::ai_with_tool_calls(
                "",
                vec![
                    call("x", "launchMissiles", json!({})),
                    call("y", "webSearch", json!({ "query": "news" })),
                ],
            ));
        }
        for result in tool_messages(messages) {
            let payload: Value = serde_json::from_str(&result.content).unwrap();
            assert_eq!(payload["success"], false);
            assert!(payload["error"].as_str().unwrap().contains("is not available"));
        }
        Ok(Message::ai("I cannot do that."))
    });

    let agent = AgentLoop::new(Arc::new(model), registry(), 5);
    let run = agent
        .run(
            ConversationState::new("conv-5", "do things", None),
            Message::human("do things"),
            &[ToolKind::WeatherLookup],
            &ctx(),
        )
        .await
        .unwrap();

    assert!(run.tools_used.is_empty());
    assert_eq!(run.round_trips, 1);
}

#[tokio::test]
async fn test_panicking_tool_becomes_failed_result() {
    let mut model = MockModel::new();
    let mut turn = 0;
    model.expect_complete().times(2).returning(move |messages, _| {
        turn += 1;
        if turn == 1 {
            return Ok(Message::ai_with_tool_calls(
                "",
                vec![call("p", "webSearch", json!({ "query": "rust" }))],
            ));
        }
        let results = tool_messages(messages);
        let payload: Value = serde_json::from_str(&results[0].content).unwrap();
        assert_eq!(payload["success"], false);
        assert!(payload["error"].as_str().unwrap().contains("failed unexpectedly"));
        Ok(Message::ai("Search is unavailable right now."))
    });

    let agent = AgentLoop::new(Arc::new(model), registry(), 5);
    let run = agent
        .run(
            ConversationState::new("conv-6", "search rust", None),
            Message::human("search rust"),
            &[ToolKind::WebSearch],
            &ctx(),
        )
        .await
        .unwrap();

    assert_eq!(run.answer, "Search is unavailable right now.");
    assert_eq!(run.tools_used, vec!["webSearch".to_string()]);
}

#[tokio::test]
async fn test_model_error_propagates() {
    let mut model = MockModel::new();
    model
        .expect_complete()
        .returning(|_, _| Err(LlmError::InvalidResponse("no choices in completion".into())));

    let agent = AgentLoop::new(Arc::new(model), registry(), 5);
    let err = agent
        .run(
            ConversationState::new("conv-7", "hi", None),
            Message::human("hi"),
            &[],
            &ctx(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, AgentError::Model(LlmError::InvalidResponse(_))));
}

#[tokio::test]
async fn test_prior_history_is_sent_before_the_new_message() {
    let mut model = MockModel::new();
    model
        .expect_complete()
        .withf(|messages, _| {
            messages.len() == 4
                && messages[1].content == "earlier question"
                && messages[3].content == "follow up"
        })
        .returning(|_, _| Ok(Message::ai("answer")));

    let state = ConversationState::new("conv-8", "follow up", None).with_history(vec![
        Message::human("earlier question"),
        Message::ai("earlier answer"),
    ]);

    let agent = AgentLoop::new(Arc::new(model), registry(), 5);
    let run = agent
        .run(state, Message::human("follow up"), &[], &ctx())
        .await
        .unwrap();
    assert_eq!(run.state.messages.len(), 5);
}

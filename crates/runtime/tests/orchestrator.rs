//! Turn-level tests for [`GenieAgent`] with a scripted backend and
//! in-process tools.

use async_trait::async_trait;
use runtime::model::{
    Backend, ChatRequest, ChatResponse, ChatTurn, ModelError, Role, ToolCallRequest, ToolSpec,
    Usage,
};
use runtime::tools::{StaticToolProvider, ToolCatalog, ToolError, ToolExecutor, ToolProvider};
use runtime::{GenieAgent, HistoryItem};
use serde_json::{Map, Value, json};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

const PROMPT: &str = "You are a helpful assistant.";

/// Everything one backend call received.
struct SeenRequest {
    messages: Vec<ChatTurn>,
    tools: Vec<ToolSpec>,
}

/// A backend that replays canned replies and records what it was asked.
#[derive(Clone, Default)]
struct ScriptedBackend {
    replies: Arc<Mutex<VecDeque<ChatTurn>>>,
    seen: Arc<Mutex<Vec<SeenRequest>>>,
}

impl ScriptedBackend {
    fn with_replies(replies: impl IntoIterator<Item = ChatTurn>) -> Self {
        Self {
            replies: Arc::new(Mutex::new(replies.into_iter().collect())),
            seen: Arc::default(),
        }
    }

    fn seen(&self) -> Vec<SeenRequest> {
        std::mem::take(&mut *self.seen.lock().unwrap())
    }
}

impl Backend for ScriptedBackend {
    async fn complete(&self, request: ChatRequest<'_>) -> Result<ChatResponse, ModelError> {
        self.seen.lock().unwrap().push(SeenRequest {
            messages: request.messages.to_vec(),
            tools: request.tools.to_vec(),
        });
        let message = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .expect("script has a reply for every model call");
        Ok(ChatResponse {
            message,
            usage: Usage::default(),
        })
    }
}

/// Succeeds with a fixed output and records the arguments it was given.
struct RecordingTool {
    output: String,
    calls: Mutex<Vec<Map<String, Value>>>,
}

impl RecordingTool {
    fn new(output: &str) -> Arc<Self> {
        Arc::new(Self {
            output: output.to_owned(),
            calls: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> Vec<Map<String, Value>> {
        std::mem::take(&mut *self.calls.lock().unwrap())
    }
}

#[async_trait]
impl ToolExecutor for RecordingTool {
    async fn invoke(&self, arguments: Map<String, Value>) -> Result<String, ToolError> {
        self.calls.lock().unwrap().push(arguments);
        Ok(self.output.clone())
    }
}

struct FailingTool;

#[async_trait]
impl ToolExecutor for FailingTool {
    async fn invoke(&self, _arguments: Map<String, Value>) -> Result<String, ToolError> {
        Err(ToolError::Execution("space is on fire".to_owned()))
    }
}

struct BrokenProvider;

#[async_trait]
impl ToolProvider for BrokenProvider {
    async fn discover(&self) -> Result<ToolCatalog, ToolError> {
        Err(ToolError::Discovery("mcp endpoint unreachable".to_owned()))
    }
}

fn query_space_spec() -> ToolSpec {
    ToolSpec::new(
        "query_space",
        "Run a natural-language query against the space.",
        json!({"type": "object", "properties": {"query": {"type": "string"}}}),
    )
}

fn tool_call_reply(calls: Vec<ToolCallRequest>) -> ChatTurn {
    ChatTurn {
        role: Role::Assistant,
        content: None,
        tool_calls: Some(calls),
        tool_call_id: None,
        name: None,
        id: None,
    }
}

fn user_input(text: &str) -> Vec<HistoryItem> {
    vec![ChatTurn::user(text).into()]
}

#[tokio::test]
async fn plain_answer_consults_the_model_once() {
    let backend = ScriptedBackend::with_replies([ChatTurn::assistant("Lisbon, Porto, Faro.")]);
    let tool = RecordingTool::new("unused");
    let provider = StaticToolProvider::new().with_tool(query_space_spec(), tool.clone());
    let agent = GenieAgent::new(backend.clone(), provider, PROMPT);

    let response = agent
        .predict(user_input("List top 3 distribution centers."))
        .await
        .unwrap();

    let seen = backend.seen();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].messages.len(), 2);
    assert_eq!(seen[0].messages[0].role, Role::System);
    assert_eq!(seen[0].messages[0].text_content(), PROMPT);
    assert_eq!(seen[0].messages[1].role, Role::User);
    assert_eq!(
        seen[0].messages[1].text_content(),
        "List top 3 distribution centers."
    );
    assert_eq!(seen[0].tools.len(), 1);
    assert_eq!(seen[0].tools[0].name, "query_space");

    assert_eq!(response.messages.len(), 1);
    assert_eq!(response.messages[0].text_content(), "Lisbon, Porto, Faro.");
    assert!(response.messages[0].id.is_some());
    assert!(tool.calls().is_empty());
}

#[tokio::test]
async fn tool_call_runs_the_executor_then_consults_again() {
    let backend = ScriptedBackend::with_replies([
        tool_call_reply(vec![ToolCallRequest::function(
            "call-1",
            "query_space",
            r#"{"query": "top centers"}"#,
        )]),
        ChatTurn::assistant("Top centers are A, B and C."),
    ]);
    let tool = RecordingTool::new("42 rows");
    let provider = StaticToolProvider::new().with_tool(query_space_spec(), tool.clone());
    let agent = GenieAgent::new(backend.clone(), provider, PROMPT);

    let response = agent
        .predict(user_input("List top 3 distribution centers."))
        .await
        .unwrap();

    let calls = tool.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].get("query"), Some(&json!("top centers")));

    let seen = backend.seen();
    assert_eq!(seen.len(), 2);
    // The follow-up offers no tools, so the model has to answer.
    assert!(seen[1].tools.is_empty());
    let transcript = &seen[1].messages;
    assert_eq!(transcript.len(), 4);
    assert_eq!(transcript[2].role, Role::Assistant);
    assert_eq!(transcript[2].tool_call_requests().len(), 1);
    assert_eq!(transcript[3].role, Role::Tool);
    assert_eq!(transcript[3].text_content(), "42 rows");
    assert_eq!(transcript[3].tool_call_id.as_deref(), Some("call-1"));

    assert_eq!(response.messages.len(), 3);
    assert_eq!(response.messages[0].tool_call_requests().len(), 1);
    assert_eq!(response.messages[1].role, Role::Tool);
    assert_eq!(response.messages[1].text_content(), "42 rows");
    assert_eq!(
        response.messages[2].text_content(),
        "Top centers are A, B and C."
    );
}

#[tokio::test]
async fn only_the_first_tool_call_is_honored() {
    let backend = ScriptedBackend::with_replies([
        tool_call_reply(vec![
            ToolCallRequest::function("call-1", "query_space", r#"{"query": "first"}"#),
            ToolCallRequest::function("call-2", "query_space", r#"{"query": "second"}"#),
        ]),
        ChatTurn::assistant("Done."),
    ]);
    let tool = RecordingTool::new("one row");
    let provider = StaticToolProvider::new().with_tool(query_space_spec(), tool.clone());
    let agent = GenieAgent::new(backend.clone(), provider, PROMPT);

    let response = agent.predict(user_input("go")).await.unwrap();

    let calls = tool.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].get("query"), Some(&json!("first")));
    assert_eq!(response.messages[1].tool_call_id.as_deref(), Some("call-1"));
}

#[tokio::test]
async fn unknown_tool_becomes_inline_error_output() {
    let backend = ScriptedBackend::with_replies([
        tool_call_reply(vec![ToolCallRequest::function(
            "call-1",
            "does_not_exist",
            "{}",
        )]),
        ChatTurn::assistant("I could not look that up."),
    ]);
    let tool = RecordingTool::new("unused");
    let provider = StaticToolProvider::new().with_tool(query_space_spec(), tool.clone());
    let agent = GenieAgent::new(backend.clone(), provider, PROMPT);

    let response = agent.predict(user_input("go")).await.unwrap();

    assert!(tool.calls().is_empty());
    assert_eq!(backend.seen().len(), 2);
    assert_eq!(response.messages.len(), 3);
    assert_eq!(
        response.messages[1].text_content(),
        "Error invoking does_not_exist: tool not found: does_not_exist"
    );
}

#[tokio::test]
async fn tool_failure_becomes_inline_error_output() {
    let backend = ScriptedBackend::with_replies([
        tool_call_reply(vec![ToolCallRequest::function(
            "call-1",
            "query_space",
            "{}",
        )]),
        ChatTurn::assistant("The space seems unavailable."),
    ]);
    let provider = StaticToolProvider::new().with_tool(query_space_spec(), Arc::new(FailingTool));
    let agent = GenieAgent::new(backend.clone(), provider, PROMPT);

    let response = agent.predict(user_input("go")).await.unwrap();

    assert_eq!(
        response.messages[1].text_content(),
        "Error invoking query_space: execution failed: space is on fire"
    );
    assert_eq!(
        response.messages[2].text_content(),
        "The space seems unavailable."
    );
}

#[tokio::test]
async fn malformed_arguments_become_inline_error_output() {
    let backend = ScriptedBackend::with_replies([
        tool_call_reply(vec![ToolCallRequest::function(
            "call-1",
            "query_space",
            "{not json",
        )]),
        ChatTurn::assistant("Sorry."),
    ]);
    let tool = RecordingTool::new("unused");
    let provider = StaticToolProvider::new().with_tool(query_space_spec(), tool.clone());
    let agent = GenieAgent::new(backend.clone(), provider, PROMPT);

    let response = agent.predict(user_input("go")).await.unwrap();

    assert!(tool.calls().is_empty());
    assert!(
        response.messages[1]
            .text_content()
            .starts_with("Error invoking query_space: invalid arguments:")
    );
}

#[tokio::test]
async fn produced_messages_get_fresh_distinct_ids() {
    let backend = ScriptedBackend::with_replies([
        tool_call_reply(vec![ToolCallRequest::function(
            "call-1",
            "query_space",
            "{}",
        )]),
        ChatTurn::assistant("Done."),
    ]);
    let tool = RecordingTool::new("ok");
    let provider = StaticToolProvider::new().with_tool(query_space_spec(), tool);
    let agent = GenieAgent::new(backend, provider, PROMPT);

    let input = vec![HistoryItem::from(
        ChatTurn::user("go").with_id("caller-supplied"),
    )];
    let response = agent.predict(input).await.unwrap();

    let ids: Vec<&str> = response
        .messages
        .iter()
        .map(|message| message.id.as_deref().expect("produced message has an id"))
        .collect();
    assert_eq!(ids.len(), 3);
    assert!(!ids.contains(&"caller-supplied"));
    assert_ne!(ids[0], ids[1]);
    assert_ne!(ids[1], ids[2]);
    assert_ne!(ids[0], ids[2]);
}

#[tokio::test]
async fn discovery_failure_leaves_the_model_toolless() {
    let backend = ScriptedBackend::with_replies([ChatTurn::assistant("I can still answer.")]);
    let agent = GenieAgent::new(backend.clone(), BrokenProvider, PROMPT);

    let response = agent.predict(user_input("hello")).await.unwrap();

    let seen = backend.seen();
    assert_eq!(seen.len(), 1);
    assert!(seen[0].tools.is_empty());
    assert_eq!(response.messages.len(), 1);
    assert_eq!(response.messages[0].text_content(), "I can still answer.");
}

#[tokio::test]
async fn structured_history_is_flattened_for_the_provider() {
    use runtime::{ContentFragment, MessageContent};

    let backend = ScriptedBackend::with_replies([ChatTurn::assistant("ok")]);
    let tool = RecordingTool::new("unused");
    let provider = StaticToolProvider::new().with_tool(query_space_spec(), tool);
    let agent = GenieAgent::new(backend.clone(), provider, PROMPT);

    let input = vec![
        HistoryItem::Message {
            role: Role::User,
            content: MessageContent::Fragments(vec![ContentFragment {
                fragment_type: Some("input_text".to_owned()),
                text: "List top 3 distribution centers.".to_owned(),
            }]),
        },
        HistoryItem::FunctionCall {
            call_id: "c-0".to_owned(),
            name: "query_space".to_owned(),
            arguments: "{}".to_owned(),
        },
        HistoryItem::FunctionCallOutput {
            call_id: "c-0".to_owned(),
            output: "9 rows".to_owned(),
        },
    ];
    agent.predict(input).await.unwrap();

    let seen = backend.seen();
    let transcript = &seen[0].messages;
    assert_eq!(transcript.len(), 4);
    assert_eq!(transcript[1].role, Role::User);
    assert_eq!(
        transcript[1].text_content(),
        "List top 3 distribution centers."
    );
    assert_eq!(
        transcript[2].tool_call_requests()[0].function.name,
        "query_space"
    );
    assert_eq!(transcript[3].role, Role::Tool);
    assert_eq!(transcript[3].text_content(), "9 rows");
}

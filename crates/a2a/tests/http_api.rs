//! End-to-end tests: real server on an ephemeral port, driven by the client.

use std::sync::Arc;

use a2a::{
    AgentCapabilities, AgentCard, AgentExecutor, AgentServer, AgentSkill, CardResolver, Client,
    EventQueue, ExecutorError, Message, RequestContext, SendMessageResult,
};
use async_trait::async_trait;
use serde_json::{Value, json};
use tokio::net::TcpListener;

struct UppercaseExecutor;

#[async_trait]
impl AgentExecutor for UppercaseExecutor {
    async fn execute(&self, ctx: RequestContext, queue: EventQueue) -> Result<(), ExecutorError> {
        let reply = ctx.user_input().to_uppercase();
        queue.enqueue_message(Message::agent_text(reply)).await;
        Ok(())
    }

    async fn cancel(&self, _ctx: RequestContext, _queue: EventQueue) -> Result<(), ExecutorError> {
        Err(ExecutorError::CancelUnsupported)
    }
}

fn test_card(rpc_url: &str) -> AgentCard {
    AgentCard {
        name: "upper-agent".to_owned(),
        description: "shouts back".to_owned(),
        url: rpc_url.to_owned(),
        version: "1.0.0".to_owned(),
        default_input_modes: vec!["text".to_owned()],
        default_output_modes: vec!["text".to_owned()],
        capabilities: AgentCapabilities {
            streaming: true,
            ..Default::default()
        },
        skills: vec![AgentSkill {
            id: "upper".to_owned(),
            name: "Uppercase".to_owned(),
            description: "uppercases input".to_owned(),
            tags: vec!["demo".to_owned()],
            examples: vec![],
        }],
        supports_authenticated_extended_card: false,
    }
}

/// Bind an ephemeral port, serve in the background, return the base URL.
async fn spawn_server() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let base = format!("http://{addr}");
    let card = test_card(&format!("{base}/api/a2a"));
    let server = AgentServer::new(card, Arc::new(UppercaseExecutor), "/api/a2a");
    tokio::spawn(async move { server.serve(listener).await.unwrap() });
    base
}

#[tokio::test]
async fn card_resolves_from_well_known_path() {
    let base = spawn_server().await;
    let card = CardResolver::new(&base).resolve().await.unwrap();
    assert_eq!(card.name, "upper-agent");
    assert_eq!(card.url, format!("{base}/api/a2a"));
    assert!(card.capabilities.streaming);
    assert_eq!(card.skills[0].id, "upper");
}

#[tokio::test]
async fn send_message_round_trip() {
    let base = spawn_server().await;
    let card = CardResolver::new(&base).resolve().await.unwrap();
    let client = Client::from_card(&card);
    let result = client
        .send_message(Message::user_text("hello there"))
        .await
        .unwrap();
    match result {
        SendMessageResult::Message(message) => {
            assert_eq!(message.text_content(), "HELLO THERE");
            assert!(!message.message_id.is_empty());
        }
        other => panic!("unexpected result: {other:?}"),
    }
}

#[tokio::test]
async fn stream_emits_final_frame() {
    let base = spawn_server().await;
    let response = reqwest::Client::new()
        .post(format!("{base}/api/a2a"))
        .json(&json!({
            "jsonrpc": "2.0",
            "id": "req-1",
            "method": "message/stream",
            "params": {
                "message": {
                    "role": "user",
                    "parts": [{"kind": "text", "text": "hi"}],
                    "messageId": "m-1",
                    "kind": "message"
                }
            }
        }))
        .send()
        .await
        .unwrap();
    let content_type = response
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_owned();
    assert!(content_type.starts_with("text/event-stream"), "got {content_type}");

    let body = response.text().await.unwrap();
    let frame = first_data_line(&body);
    assert_eq!(frame["id"], json!("req-1"));
    assert_eq!(frame["result"]["parts"][0]["text"], json!("HI"));
}

#[tokio::test]
async fn malformed_json_yields_parse_error() {
    let base = spawn_server().await;
    let response = reqwest::Client::new()
        .post(format!("{base}/api/a2a"))
        .body("{not json")
        .send()
        .await
        .unwrap();
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"]["code"], json!(-32700));
}

#[tokio::test]
async fn tasks_get_reports_not_found_over_http() {
    let base = spawn_server().await;
    let response = reqwest::Client::new()
        .post(format!("{base}/api/a2a"))
        .json(&json!({
            "jsonrpc": "2.0",
            "id": 5,
            "method": "tasks/get",
            "params": {"id": "t-404"}
        }))
        .send()
        .await
        .unwrap();
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["id"], json!(5));
    assert_eq!(body["error"]["code"], json!(-32001));
}

fn first_data_line(body: &str) -> Value {
    let line = body
        .lines()
        .find_map(|line| line.strip_prefix("data:"))
        .map(str::trim_start)
        .expect("no data line in SSE body");
    serde_json::from_str(line).unwrap()
}

//! JSON-RPC request handling and the HTTP server.
//!
//! [`RequestHandler`] owns protocol dispatch; [`AgentServer`] wraps it in an
//! axum router that serves the agent card on the well-known path and the
//! JSON-RPC endpoint on the configured path. `message/stream` answers with
//! an SSE body whose events are complete JSON-RPC responses.

use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::State;
use axum::response::sse::{Event as SseEvent, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures_util::StreamExt;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::net::TcpListener;
use tokio_stream::wrappers::ReceiverStream;
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

use crate::error::Result;
use crate::executor::{AgentExecutor, EventQueue, ExecutorError, RequestContext};
use crate::protocol::{
    AGENT_CARD_PATH, AgentCard, JsonRpcError, JsonRpcRequest, JsonRpcResponse, Message,
    MessageSendParams, RequestId, SendMessageResult, TaskIdParams,
};

const EVENT_QUEUE_CAPACITY: usize = 16;

/// Emitted when even the error response fails to serialize.
const INTERNAL_ERROR_FRAME: &str =
    r#"{"jsonrpc":"2.0","id":null,"error":{"code":-32603,"message":"Internal error"}}"#;

/// Dispatches JSON-RPC requests to an [`AgentExecutor`].
pub struct RequestHandler {
    executor: Arc<dyn AgentExecutor>,
}

impl RequestHandler {
    pub fn new(executor: Arc<dyn AgentExecutor>) -> Self {
        Self { executor }
    }

    /// Handle one request and produce the response to send back.
    ///
    /// `message/stream` is accepted here with `message/send` semantics; the
    /// HTTP layer routes it to [`RequestHandler::handle_stream`] instead when
    /// an event-stream response is wanted.
    pub async fn handle(&self, request: JsonRpcRequest) -> JsonRpcResponse {
        let id = request.id.clone();
        if request.jsonrpc != "2.0" {
            return JsonRpcResponse::failure(
                id,
                JsonRpcError::invalid_request("jsonrpc must be \"2.0\""),
            );
        }
        debug!(method = %request.method, "rpc request");
        match request.method.as_str() {
            "message/send" | "message/stream" => self.on_message_send(id, request.params).await,
            "tasks/get" => on_task_get(id, request.params),
            "tasks/cancel" => self.on_task_cancel(id, request.params).await,
            other => JsonRpcResponse::failure(id, JsonRpcError::method_not_found(other)),
        }
    }

    /// Handle `message/stream`: events become SSE frames as the executor
    /// produces them, and an executor failure after zero events becomes a
    /// trailing error frame.
    pub async fn handle_stream(&self, request: JsonRpcRequest) -> Response {
        let id = request.id.clone();
        let params: MessageSendParams = match decode_params(request.params) {
            Ok(params) => params,
            Err(error) => return single_frame(JsonRpcResponse::failure(id, error)),
        };

        let ctx = RequestContext::for_message(params.message);
        let (queue, events) = EventQueue::channel(EVENT_QUEUE_CAPACITY);
        let executor = Arc::clone(&self.executor);
        let task = tokio::spawn(async move { executor.execute(ctx, queue).await });

        let frame_id = id.clone();
        let frames = ReceiverStream::new(events)
            .map(move |event| Ok::<_, Infallible>(event_frame(&frame_id, event)));
        let tail = futures_util::stream::once(async move {
            match task.await {
                Ok(Ok(())) => None,
                Ok(Err(error)) => Some(Ok(sse_frame(&JsonRpcResponse::failure(
                    id,
                    JsonRpcError::internal(error.to_string()),
                )))),
                Err(error) => Some(Ok(sse_frame(&JsonRpcResponse::failure(
                    id,
                    JsonRpcError::internal(format!("executor task failed: {error}")),
                )))),
            }
        })
        .filter_map(|frame| async move { frame });

        Sse::new(frames.chain(tail)).into_response()
    }

    async fn on_message_send(
        &self,
        id: Option<RequestId>,
        params: Option<Value>,
    ) -> JsonRpcResponse {
        let params: MessageSendParams = match decode_params(params) {
            Ok(params) => params,
            Err(error) => return JsonRpcResponse::failure(id, error),
        };
        match self.run_turn(params.message).await {
            Ok(event) => match serde_json::to_value(&event) {
                Ok(value) => JsonRpcResponse::success(id, value),
                Err(error) => {
                    JsonRpcResponse::failure(id, JsonRpcError::internal(error.to_string()))
                }
            },
            Err(error) => JsonRpcResponse::failure(id, error),
        }
    }

    /// Run the executor on its own task and reply with the first event it
    /// queues.
    async fn run_turn(
        &self,
        message: Message,
    ) -> std::result::Result<SendMessageResult, JsonRpcError> {
        let ctx = RequestContext::for_message(message);
        let (queue, mut events) = EventQueue::channel(EVENT_QUEUE_CAPACITY);
        let executor = Arc::clone(&self.executor);
        let task = tokio::spawn(async move { executor.execute(ctx, queue).await });
        let first = events.recv().await;
        match task.await {
            Ok(Ok(())) => {
                first.ok_or_else(|| JsonRpcError::internal("executor produced no response"))
            }
            Ok(Err(error)) => Err(JsonRpcError::internal(error.to_string())),
            Err(error) => Err(JsonRpcError::internal(format!("executor task failed: {error}"))),
        }
    }

    async fn on_task_cancel(
        &self,
        id: Option<RequestId>,
        params: Option<Value>,
    ) -> JsonRpcResponse {
        let params: TaskIdParams = match decode_params(params) {
            Ok(params) => params,
            Err(error) => return JsonRpcResponse::failure(id, error),
        };
        let ctx = RequestContext::for_task(params.id);
        let (queue, _events) = EventQueue::channel(EVENT_QUEUE_CAPACITY);
        match self.executor.cancel(ctx, queue).await {
            Err(ExecutorError::CancelUnsupported) => JsonRpcResponse::failure(
                id,
                JsonRpcError::unsupported_operation("cancel not supported"),
            ),
            Err(ExecutorError::Failed(message)) => {
                JsonRpcResponse::failure(id, JsonRpcError::internal(message))
            }
            Ok(()) => JsonRpcResponse::failure(
                id,
                JsonRpcError::internal("cancellation produced no task"),
            ),
        }
    }
}

fn on_task_get(id: Option<RequestId>, params: Option<Value>) -> JsonRpcResponse {
    if let Err(error) = decode_params::<TaskIdParams>(params) {
        return JsonRpcResponse::failure(id, error);
    }
    // No task survives its request, so every lookup misses.
    JsonRpcResponse::failure(id, JsonRpcError::task_not_found())
}

fn decode_params<T: DeserializeOwned>(
    params: Option<Value>,
) -> std::result::Result<T, JsonRpcError> {
    let params = params.ok_or_else(|| JsonRpcError::invalid_params("missing params"))?;
    serde_json::from_value(params).map_err(|error| JsonRpcError::invalid_params(error.to_string()))
}

fn event_frame(id: &Option<RequestId>, event: SendMessageResult) -> SseEvent {
    let response = match serde_json::to_value(&event) {
        Ok(value) => JsonRpcResponse::success(id.clone(), value),
        Err(error) => {
            JsonRpcResponse::failure(id.clone(), JsonRpcError::internal(error.to_string()))
        }
    };
    sse_frame(&response)
}

fn sse_frame(response: &JsonRpcResponse) -> SseEvent {
    match serde_json::to_string(response) {
        Ok(payload) => SseEvent::default().data(payload),
        Err(_) => SseEvent::default().data(INTERNAL_ERROR_FRAME),
    }
}

fn single_frame(response: JsonRpcResponse) -> Response {
    let stream = tokio_stream::once(Ok::<_, Infallible>(sse_frame(&response)));
    Sse::new(stream).into_response()
}

/// An agent exposed over HTTP: card on the well-known path, JSON-RPC on the
/// configured path.
pub struct AgentServer {
    card: Arc<AgentCard>,
    handler: Arc<RequestHandler>,
    rpc_path: String,
}

impl AgentServer {
    pub fn new(
        card: AgentCard,
        executor: Arc<dyn AgentExecutor>,
        rpc_path: impl Into<String>,
    ) -> Self {
        Self {
            card: Arc::new(card),
            handler: Arc::new(RequestHandler::new(executor)),
            rpc_path: rpc_path.into(),
        }
    }

    pub fn router(&self) -> Router {
        let state = AppState {
            card: Arc::clone(&self.card),
            handler: Arc::clone(&self.handler),
        };
        Router::new()
            .route(AGENT_CARD_PATH, get(agent_card))
            .route(&self.rpc_path, post(rpc_endpoint))
            .layer(TraceLayer::new_for_http())
            .with_state(state)
    }

    /// Serve until the listener fails.
    pub async fn serve(self, listener: TcpListener) -> Result<()> {
        let addr = listener.local_addr()?;
        info!(%addr, agent = %self.card.name, "a2a server listening");
        axum::serve(listener, self.router()).await?;
        Ok(())
    }
}

#[derive(Clone)]
struct AppState {
    card: Arc<AgentCard>,
    handler: Arc<RequestHandler>,
}

async fn agent_card(State(state): State<AppState>) -> Json<AgentCard> {
    Json((*state.card).clone())
}

async fn rpc_endpoint(State(state): State<AppState>, body: String) -> Response {
    let value: Value = match serde_json::from_str(&body) {
        Ok(value) => value,
        Err(_) => {
            return Json(JsonRpcResponse::failure(None, JsonRpcError::parse_error()))
                .into_response();
        }
    };
    let id = value
        .get("id")
        .and_then(|raw| serde_json::from_value(raw.clone()).ok());
    let request: JsonRpcRequest = match serde_json::from_value(value) {
        Ok(request) => request,
        Err(error) => {
            return Json(JsonRpcResponse::failure(
                id,
                JsonRpcError::invalid_request(error.to_string()),
            ))
            .into_response();
        }
    };
    if request.method == "message/stream" {
        state.handler.handle_stream(request).await
    } else {
        Json(state.handler.handle(request).await).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;

    struct EchoExecutor;

    #[async_trait]
    impl AgentExecutor for EchoExecutor {
        async fn execute(
            &self,
            ctx: RequestContext,
            queue: EventQueue,
        ) -> std::result::Result<(), ExecutorError> {
            let reply = format!("echo: {}", ctx.user_input());
            queue.enqueue_message(Message::agent_text(reply)).await;
            Ok(())
        }

        async fn cancel(
            &self,
            _ctx: RequestContext,
            _queue: EventQueue,
        ) -> std::result::Result<(), ExecutorError> {
            Err(ExecutorError::CancelUnsupported)
        }
    }

    struct FailingExecutor;

    #[async_trait]
    impl AgentExecutor for FailingExecutor {
        async fn execute(
            &self,
            _ctx: RequestContext,
            _queue: EventQueue,
        ) -> std::result::Result<(), ExecutorError> {
            Err(ExecutorError::Failed("backend exploded".to_owned()))
        }

        async fn cancel(
            &self,
            _ctx: RequestContext,
            _queue: EventQueue,
        ) -> std::result::Result<(), ExecutorError> {
            Err(ExecutorError::CancelUnsupported)
        }
    }

    struct SilentExecutor;

    #[async_trait]
    impl AgentExecutor for SilentExecutor {
        async fn execute(
            &self,
            _ctx: RequestContext,
            _queue: EventQueue,
        ) -> std::result::Result<(), ExecutorError> {
            Ok(())
        }

        async fn cancel(
            &self,
            _ctx: RequestContext,
            _queue: EventQueue,
        ) -> std::result::Result<(), ExecutorError> {
            Err(ExecutorError::CancelUnsupported)
        }
    }

    fn handler(executor: impl AgentExecutor + 'static) -> RequestHandler {
        RequestHandler::new(Arc::new(executor))
    }

    fn request(method: &str, params: Value) -> JsonRpcRequest {
        JsonRpcRequest {
            jsonrpc: "2.0".to_owned(),
            id: Some(RequestId::Number(1)),
            method: method.to_owned(),
            params: Some(params),
        }
    }

    fn send_params(text: &str) -> Value {
        json!({
            "message": {
                "role": "user",
                "parts": [{"kind": "text", "text": text}],
                "messageId": "m-1",
                "kind": "message"
            }
        })
    }

    #[tokio::test]
    async fn send_returns_agent_message() {
        let response = handler(EchoExecutor)
            .handle(request("message/send", send_params("hello")))
            .await;
        assert!(response.error.is_none());
        let result: SendMessageResult =
            serde_json::from_value(response.result.unwrap()).unwrap();
        match result {
            SendMessageResult::Message(message) => {
                assert_eq!(message.text_content(), "echo: hello");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn unknown_method_is_reported() {
        let response = handler(EchoExecutor)
            .handle(request("message/unsubscribe", json!({})))
            .await;
        assert_eq!(response.error.unwrap().code, -32601);
    }

    #[tokio::test]
    async fn tasks_are_never_found() {
        let response = handler(EchoExecutor)
            .handle(request("tasks/get", json!({"id": "t-1"})))
            .await;
        assert_eq!(response.error.unwrap().code, -32001);
    }

    #[tokio::test]
    async fn cancel_is_unsupported() {
        let response = handler(EchoExecutor)
            .handle(request("tasks/cancel", json!({"id": "t-1"})))
            .await;
        let error = response.error.unwrap();
        assert_eq!(error.code, -32004);
        assert!(error.message.contains("cancel not supported"));
    }

    #[tokio::test]
    async fn malformed_params_are_rejected() {
        let response = handler(EchoExecutor)
            .handle(request("message/send", json!({"message": 42})))
            .await;
        assert_eq!(response.error.unwrap().code, -32602);
    }

    #[tokio::test]
    async fn missing_params_are_rejected() {
        let mut req = request("tasks/get", json!({}));
        req.params = None;
        let response = handler(EchoExecutor).handle(req).await;
        assert_eq!(response.error.unwrap().code, -32602);
    }

    #[tokio::test]
    async fn executor_failure_maps_to_internal_error() {
        let response = handler(FailingExecutor)
            .handle(request("message/send", send_params("hello")))
            .await;
        let error = response.error.unwrap();
        assert_eq!(error.code, -32603);
        assert!(error.message.contains("backend exploded"));
    }

    #[tokio::test]
    async fn silent_executor_maps_to_internal_error() {
        let response = handler(SilentExecutor)
            .handle(request("message/send", send_params("hello")))
            .await;
        assert_eq!(response.error.unwrap().code, -32603);
    }

    #[tokio::test]
    async fn wrong_jsonrpc_version_is_rejected() {
        let mut req = request("message/send", send_params("hello"));
        req.jsonrpc = "1.0".to_owned();
        let response = handler(EchoExecutor).handle(req).await;
        assert_eq!(response.error.unwrap().code, -32600);
    }

    #[tokio::test]
    async fn stream_method_shares_send_semantics() {
        let response = handler(EchoExecutor)
            .handle(request("message/stream", send_params("hi")))
            .await;
        assert!(response.error.is_none());
    }
}

//! MCP client over the streamable HTTP transport.
//!
//! A [`Session`] speaks JSON-RPC to a single remote MCP endpoint. Every
//! request is an HTTP POST; the server may answer with a plain JSON body or
//! with a short-lived SSE stream carrying the response as an event. Servers
//! that are stateful hand back an `Mcp-Session-Id` header on initialize,
//! which we echo on every subsequent request.

use std::sync::atomic::{AtomicI64, Ordering};

use futures_util::StreamExt;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::error::{Error, Result};
use crate::protocol::{
    CallToolParams, CallToolResult, InitializeParams, InitializeResult, JsonRpcNotification,
    JsonRpcRequest, JsonRpcResponse, ListToolsParams, ListToolsResult, RequestId, ServerInfo, Tool,
};

const SESSION_ID_HEADER: &str = "mcp-session-id";
const ACCEPT_BOTH: &str = "application/json, text/event-stream";

/// Where and how to reach one MCP endpoint.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Full URL of the streamable HTTP endpoint.
    pub url: String,
    /// Bearer token attached to every request, if the endpoint needs one.
    pub bearer_token: Option<String>,
}

impl SessionConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            bearer_token: None,
        }
    }

    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }
}

/// An initialized connection to an MCP server.
#[derive(Debug)]
pub struct Session {
    http: reqwest::Client,
    config: SessionConfig,
    session_id: Option<String>,
    server_info: ServerInfo,
    next_id: AtomicI64,
}

impl Session {
    /// Connect and run the initialize handshake.
    ///
    /// Sends `initialize`, records the session ID header if the server set
    /// one, then fires the `notifications/initialized` notification.
    pub async fn connect(config: SessionConfig) -> Result<Self> {
        let http = reqwest::Client::new();

        let id = RequestId::Number(1);
        let request = JsonRpcRequest::new(id.clone(), "initialize")
            .with_params(InitializeParams::default())?;
        let body = serde_json::to_value(&request)?;
        let response = post_rpc(&http, &config, None, &body).await?;
        let session_id = response
            .headers()
            .get(SESSION_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);
        let rpc = decode_rpc_response(response, &id).await?;
        let init: InitializeResult = serde_json::from_value(rpc.into_result()?)?;
        debug!(
            url = %config.url,
            server = %init.server_info.name,
            protocol = %init.protocol_version,
            "mcp session established"
        );

        let session = Self {
            http,
            config,
            session_id,
            server_info: init.server_info,
            next_id: AtomicI64::new(2),
        };
        session.notify("notifications/initialized").await?;
        Ok(session)
    }

    /// Identity the server reported during initialize.
    pub fn server_info(&self) -> &ServerInfo {
        &self.server_info
    }

    /// List every tool the server exposes, following cursor pagination.
    pub async fn list_tools(&self) -> Result<Vec<Tool>> {
        let mut tools = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let params = ListToolsParams {
                cursor: cursor.take(),
            };
            let page: ListToolsResult = self.request("tools/list", Some(params)).await?;
            tools.extend(page.tools);
            match page.next_cursor {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }
        Ok(tools)
    }

    /// Invoke a tool by name.
    ///
    /// A result flagged `isError` by the server becomes
    /// [`Error::ToolCallFailed`] carrying the result text.
    pub async fn call_tool(
        &self,
        name: &str,
        arguments: Option<serde_json::Map<String, Value>>,
    ) -> Result<CallToolResult> {
        let params = CallToolParams {
            name: name.to_owned(),
            arguments,
        };
        let result: CallToolResult = self.request("tools/call", Some(params)).await?;
        if result.is_error {
            return Err(Error::ToolCallFailed(result.joined_text()));
        }
        Ok(result)
    }

    /// Tear down the session. Termination is advisory; failures are logged
    /// and swallowed.
    pub async fn close(self) {
        let Some(session_id) = self.session_id else {
            return;
        };
        let mut request = self
            .http
            .delete(&self.config.url)
            .header(SESSION_ID_HEADER, &session_id);
        if let Some(token) = &self.config.bearer_token {
            request = request.bearer_auth(token);
        }
        if let Err(error) = request.send().await {
            debug!(url = %self.config.url, %error, "session delete failed");
        }
    }

    async fn request<P, R>(&self, method: &str, params: Option<P>) -> Result<R>
    where
        P: Serialize,
        R: DeserializeOwned,
    {
        let id = self.next_request_id();
        let mut request = JsonRpcRequest::new(id.clone(), method);
        if let Some(params) = params {
            request = request.with_params(params)?;
        }
        let body = serde_json::to_value(&request)?;
        let response =
            post_rpc(&self.http, &self.config, self.session_id.as_deref(), &body).await?;
        let rpc = decode_rpc_response(response, &id).await?;
        Ok(serde_json::from_value(rpc.into_result()?)?)
    }

    async fn notify(&self, method: &str) -> Result<()> {
        let body = serde_json::to_value(&JsonRpcNotification::new(method))?;
        post_rpc(&self.http, &self.config, self.session_id.as_deref(), &body).await?;
        Ok(())
    }

    fn next_request_id(&self) -> RequestId {
        RequestId::Number(self.next_id.fetch_add(1, Ordering::SeqCst))
    }
}

/// POST one JSON-RPC body and fail on any non-2xx status.
async fn post_rpc(
    http: &reqwest::Client,
    config: &SessionConfig,
    session_id: Option<&str>,
    body: &Value,
) -> Result<reqwest::Response> {
    let mut request = http.post(&config.url).header(ACCEPT, ACCEPT_BOTH).json(body);
    if let Some(token) = &config.bearer_token {
        request = request.bearer_auth(token);
    }
    if let Some(session_id) = session_id {
        request = request.header(SESSION_ID_HEADER, session_id);
    }
    let response = request.send().await?;
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(Error::Status {
            status: status.as_u16(),
            body,
        });
    }
    Ok(response)
}

/// Decode the response body, which is either a JSON object or an SSE stream
/// containing the response as a `data:` event.
async fn decode_rpc_response(
    response: reqwest::Response,
    id: &RequestId,
) -> Result<JsonRpcResponse> {
    let is_event_stream = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("text/event-stream"));
    if is_event_stream {
        return read_sse_response(response, id).await;
    }
    let text = response.text().await?;
    let rpc: JsonRpcResponse = serde_json::from_str(&text)
        .map_err(|error| Error::InvalidResponse(format!("malformed response body: {error}")))?;
    expect_id(rpc, id)
}

fn expect_id(rpc: JsonRpcResponse, id: &RequestId) -> Result<JsonRpcResponse> {
    if rpc.id.as_ref() == Some(id) {
        Ok(rpc)
    } else {
        Err(Error::InvalidResponse(format!(
            "response id mismatch: expected {id:?}, got {:?}",
            rpc.id
        )))
    }
}

/// Scan an SSE stream for the event whose payload answers `id`.
///
/// Notifications and unrelated events are skipped; the stream is abandoned
/// as soon as the response arrives.
async fn read_sse_response(response: reqwest::Response, id: &RequestId) -> Result<JsonRpcResponse> {
    let mut stream = response.bytes_stream();
    let mut buffer = String::new();
    let mut data = String::new();
    while let Some(chunk) = stream.next().await {
        buffer.push_str(&String::from_utf8_lossy(&chunk?));
        while let Some(end) = buffer.find('\n') {
            let line: String = buffer.drain(..=end).collect();
            let line = line.trim_end_matches(['\r', '\n']);
            if let Some(payload) = line.strip_prefix("data:") {
                if !data.is_empty() {
                    data.push('\n');
                }
                data.push_str(payload.trim_start());
            } else if line.is_empty() && !data.is_empty() {
                if let Some(rpc) = parse_matching_response(&data, id) {
                    return Ok(rpc);
                }
                data.clear();
            }
        }
    }
    // Streams are allowed to end without a blank line after the last event.
    if !data.is_empty() {
        if let Some(rpc) = parse_matching_response(&data, id) {
            return Ok(rpc);
        }
    }
    Err(Error::InvalidResponse(
        "event stream ended without a response".to_owned(),
    ))
}

fn parse_matching_response(data: &str, id: &RequestId) -> Option<JsonRpcResponse> {
    let rpc: JsonRpcResponse = serde_json::from_str(data).ok()?;
    (rpc.id.as_ref() == Some(id)).then_some(rpc)
}

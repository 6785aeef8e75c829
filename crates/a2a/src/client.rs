//! Client side: card resolution and message sending.

use reqwest::header::ACCEPT;
use serde_json::Value;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::protocol::{
    AGENT_CARD_PATH, AgentCard, JsonRpcRequest, JsonRpcResponse, Message, MessageSendParams,
    RequestId, SendMessageResult,
};

/// Fetches an agent card from its well-known path.
pub struct CardResolver {
    http: reqwest::Client,
    base_url: String,
    bearer_token: Option<String>,
}

impl CardResolver {
    pub fn new(base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self {
            http: reqwest::Client::new(),
            base_url,
            bearer_token: None,
        }
    }

    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    pub async fn resolve(&self) -> Result<AgentCard> {
        let url = format!("{}{}", self.base_url, AGENT_CARD_PATH);
        let mut request = self.http.get(&url);
        if let Some(token) = &self.bearer_token {
            request = request.bearer_auth(token);
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
        Ok(response.json().await?)
    }
}

/// Talks JSON-RPC to one agent endpoint.
pub struct Client {
    http: reqwest::Client,
    rpc_url: String,
    bearer_token: Option<String>,
}

impl Client {
    pub fn new(rpc_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            rpc_url: rpc_url.into(),
            bearer_token: None,
        }
    }

    /// Point the client at the endpoint a resolved card advertises.
    pub fn from_card(card: &AgentCard) -> Self {
        Self::new(card.url.clone())
    }

    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    /// Send one message and wait for the agent's reply.
    pub async fn send_message(&self, message: Message) -> Result<SendMessageResult> {
        let params = MessageSendParams {
            message,
            metadata: None,
        };
        let response = self.call("message/send", serde_json::to_value(&params)?).await?;
        let result = response
            .result
            .ok_or_else(|| Error::InvalidResponse("response carries no result".to_owned()))?;
        Ok(serde_json::from_value(result)?)
    }

    async fn call(&self, method: &str, params: Value) -> Result<JsonRpcResponse> {
        let request = JsonRpcRequest {
            jsonrpc: "2.0".to_owned(),
            id: Some(RequestId::String(Uuid::new_v4().to_string())),
            method: method.to_owned(),
            params: Some(params),
        };
        let mut http_request = self
            .http
            .post(&self.rpc_url)
            .header(ACCEPT, "application/json")
            .json(&request);
        if let Some(token) = &self.bearer_token {
            http_request = http_request.bearer_auth(token);
        }
        let response = http_request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Status {
                status: status.as_u16(),
                body,
            });
        }
        let mut response: JsonRpcResponse = response.json().await?;
        if let Some(error) = response.error.take() {
            return Err(error.into());
        }
        Ok(response)
    }
}

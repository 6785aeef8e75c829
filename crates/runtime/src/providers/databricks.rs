//! Databricks model serving backend.
//!
//! Serving endpoints expose the OpenAI-compatible chat-completions surface
//! at `{workspace}/serving-endpoints/chat/completions`, with the endpoint
//! name in the `model` field.

use crate::auth::WorkspaceAuth;
use crate::model::{
    Backend, ChatRequest, ChatResponse, ChatTurn, ModelError, Role, ToolCallRequest, ToolSpec,
    Usage,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

const CHAT_COMPLETIONS_PATH: &str = "/serving-endpoints/chat/completions";

// ─────────────────────────────────────────────────────────────────────────────
// API Wire Types
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ApiRequest {
    model: String,
    messages: Vec<ApiMessage>,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<ApiTool>,
}

#[derive(Debug, Serialize)]
struct ApiMessage {
    role: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<ToolCallRequest>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
}

#[derive(Debug, Serialize)]
struct ApiTool {
    #[serde(rename = "type")]
    tool_type: &'static str,
    function: ApiFunction,
}

#[derive(Debug, Serialize)]
struct ApiFunction {
    name: String,
    description: String,
    parameters: Value,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    choices: Vec<ApiChoice>,
    #[serde(default)]
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ApiResponseMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<ToolCallRequest>>,
}

#[derive(Debug, Deserialize, Default, Clone, Copy)]
struct ApiUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

// ─────────────────────────────────────────────────────────────────────────────
// Backend Implementation
// ─────────────────────────────────────────────────────────────────────────────

/// Builder for creating a Databricks backend.
#[derive(Debug, Clone)]
pub struct DatabricksBackendBuilder {
    host: String,
    auth: WorkspaceAuth,
    endpoint: String,
    max_tokens: u32,
    temperature: Option<f32>,
}

impl DatabricksBackendBuilder {
    pub fn new(
        host: impl Into<String>,
        auth: WorkspaceAuth,
        endpoint: impl Into<String>,
    ) -> Self {
        let mut host = host.into();
        while host.ends_with('/') {
            host.pop();
        }
        Self {
            host,
            auth,
            endpoint: endpoint.into(),
            max_tokens: 4096,
            temperature: None,
        }
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn build(self) -> DatabricksBackend {
        DatabricksBackend {
            client: reqwest::Client::new(),
            url: format!("{}{}", self.host, CHAT_COMPLETIONS_PATH),
            auth: self.auth,
            endpoint: self.endpoint,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        }
    }
}

/// Databricks serving-endpoints backend.
pub struct DatabricksBackend {
    client: reqwest::Client,
    url: String,
    auth: WorkspaceAuth,
    endpoint: String,
    max_tokens: u32,
    temperature: Option<f32>,
}

impl DatabricksBackend {
    pub fn builder(
        host: impl Into<String>,
        auth: WorkspaceAuth,
        endpoint: impl Into<String>,
    ) -> DatabricksBackendBuilder {
        DatabricksBackendBuilder::new(host, auth, endpoint)
    }

    fn role_to_api(role: Role) -> &'static str {
        match role {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Tool => "tool",
        }
    }

    // The local `id` tag stays behind; everything else crosses the wire.
    fn turn_to_api(turn: &ChatTurn) -> ApiMessage {
        ApiMessage {
            role: Self::role_to_api(turn.role),
            content: turn.content.clone(),
            tool_calls: turn.tool_calls.clone(),
            tool_call_id: turn.tool_call_id.clone(),
            name: turn.name.clone(),
        }
    }

    fn tool_to_api(spec: &ToolSpec) -> ApiTool {
        ApiTool {
            tool_type: "function",
            function: ApiFunction {
                name: spec.name.clone(),
                description: spec.description.clone(),
                parameters: spec.parameters.clone(),
            },
        }
    }
}

impl std::fmt::Display for DatabricksBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "databricks({}, auth={})", self.endpoint, self.auth)
    }
}

impl Backend for DatabricksBackend {
    async fn complete(&self, request: ChatRequest<'_>) -> Result<ChatResponse, ModelError> {
        let api_request = ApiRequest {
            model: self.endpoint.clone(),
            messages: request.messages.iter().map(Self::turn_to_api).collect(),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            tools: request.tools.iter().map(Self::tool_to_api).collect(),
        };

        let req = self
            .client
            .post(&self.url)
            .header("content-type", "application/json")
            .header("accept", "application/json");
        let req = self.auth.apply_headers(req);

        let response = req
            .json(&api_request)
            .send()
            .await
            .map_err(|e| ModelError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ModelError::Api(format!("{status}: {body}")));
        }

        let api_response: ApiResponse = response
            .json()
            .await
            .map_err(|e| ModelError::InvalidResponse(e.to_string()))?;

        let choice = api_response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ModelError::InvalidResponse("no choices in response".to_owned()))?;

        let message = ChatTurn {
            role: Role::Assistant,
            content: choice.message.content,
            tool_calls: choice.message.tool_calls.filter(|calls| !calls.is_empty()),
            tool_call_id: None,
            name: None,
            id: None,
        };
        let usage = api_response
            .usage
            .map(|u| Usage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
            })
            .unwrap_or_default();

        Ok(ChatResponse { message, usage })
    }
}

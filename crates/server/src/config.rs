//! Configuration loading from genie.toml.

use runtime::WorkspaceAuth;
use serde::Deserialize;
use std::path::Path;

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    /// Listener and public addressing.
    #[serde(default)]
    pub server: ServerConfig,

    /// Databricks workspace coordinates.
    #[serde(default)]
    pub workspace: WorkspaceConfig,

    /// Serving-endpoint model settings.
    #[serde(default)]
    pub llm: LlmConfig,

    /// Remote tool discovery.
    #[serde(default)]
    pub tools: ToolsConfig,
}

/// HTTP server configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind.
    pub host: String,

    /// Port to bind.
    pub port: u16,

    /// Externally reachable base URL, advertised on the agent card.
    pub public_url: Option<String>,

    /// Path serving the JSON-RPC endpoint.
    pub rpc_path: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            public_url: None,
            rpc_path: "/api/a2a".to_string(),
        }
    }
}

/// Databricks workspace configuration.
#[derive(Debug, Default, Deserialize)]
pub struct WorkspaceConfig {
    /// Workspace base URL (https://<workspace>.cloud.databricks.com).
    pub host: Option<String>,

    /// Personal access token (dapi...).
    /// Mutually exclusive with oauth_token.
    pub token: Option<String>,

    /// OAuth access token.
    /// Mutually exclusive with token.
    pub oauth_token: Option<String>,
}

/// Model endpoint configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Serving endpoint to query.
    pub endpoint: String,

    /// System prompt opening every turn.
    pub system_prompt: String,

    /// Completion budget per model call.
    pub max_tokens: Option<u32>,

    /// Sampling temperature.
    pub temperature: Option<f32>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            endpoint: "databricks-meta-llama-3-3-70b-instruct".to_string(),
            system_prompt:
                "You are a helpful assistant. Use the available tools to answer data questions."
                    .to_string(),
            max_tokens: None,
            temperature: None,
        }
    }
}

/// Tool discovery configuration.
#[derive(Debug, Default, Deserialize)]
pub struct ToolsConfig {
    /// MCP endpoints to discover tools from. Entries are either absolute
    /// URLs or paths resolved against the workspace host.
    #[serde(default)]
    pub endpoints: Vec<String>,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(toml: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Fill gaps from the standard Databricks environment variables.
    pub fn apply_env(&mut self) {
        if self.workspace.host.is_none() {
            self.workspace.host = env_value("DATABRICKS_HOST");
        }
        if self.workspace.token.is_none() && self.workspace.oauth_token.is_none() {
            self.workspace.token = env_value("DATABRICKS_TOKEN");
        }
        if self.server.public_url.is_none() {
            self.server.public_url = env_value("DATABRICKS_APP_URL");
        }
    }

    /// Build the authentication from config.
    ///
    /// Requires exactly one of token or oauth_token to be set.
    pub fn auth(&self) -> Result<WorkspaceAuth, ConfigError> {
        match (&self.workspace.token, &self.workspace.oauth_token) {
            (Some(token), None) => Ok(WorkspaceAuth::Pat(token.clone())),
            (None, Some(token)) => Ok(WorkspaceAuth::OauthToken(token.clone())),
            (Some(_), Some(_)) => Err(ConfigError::AmbiguousAuth),
            (None, None) => Err(ConfigError::MissingAuth),
        }
    }

    /// The workspace base URL, without a trailing slash.
    pub fn workspace_host(&self) -> Result<String, ConfigError> {
        self.workspace
            .host
            .as_deref()
            .map(|host| host.trim_end_matches('/').to_owned())
            .ok_or(ConfigError::MissingHost)
    }

    /// The base URL clients reach the server on.
    pub fn public_url(&self) -> String {
        match &self.server.public_url {
            Some(url) => url.trim_end_matches('/').to_owned(),
            None => format!("http://localhost:{}", self.server.port),
        }
    }

    /// Tool endpoints as absolute URLs.
    pub fn resolved_tool_endpoints(&self, workspace_host: &str) -> Vec<String> {
        let host = workspace_host.trim_end_matches('/');
        self.tools
            .endpoints
            .iter()
            .map(|endpoint| {
                if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
                    endpoint.clone()
                } else if endpoint.starts_with('/') {
                    format!("{host}{endpoint}")
                } else {
                    format!("{host}/{endpoint}")
                }
            })
            .collect()
    }
}

fn env_value(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.is_empty())
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(String),

    #[error("workspace host not configured: set workspace.host or DATABRICKS_HOST")]
    MissingHost,

    #[error(
        "authentication not configured: set workspace.token, workspace.oauth_token or DATABRICKS_TOKEN"
    )]
    MissingAuth,

    #[error(
        "ambiguous authentication: set either workspace.token OR workspace.oauth_token, not both"
    )]
    AmbiguousAuth,
}

//! MCP-backed tool discovery and execution.

use crate::auth::WorkspaceAuth;
use crate::model::ToolSpec;
use crate::tools::{ToolCatalog, ToolError, ToolExecutor, ToolProvider};
use async_trait::async_trait;
use mcp::{Session, SessionConfig};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, warn};

/// Discovers tools from a set of MCP endpoints.
///
/// Each discovery opens a fresh session per endpoint, lists its tools, and
/// closes the session again; nothing is cached or pooled. An endpoint that
/// fails to answer is skipped with a warning so the remaining endpoints
/// still contribute. When two endpoints expose the same tool name, the one
/// listed later wins.
pub struct McpToolProvider {
    endpoints: Vec<String>,
    auth: Option<WorkspaceAuth>,
}

impl McpToolProvider {
    pub fn new(endpoints: Vec<String>, auth: Option<WorkspaceAuth>) -> Self {
        Self { endpoints, auth }
    }

    fn session_config(&self, url: &str) -> SessionConfig {
        let mut config = SessionConfig::new(url);
        if let Some(auth) = &self.auth {
            config = config.with_bearer_token(auth.token());
        }
        config
    }
}

#[async_trait]
impl ToolProvider for McpToolProvider {
    async fn discover(&self) -> Result<ToolCatalog, ToolError> {
        let mut catalog = ToolCatalog::new();
        for endpoint in &self.endpoints {
            let tools = match list_endpoint_tools(self.session_config(endpoint)).await {
                Ok(tools) => tools,
                Err(error) => {
                    warn!(endpoint = %endpoint, %error, "skipping mcp endpoint, discovery failed");
                    continue;
                }
            };
            for tool in tools {
                let spec = ToolSpec::new(
                    &tool.name,
                    tool.description.clone().unwrap_or_default(),
                    tool.input_schema.clone(),
                );
                debug!(endpoint = %endpoint, tool = %spec.name, "discovered tool");
                let executor = McpToolExecutor {
                    config: self.session_config(endpoint),
                    tool: tool.name,
                };
                catalog.register(spec, Arc::new(executor));
            }
        }
        Ok(catalog)
    }
}

async fn list_endpoint_tools(config: SessionConfig) -> mcp::Result<Vec<mcp::Tool>> {
    let session = Session::connect(config).await?;
    let tools = session.list_tools().await;
    session.close().await;
    tools
}

/// Invokes one remote tool, opening a fresh session per call.
struct McpToolExecutor {
    config: SessionConfig,
    tool: String,
}

#[async_trait]
impl ToolExecutor for McpToolExecutor {
    async fn invoke(&self, arguments: Map<String, Value>) -> Result<String, ToolError> {
        let session = Session::connect(self.config.clone())
            .await
            .map_err(|error| ToolError::Execution(error.to_string()))?;
        let result = session.call_tool(&self.tool, Some(arguments)).await;
        session.close().await;
        match result {
            Ok(result) => Ok(result.joined_text()),
            // The failure text the server embedded in the result is the
            // useful part; pass it on without the wrapper.
            Err(mcp::Error::ToolCallFailed(text)) => Err(ToolError::Execution(text)),
            Err(error) => Err(ToolError::Execution(error.to_string())),
        }
    }
}

//! Single-turn orchestration.
//!
//! One call to [`GenieAgent::predict`] is one complete turn: discover the
//! tool surface, consult the model with it, execute at most the first
//! requested tool, then consult the model once more with no tools offered
//! so it has to answer. The model is consulted at most twice per turn and
//! nothing survives the turn.

use crate::error::Result;
use crate::history::{self, HistoryItem};
use crate::model::{Backend, ChatRequest, ChatTurn, ToolCallRequest};
use crate::tools::{ToolCatalog, ToolError, ToolProvider};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// What one turn produced: every message appended after the caller's input,
/// each tagged with a fresh id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictResponse {
    pub messages: Vec<ChatTurn>,
}

/// The single-turn agent: one model backend, one tool provider, one system
/// prompt.
pub struct GenieAgent<B, T> {
    backend: B,
    tools: T,
    system_prompt: String,
}

impl<B: Backend, T: ToolProvider> GenieAgent<B, T> {
    pub fn new(backend: B, tools: T, system_prompt: impl Into<String>) -> Self {
        Self {
            backend,
            tools,
            system_prompt: system_prompt.into(),
        }
    }

    /// Run one turn over the caller's history.
    pub async fn predict(&self, input: Vec<HistoryItem>) -> Result<PredictResponse> {
        let mut records: Vec<HistoryItem> = Vec::with_capacity(input.len() + 1);
        records.push(ChatTurn::system(&self.system_prompt).into());
        records.extend(input);

        // Discovery trouble never fails the turn; the model just sees
        // fewer (or no) tools.
        let catalog = match self.tools.discover().await {
            Ok(catalog) => catalog,
            Err(error) => {
                warn!(%error, "tool discovery failed, continuing without tools");
                ToolCatalog::new()
            }
        };
        let specs = catalog.specs();
        info!(tools = specs.len(), "starting turn");

        // First consultation: the model sees the full tool surface.
        let turns = history::normalize_all(&records);
        let first = self
            .backend
            .complete(ChatRequest {
                messages: &turns,
                tools: &specs,
            })
            .await?;
        let reply = first.message.with_id(Uuid::new_v4().to_string());
        let mut produced = vec![reply.clone()];
        records.push(reply.clone().into());

        let calls = reply.tool_call_requests();
        if calls.is_empty() {
            return Ok(PredictResponse { messages: produced });
        }
        if calls.len() > 1 {
            debug!(
                dropped = calls.len() - 1,
                "model requested multiple tools, honoring the first"
            );
        }

        let call = &calls[0];
        let output = self.run_tool(&catalog, call).await;
        records.push(HistoryItem::FunctionCallOutput {
            call_id: call.id.clone(),
            output: output.clone(),
        });
        produced.push(ChatTurn::tool_output(&call.id, output).with_id(Uuid::new_v4().to_string()));

        // Second consultation: no tools offered, so the model must answer.
        let turns = history::normalize_all(&records);
        let second = self
            .backend
            .complete(ChatRequest {
                messages: &turns,
                tools: &[],
            })
            .await?;
        produced.push(second.message.with_id(Uuid::new_v4().to_string()));

        Ok(PredictResponse { messages: produced })
    }

    /// Execute one requested call. Failures of any kind become the tool's
    /// output text; the model gets to read them and still answer.
    async fn run_tool(&self, catalog: &ToolCatalog, call: &ToolCallRequest) -> String {
        let name = &call.function.name;
        let invocation = async {
            let executor = catalog
                .executor(name)
                .ok_or_else(|| ToolError::NotFound(name.clone()))?;
            let arguments = call
                .arguments_map()
                .map_err(|error| ToolError::InvalidArguments(error.to_string()))?;
            executor.invoke(arguments).await
        };
        match invocation.await {
            Ok(output) => {
                debug!(tool = %name, "tool call succeeded");
                output
            }
            Err(error) => {
                warn!(tool = %name, %error, "tool call failed, reporting inline");
                format!("Error invoking {name}: {error}")
            }
        }
    }
}

//! Bridges A2A requests into single-turn agent predictions.

use a2a::{AgentExecutor, EventQueue, ExecutorError, Message, RequestContext};
use async_trait::async_trait;
use runtime::tools::ToolProvider;
use runtime::{Backend, ChatTurn, GenieAgent, HistoryItem, PredictResponse, Role};
use tracing::info;

/// Executes each incoming message as one agent turn.
pub struct GenieExecutor<B, T> {
    agent: GenieAgent<B, T>,
}

impl<B: Backend, T: ToolProvider> GenieExecutor<B, T> {
    pub fn new(agent: GenieAgent<B, T>) -> Self {
        Self { agent }
    }
}

#[async_trait]
impl<B, T> AgentExecutor for GenieExecutor<B, T>
where
    B: Backend + 'static,
    T: ToolProvider + 'static,
{
    async fn execute(&self, ctx: RequestContext, queue: EventQueue) -> Result<(), ExecutorError> {
        let text = ctx.user_input();
        info!(chars = text.len(), "handling message");

        let input = vec![HistoryItem::from(ChatTurn::user(text))];
        let response = self
            .agent
            .predict(input)
            .await
            .map_err(|error| ExecutorError::Failed(error.to_string()))?;

        queue
            .enqueue_message(Message::agent_text(final_text(&response)))
            .await;
        Ok(())
    }

    async fn cancel(&self, _ctx: RequestContext, _queue: EventQueue) -> Result<(), ExecutorError> {
        Err(ExecutorError::CancelUnsupported)
    }
}

/// All assistant text from the turn, later passages on their own lines.
fn final_text(response: &PredictResponse) -> String {
    let passages: Vec<&str> = response
        .messages
        .iter()
        .filter(|message| message.role == Role::Assistant)
        .map(|message| message.text_content())
        .filter(|text| !text.is_empty())
        .collect();
    passages.join("\n")
}

//! The executor seam between the protocol server and an agent.

use crate::protocol::{Message, SendMessageResult};
use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::debug;

/// Errors an executor can report back to the request handler.
#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("cancellation is not supported")]
    CancelUnsupported,
    #[error("{0}")]
    Failed(String),
}

/// What the server knows about the request being executed.
#[derive(Debug, Clone)]
pub struct RequestContext {
    message: Option<Message>,
    task_id: Option<String>,
}

impl RequestContext {
    /// Context for an incoming `message/send` or `message/stream`.
    pub fn for_message(message: Message) -> Self {
        Self {
            message: Some(message),
            task_id: None,
        }
    }

    /// Context for a task-addressed request (`tasks/cancel`).
    pub fn for_task(task_id: impl Into<String>) -> Self {
        Self {
            message: None,
            task_id: Some(task_id.into()),
        }
    }

    /// Text parts of the incoming message joined with newlines; empty when
    /// the request carried no message.
    pub fn user_input(&self) -> String {
        self.message
            .as_ref()
            .map(Message::text_content)
            .unwrap_or_default()
    }

    pub fn message(&self) -> Option<&Message> {
        self.message.as_ref()
    }

    pub fn message_id(&self) -> Option<&str> {
        self.message.as_ref().map(|m| m.message_id.as_str())
    }

    pub fn task_id(&self) -> Option<&str> {
        self.task_id.as_deref()
    }
}

/// Sending half of the per-request event channel.
///
/// The handler holds the receiving half and turns events into JSON-RPC
/// results. Enqueueing after the client went away is a no-op.
#[derive(Debug, Clone)]
pub struct EventQueue {
    sender: mpsc::Sender<SendMessageResult>,
}

impl EventQueue {
    pub(crate) fn channel(capacity: usize) -> (Self, mpsc::Receiver<SendMessageResult>) {
        let (sender, receiver) = mpsc::channel(capacity);
        (Self { sender }, receiver)
    }

    pub async fn enqueue_message(&self, message: Message) {
        self.enqueue(SendMessageResult::Message(message)).await;
    }

    pub async fn enqueue(&self, event: SendMessageResult) {
        if self.sender.send(event).await.is_err() {
            debug!("event queue closed, dropping event");
        }
    }
}

/// An agent that can be driven over the A2A protocol.
///
/// This is the boundary between protocol plumbing and agent logic. One
/// `execute` call handles one request; the executor reports its reply by
/// enqueueing a message before returning.
#[async_trait]
pub trait AgentExecutor: Send + Sync {
    /// Run the agent for one request.
    async fn execute(&self, ctx: RequestContext, queue: EventQueue) -> Result<(), ExecutorError>;

    /// Cancel an in-flight request.
    async fn cancel(&self, ctx: RequestContext, queue: EventQueue) -> Result<(), ExecutorError>;
}

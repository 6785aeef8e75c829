//! A2A (agent-to-agent) protocol library.
//!
//! This crate provides the wire types, a JSON-RPC request handler plus axum
//! server for exposing an agent behind the protocol, and a small client for
//! talking to one.
//!
//! # Example
//!
//! ```no_run
//! use a2a::{CardResolver, Client, Message};
//!
//! # async fn example() -> a2a::Result<()> {
//! let card = CardResolver::new("http://localhost:8000").resolve().await?;
//! println!("Agent: {} v{}", card.name, card.version);
//!
//! let client = Client::from_card(&card);
//! let reply = client
//!     .send_message(Message::user_text("List top 3 distribution centers."))
//!     .await?;
//! println!("{reply:?}");
//! # Ok(())
//! # }
//! ```

mod client;
mod error;
mod executor;
mod protocol;
mod server;

pub use client::{CardResolver, Client};
pub use error::{Error, Result};
pub use executor::{AgentExecutor, EventQueue, ExecutorError, RequestContext};
pub use protocol::{
    AGENT_CARD_PATH, AgentCapabilities, AgentCard, AgentSkill, JsonRpcError, JsonRpcRequest,
    JsonRpcResponse, Message, MessageSendParams, Part, RequestId, Role, SendMessageResult, Task,
    TaskIdParams, TaskState, TaskStatus,
};
pub use server::{AgentServer, RequestHandler};

//! Genie agent runtime: single-turn orchestration over Databricks.
//!
//! This crate provides the core runtime for the genie agent: a chat
//! history adapter, a serving-endpoint model backend, MCP tool discovery,
//! and the single-turn orchestrator that ties them together.
//!
//! # Overview
//!
//! The runtime is organized around these concepts:
//!
//! - **GenieAgent**: Runs one complete turn per call; it consults the
//!   model at most twice and executes at most one tool in between.
//! - **Backend**: A trait abstracting chat-completion providers
//!   (Databricks serving endpoints).
//! - **ToolProvider**: Discovers a catalog of executable tools, typically
//!   from remote MCP servers.
//!
//! # Example
//!
//! ```ignore
//! use runtime::{ChatTurn, DatabricksBackend, GenieAgent, WorkspaceAuth};
//! use runtime::tools::McpToolProvider;
//!
//! # async fn example() -> runtime::Result<()> {
//! let auth = WorkspaceAuth::Pat("dapi-...".into());
//! let backend = DatabricksBackend::builder(
//!     "https://my-workspace.cloud.databricks.com",
//!     auth.clone(),
//!     "databricks-meta-llama-3-3-70b-instruct",
//! )
//! .build();
//! let tools = McpToolProvider::new(
//!     vec!["https://my-workspace.cloud.databricks.com/api/2.0/mcp/genie/abc123".into()],
//!     Some(auth),
//! );
//!
//! let agent = GenieAgent::new(backend, tools, "You are a helpful assistant.");
//! let response = agent
//!     .predict(vec![ChatTurn::user("List top 3 distribution centers.").into()])
//!     .await?;
//! println!("{response:?}");
//! # Ok(())
//! # }
//! ```

mod agent;
mod auth;
mod error;
mod history;
pub mod model;
mod providers;
pub mod tools;

// Orchestration
pub use agent::{GenieAgent, PredictResponse};

// Chat history wire shapes
pub use history::{ContentFragment, HistoryItem, MessageContent, normalize, normalize_all};

// Model core types (provider-agnostic)
pub use model::{
    Backend, ChatRequest, ChatResponse, ChatTurn, FunctionCall, ModelError, Role, ToolCallRequest,
    ToolSpec, Usage,
};

// Providers
pub use providers::{DatabricksBackend, DatabricksBackendBuilder};

// Workspace auth
pub use auth::WorkspaceAuth;

// Error types
pub use error::{Error, Result};

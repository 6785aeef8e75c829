//! MCP (Model Context Protocol) client library.
//!
//! This crate provides a client for communicating with MCP servers over the
//! streamable HTTP transport.
//!
//! # Example
//!
//! ```no_run
//! use mcp::{Session, SessionConfig};
//!
//! # async fn example() -> mcp::Result<()> {
//! let config = SessionConfig::new("https://example.com/api/mcp/genie")
//!     .with_bearer_token("dapi-secret");
//!
//! let session = Session::connect(config).await?;
//!
//! for tool in session.list_tools().await? {
//!     println!("Tool: {}", tool.name);
//! }
//!
//! let mut arguments = serde_json::Map::new();
//! arguments.insert("query".to_string(), "top distribution centers".into());
//! let result = session.call_tool("query_space", Some(arguments)).await?;
//! println!("{}", result.joined_text());
//!
//! session.close().await;
//! # Ok(())
//! # }
//! ```

mod client;
mod error;
mod protocol;

pub use client::{Session, SessionConfig};
pub use error::{Error, Result};
pub use protocol::{
    CallToolParams, CallToolResult, InitializeParams, InitializeResult, JsonRpcError,
    JsonRpcNotification, JsonRpcRequest, JsonRpcResponse, ListToolsParams, ListToolsResult,
    PROTOCOL_VERSION, RequestId, ResourceContents, ServerCapabilities, ServerInfo, Tool,
    ToolContent,
};

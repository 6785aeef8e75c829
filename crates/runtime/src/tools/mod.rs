//! Tool discovery and execution.

pub mod errors;
mod mcp;
mod provider;

pub use errors::ToolError;
pub use mcp::McpToolProvider;
pub use provider::{StaticToolProvider, ToolCatalog, ToolExecutor, ToolProvider};

use thiserror::Error;

/// Errors from tool discovery and execution.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("tool not found: {0}")]
    NotFound(String),
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),
    #[error("discovery failed: {0}")]
    Discovery(String),
    #[error("execution failed: {0}")]
    Execution(String),
}

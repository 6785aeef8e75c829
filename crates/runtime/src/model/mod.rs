//! Chat protocol types and the backend trait.

pub mod errors;
pub mod types;

pub use errors::ModelError;
pub use types::{
    Backend, ChatRequest, ChatResponse, ChatTurn, FunctionCall, Role, ToolCallRequest, ToolSpec,
    Usage,
};

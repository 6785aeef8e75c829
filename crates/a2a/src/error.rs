//! A2A error types.

use crate::protocol::JsonRpcError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("http transport: {0}")]
    Http(#[from] reqwest::Error),

    #[error("endpoint returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("json serialization: {0}")]
    Json(#[from] serde_json::Error),

    #[error("agent returned an error: {0}")]
    Rpc(#[from] JsonRpcError),

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

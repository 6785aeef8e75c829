use thiserror::Error;

/// Errors from LLM provider calls.
///
/// Marked `#[non_exhaustive]` so new failure modes can be added without
/// breaking downstream matches.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ModelError {
    /// The request never produced an HTTP response.
    #[error("network: {0}")]
    Network(String),

    /// The endpoint answered with a non-success status.
    #[error("provider api: {0}")]
    Api(String),

    /// The endpoint answered, but not with anything we can use.
    #[error("invalid provider response: {0}")]
    InvalidResponse(String),
}

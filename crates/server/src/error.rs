//! Server error types.

use crate::config::ConfigError;
use thiserror::Error;

/// Startup and serving errors.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Configuration is invalid or missing required fields.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// An error occurred in the A2A layer.
    #[error(transparent)]
    A2a(#[from] a2a::Error),

    /// An I/O error occurred.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

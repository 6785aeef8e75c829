//! Wiring for the genie A2A server: configuration, the public agent
//! card, and the executor bridging A2A requests into agent turns.

pub mod card;
pub mod config;
pub mod error;
pub mod executor;

pub use card::agent_card;
pub use config::{Config, ConfigError};
pub use error::{Error, Result};
pub use executor::GenieExecutor;

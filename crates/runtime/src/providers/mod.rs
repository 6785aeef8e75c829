//! LLM provider backends.

mod databricks;

pub use databricks::{DatabricksBackend, DatabricksBackendBuilder};

//! Tool discovery seam and the per-turn catalog.

use crate::model::ToolSpec;
use crate::tools::ToolError;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;

/// Executes one named tool.
///
/// Implementations own whatever connection state an invocation needs; the
/// orchestrator only ever hands them decoded arguments.
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    async fn invoke(&self, arguments: Map<String, Value>) -> Result<String, ToolError>;
}

/// Discovers the tools available to a turn.
///
/// Discovery runs once per turn, and what it returns is that turn's whole
/// tool surface.
#[async_trait]
pub trait ToolProvider: Send + Sync {
    async fn discover(&self) -> Result<ToolCatalog, ToolError>;
}

/// The tools one turn may use, keyed by name.
#[derive(Default, Clone)]
pub struct ToolCatalog {
    entries: HashMap<String, CatalogEntry>,
}

#[derive(Clone)]
struct CatalogEntry {
    spec: ToolSpec,
    executor: Arc<dyn ToolExecutor>,
}

impl ToolCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool. A later registration under the same name replaces
    /// the earlier one.
    pub fn register(&mut self, spec: ToolSpec, executor: Arc<dyn ToolExecutor>) {
        self.entries
            .insert(spec.name.clone(), CatalogEntry { spec, executor });
    }

    /// Specs in deterministic (name) order.
    pub fn specs(&self) -> Vec<ToolSpec> {
        let mut specs: Vec<ToolSpec> =
            self.entries.values().map(|entry| entry.spec.clone()).collect();
        specs.sort_by(|a, b| a.name.cmp(&b.name));
        specs
    }

    pub fn executor(&self, name: &str) -> Option<Arc<dyn ToolExecutor>> {
        self.entries
            .get(name)
            .map(|entry| Arc::clone(&entry.executor))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Serves a fixed catalog; discovery never fails.
///
/// Useful for testing or when no tool endpoints are configured.
#[derive(Default, Clone)]
pub struct StaticToolProvider {
    catalog: ToolCatalog,
}

impl StaticToolProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tool(mut self, spec: ToolSpec, executor: Arc<dyn ToolExecutor>) -> Self {
        self.catalog.register(spec, executor);
        self
    }
}

#[async_trait]
impl ToolProvider for StaticToolProvider {
    async fn discover(&self) -> Result<ToolCatalog, ToolError> {
        Ok(self.catalog.clone())
    }
}

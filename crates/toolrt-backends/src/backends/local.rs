//! In-process backend: executes tools registered as boxed closures/handlers
//! directly in the host process, against an arbitrary handler registry.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use toolrt_types::Tool;

use crate::backend::{Backend, BackendMetadata, Lifecycle, LifecycleState};
use crate::error::BackendError;

/// An in-process tool implementation: a schema plus an async handler.
#[async_trait]
pub trait LocalHandler: Send + Sync {
    fn tool(&self) -> Tool;
    fn requires_approval(&self) -> bool {
        false
    }
    async fn call(&self, ctx: &CancellationToken, args: Value) -> Result<Value, BackendError>;
}

/// Backend that dispatches to a registry of in-process handlers keyed by
/// tool name.
pub struct LocalBackend {
    name: String,
    enabled: bool,
    lifecycle: Lifecycle,
    handlers: HashMap<String, Arc<dyn LocalHandler>>,
}

impl LocalBackend {
    pub fn new(name: impl Into<String>, handlers: Vec<Arc<dyn LocalHandler>>) -> Self {
        let mut map = HashMap::new();
        for handler in handlers {
            map.insert(handler.tool().name.clone(), handler);
        }
        Self {
            name: name.into(),
            enabled: true,
            lifecycle: Lifecycle::new(),
            handlers: map,
        }
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn has_tool(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }
}

#[async_trait]
impl Backend for LocalBackend {
    fn kind(&self) -> &str {
        "local"
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn enabled(&self) -> bool {
        self.enabled
    }

    fn lifecycle(&self) -> LifecycleState {
        self.lifecycle.get()
    }

    async fn list_tools(&self, ctx: &CancellationToken) -> Result<Vec<Tool>, BackendError> {
        if ctx.is_cancelled() {
            return Err(BackendError::Cancelled);
        }
        Ok(self.handlers.values().map(|h| h.tool()).collect())
    }

    async fn execute(
        &self,
        ctx: &CancellationToken,
        local_tool_name: &str,
        args: Value,
    ) -> Result<Value, BackendError> {
        if ctx.is_cancelled() {
            return Err(BackendError::Cancelled);
        }
        let handler = self
            .handlers
            .get(local_tool_name)
            .ok_or_else(|| BackendError::ToolNotFound(local_tool_name.to_string()))?;
        handler.call(ctx, args).await
    }

    async fn start(&self, _ctx: &CancellationToken) -> Result<(), BackendError> {
        self.lifecycle.mark_started();
        Ok(())
    }

    async fn stop(&self) -> Result<(), BackendError> {
        self.lifecycle.mark_stopped();
        Ok(())
    }

    fn requires_approval(&self, local_tool_name: &str) -> bool {
        self.handlers
            .get(local_tool_name)
            .map(|h| h.requires_approval())
            .unwrap_or(false)
    }

    fn metadata(&self) -> BackendMetadata {
        BackendMetadata::new(&self.name, "local")
            .with_location("localhost")
            .with_info("tool_count", self.handlers.len().to_string())
    }
}

//! Union view over all enabled backends: one flat tool catalog plus routed
//! execution.

use std::sync::Arc;

use serde_json::Value;
use tokio_util::sync::CancellationToken;
use toolrt_types::{Tool, ToolId};
use tracing::instrument;

use crate::error::BackendError;
use crate::registry::Registry;

pub struct Aggregator {
    registry: Arc<Registry>,
}

impl Aggregator {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self { registry }
    }

    /// Iterates enabled backends in registry order, concatenating their
    /// tools and filling in a missing namespace with the backend's instance
    /// name. Any backend error aborts the whole call — no partial catalog
    /// (see design notes: this is deliberate fail-fast behavior, not a
    /// missing feature).
    #[instrument(skip(self, ctx))]
    pub async fn list_all_tools(&self, ctx: &CancellationToken) -> Result<Vec<Tool>, BackendError> {
        let mut tools = Vec::new();
        for backend in self.registry.list_enabled().await {
            if ctx.is_cancelled() {
                return Err(BackendError::Cancelled);
            }
            let backend_tools = backend.list_tools(ctx).await?;
            for mut tool in backend_tools {
                if tool.namespace.is_empty() {
                    tool.namespace = backend.name().to_string();
                }
                tools.push(tool);
            }
        }
        Ok(tools)
    }

    /// Parse `full_tool_id`, resolve its backend, and execute the local tool
    /// name against it.
    #[instrument(skip(self, ctx, args), fields(tool_id = %full_tool_id))]
    pub async fn execute(
        &self,
        ctx: &CancellationToken,
        full_tool_id: &str,
        args: Value,
    ) -> Result<Value, BackendError> {
        let id =
            ToolId::parse(full_tool_id).map_err(|e| BackendError::InvalidToolId(e.to_string()))?;

        if !id.has_backend() {
            return Err(BackendError::InvalidToolId(format!(
                "tool id {full_tool_id:?} has no backend component"
            )));
        }

        let backend = self
            .registry
            .get(&id.backend)
            .await
            .ok_or_else(|| BackendError::NotFound(id.backend.clone()))?;

        if !backend.enabled() {
            return Err(BackendError::Disabled(id.backend.clone()));
        }

        backend.execute(ctx, &id.name, args).await
    }
}

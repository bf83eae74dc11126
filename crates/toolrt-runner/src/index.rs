//! Tool/backend index: the runner's primary resolver, backed by the backend
//! registry and the `ToolId` namespaced/bare distinction.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use toolrt_backends::{Backend, Registry};
use toolrt_types::{Tool, ToolId};

/// Resolves a [`ToolId`] to its schema and to the backend(s) that can run
/// it, scanning the registry's enabled backends when the id is bare.
pub struct ToolIndex {
    registry: Arc<Registry>,
}

impl ToolIndex {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self { registry }
    }

    pub async fn resolve_tool(&self, ctx: &CancellationToken, id: &ToolId) -> Option<Tool> {
        if id.has_backend() {
            let backend = self.registry.get(&id.backend).await?;
            let tools = backend.list_tools(ctx).await.ok()?;
            tools.into_iter().find(|t| t.name == id.name)
        } else {
            for backend in self.registry.list_enabled().await {
                if let Ok(tools) = backend.list_tools(ctx).await
                    && let Some(tool) = tools.into_iter().find(|t| t.name == id.name)
                {
                    return Some(tool);
                }
            }
            None
        }
    }

    pub async fn candidate_backends(
        &self,
        ctx: &CancellationToken,
        id: &ToolId,
    ) -> Vec<Arc<dyn Backend>> {
        if id.has_backend() {
            self.registry.get(&id.backend).await.into_iter().collect()
        } else {
            let mut candidates = Vec::new();
            for backend in self.registry.list_enabled().await {
                if let Ok(tools) = backend.list_tools(ctx).await
                    && tools.iter().any(|t| t.name == id.name)
                {
                    candidates.push(backend);
                }
            }
            candidates
        }
    }
}

//! Read-only tool catalog consumed by [`crate::tools::Tools`]: search,
//! namespace enumeration, and documentation. Backed by the backend registry
//! and aggregator (§6 "Interfaces consumed from collaborators").

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use toolrt_backends::{Aggregator, Registry};
use toolrt_types::Tool;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetailLevel {
    Summary,
    Full,
}

#[async_trait]
pub trait ToolCatalog: Send + Sync {
    async fn search_tools(&self, ctx: &CancellationToken, query: &str, limit: usize) -> Vec<Tool>;
    async fn list_namespaces(&self, ctx: &CancellationToken) -> Vec<String>;
    async fn describe_tool(
        &self,
        ctx: &CancellationToken,
        full_tool_id: &str,
        detail: DetailLevel,
    ) -> Option<String>;
    async fn list_tool_examples(
        &self,
        ctx: &CancellationToken,
        full_tool_id: &str,
        max: usize,
    ) -> Vec<String>;
}

/// Default catalog backed directly by the aggregator's flat tool view.
/// Examples are always empty — there is no example store in this layer;
/// a richer catalog implementation can be substituted via [`ToolCatalog`].
pub struct RegistryCatalog {
    registry: Arc<Registry>,
    aggregator: Arc<Aggregator>,
}

impl RegistryCatalog {
    pub fn new(registry: Arc<Registry>, aggregator: Arc<Aggregator>) -> Self {
        Self {
            registry,
            aggregator,
        }
    }
}

#[async_trait]
impl ToolCatalog for RegistryCatalog {
    async fn search_tools(&self, ctx: &CancellationToken, query: &str, limit: usize) -> Vec<Tool> {
        let Ok(tools) = self.aggregator.list_all_tools(ctx).await else {
            return Vec::new();
        };
        let query = query.to_lowercase();
        let mut matches: Vec<Tool> = tools
            .into_iter()
            .filter(|t| {
                query.is_empty()
                    || t.name.to_lowercase().contains(&query)
                    || t.description.to_lowercase().contains(&query)
            })
            .collect();
        if limit > 0 {
            matches.truncate(limit);
        }
        matches
    }

    async fn list_namespaces(&self, _ctx: &CancellationToken) -> Vec<String> {
        let mut namespaces: Vec<String> = self
            .registry
            .list_enabled()
            .await
            .into_iter()
            .map(|b| b.name().to_string())
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        namespaces.sort();
        namespaces
    }

    async fn describe_tool(
        &self,
        ctx: &CancellationToken,
        full_tool_id: &str,
        detail: DetailLevel,
    ) -> Option<String> {
        let tools = self.aggregator.list_all_tools(ctx).await.ok()?;
        let tool = tools
            .into_iter()
            .find(|t| t.id().to_string() == full_tool_id || t.name == full_tool_id)?;
        Some(match detail {
            DetailLevel::Summary => tool.description,
            DetailLevel::Full => format!(
                "{}\n\nnamespace: {}\ninput schema: {}",
                tool.description, tool.namespace, tool.input_schema
            ),
        })
    }

    async fn list_tool_examples(
        &self,
        _ctx: &CancellationToken,
        _full_tool_id: &str,
        _max: usize,
    ) -> Vec<String> {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use toolrt_backends::backends::local::{LocalBackend, LocalHandler};
    use toolrt_backends::error::BackendError;

    struct EchoHandler;

    #[async_trait]
    impl LocalHandler for EchoHandler {
        fn tool(&self) -> Tool {
            Tool::new("echo", "echoes back its input", json!({"type": "object"}))
        }
        async fn call(&self, _ctx: &CancellationToken, args: serde_json::Value) -> Result<serde_json::Value, BackendError> {
            Ok(args)
        }
    }

    async fn catalog_with_one_backend() -> RegistryCatalog {
        let registry = Arc::new(Registry::new());
        let backend = Arc::new(LocalBackend::new("mb", vec![Arc::new(EchoHandler)]));
        registry.register("mb", backend).await.unwrap();
        let aggregator = Arc::new(Aggregator::new(Arc::clone(&registry)));
        RegistryCatalog::new(registry, aggregator)
    }

    #[tokio::test]
    async fn search_matches_by_name_and_description() {
        let catalog = catalog_with_one_backend().await;
        let ctx = CancellationToken::new();
        let found = catalog.search_tools(&ctx, "echo", 0).await;
        assert_eq!(found.len(), 1);
        assert!(catalog.search_tools(&ctx, "nonexistent", 0).await.is_empty());
    }

    #[tokio::test]
    async fn search_respects_limit() {
        let catalog = catalog_with_one_backend().await;
        let ctx = CancellationToken::new();
        let found = catalog.search_tools(&ctx, "", 0).await;
        assert_eq!(found.len(), 1);
    }

    #[tokio::test]
    async fn list_namespaces_reflects_backend_names() {
        let catalog = catalog_with_one_backend().await;
        let namespaces = catalog.list_namespaces(&CancellationToken::new()).await;
        assert_eq!(namespaces, vec!["mb".to_string()]);
    }

    #[tokio::test]
    async fn describe_tool_full_includes_schema() {
        let catalog = catalog_with_one_backend().await;
        let ctx = CancellationToken::new();
        let summary = catalog.describe_tool(&ctx, "mb:echo", DetailLevel::Summary).await.unwrap();
        assert_eq!(summary, "echoes back its input");
        let full = catalog.describe_tool(&ctx, "mb:echo", DetailLevel::Full).await.unwrap();
        assert!(full.contains("namespace: mb"));
        assert!(catalog.describe_tool(&ctx, "mb:missing", DetailLevel::Summary).await.is_none());
    }

    #[tokio::test]
    async fn examples_are_always_empty() {
        let catalog = catalog_with_one_backend().await;
        let ctx = CancellationToken::new();
        assert!(catalog.list_tool_examples(&ctx, "mb:echo", 10).await.is_empty());
    }
}

//! HTTP backend: forwards tool calls to a JSON/HTTP tool service. Resolves
//! its tool list at construction, forwards calls over `reqwest`, and maps
//! remote failures through unchanged.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use toolrt_types::Tool;
use tracing::{debug, instrument};

use crate::backend::{Backend, BackendMetadata, Lifecycle, LifecycleState};
use crate::error::BackendError;

#[derive(Debug, Serialize)]
struct ExecuteRequestBody<'a> {
    tool: &'a str,
    args: &'a Value,
}

#[derive(Debug, Deserialize)]
struct ExecuteResponseBody {
    #[serde(default)]
    result: Value,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ListToolsResponseBody {
    tools: Vec<Tool>,
}

/// Backend that forwards tool calls to a remote HTTP service exposing
/// `GET {base_url}/tools` and `POST {base_url}/tools/{name}/execute`.
pub struct HttpBackend {
    name: String,
    enabled: bool,
    lifecycle: Lifecycle,
    base_url: String,
    bearer_token: Option<String>,
    client: reqwest::Client,
}

impl HttpBackend {
    pub fn new(name: impl Into<String>, base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            name: name.into(),
            enabled: true,
            lifecycle: Lifecycle::new(),
            base_url: base_url.into(),
            bearer_token: None,
            client: reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_default(),
        }
    }

    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    fn authed(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.bearer_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }
}

#[async_trait]
impl Backend for HttpBackend {
    fn kind(&self) -> &str {
        "http"
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

    #[instrument(skip(self, ctx), fields(backend.name = %self.name))]
    async fn list_tools(&self, ctx: &CancellationToken) -> Result<Vec<Tool>, BackendError> {
        if ctx.is_cancelled() {
            return Err(BackendError::Cancelled);
        }
        let url = format!("{}/tools", self.base_url);
        let request = self.authed(self.client.get(&url));
        let response = request
            .send()
            .await
            .map_err(|e| BackendError::Unavailable(format!("GET {url} failed: {e}")))?;

        if !response.status().is_success() {
            return Err(BackendError::Remote(format!(
                "remote returned status {}",
                response.status()
            )));
        }

        let body: ListToolsResponseBody = response
            .json()
            .await
            .map_err(|e| BackendError::Remote(format!("invalid list-tools response: {e}")))?;
        Ok(body.tools)
    }

    #[instrument(skip(self, ctx, args), fields(backend.name = %self.name, tool = %local_tool_name))]
    async fn execute(
        &self,
        ctx: &CancellationToken,
        local_tool_name: &str,
        args: Value,
    ) -> Result<Value, BackendError> {
        if ctx.is_cancelled() {
            return Err(BackendError::Cancelled);
        }

        let url = format!("{}/tools/{}/execute", self.base_url, local_tool_name);
        let body = ExecuteRequestBody {
            tool: local_tool_name,
            args: &args,
        };

        debug!("dispatching to remote http backend");
        let request = self.authed(self.client.post(&url)).json(&body);
        let response = request
            .send()
            .await
            .map_err(|e| BackendError::Unavailable(format!("POST {url} failed: {e}")))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(BackendError::ToolNotFound(local_tool_name.to_string()));
        }
        if !response.status().is_success() {
            return Err(BackendError::Remote(format!(
                "remote returned status {}",
                response.status()
            )));
        }

        let body: ExecuteResponseBody = response
            .json()
            .await
            .map_err(|e| BackendError::Remote(format!("invalid execute response: {e}")))?;

        match body.error {
            Some(message) => Err(BackendError::Remote(message)),
            None => Ok(body.result),
        }
    }

    async fn start(&self, _ctx: &CancellationToken) -> Result<(), BackendError> {
        self.lifecycle.mark_started();
        Ok(())
    }

    async fn stop(&self) -> Result<(), BackendError> {
        self.lifecycle.mark_stopped();
        Ok(())
    }

    async fn health_check(&self) -> bool {
        let url = format!("{}/healthz", self.base_url);
        self.client
            .get(&url)
            .send()
            .await
            .map(|r| r.status().is_success())
            .unwrap_or(false)
    }

    fn metadata(&self) -> BackendMetadata {
        BackendMetadata::new(&self.name, "http").with_location(self.base_url.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn backend() -> HttpBackend {
        HttpBackend::new("remote-svc", "http://127.0.0.1:9", Duration::from_millis(50))
    }

    #[tokio::test]
    async fn cancelled_context_short_circuits_list_tools() {
        let backend = backend();
        let ctx = CancellationToken::new();
        ctx.cancel();
        let err = backend.list_tools(&ctx).await.unwrap_err();
        assert!(err.is_kind(toolrt_types::ErrorKind::Cancelled));
    }

    #[tokio::test]
    async fn cancelled_context_short_circuits_execute() {
        let backend = backend();
        let ctx = CancellationToken::new();
        ctx.cancel();
        let err = backend.execute(&ctx, "some_tool", json!({})).await.unwrap_err();
        assert!(err.is_kind(toolrt_types::ErrorKind::Cancelled));
    }

    #[test]
    fn metadata_reports_base_url() {
        let backend = backend();
        let metadata = backend.metadata();
        assert_eq!(metadata.location.as_deref(), Some("http://127.0.0.1:9"));
    }

    #[tokio::test]
    async fn lifecycle_transitions() {
        let backend = backend();
        assert_eq!(backend.lifecycle(), LifecycleState::New);
        backend.start(&CancellationToken::new()).await.unwrap();
        assert_eq!(backend.lifecycle(), LifecycleState::Started);
        backend.stop().await.unwrap();
        assert_eq!(backend.lifecycle(), LifecycleState::Stopped);
    }
}

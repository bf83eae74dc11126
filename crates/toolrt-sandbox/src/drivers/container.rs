//! Generic container driver (namespaces + cgroups). The actual container
//! runtime (Docker/containerd/whatever) is an external daemon not modeled
//! in this crate, so the driver delegates to a pluggable [`ContainerClient`]
//! rather than shelling out to a specific CLI.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::SandboxError;
use crate::health::{HealthChecker, ImageResolver};
use crate::request::{ExecuteRequest, validate_request};
use crate::result::{BackendInfo, BackendKind, ExecuteResult, Readiness};

/// What a container runtime client needs to support for this driver.
/// A production implementation would speak to a local daemon socket or a
/// remote container-orchestration API; that wire protocol is out of scope
/// here.
#[async_trait]
pub trait ContainerClient: Send + Sync {
    async fn run(
        &self,
        ctx: &CancellationToken,
        image: &str,
        req: &ExecuteRequest,
    ) -> Result<ExecuteResult, SandboxError>;
}

pub struct ContainerDriver {
    client: std::sync::Arc<dyn ContainerClient>,
    health: Option<std::sync::Arc<dyn HealthChecker>>,
    image_resolver: Option<std::sync::Arc<dyn ImageResolver>>,
    default_image: String,
}

impl ContainerDriver {
    pub fn new(client: std::sync::Arc<dyn ContainerClient>, default_image: impl Into<String>) -> Self {
        Self {
            client,
            health: None,
            image_resolver: None,
            default_image: default_image.into(),
        }
    }

    pub fn with_health_checker(mut self, checker: std::sync::Arc<dyn HealthChecker>) -> Self {
        self.health = Some(checker);
        self
    }

    pub fn with_image_resolver(mut self, resolver: std::sync::Arc<dyn ImageResolver>) -> Self {
        self.image_resolver = Some(resolver);
        self
    }
}

#[async_trait]
impl crate::driver::IsolationBackend for ContainerDriver {
    fn kind(&self) -> BackendKind {
        BackendKind::Container
    }

    async fn info(&self, _ctx: &CancellationToken) -> BackendInfo {
        BackendInfo {
            kind: BackendKind::Container,
            readiness: Readiness::Ready,
            details: format!("default_image={}", self.default_image),
        }
    }

    async fn execute(
        &self,
        ctx: &CancellationToken,
        req: &ExecuteRequest,
    ) -> Result<ExecuteResult, SandboxError> {
        validate_request(req)?;

        if let Some(checker) = &self.health {
            checker
                .ping(ctx)
                .await
                .map_err(|e| SandboxError::DaemonUnavailable(e.to_string()))?;
        }

        let image_ref = req
            .metadata
            .get("image")
            .cloned()
            .unwrap_or_else(|| self.default_image.clone());

        let resolved_image = if let Some(resolver) = &self.image_resolver {
            resolver.resolve(ctx, &image_ref).await?
        } else {
            image_ref
        };

        debug!(image = %resolved_image, profile = %req.profile, "dispatching container execution");

        self.client.run(ctx, &resolved_image, req).await
    }
}

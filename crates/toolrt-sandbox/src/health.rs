//! Optional pre-flight checks consulted by [`crate::runtime::Runtime`]
//! before dispatching to a driver.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::SandboxError;

#[async_trait]
pub trait HealthChecker: Send + Sync {
    async fn ping(&self, ctx: &CancellationToken) -> Result<(), SandboxError>;
}

#[async_trait]
pub trait ImageResolver: Send + Sync {
    async fn resolve(&self, ctx: &CancellationToken, reference: &str) -> Result<String, SandboxError>;
}

//! Orchestrator-backed driver (pod / VM-on-node). Ensures the remote
//! environment is running, polls until ready or the deadline elapses, then
//! forwards to a [`RemoteDriver`], optionally stopping the environment
//! afterward. The polling loop follows §5's requirement to `select` on
//! both the poll tick and the enclosing context.

use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::driver::IsolationBackend;
use crate::drivers::remote::RemoteDriver;
use crate::error::SandboxError;
use crate::request::{ExecuteRequest, validate_request};
use crate::result::{BackendInfo, BackendKind, ExecuteResult, Readiness};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleStatus {
    Starting,
    Running,
    Failed,
}

/// Lifecycle control for the orchestrated environment (pod, node VM, ...).
/// The orchestrator's own API shape is opaque to this crate; only the
/// start/poll/stop contract matters here.
#[async_trait]
pub trait OrchestratorLifecycle: Send + Sync {
    async fn start(&self, ctx: &CancellationToken) -> Result<(), SandboxError>;
    async fn poll_status(&self, ctx: &CancellationToken) -> Result<LifecycleStatus, SandboxError>;
    async fn stop(&self, ctx: &CancellationToken) -> Result<(), SandboxError>;
}

pub struct OrchestratorDriver {
    lifecycle: std::sync::Arc<dyn OrchestratorLifecycle>,
    remote: RemoteDriver,
    start_if_stopped: bool,
    stop_after_execute: bool,
    poll_interval: Duration,
}

impl OrchestratorDriver {
    pub fn new(lifecycle: std::sync::Arc<dyn OrchestratorLifecycle>, remote: RemoteDriver) -> Self {
        Self {
            lifecycle,
            remote,
            start_if_stopped: true,
            stop_after_execute: false,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_start_if_stopped(mut self, start_if_stopped: bool) -> Self {
        self.start_if_stopped = start_if_stopped;
        self
    }

    pub fn with_stop_after_execute(mut self, stop_after_execute: bool) -> Self {
        self.stop_after_execute = stop_after_execute;
        self
    }

    async fn wait_until_running(&self, ctx: &CancellationToken, deadline: Duration) -> Result<(), SandboxError> {
        let deadline_ctx = ctx.child_token();
        let guard = {
            let token = deadline_ctx.clone();
            tokio::spawn(async move {
                tokio::time::sleep(deadline).await;
                token.cancel();
            })
        };

        let result = loop {
            match self.lifecycle.poll_status(ctx).await? {
                LifecycleStatus::Running => break Ok(()),
                LifecycleStatus::Failed => {
                    break Err(SandboxError::DaemonUnavailable(
                        "orchestrated environment reported failed status".to_string(),
                    ));
                }
                LifecycleStatus::Starting => {
                    tokio::select! {
                        _ = deadline_ctx.cancelled() => {
                            break Err(SandboxError::DaemonUnavailable(
                                "timed out waiting for orchestrated environment to become ready".to_string(),
                            ));
                        }
                        _ = tokio::time::sleep(self.poll_interval) => {
                            debug!("polling orchestrated environment status");
                        }
                    }
                }
            }
        };

        guard.abort();
        result
    }
}

#[async_trait]
impl IsolationBackend for OrchestratorDriver {
    fn kind(&self) -> BackendKind {
        BackendKind::Orchestrator
    }

    async fn info(&self, ctx: &CancellationToken) -> BackendInfo {
        match self.lifecycle.poll_status(ctx).await {
            Ok(LifecycleStatus::Running) => BackendInfo {
                kind: BackendKind::Orchestrator,
                readiness: Readiness::Ready,
                details: "environment running".to_string(),
            },
            Ok(status) => BackendInfo {
                kind: BackendKind::Orchestrator,
                readiness: Readiness::Degraded,
                details: format!("environment status {status:?}"),
            },
            Err(e) => BackendInfo {
                kind: BackendKind::Orchestrator,
                readiness: Readiness::Unavailable,
                details: e.to_string(),
            },
        }
    }

    async fn execute(
        &self,
        ctx: &CancellationToken,
        req: &ExecuteRequest,
    ) -> Result<ExecuteResult, SandboxError> {
        validate_request(req)?;

        let timeout = if req.timeout.is_zero() { DEFAULT_TIMEOUT } else { req.timeout };

        let status = self.lifecycle.poll_status(ctx).await?;
        if status != LifecycleStatus::Running {
            if !self.start_if_stopped {
                return Err(SandboxError::DaemonUnavailable(
                    "orchestrated environment is not running and start-if-stopped is disabled".to_string(),
                ));
            }
            self.lifecycle.start(ctx).await?;
            self.wait_until_running(ctx, timeout).await?;
        }

        let result = self.remote.execute(ctx, req).await;

        if self.stop_after_execute {
            let _ = self.lifecycle.stop(ctx).await;
        }

        result
    }
}

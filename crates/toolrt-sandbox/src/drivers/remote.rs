//! Remote driver — serializes the request over HTTP per the sandbox-boundary
//! wire shape (§6), HMAC-signs the body when a token is configured, retries
//! transient failures, and treats context cancellation as a non-retry
//! signal.

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine as _;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::Sha256;
use tokio_util::sync::CancellationToken;
use toolrt_types::ToolCallRecord;
use tracing::{debug, warn};

use crate::error::SandboxError;
use crate::request::{ExecuteRequest, validate_request};
use crate::result::{BackendInfo, BackendKind, ExecuteResult, Readiness};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const NETWORK_OVERHEAD_PAD: Duration = Duration::from_secs(5);
const DEFAULT_MAX_RETRIES: u32 = 3;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Serialize)]
struct WireLimits {
    max_tool_calls: u64,
    max_chain_steps: u64,
    cpu_quota_millis: u64,
    memory_bytes: u64,
    pids_max: u64,
    disk_bytes: u64,
}

#[derive(Debug, Serialize)]
struct WireRequestInner {
    language: String,
    code: String,
    timeout_ms: u64,
    limits: WireLimits,
    profile: String,
    metadata: std::collections::HashMap<String, String>,
    enable_tracing: bool,
    requested_scope: Option<String>,
}

#[derive(Debug, Serialize)]
struct WireGateway {
    url: String,
    token: Option<String>,
    protocol: &'static str,
}

#[derive(Debug, Serialize)]
struct WireRequest {
    request: WireRequestInner,
    gateway: Option<WireGateway>,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct WireResult {
    #[serde(default)]
    value: Value,
    #[serde(default)]
    stdout: String,
    #[serde(default)]
    stderr: String,
    #[serde(default)]
    tool_calls: Vec<ToolCallRecord>,
    #[serde(default)]
    duration_ms: u64,
    #[serde(default)]
    limits_enforced: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct WireError {
    code: String,
    message: String,
}

#[derive(Debug, Deserialize)]
struct WireResponse {
    #[serde(default)]
    result: Option<WireResult>,
    #[serde(default)]
    error: Option<WireError>,
}

/// Where a [`RemoteDriver`] forwards callback gateway traffic. Kept opaque
/// to this crate — the remote side only needs a URL and an optional token
/// to dial back into the proxy gateway, per §6's gateway descriptor.
#[derive(Debug, Clone)]
pub struct GatewayEndpoint {
    pub url: String,
    pub token: Option<String>,
}

pub struct RemoteDriver {
    client: reqwest::Client,
    endpoint: String,
    bearer_token: Option<String>,
    signing_key: Option<Vec<u8>>,
    max_retries: u32,
}

impl RemoteDriver {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            endpoint: endpoint.into(),
            bearer_token: None,
            signing_key: None,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }

    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    pub fn with_signing_key(mut self, key: impl Into<Vec<u8>>) -> Self {
        self.signing_key = Some(key.into());
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    fn sign(&self, timestamp: &str, body: &[u8]) -> Option<String> {
        let key = self.signing_key.as_ref()?;
        let mut mac = HmacSha256::new_from_slice(key).ok()?;
        mac.update(timestamp.as_bytes());
        mac.update(b".");
        mac.update(body);
        let signature = mac.finalize().into_bytes();
        Some(base64::engine::general_purpose::STANDARD.encode(signature))
    }

    async fn send_once(
        &self,
        req: &ExecuteRequest,
        gateway: Option<&GatewayEndpoint>,
        timeout: Duration,
    ) -> Result<ExecuteResult, SandboxError> {
        let wire = WireRequest {
            request: WireRequestInner {
                language: req.language.clone(),
                code: req.code.clone(),
                timeout_ms: timeout.as_millis() as u64,
                limits: WireLimits {
                    max_tool_calls: req.limits.max_tool_calls,
                    max_chain_steps: req.limits.max_chain_steps,
                    cpu_quota_millis: req.limits.cpu_quota_millis,
                    memory_bytes: req.limits.memory_bytes,
                    pids_max: req.limits.pids_max,
                    disk_bytes: req.limits.disk_bytes,
                },
                profile: req.profile.to_string(),
                metadata: req.metadata.clone(),
                enable_tracing: true,
                requested_scope: None,
            },
            gateway: gateway.map(|g| WireGateway {
                url: g.url.clone(),
                token: g.token.clone(),
                protocol: "toolruntime-gateway-http/v1",
            }),
            stream: false,
        };

        let body = serde_json::to_vec(&wire)
            .map_err(|e| SandboxError::InvalidRequest(format!("failed to encode request: {e}")))?;

        let timestamp = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Nanos, true);

        let mut builder = self
            .client
            .post(format!("{}/execute", self.endpoint))
            .header("content-type", "application/json")
            .header("X-Toolruntime-Timestamp", &timestamp)
            .timeout(timeout + NETWORK_OVERHEAD_PAD)
            .body(body.clone());

        if let Some(token) = &self.bearer_token {
            builder = builder.bearer_auth(token);
            if let Some(signature) = self.sign(&timestamp, &body) {
                builder = builder.header("X-Toolruntime-Signature", signature);
            }
        }

        let response = builder
            .send()
            .await
            .map_err(|e| SandboxError::BackendUnavailable(format!("remote execute failed: {e}")))?;

        if !response.status().is_success() {
            return Err(SandboxError::Remote(format!(
                "remote returned status {}",
                response.status()
            )));
        }

        let parsed: WireResponse = response
            .json()
            .await
            .map_err(|e| SandboxError::Remote(format!("invalid response body: {e}")))?;

        if let Some(error) = parsed.error {
            return Err(SandboxError::Remote(format!("{}: {}", error.code, error.message)));
        }

        let result = parsed
            .result
            .ok_or_else(|| SandboxError::Remote("response carried neither result nor error".to_string()))?;

        Ok(ExecuteResult {
            value: result.value,
            stdout: result.stdout,
            stderr: result.stderr,
            duration: Duration::from_millis(result.duration_ms),
            backend: BackendInfo {
                kind: BackendKind::Remote,
                readiness: Readiness::Ready,
                details: self.endpoint.clone(),
            },
            limits_enforced: result.limits_enforced,
            tool_calls: result.tool_calls,
        })
    }
}

#[async_trait]
impl crate::driver::IsolationBackend for RemoteDriver {
    fn kind(&self) -> BackendKind {
        BackendKind::Remote
    }

    async fn info(&self, _ctx: &CancellationToken) -> BackendInfo {
        BackendInfo {
            kind: BackendKind::Remote,
            readiness: Readiness::Ready,
            details: self.endpoint.clone(),
        }
    }

    async fn execute(
        &self,
        ctx: &CancellationToken,
        req: &ExecuteRequest,
    ) -> Result<ExecuteResult, SandboxError> {
        validate_request(req)?;

        let timeout = if req.timeout.is_zero() { DEFAULT_TIMEOUT } else { req.timeout };
        // Gateway dialback is provided by the caller out-of-band (e.g. the
        // runtime attaches a proxy listener address); this driver only
        // forwards whatever endpoint metadata it was given.
        let gateway = req.metadata.get("gateway_url").map(|url| GatewayEndpoint {
            url: url.clone(),
            token: req.metadata.get("gateway_token").cloned(),
        });

        let mut attempt = 0;
        loop {
            if ctx.is_cancelled() {
                return Err(SandboxError::Cancelled);
            }

            let result = tokio::select! {
                _ = ctx.cancelled() => return Err(SandboxError::Cancelled),
                res = self.send_once(req, gateway.as_ref(), timeout) => res,
            };

            match result {
                Ok(result) => return Ok(result),
                Err(err) if err.is_kind(toolrt_types::ErrorKind::Cancelled) => return Err(err),
                Err(err) if attempt + 1 >= self.max_retries => return Err(err),
                Err(err) => {
                    attempt += 1;
                    warn!(attempt, error = %err, "retrying remote sandbox execution");
                    debug!(endpoint = %self.endpoint, "remote retry backoff");
                    continue;
                }
            }
        }
    }
}

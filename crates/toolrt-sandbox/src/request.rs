//! The request shape passed to [`crate::runtime::Runtime::execute`] and on
//! to each isolation backend driver.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::error::SandboxError;
use crate::gateway::ToolGateway;
use crate::profile::SecurityProfile;

/// Resource limits. Zero at any field means "unset — let the driver
/// default apply".
#[derive(Debug, Clone, Copy, Default)]
pub struct Limits {
    pub max_tool_calls: u64,
    pub max_chain_steps: u64,
    pub cpu_quota_millis: u64,
    pub memory_bytes: u64,
    pub pids_max: u64,
    pub disk_bytes: u64,
}

#[derive(Clone)]
pub struct ExecuteRequest {
    pub language: String,
    pub code: String,
    pub timeout: Duration,
    pub limits: Limits,
    pub profile: SecurityProfile,
    pub metadata: HashMap<String, String>,
    /// Required — a request with no gateway is rejected with
    /// [`crate::error::SandboxError::MissingGateway`] before dispatch.
    pub gateway: Option<Arc<dyn ToolGateway>>,
}

impl ExecuteRequest {
    pub fn new(code: impl Into<String>, profile: SecurityProfile) -> Self {
        Self {
            language: String::new(),
            code: code.into(),
            timeout: Duration::ZERO,
            limits: Limits::default(),
            profile,
            metadata: HashMap::new(),
            gateway: None,
        }
    }

    pub fn with_gateway(mut self, gateway: Arc<dyn ToolGateway>) -> Self {
        self.gateway = Some(gateway);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// Shared request validation (§4.6 "Request validation"). Invoked by
/// [`crate::runtime::Runtime::execute`] before dispatch, and independently
/// by each driver so the "`MissingGateway` before any I/O" invariant holds
/// even when a driver is exercised directly in isolation.
pub fn validate_request(req: &ExecuteRequest) -> Result<(), SandboxError> {
    if req.code.trim().is_empty() {
        return Err(SandboxError::InvalidRequest("code must not be empty".to_string()));
    }
    if req.gateway.is_none() {
        return Err(SandboxError::MissingGateway);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::DirectGateway;
    use toolrt_exec::{RegistryCatalog, Tools, ToolsLimits};
    use toolrt_runner::Runner;

    fn gateway() -> Arc<dyn ToolGateway> {
        let registry = Arc::new(toolrt_backends::Registry::new());
        let aggregator = Arc::new(toolrt_backends::Aggregator::new(Arc::clone(&registry)));
        let catalog = Arc::new(RegistryCatalog::new(Arc::clone(&registry), Arc::clone(&aggregator)));
        let index = Arc::new(toolrt_runner::ToolIndex::new(Arc::clone(&registry)));
        let runner = Arc::new(Runner::new(index));
        let tools = Arc::new(Tools::new(catalog, runner, ToolsLimits::default()));
        Arc::new(DirectGateway::new(tools))
    }

    #[test]
    fn empty_code_is_invalid_regardless_of_gateway() {
        let req = ExecuteRequest::new("   ", SecurityProfile::Dev).with_gateway(gateway());
        assert!(matches!(
            validate_request(&req),
            Err(SandboxError::InvalidRequest(_))
        ));
    }

    #[test]
    fn missing_gateway_is_rejected() {
        let req = ExecuteRequest::new("print(1)", SecurityProfile::Dev);
        assert!(matches!(validate_request(&req), Err(SandboxError::MissingGateway)));
    }

    #[test]
    fn well_formed_request_validates() {
        let req = ExecuteRequest::new("print(1)", SecurityProfile::Dev).with_gateway(gateway());
        assert!(validate_request(&req).is_ok());
    }

    #[test]
    fn zero_limits_mean_unset() {
        let limits = Limits::default();
        assert_eq!(limits.max_tool_calls, 0);
        assert_eq!(limits.memory_bytes, 0);
    }
}

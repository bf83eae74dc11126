//! The result shape returned by every isolation backend driver and by
//! [`crate::runtime::Runtime::execute`].

use std::time::Duration;

use serde_json::Value;
use toolrt_types::ToolCallRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    UnsafeHost,
    Container,
    MicroVm,
    Wasm,
    Remote,
    Orchestrator,
}

impl BackendKind {
    pub fn as_str(self) -> &'static str {
        match self {
            BackendKind::UnsafeHost => "unsafe-host",
            BackendKind::Container => "container",
            BackendKind::MicroVm => "microvm",
            BackendKind::Wasm => "wasm",
            BackendKind::Remote => "remote",
            BackendKind::Orchestrator => "orchestrator",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    Ready,
    Degraded,
    Unavailable,
}

#[derive(Debug, Clone)]
pub struct BackendInfo {
    pub kind: BackendKind,
    pub readiness: Readiness,
    pub details: String,
}

#[derive(Debug, Clone)]
pub struct ExecuteResult {
    pub value: Value,
    pub stdout: String,
    pub stderr: String,
    pub duration: Duration,
    pub backend: BackendInfo,
    /// Which limits the sandbox actually enforced, by name (e.g.
    /// `"memory_bytes"`, `"cpu_quota_millis"`) — not every driver enforces
    /// every dimension of [`crate::request::Limits`].
    pub limits_enforced: Vec<String>,
    pub tool_calls: Vec<ToolCallRecord>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_kind_as_str_matches_wire_naming() {
        assert_eq!(BackendKind::UnsafeHost.as_str(), "unsafe-host");
        assert_eq!(BackendKind::MicroVm.as_str(), "microvm");
        assert_eq!(BackendKind::Orchestrator.as_str(), "orchestrator");
    }

    #[test]
    fn readiness_variants_are_distinguishable() {
        assert_ne!(Readiness::Ready, Readiness::Degraded);
        assert_ne!(Readiness::Degraded, Readiness::Unavailable);
    }
}

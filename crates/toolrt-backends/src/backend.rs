//! The `Backend` trait: a source of executable tools.
//!
//! kind/name/enabled/lifecycle contract, with optional streaming and
//! configuration capabilities discoverable via capability probing rather
//! than trait inheritance.

use std::collections::HashMap;
use std::pin::Pin;
use std::sync::atomic::{AtomicU8, Ordering};

use async_trait::async_trait;
use futures::Stream;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use toolrt_types::Tool;

use crate::error::BackendError;

/// A lazily-produced sequence of streamed values, as returned by
/// [`StreamingBackend::execute_stream`].
pub type ValueStream = Pin<Box<dyn Stream<Item = Result<Value, BackendError>> + Send>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    New,
    Started,
    Stopped,
}

/// An atomic `new -> started -> stopped` cell backend implementations embed
/// so the registry and the backend itself agree on lifecycle state without
/// a lock.
#[derive(Debug)]
pub struct Lifecycle(AtomicU8);

impl Lifecycle {
    pub fn new() -> Self {
        Self(AtomicU8::new(0))
    }

    pub fn get(&self) -> LifecycleState {
        match self.0.load(Ordering::SeqCst) {
            1 => LifecycleState::Started,
            2 => LifecycleState::Stopped,
            _ => LifecycleState::New,
        }
    }

    pub fn mark_started(&self) {
        self.0.store(1, Ordering::SeqCst);
    }

    pub fn mark_stopped(&self) {
        self.0.store(2, Ordering::SeqCst);
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

/// Metadata about a backend for debugging and monitoring. Additive —
/// consumed by facade introspection, never by dispatch logic.
#[derive(Debug, Clone, Default)]
pub struct BackendMetadata {
    pub name: String,
    pub backend_type: String,
    pub location: Option<String>,
    pub additional_info: HashMap<String, String>,
}

impl BackendMetadata {
    pub fn new(name: impl Into<String>, backend_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            backend_type: backend_type.into(),
            location: None,
            additional_info: HashMap::new(),
        }
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn with_info(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.additional_info.insert(key.into(), value.into());
        self
    }
}

/// A source of executable tools. Every method must honor `ctx`'s
/// cancellation/deadline and be safe to call concurrently.
#[async_trait]
pub trait Backend: Send + Sync {
    fn kind(&self) -> &str;
    fn name(&self) -> &str;
    fn enabled(&self) -> bool;
    fn lifecycle(&self) -> LifecycleState;

    async fn list_tools(&self, ctx: &CancellationToken) -> Result<Vec<Tool>, BackendError>;

    /// Execute `local_tool_name` (unqualified — the backend's own naming,
    /// not a `backend:name` id) with `args`, returning the structured
    /// result.
    async fn execute(
        &self,
        ctx: &CancellationToken,
        local_tool_name: &str,
        args: Value,
    ) -> Result<Value, BackendError>;

    async fn start(&self, _ctx: &CancellationToken) -> Result<(), BackendError> {
        Ok(())
    }

    async fn stop(&self) -> Result<(), BackendError> {
        Ok(())
    }

    /// Liveness probe consumed by health-check tooling; not required for
    /// dispatch.
    async fn health_check(&self) -> bool {
        true
    }

    fn requires_approval(&self, _local_tool_name: &str) -> bool {
        false
    }

    fn metadata(&self) -> BackendMetadata {
        BackendMetadata::new(self.name(), self.kind())
    }

    /// Capability probe: `Some` when this backend also implements
    /// [`StreamingBackend`].
    fn as_streaming(&self) -> Option<&dyn StreamingBackend> {
        None
    }

    /// Capability probe: `Some` when this backend accepts raw-bytes
    /// configuration via [`ConfigurableBackend`].
    fn as_configurable(&self) -> Option<&dyn ConfigurableBackend> {
        None
    }
}

/// Optional streaming-execute capability. Contract: when the error return is
/// absent, the returned stream must be non-empty (a closed/empty stream is
/// legal, but producing `Ok` of an empty stream vs `Err` is the backend's
/// choice, not this trait's).
#[async_trait]
pub trait StreamingBackend: Send + Sync {
    async fn execute_stream(
        &self,
        ctx: &CancellationToken,
        local_tool_name: &str,
        args: Value,
    ) -> Result<ValueStream, BackendError>;
}

/// Optional raw-bytes configuration capability. Validates and fails eagerly
/// on malformed input.
pub trait ConfigurableBackend: Send + Sync {
    fn configure(&self, raw: &[u8]) -> Result<(), BackendError>;
}

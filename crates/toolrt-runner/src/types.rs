//! Request/response shapes for [`crate::Runner`].

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde_json::Value;
use toolrt_backends::Backend;
use toolrt_types::{Tool, ToolId};

use crate::error::RunnerError;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Fallback invoked when the index has no entry for a tool id.
pub type ToolResolverFallback = Arc<dyn Fn(ToolId) -> BoxFuture<'static, Option<Tool>> + Send + Sync>;

/// Fallback invoked when the index returns no backend candidates.
pub type BackendResolverFallback =
    Arc<dyn Fn(ToolId) -> BoxFuture<'static, Vec<Arc<dyn Backend>>> + Send + Sync>;

/// One step of a [`crate::Runner::run_chain`] call.
#[derive(Debug, Clone)]
pub struct RunStep {
    pub id: ToolId,
    pub args: HashMap<String, Value>,
    pub use_previous: bool,
}

impl RunStep {
    pub fn new(id: ToolId, args: HashMap<String, Value>) -> Self {
        Self {
            id,
            args,
            use_previous: false,
        }
    }

    pub fn use_previous(mut self) -> Self {
        self.use_previous = true;
        self
    }
}

/// Result of a single successful dispatch. Output-schema validation
/// failures do not fail the call: the produced value is still returned, and
/// the validation error is attached for observability (§4.4).
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub value: Value,
    pub backend_kind: String,
    pub output_validation_error: Option<String>,
}

/// Record of one chain step, successful or not, with the arg map actually
/// dispatched (post `UsePrevious` substitution).
#[derive(Debug, Clone)]
pub struct StepResult {
    pub index: usize,
    pub id: ToolId,
    pub effective_args: HashMap<String, Value>,
    pub outcome: Result<RunOutcome, RunnerError>,
}

/// Outcome of a [`crate::Runner::run_chain`] call.
#[derive(Debug, Clone, Default)]
pub struct ChainOutcome {
    pub last_value: Option<Value>,
    pub steps: Vec<StepResult>,
    pub error: Option<RunnerError>,
}

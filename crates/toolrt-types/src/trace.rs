//! The tool-call trace record produced by every dispatched call.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Which pipeline operation produced a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolCallOp {
    Run,
    Chain,
}

impl ToolCallOp {
    pub fn as_str(self) -> &'static str {
        match self {
            ToolCallOp::Run => "run",
            ToolCallOp::Chain => "chain",
        }
    }
}

/// One entry in the append-only trace of a single execution (one
/// `RunTool`/`RunChain` call from inside a `Tools` environment, or one
/// direct `Runner::run`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallRecord {
    pub tool_id: String,
    pub args: HashMap<String, Value>,
    pub result: Option<Value>,
    pub backend_kind: Option<String>,
    pub error: Option<String>,
    pub error_op: Option<ToolCallOp>,
    #[serde(with = "duration_millis")]
    pub duration: Duration,
}

impl ToolCallRecord {
    pub fn success(
        tool_id: impl Into<String>,
        args: HashMap<String, Value>,
        result: Value,
        backend_kind: Option<String>,
        duration: Duration,
    ) -> Self {
        Self {
            tool_id: tool_id.into(),
            args,
            result: Some(result),
            backend_kind,
            error: None,
            error_op: None,
            duration,
        }
    }

    pub fn failure(
        tool_id: impl Into<String>,
        args: HashMap<String, Value>,
        error: impl Into<String>,
        op: ToolCallOp,
        backend_kind: Option<String>,
        duration: Duration,
    ) -> Self {
        Self {
            tool_id: tool_id.into(),
            args,
            result: None,
            backend_kind,
            error: Some(error.into()),
            error_op: Some(op),
            duration,
        }
    }

    pub fn duration_ms(&self) -> u128 {
        self.duration.as_millis()
    }
}

mod duration_millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

//! The `Tool` data model: a named unit of work, identified externally by
//! `namespace:name`.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Free-form annotations a backend may attach to a tool (hints, titles,
/// read-only/destructive flags, etc). Kept as an open map rather than a
/// fixed struct since backends disagree on what's worth annotating.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct ToolAnnotations(pub HashMap<String, Value>);

impl ToolAnnotations {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }
}

/// A named unit of work exposed by a backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tool {
    pub name: String,
    /// Filled in by the aggregator with the owning backend's instance name
    /// when a backend reports an empty namespace (spec: namespace backfill).
    pub namespace: String,
    pub description: String,
    pub input_schema: Value,
    pub output_schema: Option<Value>,
    #[serde(default)]
    pub annotations: ToolAnnotations,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Tool {
    pub fn new(name: impl Into<String>, description: impl Into<String>, input_schema: Value) -> Self {
        Self {
            name: name.into(),
            namespace: String::new(),
            description: description.into(),
            input_schema,
            output_schema: None,
            annotations: ToolAnnotations::default(),
            tags: Vec::new(),
        }
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    pub fn with_output_schema(mut self, schema: Value) -> Self {
        self.output_schema = Some(schema);
        self
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    pub fn id(&self) -> crate::tool_id::ToolId {
        crate::tool_id::ToolId::new(self.namespace.clone(), self.name.clone())
    }
}

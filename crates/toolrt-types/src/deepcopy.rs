//! Deep-copy / canonicalization helpers.
//!
//! Arguments passed into a tool call are deep-copied before being stored in
//! a [`crate::trace::ToolCallRecord`] so that caller-side mutation after the
//! call returns cannot corrupt recorded history (the tool-call trace is
//! append-only and, once written, immutable).
//!
//! Because the canonical argument representation in this workspace is
//! already `serde_json::Value`, `Value::clone` *is* a deep copy with maps
//! normalized to `{String -> Value}` and sequences to `Vec<Value>` — there's
//! no separate "map with non-string keys" or "pointer" representation to
//! normalize away, unlike a dynamically-typed host language. The one
//! non-trivial case this module still handles is the "round-trip arbitrary
//! `Serialize` value through JSON, falling back to a best-effort
//! representation on failure" rule for callers that haven't already
//! converted their arguments to `Value`.

use std::collections::HashMap;
use std::fmt::Debug;

use serde::Serialize;
use serde_json::Value;

/// Deep-copy a JSON value. `Value` owns all of its data, so this is a plain
/// clone, but it is the canonical entry point callers should use so the
/// "why a clone here" invariant (trace immutability) stays documented at the
/// call site rather than implicit.
pub fn normalize(value: &Value) -> Value {
    value.clone()
}

/// Deep-copy an argument map, normalizing to `{String -> Value}` regardless
/// of insertion order or the map type the caller used.
pub fn normalize_args(args: &HashMap<String, Value>) -> HashMap<String, Value> {
    args.iter().map(|(k, v)| (k.clone(), normalize(v))).collect()
}

/// Round-trip an arbitrary serializable value into the canonical `Value`
/// shape. On serialization failure (non-string map keys, NaN/Infinity
/// floats, etc.) the original value's `Debug` representation is stored
/// instead, matching the "best-effort, never panics" contract for trace
/// recording.
pub fn to_canonical<T: Serialize + Debug>(value: &T) -> Value {
    match serde_json::to_value(value) {
        Ok(v) => v,
        Err(err) => {
            tracing::warn!(error = %err, "failed to canonicalize value for trace; storing debug repr");
            Value::String(format!("{value:?}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn mutating_caller_copy_does_not_affect_normalized_copy() {
        let mut args: HashMap<String, Value> = HashMap::new();
        args.insert("x".to_string(), json!({"y": 1}));

        let recorded = normalize_args(&args);

        if let Some(y) = args.get_mut("x").and_then(|v| v.get_mut("y")) {
            *y = json!(2);
        }

        assert_eq!(recorded["x"]["y"], json!(1));
        assert_eq!(args["x"]["y"], json!(2));
    }

    #[test]
    fn to_canonical_round_trips_plain_values() {
        #[derive(Serialize, Debug)]
        struct Point {
            x: i32,
            y: i32,
        }
        let p = Point { x: 1, y: 2 };
        assert_eq!(to_canonical(&p), json!({"x": 1, "y": 2}));
    }
}

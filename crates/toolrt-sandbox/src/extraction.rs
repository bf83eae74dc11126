//! Value-extraction convention: recover a sandbox's structured return value
//! from its captured stdout (§6 "Value extraction convention").

use serde_json::Value;

const OUT_PREFIX: &str = "__OUT__:";

/// Scans `stdout` for the last non-empty line matching either convention.
/// Returns `Value::Null` if neither is present anywhere in the output.
pub fn extract_value(stdout: &str) -> Value {
    for line in stdout.lines().rev() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if let Some(rest) = line.strip_prefix(OUT_PREFIX) {
            return serde_json::from_str(rest).unwrap_or_else(|_| Value::String(rest.to_string()));
        }
        if let Ok(Value::Object(obj)) = serde_json::from_str::<Value>(line)
            && let Some(out) = obj.get("__out")
        {
            return out.clone();
        }
    }
    Value::Null
}

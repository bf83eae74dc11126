//! Backend selection when more than one backend advertises the same tool.

use std::sync::Arc;

use toolrt_backends::Backend;

/// A pluggable chooser over backend candidates. Contract: must return one of
/// the elements of `candidates` (or `None` only when `candidates` is empty —
/// a selector that invents a backend not present in its input is a bug the
/// runner does not guard against).
pub type BackendSelector = Arc<dyn Fn(&[Arc<dyn Backend>]) -> Option<Arc<dyn Backend>> + Send + Sync>;

/// Default preference order: `local > provider > mcp`, falling back to the
/// first candidate for any other kind tag.
pub fn default_selector() -> BackendSelector {
    Arc::new(|candidates: &[Arc<dyn Backend>]| {
        const PREFERENCE: [&str; 3] = ["local", "provider", "mcp"];
        for kind in PREFERENCE {
            if let Some(backend) = candidates.iter().find(|b| b.kind() == kind) {
                return Some(backend.clone());
            }
        }
        candidates.first().cloned()
    })
}

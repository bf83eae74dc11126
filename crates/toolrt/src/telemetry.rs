//! Tracing-subscriber bootstrap for a host binary embedding this crate: a
//! stdout `fmt` layer plus an `EnvFilter` sourced from `RUST_LOG`.

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Debug, Clone, thiserror::Error)]
#[error("failed to install global tracing subscriber: {0}")]
pub struct TelemetryError(String);

/// Installs a stdout `fmt` layer filtered by `RUST_LOG` (default `info` if
/// unset). Idempotent per process only in the sense that a second call
/// will return an error rather than panicking — library code must never
/// assume it owns the process-global subscriber.
pub fn init_tracing() -> Result<(), TelemetryError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let subscriber = tracing_subscriber::registry()
        .with(fmt::Layer::new().with_target(true).with_ansi(true))
        .with(filter);

    tracing::subscriber::set_global_default(subscriber).map_err(|e| TelemetryError(e.to_string()))
}

use std::io;
use tracing_subscriber::{fmt, EnvFilter};

/// Initialize tracing subscriber with sensible defaults and stdout writer.
/// - Respects `RUST_LOG` if set
/// - Falls back to `info,tower_http=info,axum=info`
/// - Writes to stdout to improve visibility in environments that hide stderr
pub fn init_logging_default() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=info,axum=info"));
    let _ = fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .with_writer(io::stdout)
        .try_init();
}

/// Initialize tracing subscriber with JSON structured output.
/// - Respects `RUST_LOG` if set, defaults to `info`
/// - Record store internals are logged at debug so every load/save is visible
pub fn init_logging_json() {
    // 可通过 RUST_LOG 覆盖，例如 RUST_LOG=info,service::storage=trace
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,service::storage=debug"));
    let _ = fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .json()
        .with_writer(io::stdout)
        .try_init();
}

/// Pick the formatter by name; anything other than `json` gets the compact one.
pub fn init_logging(format: &str) {
    if format.eq_ignore_ascii_case("json") {
        init_logging_json();
    } else {
        init_logging_default();
    }
}

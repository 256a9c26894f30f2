//! Logging setup utilities for the watch party server.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the tracing subscriber with the specified default log level.
///
/// This function sets up logging for the server library crate, the shared
/// crate and the binary. The log level can be overridden using the `RUST_LOG`
/// environment variable.
///
/// # Arguments
///
/// * `binary_name` - The name of the binary (e.g., "watchparty-server")
/// * `default_log_level` - The default log level (e.g., "debug", "info", "warn", "error")
///
/// # Examples
///
/// ```no_run
/// use watchparty_shared::logger::setup_logger;
///
/// setup_logger("watchparty-server", "info");
/// ```
pub fn setup_logger(binary_name: &str, default_log_level: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter(binary_name, default_log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Build the default `EnvFilter` directive string.
///
/// Crate and binary names use `-` in Cargo but `_` as tracing targets.
fn default_filter(binary_name: &str, default_log_level: &str) -> String {
    format!(
        "watchparty_server={level},{binary}={level},{shared}={level},tower_http={level}",
        level = default_log_level,
        binary = binary_name.replace('-', "_"),
        shared = env!("CARGO_PKG_NAME").replace('-', "_"),
    )
}

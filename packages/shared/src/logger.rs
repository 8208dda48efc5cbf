//! Logging setup utilities for the signaling binaries.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the tracing subscriber with the specified default log level.
///
/// Both the library crates of the workspace and the binary get the default
/// level. The filter can be overridden with the `RUST_LOG` environment variable.
///
/// # Arguments
///
/// * `binary_name` - The name of the binary (e.g., "gameface-server")
/// * `default_log_level` - The default log level (e.g., "debug", "info", "warn", "error")
///
/// # Examples
///
/// ```no_run
/// use gameface_shared::logger::setup_logger;
///
/// setup_logger("gameface-server", "debug");
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
/// Every crate of the workspace is listed so that logs emitted from library
/// code show up alongside the binary's own logs.
fn default_filter(binary_name: &str, level: &str) -> String {
    [
        "gameface_shared",
        "gameface_server",
        "gameface_client",
        &binary_name.replace('-', "_"),
    ]
    .iter()
    .map(|target| format!("{}={}", target, level))
    .collect::<Vec<_>>()
    .join(",")
}

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize tracing for embedders that have no subscriber of their own.
///
/// - Stdout: compact, human-readable
/// - Default level: INFO, override via RUST_LOG env
///
/// Call at most once per process; hosts with their own subscriber should
/// skip this entirely, the crate only ever emits through `tracing` macros.
pub fn init() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,vitala_chat=debug"));

    let stdout_layer = fmt::layer()
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .compact();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .init();

    tracing::debug!("Tracing initialized");
}

use tracing_subscriber::{fmt, EnvFilter};

/// Installs the global `tracing` subscriber. `RUST_LOG` overrides the default `info` level.
/// Calling it more than once is harmless.
pub fn init_logging() {
    init_logging_with_default("info");
}

pub fn init_logging_with_default(default_directive: &str) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));
    let _ = fmt().with_env_filter(env_filter).try_init();
}

use tracing_subscriber::EnvFilter;

/// Environment variable holding a `tracing` filter directive
pub const LOG_ENV: &str = "MOMENTUM_LOG";

/// Install the stderr subscriber. `MOMENTUM_LOG` wins over `fallback_level`
/// (normally `[log] level` from momentum.toml). Calling twice is harmless.
pub fn init(fallback_level: &str) {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_new(fallback_level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

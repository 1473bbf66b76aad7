use tracing_subscriber::{fmt, EnvFilter};

/// Install the fmt subscriber. `RUST_LOG` overrides the default filter.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,qfever=debug,qfever_api=debug"));

    // A second init (e.g. from tests) is not an error.
    let _ = fmt().with_env_filter(filter).with_target(false).try_init();
}

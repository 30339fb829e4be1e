use tracing_subscriber::EnvFilter;

/// stdout logging, `RUST_LOG` overrides the default `info` level
pub fn init() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    // a subscriber may already be installed (tests)
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .try_init()
        .ok();
}

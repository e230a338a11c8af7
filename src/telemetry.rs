//! Tracing subscriber setup.
//!
//! JSON lines in production, compact human output elsewhere. `RUST_LOG`
//! overrides `server.log_level` when set.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::ServerConfig;

/// Installs the global subscriber.
///
/// Returns `false` if a subscriber was already installed (tests, embedding hosts).
pub fn init_tracing(config: &ServerConfig) -> bool {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(env_filter);

    let result = if config.is_production() {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_current_span(true),
            )
            .try_init()
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_target(true).compact())
            .try_init()
    };

    result.is_ok()
}

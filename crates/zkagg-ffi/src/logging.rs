//! Lazy tracing setup for processes that load the library without configuring a subscriber.

use std::sync::Once;

static INIT: Once = Once::new();

/// Install a compact `RUST_LOG`-driven subscriber (default `info`) once.
///
/// A subscriber installed by the host process wins; this is then a no-op.
pub fn init() {
    INIT.call_once(|| {
        if tracing::dispatcher::has_been_set() {
            return;
        }
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .compact()
            .try_init();
    });
}

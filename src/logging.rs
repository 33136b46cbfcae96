//! Diagnostic tracing for the runner.
//!
//! Library code only emits `tracing` events; the binary decides where they go.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Installs the global subscriber.
///
/// Reads `RUST_LOG`, defaulting to `warn` (or `agent_runner=debug` when
/// `verbose` is set). Output goes to stderr in compact format.
pub fn init(verbose: bool) {
    let fallback = if verbose { "warn,agent_runner=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}

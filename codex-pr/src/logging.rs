//! Tracing setup for CI logs.
//!
//! Everything goes to stderr so stdout stays free for output lines when
//! `GITHUB_OUTPUT` is unset.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the tracing subscriber.
///
/// Reads `RUST_LOG`. Defaults to `info` so pipeline phases show up in the
/// job log.
///
/// # Example
/// ```bash
/// RUST_LOG=codex_pr=debug codex-pr --prompt "add a LICENSE file"
/// ```
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .compact(),
        )
        .init();
}

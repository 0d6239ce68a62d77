//! Developer tracing for `envboot`.
//!
//! Events come from three places: `bootstrap` logs each gate as it starts and
//! what it found (interpreter path, accepted version, activated env python),
//! `io::toolchain` logs the command line of every tool it runs, and
//! `io::process` logs spawn, exit code, timeouts and truncated output.
//!
//! None of this is user output. Users see the per-gate status lines and the
//! completion report on stdout, and the single `error:` line on stderr. Under
//! the default `warn` filter only timeouts, truncation and write failures
//! surface here.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize tracing subscriber for development logging.
///
/// Reads `RUST_LOG` env var. Defaults to `warn` if unset.
/// Output: stderr, compact format.
///
/// # Example
/// ```bash
/// RUST_LOG=envboot=debug cargo run
/// ```
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}

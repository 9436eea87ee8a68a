//! Diagnostic logging setup.
//!
//! User-facing progress travels as automation events; `tracing` carries request-level
//! diagnostics on stderr. `RUST_LOG` overrides the default `warn` filter.

use tracing_subscriber::{fmt, EnvFilter};

pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .try_init();
}

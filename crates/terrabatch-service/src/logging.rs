//! Logging initialization for embedders.

use tracing_subscriber::prelude::*;

/// Install a process-wide fmt subscriber honoring `RUST_LOG`, defaulting
/// to `info` for the terrabatch crates.
///
/// Embedders with their own subscriber should skip this; calling it twice
/// is a no-op (the second install fails quietly).
pub fn init_logging() {
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        "terrabatch_flow=info,terrabatch_script=info,terrabatch_service=info,warn".to_string()
    });
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_filter(tracing_subscriber::EnvFilter::new(filter)),
        )
        .try_init();
}

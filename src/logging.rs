//! Structured logging (spec §10): `tracing_subscriber`'s `fmt` layer plus
//! an `EnvFilter` so verbosity is controlled by `RUST_LOG`, falling back
//! to the level passed on the CLI.

use tracing_subscriber::EnvFilter;

/// Installs the global subscriber. Call once, at process startup.
pub fn init(default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(true).init();
}

//! Tracing subscriber setup for the tracker binary.

use tracing_subscriber::{EnvFilter, Registry, fmt, prelude::*};

/// Install a stdout subscriber. `RUST_LOG` takes precedence over
/// `default_filter`; an unparsable default falls back to `info`.
///
/// Returns `false` if a global subscriber was already installed.
pub fn init(default_filter: &str) -> bool {
    Registry::default()
        .with(env_filter(default_filter))
        .with(fmt::layer().with_target(false))
        .try_init()
        .is_ok()
}

fn env_filter(default_filter: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::try_new(default_filter).unwrap_or_else(|err| {
            eprintln!("invalid log filter {default_filter:?}: {err}; using info");
            EnvFilter::new("info")
        })
    })
}

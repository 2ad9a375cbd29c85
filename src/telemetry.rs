//! Logging bootstrap for hosts embedding the engine.

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::error::{PatpackError, Result};

/// Default directive for a verbosity level. `RUST_LOG` takes precedence.
#[must_use]
pub const fn filter_for(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn,patpack=info",
        1 => "info,patpack=debug",
        2 => "debug,patpack=trace",
        _ => "trace",
    }
}

/// Install a global subscriber writing to stderr, as JSON when `json` is set.
///
/// Fails if a global subscriber is already installed.
pub fn init_tracing(verbosity: u8, json: bool) -> Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter_for(verbosity)));

    let installed = if json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().with_writer(std::io::stderr))
            .try_init()
    };
    installed.map_err(|err| PatpackError::Config(format!("tracing already initialized: {err}")))
}

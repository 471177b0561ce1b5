//! Tracing subscriber setup for the command-line front end.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

/// Environment variable that overrides the verbosity flags.
pub const LOG_ENV: &str = "README_LENS_LOG";

/// Filter directive for a `-v` count.
pub fn level_for(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    }
}

/// Install the global subscriber, logging to stderr so stdout stays
/// machine-readable. Calling it twice is harmless.
pub fn init_logging(verbosity: u8) {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(level_for(verbosity)));
    let layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(verbosity > 1);
    if Registry::default().with(filter).with(layer).try_init().is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}

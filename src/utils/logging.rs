// src/utils/logging.rs
use tracing_subscriber::{fmt, EnvFilter};

/// Default filter for a `-v` count: info, then debug, then trace.
fn default_level(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    }
}

/// Sets up the logging framework using tracing_subscriber.
/// `RUST_LOG` wins when set; otherwise the level follows the `-v` count.
/// Logs go to stderr so JSON results on stdout stay parseable.
pub fn setup_logging(verbosity: u8) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level(verbosity)));

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    tracing::debug!("Logging setup complete.");
}

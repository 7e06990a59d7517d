//! Tracing setup for the monitors.
//!
//! Stdout belongs to the genmon fragment, so every log line goes to stderr.

use tracing::{debug, Level};

/// Initializes the tracing subscriber; `--debug` raises the level to DEBUG.
pub fn setup_logging(debug_enabled: bool) {
    let log_level = if debug_enabled {
        Level::DEBUG
    } else {
        Level::WARN
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(debug_enabled)
        .with_line_number(debug_enabled)
        .finish();

    // A second init (e.g. from tests) keeps the first subscriber.
    if tracing::subscriber::set_global_default(subscriber).is_ok() {
        debug!("Logging initialized with level: {}", log_level);
    }
}

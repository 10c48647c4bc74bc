//! Structured logging setup using `tracing-subscriber`.
//!
//! Logs go to stderr so that `--json` result output on stdout stays clean.
//! Verbosity is controlled by `RUST_LOG` (default: `info`).

use tracing_subscriber::EnvFilter;

/// Initialise logging for the command line.
///
/// With `json` set, every event is written as one JSON object per line.
pub fn init_cli(json: bool) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

//! Logging setup
//!
//! Structured logging to stderr via `tracing`, so rendered reports on
//! stdout stay clean for piping. Verbosity flags tighten or widen the
//! filter around the configured base level; `RUST_LOG` wins when set.

use tracing_subscriber::{fmt, EnvFilter};

use crate::config::LoggingConfig;
use crate::error::{Result, ScanError};

/// Initialize the global subscriber.
///
/// `verbosity` comes from the CLI: 0 uses the configured level, 1 maps to
/// debug, 2 or more to trace; quiet mode passes an explicit "error" level
/// through the config instead.
pub fn init(config: &LoggingConfig, verbosity: u8) -> Result<()> {
    let level = match verbosity {
        0 => config.level.as_str(),
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("netrecon={level}")));

    let builder = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    let installed = match config.format.as_str() {
        "json" => builder.json().try_init(),
        _ => builder.try_init(),
    };
    installed.map_err(|e| ScanError::config(format!("failed to initialize logging: {e}")))
}

//! Application configuration
//!
//! Layered configuration: built-in defaults, then an optional TOML file,
//! then `NETRECON_*` environment variables. CLI flags override all of it at
//! the point of use. The file is never created on the user's behalf;
//! a missing file just means defaults.

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::{path::Path, time::Duration};
use tracing::debug;

use crate::error::{Result, ScanError};
use crate::output::OutputFormat;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanningConfig {
    /// Per-probe timeout in milliseconds.
    pub probe_timeout_ms: u64,
    /// Enable deep service fingerprinting by default.
    pub version_detection: bool,
}

impl Default for ScanningConfig {
    fn default() -> Self {
        Self {
            probe_timeout_ms: 1000,
            version_detection: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// DNS resolution timeout in seconds.
    pub resolve_timeout_secs: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            resolve_timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Base log level when no verbosity flags are given.
    pub level: String,
    /// Log output format: "pretty" or "json".
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Report format when the CLI does not specify one.
    pub default_format: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            default_format: "human".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PerformanceConfig {
    /// Maximum number of probes in flight at once.
    pub max_concurrent_probes: usize,
    /// Optional whole-scan deadline in seconds.
    pub deadline_secs: Option<u64>,
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            max_concurrent_probes: 32,
            deadline_secs: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub scanning: ScanningConfig,
    pub network: NetworkConfig,
    pub logging: LoggingConfig,
    pub output: OutputConfig,
    pub performance: PerformanceConfig,
}

impl AppConfig {
    /// Load configuration: defaults, then the file (if it exists), then
    /// `NETRECON_*` environment variables (e.g. `NETRECON_SCANNING__PROBE_TIMEOUT_MS`).
    pub fn load(path: &Path) -> Result<Self> {
        let mut builder = Config::builder();

        if path.exists() {
            debug!(path = %path.display(), "loading configuration file");
            builder = builder.add_source(File::from(path));
        }

        let settings = builder
            .add_source(Environment::with_prefix("NETRECON").separator("__"))
            .build()?;

        let config: Self = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.scanning.probe_timeout_ms == 0 {
            return Err(ScanError::config("probe_timeout_ms must be positive"));
        }
        if self.performance.max_concurrent_probes == 0 {
            return Err(ScanError::config("max_concurrent_probes must be positive"));
        }
        OutputFormat::parse(&self.output.default_format)?;
        if !matches!(self.logging.format.as_str(), "pretty" | "json") {
            return Err(ScanError::config(format!(
                "unknown log format '{}', expected 'pretty' or 'json'",
                self.logging.format
            )));
        }
        Ok(())
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.scanning.probe_timeout_ms)
    }

    pub fn resolve_timeout(&self) -> Duration {
        Duration::from_secs(self.network.resolve_timeout_secs)
    }
}

//! Error types for the reconnaissance engine
//!
//! Two classes of failure exist and must never be confused:
//! - Terminal errors (resolution, invalid range, configuration) abort the
//!   whole scan before or instead of probing.
//! - Local errors (probe transport failures, fingerprinting failures) are
//!   recovered per endpoint and surfaced as report data.

use std::{io, net::IpAddr};
use thiserror::Error;

/// Main result type used throughout the crate
pub type Result<T> = std::result::Result<T, ScanError>;

#[derive(Error, Debug)]
pub enum ScanError {
    /// Target specification cannot be resolved to an address
    #[error("cannot resolve target '{target}': {message}")]
    Resolution { target: String, message: String },

    /// Malformed or out-of-bounds port range
    #[error("invalid port range '{spec}': {reason}")]
    InvalidRange { spec: String, reason: String },

    /// Transport-level failure while probing one endpoint
    #[error("probe of {endpoint} failed: {message}")]
    Probe { endpoint: String, message: String },

    /// Deep fingerprinting collaborator failure
    #[error("fingerprinting {host}:{port} failed: {message}")]
    Fingerprint {
        host: IpAddr,
        port: u16,
        message: String,
    },

    /// Configuration loading or validation errors
    #[error("configuration error: {message}")]
    Configuration { message: String },

    /// Report rendering and output errors
    #[error("output error ({format}): {message}")]
    Output { format: String, message: String },

    /// File I/O errors
    #[error("io error during {operation}: {message}")]
    Io { operation: String, message: String },
}

impl ScanError {
    pub fn resolution<T: Into<String>, M: Into<String>>(target: T, message: M) -> Self {
        Self::Resolution {
            target: target.into(),
            message: message.into(),
        }
    }

    pub fn invalid_range<S: Into<String>, R: Into<String>>(spec: S, reason: R) -> Self {
        Self::InvalidRange {
            spec: spec.into(),
            reason: reason.into(),
        }
    }

    pub fn probe<E: Into<String>, M: Into<String>>(endpoint: E, message: M) -> Self {
        Self::Probe {
            endpoint: endpoint.into(),
            message: message.into(),
        }
    }

    pub fn fingerprint<M: Into<String>>(host: IpAddr, port: u16, message: M) -> Self {
        Self::Fingerprint {
            host,
            port,
            message: message.into(),
        }
    }

    pub fn config<M: Into<String>>(message: M) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn output<F: Into<String>, M: Into<String>>(format: F, message: M) -> Self {
        Self::Output {
            format: format.into(),
            message: message.into(),
        }
    }

    pub fn io<O: Into<String>, M: Into<String>>(operation: O, message: M) -> Self {
        Self::Io {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Terminal errors abort the whole scan; everything else is recovered
    /// per endpoint and recorded in the report.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Resolution { .. } | Self::InvalidRange { .. } | Self::Configuration { .. }
        )
    }
}

impl From<io::Error> for ScanError {
    fn from(error: io::Error) -> Self {
        Self::io("io operation", error.to_string())
    }
}

impl From<serde_json::Error> for ScanError {
    fn from(error: serde_json::Error) -> Self {
        Self::output("json", error.to_string())
    }
}

impl From<config::ConfigError> for ScanError {
    fn from(error: config::ConfigError) -> Self {
        Self::config(error.to_string())
    }
}

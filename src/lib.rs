//! netrecon: network reconnaissance engine
//!
//! Scans a target host or CIDR range across a TCP/UDP port matrix,
//! identifies the services behind open ports, and annotates them with
//! known-risk classifications. Reports are deterministic: given the same
//! observed network state, repeated scans produce byte-identical output.

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod logging;
pub mod output;
pub mod probe;
pub mod report;
pub mod resolver;
pub mod risk;
pub mod scanner;
pub mod services;

pub use cli::Cli;
pub use config::AppConfig;
pub use crate::core::{
    Application, Endpoint, EndpointOutcome, Fingerprinter, ProbeResult, ProbeStatus, Prober,
    Protocol, Target,
};
pub use error::{Result, ScanError};
pub use output::OutputFormat;
pub use report::{ScanReport, ScanSummary};
pub use scanner::{Orchestrator, PortRange, ScanOptions};

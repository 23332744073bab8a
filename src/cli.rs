//! Command-line interface
//!
//! Argument surface for a scan invocation. Flags override configuration
//! values; anything unset falls through to the loaded `AppConfig`.

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

use crate::core::Protocol;
use crate::error::{Result, ScanError};
use crate::output::OutputFormat;

#[derive(Debug, Parser)]
#[command(
    name = "netrecon",
    version,
    about = "Network reconnaissance: port scanning, service identification, risk classification",
    long_about = None
)]
pub struct Cli {
    /// Target to scan: IP address, hostname, or CIDR range (e.g. 10.0.0.0/24)
    pub target: String,

    /// Port range as START-END (e.g. 1-1024) or a single port
    pub ports: String,

    /// Transport protocols to probe
    #[arg(long, value_enum, default_value_t = ProtocolChoice::Both)]
    pub protocol: ProtocolChoice,

    /// Probe open TCP services for banners and version strings
    #[arg(long)]
    pub version_detection: bool,

    /// Per-probe timeout in milliseconds
    #[arg(long)]
    pub timeout_ms: Option<u64>,

    /// Maximum number of probes in flight at once
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Abort the scan after this many seconds, reporting partial results
    #[arg(long)]
    pub deadline_secs: Option<u64>,

    /// Write the rendered report to a file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Report format
    #[arg(long, value_parser = parse_output_format)]
    pub format: Option<OutputFormat>,

    /// Configuration file path
    #[arg(long, default_value = "netrecon.toml")]
    pub config_path: PathBuf,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Log errors only
    #[arg(short, long)]
    pub quiet: bool,
}

impl Cli {
    /// Cross-flag validation that clap cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.quiet && self.verbose > 0 {
            return Err(ScanError::config("--quiet conflicts with --verbose"));
        }
        if self.target.trim().is_empty() {
            return Err(ScanError::config("target must not be empty"));
        }
        if let Some(0) = self.timeout_ms {
            return Err(ScanError::config("--timeout-ms must be positive"));
        }
        if let Some(0) = self.concurrency {
            return Err(ScanError::config("--concurrency must be positive"));
        }
        Ok(())
    }

    /// Report format, preferring the flag over the configured default.
    pub fn effective_format(&self, default: &str) -> OutputFormat {
        self.format
            .unwrap_or_else(|| OutputFormat::parse(default).unwrap_or(OutputFormat::Human))
    }
}

fn parse_output_format(s: &str) -> std::result::Result<OutputFormat, String> {
    OutputFormat::parse(s).map_err(|e| e.to_string())
}

/// Protocol selection on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ProtocolChoice {
    Tcp,
    Udp,
    Both,
}

impl ProtocolChoice {
    /// Concrete protocol list, always TCP before UDP.
    pub fn protocols(&self) -> Vec<Protocol> {
        match self {
            Self::Tcp => vec![Protocol::Tcp],
            Self::Udp => vec![Protocol::Udp],
            Self::Both => vec![Protocol::Tcp, Protocol::Udp],
        }
    }
}

impl std::fmt::Display for ProtocolChoice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Tcp => "tcp",
            Self::Udp => "udp",
            Self::Both => "both",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn minimal_invocation_defaults_to_both_protocols() {
        let cli = parse(&["netrecon", "192.168.1.1", "1-1024"]);
        assert_eq!(cli.target, "192.168.1.1");
        assert_eq!(cli.ports, "1-1024");
        assert_eq!(cli.protocol, ProtocolChoice::Both);
        assert_eq!(
            cli.protocol.protocols(),
            vec![Protocol::Tcp, Protocol::Udp]
        );
        assert!(!cli.version_detection);
        assert!(cli.validate().is_ok());
    }

    #[test]
    fn flags_are_recognized() {
        let cli = parse(&[
            "netrecon",
            "scanme.example.com",
            "22",
            "--protocol",
            "tcp",
            "--version-detection",
            "--timeout-ms",
            "500",
            "--format",
            "json",
            "--deadline-secs",
            "30",
        ]);
        assert_eq!(cli.protocol.protocols(), vec![Protocol::Tcp]);
        assert!(cli.version_detection);
        assert_eq!(cli.timeout_ms, Some(500));
        assert_eq!(cli.format, Some(OutputFormat::Json));
        assert_eq!(cli.deadline_secs, Some(30));
    }

    #[test]
    fn quiet_and_verbose_conflict() {
        let cli = parse(&["netrecon", "10.0.0.1", "80", "-q", "-v"]);
        assert!(cli.validate().is_err());
    }

    #[test]
    fn format_flag_rejects_unknown_values() {
        assert!(Cli::try_parse_from(["netrecon", "10.0.0.1", "80", "--format", "xml"]).is_err());
    }

    #[test]
    fn effective_format_prefers_flag_over_config() {
        let cli = parse(&["netrecon", "10.0.0.1", "80", "--format", "json"]);
        assert_eq!(cli.effective_format("human"), OutputFormat::Json);

        let cli = parse(&["netrecon", "10.0.0.1", "80"]);
        assert_eq!(cli.effective_format("json"), OutputFormat::Json);
        assert_eq!(cli.effective_format("human"), OutputFormat::Human);
    }
}

//! Report presentation
//!
//! Renders an assembled report as a human-readable table or pretty JSON and
//! writes it to stdout or a file. Rendering is a pure function of the
//! report, so the format choice never affects what was scanned.

use std::fmt::Write as _;
use std::path::Path;
use tracing::info;

use crate::{
    error::{Result, ScanError},
    report::ScanReport,
};

/// Output format for rendered reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Human,
    Json,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Human => "human",
            Self::Json => "json",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "human" | "text" => Ok(Self::Human),
            "json" => Ok(Self::Json),
            other => Err(ScanError::config(format!(
                "unknown output format '{other}', expected 'human' or 'json'"
            ))),
        }
    }
}

/// Render a report in the requested format.
pub fn render(report: &ScanReport, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Human => Ok(render_human(report)),
        OutputFormat::Json => serde_json::to_string_pretty(report)
            .map_err(|e| ScanError::output("json", e.to_string())),
    }
}

fn render_human(report: &ScanReport) -> String {
    let mut out = String::new();
    let bar = "=".repeat(60);

    let _ = writeln!(out, "{bar}");
    if report.target == report.ip {
        let _ = writeln!(out, "Scan report for {}", report.target);
    } else {
        let _ = writeln!(out, "Scan report for {} ({})", report.target, report.ip);
    }
    let _ = writeln!(out, "{bar}");

    if report.entries.is_empty() {
        let _ = writeln!(out, "No open ports found.");
    } else {
        let _ = writeln!(
            out,
            "{:<7} {:<6} {:<16} {:<14} Risk",
            "Port", "Proto", "Service", "Version"
        );
        let _ = writeln!(out, "{}", "-".repeat(60));
        for entry in &report.entries {
            let _ = writeln!(
                out,
                "{:<7} {:<6} {:<16} {:<14} {}",
                entry.port,
                entry.protocol,
                entry.service,
                entry.version.as_deref().unwrap_or("-"),
                entry.risk
            );
        }
    }

    if !report.errors.is_empty() {
        let _ = writeln!(out, "\nProbe errors:");
        for error in &report.errors {
            let _ = writeln!(
                out,
                "  {}/{}: {}",
                error.port, error.protocol, error.message
            );
        }
    }

    let _ = writeln!(out, "\nSummary:");
    let _ = writeln!(out, "  Endpoints probed : {}", report.summary.total_probed);
    let _ = writeln!(out, "  Open TCP ports   : {}", report.summary.total_open_tcp);
    let _ = writeln!(out, "  Open UDP ports   : {}", report.summary.total_open_udp);
    let _ = writeln!(out, "  Flagged services : {}", report.summary.total_flagged);
    if report.truncated {
        let _ = writeln!(out, "  NOTE: scan was cut short; results are partial.");
    }

    out
}

/// Write rendered output to a file, or stdout when no path is given.
pub async fn write(content: &str, path: Option<&Path>) -> Result<()> {
    match path {
        Some(path) => {
            tokio::fs::write(path, content)
                .await
                .map_err(|e| ScanError::io(format!("write {}", path.display()), e.to_string()))?;
            info!(path = %path.display(), "report written");
            Ok(())
        }
        None => {
            println!("{content}");
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Endpoint, EndpointOutcome, ProbeStatus, Protocol, Target};
    use crate::report;
    use std::net::IpAddr;

    fn sample_report() -> ScanReport {
        let ip: IpAddr = "192.0.2.1".parse().unwrap();
        let target = Target::new("example.test", ip);
        let outcome = EndpointOutcome {
            endpoint: Endpoint::new(target.clone(), 21, Protocol::Tcp),
            status: ProbeStatus::Open,
            service: Some(crate::core::ServiceRecord {
                name: "ftp".to_string(),
                version: None,
                source: crate::core::IdentificationSource::WellKnownTable,
            }),
            risk: Some(crate::risk::classify("ftp")),
        };
        report::build(&target, &[outcome], false)
    }

    #[test]
    fn format_parse_accepts_known_names() {
        assert_eq!(OutputFormat::parse("json").unwrap(), OutputFormat::Json);
        assert_eq!(OutputFormat::parse("Human").unwrap(), OutputFormat::Human);
        assert!(OutputFormat::parse("yaml").is_err());
    }

    #[test]
    fn human_rendering_shows_open_ports_and_summary() {
        let rendered = render(&sample_report(), OutputFormat::Human).unwrap();
        assert!(rendered.contains("example.test (192.0.2.1)"));
        assert!(rendered.contains("ftp"));
        assert!(rendered.contains("Unencrypted file transfer"));
        assert!(rendered.contains("Open TCP ports   : 1"));
    }

    #[test]
    fn json_rendering_round_trips() {
        let report = sample_report();
        let rendered = render(&report, OutputFormat::Json).unwrap();
        let parsed: ScanReport = serde_json::from_str(&rendered).unwrap();
        assert_eq!(parsed, report);
    }

    #[tokio::test]
    async fn file_output_writes_rendered_content() {
        let dir = std::env::temp_dir().join("netrecon-output-test");
        tokio::fs::create_dir_all(&dir).await.unwrap();
        let path = dir.join("report.json");

        let rendered = render(&sample_report(), OutputFormat::Json).unwrap();
        write(&rendered, Some(&path)).await.unwrap();

        let read_back = tokio::fs::read_to_string(&path).await.unwrap();
        assert_eq!(read_back, rendered);
        let _ = tokio::fs::remove_file(&path).await;
    }
}

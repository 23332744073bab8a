//! Report assembly
//!
//! Turns the itemized probe outcomes for one target into the serializable
//! report structure. Reports carry no timestamps or timing data, so two
//! scans observing the same network state serialize byte-for-byte
//! identically.

use serde::{Deserialize, Serialize};

use crate::core::{EndpointOutcome, ProbeStatus, Protocol, Target};
use crate::{risk, services};

/// One open endpoint in the report, ordered TCP before UDP, ports ascending.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportEntry {
    pub protocol: Protocol,
    pub port: u16,
    pub service: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    pub risk: String,
}

/// One endpoint whose probe failed locally. Kept separate from entries so
/// failures are visible without polluting the open set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportError {
    pub protocol: Protocol,
    pub port: u16,
    pub message: String,
}

/// Aggregate counters, always consistent with the itemized entries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanSummary {
    pub total_probed: usize,
    pub total_open_tcp: usize,
    pub total_open_udp: usize,
    pub total_flagged: usize,
}

/// Full scan report for one target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanReport {
    pub target: String,
    pub ip: String,
    pub entries: Vec<ReportEntry>,
    pub errors: Vec<ReportError>,
    pub summary: ScanSummary,
    /// Set when the scan stopped before covering the full matrix; the
    /// report then describes only what was actually probed.
    pub truncated: bool,
}

/// Assemble the report from ordered outcomes.
///
/// Only open endpoints become entries; the ambiguous UDP open|filtered
/// verdict stays out of both the entries and the open counters. Callers
/// pass outcomes already sorted by (protocol, port).
pub fn build(target: &Target, outcomes: &[EndpointOutcome], truncated: bool) -> ScanReport {
    let mut entries = Vec::new();
    let mut errors = Vec::new();
    let mut summary = ScanSummary {
        total_probed: outcomes.len(),
        ..ScanSummary::default()
    };

    for outcome in outcomes {
        match &outcome.status {
            ProbeStatus::Open => {
                match outcome.endpoint.protocol {
                    Protocol::Tcp => summary.total_open_tcp += 1,
                    Protocol::Udp => summary.total_open_udp += 1,
                }
                let service = outcome.service.as_ref();
                let risk_text = outcome
                    .risk
                    .as_ref()
                    .map(|r| r.description.clone())
                    .unwrap_or_else(|| risk::NO_KNOWN_RISK.to_string());
                if risk_text != risk::NO_KNOWN_RISK {
                    summary.total_flagged += 1;
                }
                entries.push(ReportEntry {
                    protocol: outcome.endpoint.protocol,
                    port: outcome.endpoint.port,
                    service: service
                        .map(|s| s.name.clone())
                        .unwrap_or_else(|| services::UNKNOWN_SERVICE.to_string()),
                    version: service.and_then(|s| s.version.clone()),
                    risk: risk_text,
                });
            }
            ProbeStatus::Error(message) => {
                errors.push(ReportError {
                    protocol: outcome.endpoint.protocol,
                    port: outcome.endpoint.port,
                    message: message.clone(),
                });
            }
            ProbeStatus::Closed | ProbeStatus::Filtered | ProbeStatus::OpenFiltered => {}
        }
    }

    ScanReport {
        target: target.host.clone(),
        ip: target.ip.to_string(),
        entries,
        errors,
        summary,
        truncated,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Endpoint, IdentificationSource, RiskAnnotation, ServiceRecord};
    use std::net::IpAddr;

    fn target() -> Target {
        let ip: IpAddr = "198.51.100.7".parse().unwrap();
        Target::new("198.51.100.7", ip)
    }

    fn outcome(port: u16, protocol: Protocol, status: ProbeStatus) -> EndpointOutcome {
        let (service, risk) = if status == ProbeStatus::Open {
            let name = crate::services::well_known_service(port, protocol)
                .unwrap_or(crate::services::UNKNOWN_SERVICE);
            (
                Some(ServiceRecord {
                    name: name.to_string(),
                    version: None,
                    source: IdentificationSource::WellKnownTable,
                }),
                Some(risk::classify(name)),
            )
        } else {
            (None, None)
        };
        EndpointOutcome {
            endpoint: Endpoint::new(target(), port, protocol),
            status,
            service,
            risk,
        }
    }

    #[test]
    fn only_open_endpoints_become_entries() {
        let outcomes = vec![
            outcome(21, Protocol::Tcp, ProbeStatus::Open),
            outcome(22, Protocol::Tcp, ProbeStatus::Closed),
            outcome(23, Protocol::Tcp, ProbeStatus::Filtered),
            outcome(53, Protocol::Udp, ProbeStatus::OpenFiltered),
        ];
        let report = build(&target(), &outcomes, false);

        assert_eq!(report.entries.len(), 1);
        assert_eq!(report.entries[0].port, 21);
        assert_eq!(report.entries[0].service, "ftp");
        assert_eq!(report.summary.total_probed, 4);
        assert_eq!(report.summary.total_open_tcp, 1);
        assert_eq!(report.summary.total_open_udp, 0);
    }

    #[test]
    fn flagged_count_tracks_taxonomy_matches() {
        let outcomes = vec![
            outcome(21, Protocol::Tcp, ProbeStatus::Open),
            outcome(22, Protocol::Tcp, ProbeStatus::Open),
            outcome(23, Protocol::Tcp, ProbeStatus::Open),
        ];
        let report = build(&target(), &outcomes, false);

        // ftp and telnet are flagged, ssh is not.
        assert_eq!(report.summary.total_flagged, 2);
        let ssh = report.entries.iter().find(|e| e.port == 22).unwrap();
        assert_eq!(ssh.risk, risk::NO_KNOWN_RISK);
    }

    #[test]
    fn probe_errors_surface_as_rows() {
        let mut failed = outcome(80, Protocol::Tcp, ProbeStatus::Closed);
        failed.status = ProbeStatus::Error("network unreachable".to_string());
        let report = build(&target(), &[failed], false);

        assert!(report.entries.is_empty());
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].message, "network unreachable");
        assert_eq!(report.summary.total_probed, 1);
    }

    #[test]
    fn version_is_omitted_from_json_when_absent() {
        let outcomes = vec![outcome(80, Protocol::Tcp, ProbeStatus::Open)];
        let report = build(&target(), &outcomes, false);
        let json = serde_json::to_string(&report).unwrap();
        assert!(!json.contains("version"));
        assert!(json.contains("\"protocol\":\"tcp\""));
    }

    #[test]
    fn identical_outcomes_serialize_identically() {
        let outcomes = vec![
            outcome(22, Protocol::Tcp, ProbeStatus::Open),
            outcome(53, Protocol::Udp, ProbeStatus::Open),
        ];
        let first = serde_json::to_string(&build(&target(), &outcomes, false)).unwrap();
        let second = serde_json::to_string(&build(&target(), &outcomes, false)).unwrap();
        assert_eq!(first, second);
    }
}

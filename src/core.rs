//! Core application wiring and trait seams
//!
//! Holds the shared data model (targets, endpoints, probe verdicts, service
//! records, risk annotations), the two capability traits the orchestrator is
//! parameterized over, and the `Application` composition root that wires
//! CLI input through resolution, scanning, and report output.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::{fmt, net::IpAddr, sync::Arc, time::Duration};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::{
    cli::Cli,
    config::AppConfig,
    error::Result,
    output,
    probe::ConnectProber,
    resolver,
    scanner::{Orchestrator, PortRange, ScanOptions},
    services::{BannerFingerprinter, ServiceIdentifier},
};

/// A resolved scan target: the caller's original specification plus the
/// address probing actually uses. Immutable once resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub host: String,
    pub ip: IpAddr,
}

impl Target {
    pub fn new<H: Into<String>>(host: H, ip: IpAddr) -> Self {
        Self {
            host: host.into(),
            ip,
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host == self.ip.to_string() {
            write!(f, "{}", self.ip)
        } else {
            write!(f, "{} ({})", self.host, self.ip)
        }
    }
}

/// Transport protocol of an endpoint. The derived ordering (TCP before UDP)
/// is what makes report output deterministic.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Tcp,
    Udp,
}

impl Protocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tcp => "tcp",
            Self::Udp => "udp",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One (target, port, protocol) probe unit. Stateless value, never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub target: Target,
    pub port: u16,
    pub protocol: Protocol,
}

impl Endpoint {
    pub fn new(target: Target, port: u16, protocol: Protocol) -> Self {
        Self {
            target,
            port,
            protocol,
        }
    }

    pub fn addr(&self) -> std::net::SocketAddr {
        std::net::SocketAddr::new(self.target.ip, self.port)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}/{}", self.target.ip, self.port, self.protocol)
    }
}

/// Reachability verdict for one endpoint.
///
/// `OpenFiltered` is UDP's inherently ambiguous no-response state. It is a
/// distinct verdict: never folded into `Open`, never folded into TCP's
/// explicit `Closed`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeStatus {
    Open,
    Closed,
    Filtered,
    OpenFiltered,
    Error(String),
}

impl ProbeStatus {
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Open)
    }
}

impl fmt::Display for ProbeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open => f.write_str("open"),
            Self::Closed => f.write_str("closed"),
            Self::Filtered => f.write_str("filtered"),
            Self::OpenFiltered => f.write_str("open|filtered"),
            Self::Error(message) => write!(f, "error: {message}"),
        }
    }
}

/// Outcome of probing one endpoint. Consumed immediately by the
/// orchestrator, never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeResult {
    pub status: ProbeStatus,
}

impl ProbeResult {
    pub fn new(status: ProbeStatus) -> Self {
        Self { status }
    }
}

/// Where a service identification came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentificationSource {
    WellKnownTable,
    DeepProbe,
}

/// Best-guess service identification for an open endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceRecord {
    pub name: String,
    pub version: Option<String>,
    pub source: IdentificationSource,
}

/// Risk verdict for an identified service. Always present for classified
/// endpoints; unmatched services carry the sentinel description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RiskAnnotation {
    pub description: String,
}

impl RiskAnnotation {
    pub fn is_flagged(&self) -> bool {
        self.description != crate::risk::NO_KNOWN_RISK
    }
}

/// Name and optional version extracted by a deep fingerprinting pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fingerprint {
    pub name: String,
    pub version: Option<String>,
}

/// Composite per-endpoint result the orchestrator hands to the report
/// builder. `service` and `risk` are present exactly when `status` is Open.
#[derive(Debug, Clone)]
pub struct EndpointOutcome {
    pub endpoint: Endpoint,
    pub status: ProbeStatus,
    pub service: Option<ServiceRecord>,
    pub risk: Option<RiskAnnotation>,
}

/// Probes a single endpoint under a bounded timeout.
///
/// Implementations must encode ordinary reachability outcomes (including
/// per-endpoint transport failures) in the `ProbeResult`; an `Err` is still
/// recovered locally by the orchestrator and recorded as that endpoint's
/// `Error` status, never aborting the scan.
#[async_trait]
pub trait Prober: Send + Sync {
    async fn probe(&self, endpoint: &Endpoint, timeout: Duration) -> Result<ProbeResult>;
}

/// Optional deep service fingerprinting capability.
///
/// Invoked only for open endpoints when version detection is enabled.
/// Failure falls back to table identification and never aborts the scan.
#[async_trait]
pub trait Fingerprinter: Send + Sync {
    async fn fingerprint(&self, ip: IpAddr, port: u16) -> Result<Fingerprint>;
}

/// Main application: wires configuration and CLI input through resolution,
/// orchestration, and report output.
pub struct Application {
    config: AppConfig,
    prober: Arc<dyn Prober>,
}

impl Application {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            prober: Arc::new(ConnectProber::new()),
        }
    }

    /// Substitute the probe engine, used by tests to scan simulated hosts.
    pub fn with_prober(config: AppConfig, prober: Arc<dyn Prober>) -> Self {
        Self { config, prober }
    }

    pub async fn run(&self, cli: &Cli) -> Result<()> {
        let range = PortRange::parse(&cli.ports)?;
        let options = self.scan_options(cli);

        let fingerprinter: Option<Arc<dyn Fingerprinter>> = if options.version_detection {
            Some(Arc::new(BannerFingerprinter::new(options.probe_timeout)))
        } else {
            None
        };
        let identifier = ServiceIdentifier::new(fingerprinter);
        let orchestrator = Orchestrator::new(self.prober.clone(), identifier, options);

        let cancel = CancellationToken::new();
        let ctrlc_cancel = cancel.clone();
        tokio::spawn(async move {
            let _ = tokio::signal::ctrl_c().await;
            ctrlc_cancel.cancel();
        });

        let targets =
            resolver::resolve_targets(&cli.target, self.config.resolve_timeout()).await?;
        let format = cli.effective_format(&self.config.output.default_format);

        let mut rendered = Vec::with_capacity(targets.len());
        for target in &targets {
            info!(target = %target, ports = %range, "starting scan");
            let report = orchestrator
                .scan_with_cancel(target, range, cancel.clone())
                .await?;
            info!(
                target = %target,
                open_tcp = report.summary.total_open_tcp,
                open_udp = report.summary.total_open_udp,
                flagged = report.summary.total_flagged,
                truncated = report.truncated,
                "scan finished"
            );
            rendered.push(output::render(&report, format)?);
        }

        output::write(&rendered.join("\n"), cli.output.as_deref()).await
    }

    fn scan_options(&self, cli: &Cli) -> ScanOptions {
        let scanning = &self.config.scanning;
        ScanOptions {
            protocols: cli.protocol.protocols(),
            probe_timeout: Duration::from_millis(
                cli.timeout_ms.unwrap_or(scanning.probe_timeout_ms),
            ),
            concurrency: cli
                .concurrency
                .unwrap_or(self.config.performance.max_concurrent_probes),
            version_detection: cli.version_detection || scanning.version_detection,
            deadline: cli
                .deadline_secs
                .or(self.config.performance.deadline_secs)
                .map(Duration::from_secs),
        }
    }
}

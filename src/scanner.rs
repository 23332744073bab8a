//! Scan orchestration
//!
//! Builds the full (port x protocol) endpoint matrix for a target,
//! dispatches probes under a bounded worker pool, and chains service
//! identification and risk classification for every open endpoint before it
//! contributes to summary counters. Completion order is unconstrained; the
//! final ordering is always re-sorted (TCP before UDP, ports ascending) so
//! repeated scans diff cleanly.

use std::{fmt, sync::Arc, time::Duration};
use tokio::{sync::Semaphore, task::JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::{
    core::{Endpoint, EndpointOutcome, ProbeStatus, Prober, Protocol, Target},
    error::{Result, ScanError},
    report::{self, ScanReport},
    risk,
    services::ServiceIdentifier,
};

/// Inclusive port interval, validated against [1, 65535] before any probing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortRange {
    pub start: u16,
    pub end: u16,
}

impl PortRange {
    pub fn new(start: u16, end: u16) -> Result<Self> {
        let range = Self { start, end };
        range.validate()?;
        Ok(range)
    }

    /// Parse a `start-end` specification; a bare port means a single-port
    /// range. Malformed input is terminal, no probing occurs.
    pub fn parse(spec: &str) -> Result<Self> {
        let parse_port = |s: &str| -> Result<u16> {
            s.trim()
                .parse::<u16>()
                .map_err(|_| ScanError::invalid_range(spec, format!("'{s}' is not a port number")))
        };

        let range = match spec.split_once('-') {
            Some((start, end)) => Self {
                start: parse_port(start)?,
                end: parse_port(end)?,
            },
            None => {
                let port = parse_port(spec)?;
                Self {
                    start: port,
                    end: port,
                }
            }
        };
        range.validate()?;
        Ok(range)
    }

    fn validate(&self) -> Result<()> {
        if self.start == 0 || self.end == 0 {
            return Err(ScanError::invalid_range(
                self.to_string(),
                "ports must be between 1 and 65535",
            ));
        }
        if self.start > self.end {
            return Err(ScanError::invalid_range(
                self.to_string(),
                "start port exceeds end port",
            ));
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        usize::from(self.end - self.start) + 1
    }

    /// A validated range always holds at least one port.
    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn iter(&self) -> impl Iterator<Item = u16> {
        self.start..=self.end
    }
}

impl fmt::Display for PortRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start == self.end {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}-{}", self.start, self.end)
        }
    }
}

/// Scan-wide tuning knobs.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Requested protocols; the matrix always iterates TCP before UDP
    /// regardless of request order.
    pub protocols: Vec<Protocol>,
    pub probe_timeout: Duration,
    pub concurrency: usize,
    pub version_detection: bool,
    /// Overall scan deadline; probes already in flight when it fires finish
    /// at their own timeout, and partial results are still reported.
    pub deadline: Option<Duration>,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            protocols: vec![Protocol::Tcp, Protocol::Udp],
            probe_timeout: Duration::from_millis(1000),
            concurrency: 32,
            version_detection: false,
            deadline: None,
        }
    }
}

/// Drives a full scan of one target.
pub struct Orchestrator {
    prober: Arc<dyn Prober>,
    identifier: ServiceIdentifier,
    options: ScanOptions,
}

impl Orchestrator {
    pub fn new(
        prober: Arc<dyn Prober>,
        identifier: ServiceIdentifier,
        options: ScanOptions,
    ) -> Self {
        Self {
            prober,
            identifier,
            options,
        }
    }

    /// Scan the full endpoint matrix and build the final report.
    pub async fn scan(&self, target: &Target, range: PortRange) -> Result<ScanReport> {
        self.scan_with_cancel(target, range, CancellationToken::new())
            .await
    }

    /// Variant accepting an external cancellation signal; triggering it
    /// stops dispatching new probes and assembles a truncated report from
    /// whatever completed.
    pub async fn scan_with_cancel(
        &self,
        target: &Target,
        range: PortRange,
        cancel: CancellationToken,
    ) -> Result<ScanReport> {
        let (outcomes, truncated) = self.run_probes(target, range, cancel).await?;
        Ok(report::build(target, &outcomes, truncated))
    }

    /// Probe every endpoint in the matrix and chain identification and
    /// classification for the open ones. Exposed separately so tests can
    /// assert on the exhaustive itemized set before open-only filtering.
    pub async fn run_probes(
        &self,
        target: &Target,
        range: PortRange,
        cancel: CancellationToken,
    ) -> Result<(Vec<EndpointOutcome>, bool)> {
        range.validate()?;
        let endpoints = self.endpoint_matrix(target, range);
        let total = endpoints.len();

        if let Some(deadline) = self.options.deadline {
            let deadline_cancel = cancel.clone();
            tokio::spawn(async move {
                tokio::time::sleep(deadline).await;
                deadline_cancel.cancel();
            });
        }

        let semaphore = Arc::new(Semaphore::new(self.options.concurrency.max(1)));
        let mut tasks: JoinSet<(Endpoint, ProbeStatus)> = JoinSet::new();
        let mut dispatched = 0usize;

        for endpoint in endpoints {
            let permit = tokio::select! {
                _ = cancel.cancelled() => break,
                permit = semaphore.clone().acquire_owned() => {
                    permit.expect("probe semaphore closed")
                }
            };

            let prober = self.prober.clone();
            let timeout = self.options.probe_timeout;
            tasks.spawn(async move {
                let _permit = permit;
                let status = match prober.probe(&endpoint, timeout).await {
                    Ok(result) => result.status,
                    // Transport failure on one endpoint never aborts the
                    // scan; it becomes that endpoint's verdict.
                    Err(e) => ProbeStatus::Error(e.to_string()),
                };
                (endpoint, status)
            });
            dispatched += 1;
        }

        let truncated = dispatched < total;
        if truncated {
            warn!(
                dispatched,
                total, "scan cut short, reporting partial results"
            );
        }

        let mut probed = Vec::with_capacity(dispatched);
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(pair) => probed.push(pair),
                Err(e) => warn!(error = %e, "probe task failed to complete"),
            }
        }

        // Completion order is arbitrary; the report contract is not.
        probed.sort_by_key(|(endpoint, _)| (endpoint.protocol, endpoint.port));

        let mut outcomes = Vec::with_capacity(probed.len());
        for (endpoint, status) in probed {
            let (service, risk) = if status.is_open() {
                let record = self.identifier.identify(&endpoint).await;
                let annotation = risk::classify(&record.name);
                debug!(
                    endpoint = %endpoint,
                    service = %record.name,
                    flagged = annotation.is_flagged(),
                    "open endpoint classified"
                );
                (Some(record), Some(annotation))
            } else {
                (None, None)
            };
            outcomes.push(EndpointOutcome {
                endpoint,
                status,
                service,
                risk,
            });
        }

        Ok((outcomes, truncated))
    }

    /// Every port in range crossed with every requested protocol, TCP
    /// first, ports ascending, each pair exactly once.
    fn endpoint_matrix(&self, target: &Target, range: PortRange) -> Vec<Endpoint> {
        let mut endpoints = Vec::with_capacity(range.len() * self.options.protocols.len());
        for protocol in [Protocol::Tcp, Protocol::Udp] {
            if !self.options.protocols.contains(&protocol) {
                continue;
            }
            for port in range.iter() {
                endpoints.push(Endpoint::new(target.clone(), port, protocol));
            }
        }
        endpoints
    }
}

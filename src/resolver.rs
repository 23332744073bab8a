//! Target resolution
//!
//! Turns a target specification (dotted IP, hostname, or CIDR range) into
//! concrete [`Target`]s. Literal addresses never touch DNS; hostnames go
//! through the system resolver; CIDR ranges expand to one target per usable
//! host address and are recomputed from the specification on every call.

use ipnet::IpNet;
use std::{net::IpAddr, str::FromStr, time::Duration};
use tokio::net::lookup_host;
use tracing::debug;

use crate::{
    core::Target,
    error::{Result, ScanError},
};

/// Resolve a single hostname or IP literal.
///
/// Resolution failure is terminal for the scan: there is no endpoint to
/// probe without an address.
pub async fn resolve(spec: &str, timeout: Duration) -> Result<Target> {
    if let Ok(ip) = IpAddr::from_str(spec) {
        return Ok(Target::new(spec, ip));
    }

    let lookup = tokio::time::timeout(timeout, lookup_host((spec, 0u16)))
        .await
        .map_err(|_| ScanError::resolution(spec, "resolver timed out"))?;

    let mut addrs = lookup.map_err(|e| ScanError::resolution(spec, e.to_string()))?;
    match addrs.next() {
        Some(addr) => {
            debug!(host = spec, ip = %addr.ip(), "resolved target");
            Ok(Target::new(spec, addr.ip()))
        }
        None => Err(ScanError::resolution(spec, "no addresses returned")),
    }
}

/// Expand a CIDR range into one target per usable host address.
///
/// The expansion is recomputed from the specification each call rather than
/// cached, so repeated scans always see the full range.
pub fn expand_cidr(spec: &str) -> Result<Vec<Target>> {
    let net = IpNet::from_str(spec)
        .map_err(|e| ScanError::resolution(spec, format!("invalid CIDR range: {e}")))?;
    Ok(net
        .hosts()
        .map(|ip| Target::new(ip.to_string(), ip))
        .collect())
}

/// Resolve a target specification that may be a single host or a CIDR range.
pub async fn resolve_targets(spec: &str, timeout: Duration) -> Result<Vec<Target>> {
    if spec.contains('/') {
        let targets = expand_cidr(spec)?;
        if targets.is_empty() {
            return Err(ScanError::resolution(spec, "range contains no usable hosts"));
        }
        debug!(range = spec, hosts = targets.len(), "expanded CIDR range");
        Ok(targets)
    } else {
        Ok(vec![resolve(spec, timeout).await?])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn literal_ip_resolves_without_dns() {
        let target = resolve("127.0.0.1", Duration::from_secs(1)).await.unwrap();
        assert_eq!(target.host, "127.0.0.1");
        assert_eq!(target.ip, "127.0.0.1".parse::<IpAddr>().unwrap());
    }

    #[tokio::test]
    async fn literal_ipv6_resolves_without_dns() {
        let target = resolve("::1", Duration::from_secs(1)).await.unwrap();
        assert_eq!(target.ip, "::1".parse::<IpAddr>().unwrap());
    }

    #[test]
    fn cidr_expands_to_usable_hosts_only() {
        let targets = expand_cidr("192.168.1.0/30").unwrap();
        let ips: Vec<String> = targets.iter().map(|t| t.ip.to_string()).collect();
        assert_eq!(ips, vec!["192.168.1.1", "192.168.1.2"]);
    }

    #[test]
    fn cidr_expansion_is_restartable() {
        let first = expand_cidr("10.0.0.0/29").unwrap();
        let second = expand_cidr("10.0.0.0/29").unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), 6);
    }

    #[test]
    fn malformed_cidr_is_a_resolution_error() {
        let err = expand_cidr("10.0.0.0/99").unwrap_err();
        assert!(err.is_terminal());
        assert!(matches!(err, ScanError::Resolution { .. }));
    }

    #[tokio::test]
    async fn cidr_spec_dispatches_to_expansion() {
        let targets = resolve_targets("192.0.2.0/30", Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(targets.len(), 2);
    }
}

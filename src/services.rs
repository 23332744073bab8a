//! Service identification
//!
//! Maps an open endpoint to a best-guess service name. The primary path is a
//! static well-known `(port, protocol)` table loaded once at startup; the
//! optional deep path actively grabs a banner through a [`Fingerprinter`]
//! and falls back to the table when it fails.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use std::{collections::HashMap, net::IpAddr, sync::Arc, time::Duration};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpStream,
    time::timeout,
};
use tracing::debug;

use crate::{
    core::{Endpoint, Fingerprint, Fingerprinter, IdentificationSource, Protocol, ServiceRecord},
    error::{Result, ScanError},
};

/// Name used when no identification path produced anything better.
pub const UNKNOWN_SERVICE: &str = "unknown";

/// Well-known service assignments, keyed by port and protocol so that
/// UDP-only services (tftp, ntp, snmp traps) never leak into TCP verdicts.
static PORT_SERVICES: Lazy<HashMap<(u16, Protocol), &'static str>> = Lazy::new(|| {
    let mut map = HashMap::new();

    let mut tcp = |port: u16, name: &'static str| {
        map.insert((port, Protocol::Tcp), name);
    };
    tcp(20, "ftp-data");
    tcp(21, "ftp");
    tcp(22, "ssh");
    tcp(23, "telnet");
    tcp(25, "smtp");
    tcp(79, "finger");
    tcp(80, "http");
    tcp(110, "pop3");
    tcp(111, "rpcbind");
    tcp(119, "nntp");
    tcp(135, "msrpc");
    tcp(139, "netbios-ssn");
    tcp(143, "imap");
    tcp(179, "bgp");
    tcp(389, "ldap");
    tcp(443, "https");
    tcp(445, "microsoft-ds");
    tcp(465, "smtps");
    tcp(554, "rtsp");
    tcp(587, "submission");
    tcp(631, "ipp");
    tcp(636, "ldaps");
    tcp(993, "imaps");
    tcp(995, "pop3s");
    tcp(1080, "socks");
    tcp(1433, "ms-sql-s");
    tcp(1521, "oracle");
    tcp(1723, "pptp");
    tcp(2049, "nfs");
    tcp(2375, "docker");
    tcp(3128, "squid");
    tcp(3306, "mysql");
    tcp(3389, "rdp");
    tcp(5432, "postgresql");
    tcp(5672, "amqp");
    tcp(5900, "vnc");
    tcp(5984, "couchdb");
    tcp(6379, "redis");
    tcp(6667, "irc");
    tcp(8000, "http-alt");
    tcp(8080, "http-proxy");
    tcp(8443, "https-alt");
    tcp(8888, "http-alt");
    tcp(9092, "kafka");
    tcp(9200, "elasticsearch");
    tcp(9418, "git");
    tcp(11211, "memcached");
    tcp(27017, "mongodb");

    let mut udp = |port: u16, name: &'static str| {
        map.insert((port, Protocol::Udp), name);
    };
    udp(53, "domain");
    udp(67, "dhcp-server");
    udp(68, "dhcp-client");
    udp(69, "tftp");
    udp(123, "ntp");
    udp(137, "netbios-ns");
    udp(138, "netbios-dgm");
    udp(161, "snmp");
    udp(162, "snmptrap");
    udp(500, "isakmp");
    udp(514, "syslog");
    udp(520, "rip");
    udp(1194, "openvpn");
    udp(1812, "radius");
    udp(5060, "sip");
    udp(5353, "mdns");

    // DNS also answers over TCP.
    map.insert((53, Protocol::Tcp), "domain");

    map
});

/// Look up the traditional IANA-style assignment for a port/protocol pair.
pub fn well_known_service(port: u16, protocol: Protocol) -> Option<&'static str> {
    PORT_SERVICES.get(&(port, protocol)).copied()
}

/// Maps open endpoints to service records.
pub struct ServiceIdentifier {
    fingerprinter: Option<Arc<dyn Fingerprinter>>,
}

impl ServiceIdentifier {
    pub fn new(fingerprinter: Option<Arc<dyn Fingerprinter>>) -> Self {
        Self { fingerprinter }
    }

    /// Identify the service behind an open endpoint.
    ///
    /// The deep path is TCP-only and optional; its failure falls back to the
    /// well-known table rather than failing the scan.
    pub async fn identify(&self, endpoint: &Endpoint) -> ServiceRecord {
        let table_name =
            well_known_service(endpoint.port, endpoint.protocol).unwrap_or(UNKNOWN_SERVICE);

        if endpoint.protocol == Protocol::Tcp {
            if let Some(fingerprinter) = &self.fingerprinter {
                match fingerprinter
                    .fingerprint(endpoint.target.ip, endpoint.port)
                    .await
                {
                    Ok(print) => {
                        return ServiceRecord {
                            name: print.name,
                            version: print.version,
                            source: IdentificationSource::DeepProbe,
                        };
                    }
                    Err(e) => {
                        debug!(endpoint = %endpoint, error = %e, "deep fingerprint failed, using table");
                    }
                }
            }
        }

        ServiceRecord {
            name: table_name.to_string(),
            version: None,
            source: IdentificationSource::WellKnownTable,
        }
    }
}

/// Default deep fingerprinting capability: connects, reads the service
/// greeting (sending a minimal HTTP request when the peer stays quiet), and
/// recognizes a handful of common banner shapes.
pub struct BannerFingerprinter {
    connect_timeout: Duration,
    read_timeout: Duration,
}

impl BannerFingerprinter {
    pub fn new(connect_timeout: Duration) -> Self {
        Self {
            connect_timeout,
            read_timeout: Duration::from_secs(3),
        }
    }

    async fn grab_banner(&self, ip: IpAddr, port: u16) -> Result<String> {
        let addr = std::net::SocketAddr::new(ip, port);
        let mut stream = timeout(self.connect_timeout, TcpStream::connect(addr))
            .await
            .map_err(|_| ScanError::fingerprint(ip, port, "connect timed out"))?
            .map_err(|e| ScanError::fingerprint(ip, port, e.to_string()))?;

        let mut buf = [0u8; 512];
        let greeting = match timeout(self.read_timeout, stream.read(&mut buf)).await {
            Ok(Ok(n)) if n > 0 => Some(String::from_utf8_lossy(&buf[..n]).trim().to_string()),
            _ => None,
        };
        if let Some(banner) = greeting {
            return Ok(banner);
        }

        // Silent peer: nudge it with a minimal HTTP request and retry.
        if timeout(
            self.read_timeout,
            stream.write_all(b"HEAD / HTTP/1.0\r\n\r\n"),
        )
        .await
        .is_err()
        {
            return Err(ScanError::fingerprint(ip, port, "probe write timed out"));
        }
        match timeout(self.read_timeout, stream.read(&mut buf)).await {
            Ok(Ok(n)) if n > 0 => Ok(String::from_utf8_lossy(&buf[..n]).trim().to_string()),
            _ => Err(ScanError::fingerprint(ip, port, "no banner received")),
        }
    }
}

#[async_trait]
impl Fingerprinter for BannerFingerprinter {
    async fn fingerprint(&self, ip: IpAddr, port: u16) -> Result<Fingerprint> {
        let banner = self.grab_banner(ip, port).await?;
        classify_banner(port, &banner)
            .ok_or_else(|| ScanError::fingerprint(ip, port, "unrecognized banner"))
    }
}

/// Recognize common banner shapes and extract a version string when the
/// greeting carries one.
fn classify_banner(port: u16, banner: &str) -> Option<Fingerprint> {
    if let Some(rest) = banner.strip_prefix("SSH-") {
        // SSH-2.0-OpenSSH_9.6 => software after the protocol version.
        let version = rest.split_once('-').map(|(_, software)| {
            software
                .split_whitespace()
                .next()
                .unwrap_or(software)
                .to_string()
        });
        return Some(Fingerprint {
            name: "ssh".to_string(),
            version,
        });
    }

    if banner.contains("HTTP/") {
        let version = banner
            .lines()
            .find_map(|line| line.strip_prefix("Server:"))
            .map(|server| server.trim().to_string());
        return Some(Fingerprint {
            name: "http".to_string(),
            version,
        });
    }

    if banner.starts_with("220") {
        let lowered = banner.to_lowercase();
        let name = if lowered.contains("smtp") || lowered.contains("esmtp") || port == 25 {
            "smtp"
        } else {
            "ftp"
        };
        let version = banner
            .trim_start_matches("220")
            .trim_start_matches(['-', ' '])
            .split_whitespace()
            .next()
            .filter(|word| word.chars().any(|c| c.is_ascii_digit() || c == '.'))
            .map(str::to_string);
        return Some(Fingerprint {
            name: name.to_string(),
            version,
        });
    }

    if banner.starts_with("RFB ") {
        return Some(Fingerprint {
            name: "vnc".to_string(),
            version: Some(banner.trim_start_matches("RFB ").trim().to_string()),
        });
    }

    if banner.starts_with("+OK") {
        return Some(Fingerprint {
            name: "pop3".to_string(),
            version: None,
        });
    }

    if banner.starts_with("* OK") {
        return Some(Fingerprint {
            name: "imap".to_string(),
            version: None,
        });
    }

    None
}

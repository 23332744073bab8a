//! Probe engine
//!
//! Attempts a single connection or datagram exchange against one endpoint
//! under a bounded timeout and yields a reachability verdict. Stateless per
//! call; every blocking operation is individually time-boxed so no endpoint
//! can stall the scan beyond its timeout.

use async_trait::async_trait;
use std::{
    io,
    net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr},
    time::Duration,
};
use tokio::{
    net::{TcpStream, UdpSocket},
    time::timeout,
};
use tracing::trace;

use crate::{
    core::{Endpoint, ProbeResult, ProbeStatus, Prober, Protocol},
    error::{Result, ScanError},
};

/// Default probe engine: TCP connect handshakes and empty UDP datagrams.
pub struct ConnectProber;

impl ConnectProber {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ConnectProber {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Prober for ConnectProber {
    async fn probe(&self, endpoint: &Endpoint, limit: Duration) -> Result<ProbeResult> {
        let status = match endpoint.protocol {
            Protocol::Tcp => probe_tcp(endpoint.addr(), limit).await,
            Protocol::Udp => probe_udp(endpoint, limit).await?,
        };
        trace!(endpoint = %endpoint, status = %status, "probe complete");
        Ok(ProbeResult::new(status))
    }
}

/// TCP verdicts: handshake completes => Open, explicit refusal => Closed,
/// silence until the deadline => Filtered, anything else => Error.
async fn probe_tcp(addr: SocketAddr, limit: Duration) -> ProbeStatus {
    match timeout(limit, TcpStream::connect(addr)).await {
        Ok(Ok(_stream)) => ProbeStatus::Open,
        Ok(Err(e)) => match e.kind() {
            io::ErrorKind::ConnectionRefused | io::ErrorKind::ConnectionReset => {
                ProbeStatus::Closed
            }
            _ => ProbeStatus::Error(e.to_string()),
        },
        Err(_) => ProbeStatus::Filtered,
    }
}

/// UDP verdicts: any reply => Open, ICMP port-unreachable (surfaced as a
/// refused receive on a connected socket) => Closed, silence => the
/// ambiguous open|filtered state. Absence of a reply is never treated as
/// proof in either direction.
async fn probe_udp(endpoint: &Endpoint, limit: Duration) -> Result<ProbeStatus> {
    let bind_ip: IpAddr = if endpoint.target.ip.is_ipv4() {
        IpAddr::V4(Ipv4Addr::UNSPECIFIED)
    } else {
        IpAddr::V6(Ipv6Addr::UNSPECIFIED)
    };
    let bind_addr = SocketAddr::new(bind_ip, 0);

    let socket = UdpSocket::bind(bind_addr)
        .await
        .map_err(|e| ScanError::probe(endpoint.to_string(), e.to_string()))?;
    socket
        .connect(endpoint.addr())
        .await
        .map_err(|e| ScanError::probe(endpoint.to_string(), e.to_string()))?;

    if let Err(e) = socket.send(&[]).await {
        // A refused send means the kernel already saw port-unreachable from
        // an earlier exchange with this destination.
        return Ok(match e.kind() {
            io::ErrorKind::ConnectionRefused => ProbeStatus::Closed,
            _ => ProbeStatus::Error(e.to_string()),
        });
    }

    let mut buf = [0u8; 512];
    Ok(match timeout(limit, socket.recv(&mut buf)).await {
        Ok(Ok(_len)) => ProbeStatus::Open,
        Ok(Err(e)) if e.kind() == io::ErrorKind::ConnectionRefused => ProbeStatus::Closed,
        Ok(Err(e)) => ProbeStatus::Error(e.to_string()),
        Err(_) => ProbeStatus::OpenFiltered,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Target;
    use tokio::net::TcpListener;

    fn endpoint(ip: std::net::IpAddr, port: u16, protocol: Protocol) -> Endpoint {
        Endpoint::new(Target::new(ip.to_string(), ip), port, protocol)
    }

    #[tokio::test]
    async fn tcp_probe_reports_listening_port_open() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let prober = ConnectProber::new();

        let result = prober
            .probe(
                &endpoint(addr.ip(), addr.port(), Protocol::Tcp),
                Duration::from_secs(1),
            )
            .await
            .unwrap();
        assert_eq!(result.status, ProbeStatus::Open);
    }

    #[tokio::test]
    async fn tcp_probe_reports_refused_port_closed() {
        // Bind then drop to find a port that is almost certainly closed.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let prober = ConnectProber::new();

        let result = prober
            .probe(
                &endpoint(addr.ip(), addr.port(), Protocol::Tcp),
                Duration::from_secs(1),
            )
            .await
            .unwrap();
        assert_eq!(result.status, ProbeStatus::Closed);
    }

    #[tokio::test]
    async fn udp_probe_reports_reply_as_open() {
        let server = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr = server.local_addr().unwrap();
        tokio::spawn(async move {
            let mut buf = [0u8; 16];
            if let Ok((_, peer)) = server.recv_from(&mut buf).await {
                let _ = server.send_to(b"pong", peer).await;
            }
        });
        let prober = ConnectProber::new();

        let result = prober
            .probe(
                &endpoint(addr.ip(), addr.port(), Protocol::Udp),
                Duration::from_secs(1),
            )
            .await
            .unwrap();
        assert_eq!(result.status, ProbeStatus::Open);
    }

    #[tokio::test]
    async fn udp_silence_is_ambiguous_not_open() {
        // A bound socket that never answers: silence within the timeout.
        let server = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr = server.local_addr().unwrap();
        let prober = ConnectProber::new();

        let result = prober
            .probe(
                &endpoint(addr.ip(), addr.port(), Protocol::Udp),
                Duration::from_millis(200),
            )
            .await
            .unwrap();
        assert_eq!(result.status, ProbeStatus::OpenFiltered);
        assert!(!result.status.is_open());
    }
}

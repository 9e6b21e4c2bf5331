//! Real socket probes against loopback
//!
//! ICMP needs raw socket privilege, so those tests are ignored by default:
//! `sudo -E cargo test --test system_probes -- --ignored`

use netdiag::{
    probe::tcp, ErrorKind, NetworkDiagnostics, PingOptions, PortScanOptions, PortStatus, SystemProber,
    TracerouteOptions,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpListener;

fn engine() -> NetworkDiagnostics {
    NetworkDiagnostics::with_prober(Arc::new(SystemProber::new().unwrap()))
}

/// Listener that greets every connection with `banner`
async fn banner_server(banner: &'static str) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        while let Ok((mut stream, _)) = listener.accept().await {
            let _ = stream.write_all(banner.as_bytes()).await;
        }
    });
    addr
}

/// A port that was free a moment ago
async fn unused_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap().port()
}

#[tokio::test]
async fn test_connect_open_with_banner() {
    let addr = banner_server("SSH-2.0-netdiag-test\r\n").await;

    let probe = tcp::connect(addr, Duration::from_secs(2), true).await;
    assert_eq!(probe.status, PortStatus::Open);
    assert!(probe.sample.succeeded);
    assert_eq!(probe.banner.as_deref(), Some("SSH-2.0-netdiag-test"));
}

#[tokio::test]
async fn test_connect_refused_is_closed() {
    let port = unused_port().await;
    let addr: SocketAddr = ([127, 0, 0, 1], port).into();

    let probe = tcp::connect(addr, Duration::from_secs(2), false).await;
    assert_eq!(probe.status, PortStatus::Closed);
    assert_eq!(probe.sample.error, Some(ErrorKind::ConnectionRefused));
}

#[tokio::test]
async fn test_engine_scan_of_loopback() {
    let open = banner_server("220 ready\r\n").await;
    let closed = unused_port().await;
    let options = PortScanOptions::new(Duration::from_secs(1), 4).with_banners(true);

    let result = engine()
        .port_scan("127.0.0.1", &[open.port() as u32, closed as u32], &options)
        .await;

    assert!(result.succeeded, "{:?}", result.error);
    let report = result.payload.unwrap();
    assert_eq!(report.ports[&open.port()].status, PortStatus::Open);
    assert!(report.ports[&open.port()].is_open);
    assert_eq!(report.ports[&closed].status, PortStatus::Closed);
    assert!(report.ports[&closed].error.is_none());
}

#[tokio::test]
async fn test_localhost_resolves_through_system_resolver() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let options = PortScanOptions::new(Duration::from_secs(1), 1);

    let result = engine().port_scan("localhost", &[port as u32], &options).await;
    assert!(result.succeeded, "{:?}", result.error);
}

#[tokio::test]
#[ignore = "needs raw socket privilege"]
async fn test_ping_loopback() {
    let options = PingOptions::new(3, Duration::from_secs(1)).with_interval(Duration::from_millis(10));
    let result = engine().ping("127.0.0.1", &options).await;

    assert!(result.succeeded, "{:?}", result.error);
    assert_eq!(result.payload.unwrap().received, 3);
}

#[tokio::test]
#[ignore = "needs raw socket privilege"]
async fn test_traceroute_loopback_is_one_hop() {
    let options = TracerouteOptions::new(5, Duration::from_secs(1));
    let result = engine().traceroute("127.0.0.1", &options).await;

    assert!(result.succeeded, "{:?}", result.error);
    let route = result.payload.unwrap();
    assert!(route.destination_reached);
    assert_eq!(route.hops.len(), 1);
}

#[tokio::test]
async fn test_ping_without_privilege_fails_as_data() {
    let options = PingOptions::new(1, Duration::from_millis(500));
    let result = engine().ping("127.0.0.1", &options).await;

    // Either outcome is a well-formed result; without privilege the kind
    // must say so.
    if !result.succeeded {
        let kind = result.error.unwrap().kind;
        assert!(matches!(kind, ErrorKind::PermissionDenied | ErrorKind::Unreachable | ErrorKind::Timeout));
    }
}

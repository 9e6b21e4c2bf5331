//! Engine behaviour through the public `Prober` seam
//!
//! A scripted prober stands in for the network so these runs are
//! deterministic and need no privilege.

use async_trait::async_trait;
use netdiag::{
    probe::{Answer, DnsAnswer, HopProbe, ReverseAnswer, TcpProbe},
    AnnotatedResult, DiagnosticError, DnsRecord, ErrorKind, GatewayInfo, InterfaceInfo, InterfaceKind,
    NetworkConfigOptions, NetworkDiagnostics, OperationKind, PingOptions, PortScanOptions, PortStatus, ProbeSample,
    Prober, QualityOptions, RecordType, ResolverSelection, Target, TracerouteOptions,
};
use std::net::{IpAddr, SocketAddr};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

const ROUTER: [u8; 4] = [10, 0, 0, 1];
const DESTINATION: [u8; 4] = [192, 0, 2, 50];

/// Every third echo is lost, ports below 100 are open, the path is two
/// hops long and `example.test` is the only name that resolves.
#[derive(Default)]
struct ScriptedProber {
    echoes: AtomicU32,
}

#[async_trait]
impl Prober for ScriptedProber {
    async fn resolve(&self, target: &Target, _: &ResolverSelection, _: Duration) -> netdiag::Result<IpAddr> {
        match target.ip() {
            Some(ip) => Ok(ip),
            None if target.as_str() == "example.test" => Ok(IpAddr::from(DESTINATION)),
            None => Err(netdiag::AppError::resolution_failed(format!("unknown host {}", target))),
        }
    }

    async fn echo(&self, _: IpAddr, timeout: Duration) -> ProbeSample {
        let n = self.echoes.fetch_add(1, Ordering::SeqCst);
        if n % 3 == 2 {
            ProbeSample::timeout(timeout)
        } else {
            ProbeSample::success(Duration::from_millis(10 + n as u64))
        }
    }

    async fn dns(&self, name: &str, record_type: RecordType, _: &ResolverSelection, _: Duration) -> DnsAnswer {
        match (name, record_type) {
            ("example.test", RecordType::A) => {
                Answer::ok(vec![DnsRecord::A(DESTINATION.into())], Duration::from_millis(3))
            }
            _ => Answer::err(
                DiagnosticError::new(ErrorKind::NameNotFound, format!("{} does not exist", name)),
                Duration::from_millis(3),
            ),
        }
    }

    async fn reverse_dns(&self, address: IpAddr, _: &ResolverSelection, _: Duration) -> ReverseAnswer {
        if address == IpAddr::from(ROUTER) {
            Answer::ok(vec!["gw.example.test".to_string()], Duration::from_millis(2))
        } else {
            Answer::err(
                DiagnosticError::new(ErrorKind::NoPtrRecord, "no PTR"),
                Duration::from_millis(2),
            )
        }
    }

    async fn tcp_connect(&self, addr: SocketAddr, timeout: Duration, _: bool) -> TcpProbe {
        match addr.port() {
            p if p < 100 => TcpProbe {
                sample: ProbeSample::success(Duration::from_millis(1)),
                status: PortStatus::Open,
                banner: None,
            },
            p if p < 1000 => TcpProbe {
                sample: ProbeSample::failure(ErrorKind::ConnectionRefused, Duration::from_millis(1)),
                status: PortStatus::Closed,
                banner: None,
            },
            _ => TcpProbe {
                sample: ProbeSample::timeout(timeout),
                status: PortStatus::Filtered,
                banner: None,
            },
        }
    }

    async fn ttl(&self, address: IpAddr, ttl: u8, _: Duration) -> HopProbe {
        let (responder, reached) = if ttl == 1 {
            (IpAddr::from(ROUTER), false)
        } else {
            (address, true)
        };
        HopProbe::answered(ProbeSample::success(Duration::from_millis(ttl as u64 * 5)), responder, reached)
    }

    async fn interfaces(&self) -> netdiag::Result<Vec<InterfaceInfo>> {
        Ok(vec![InterfaceInfo {
            name: "wlan0".to_string(),
            index: 3,
            mac: Some("02:00:5e:10:00:01".to_string()),
            networks: vec!["10.0.0.23/24".to_string()],
            addresses: vec![IpAddr::from([10, 0, 0, 23])],
            is_up: true,
            is_loopback: false,
            kind: InterfaceKind::Wireless,
        }])
    }

    async fn default_gateway(&self) -> netdiag::Result<Option<GatewayInfo>> {
        Ok(Some(GatewayInfo {
            address: IpAddr::from(ROUTER),
            interface: Some("wlan0".to_string()),
        }))
    }
}

fn engine() -> NetworkDiagnostics {
    NetworkDiagnostics::with_prober(Arc::new(ScriptedProber::default()))
}

fn fast_ping(count: u32) -> PingOptions {
    PingOptions::new(count, Duration::from_millis(200)).with_interval(Duration::ZERO)
}

#[tokio::test]
async fn test_ping_through_hostname() {
    let result = engine().ping("example.test", &fast_ping(6)).await;

    assert_eq!(result.operation, OperationKind::Ping);
    assert!(result.succeeded);
    let stats = result.payload.unwrap();
    assert_eq!(stats.sent, 6);
    assert_eq!(stats.received, 4);
    assert!((stats.packet_loss_percent() - 100.0 / 3.0).abs() < 0.01);
}

#[tokio::test]
async fn test_unknown_host_is_resolution_failure() {
    let result = engine().ping("nowhere.test", &fast_ping(2)).await;

    assert!(!result.succeeded);
    assert_eq!(result.error.unwrap().kind, ErrorKind::ResolutionFailed);
    assert!(result.payload.is_none());
}

#[tokio::test]
async fn test_quality_score_reflects_loss() {
    let options = QualityOptions {
        ping: fast_ping(9),
        ..QualityOptions::default()
    };
    let result = engine().connection_quality_test("192.0.2.50", &options).await;

    assert!(result.succeeded);
    let score = result.payload.unwrap();
    assert!(score.score < 100);
    assert_eq!(score.latency.received, 6);
    assert!(!score.recommendations.is_empty());
}

#[tokio::test]
async fn test_scan_classifies_every_port() {
    let options = PortScanOptions::new(Duration::from_millis(100), 8);
    let result = engine().port_scan("192.0.2.50", &[22, 80, 443, 8080], &options).await;

    assert!(result.succeeded);
    let report = result.payload.unwrap();
    assert_eq!(report.ports.len(), 4);
    assert_eq!(report.ports[&22].status, PortStatus::Open);
    assert_eq!(report.ports[&80].service.as_deref(), Some("HTTP"));
    assert_eq!(report.ports[&443].status, PortStatus::Closed);
    assert_eq!(report.ports[&8080].status, PortStatus::Filtered);
    assert!(!report.cancelled);
}

#[tokio::test]
async fn test_traceroute_names_hops() {
    let options = TracerouteOptions::new(5, Duration::from_millis(200)).with_hostnames(true);
    let result = engine().traceroute("example.test", &options).await;

    assert!(result.succeeded);
    let route = result.payload.unwrap();
    assert!(route.destination_reached);
    assert_eq!(route.hops.len(), 2);
    assert_eq!(route.hops[0].hostname.as_deref(), Some("gw.example.test"));
    assert_eq!(route.hops[1].address, Some(IpAddr::from(DESTINATION)));
    assert_eq!(route.hops[1].hostname, None);
}

#[tokio::test]
async fn test_bulk_lookup_partial_success() {
    let names = vec!["example.test".to_string(), "missing.test".to_string()];
    let options = netdiag::DnsLookupOptions::new(RecordType::A);
    let result = engine().dns_bulk_lookup(&names, &options).await;

    assert!(result.succeeded);
    let bulk = result.payload.unwrap();
    assert_eq!(bulk.total, 2);
    assert_eq!(bulk.successful, 1);
    assert_eq!(bulk.failed, 1);
    assert_eq!(bulk.results[1].error.as_ref().unwrap().kind, ErrorKind::NameNotFound);
}

#[tokio::test]
async fn test_annotation_serializes_result_and_metadata() {
    let result = engine().ping("192.0.2.50", &fast_ping(3)).await;
    let annotated = AnnotatedResult::new(result)
        .with_tag("ping")
        .with_metadata("site", "lab");

    let value = serde_json::to_value(&annotated).unwrap();
    assert_eq!(value["result"]["operation"], "Ping");
    assert_eq!(value["result"]["succeeded"], true);
    assert_eq!(value["metadata"]["site"], "lab");
    assert_eq!(value["tags"][0], "ping");
}

#[tokio::test]
async fn test_network_config_through_custom_backend() {
    let options = NetworkConfigOptions {
        dns_name: "example.test".to_string(),
        connectivity_target: "192.0.2.50".to_string(),
        ping: fast_ping(3),
        ..NetworkConfigOptions::default()
    };
    let result = engine().network_config(&options).await;

    assert_eq!(result.operation, OperationKind::NetworkConfig);
    assert!(result.succeeded);
    let config = result.payload.unwrap();
    assert_eq!(config.primary_interface.as_deref(), Some("wlan0"));
    assert_eq!(config.gateway.unwrap().address, IpAddr::from(ROUTER));
    assert!(config.dns_working);
    assert!(config.internet_connectivity);
    assert!(config.issues.is_empty());
}

//! Engine tests over a scripted prober

use super::*;
use crate::probe::mock::MockProber;
use crate::types::PortStatus;
use std::sync::Arc;
use std::time::Duration;

fn engine(prober: MockProber) -> (NetworkDiagnostics, Arc<MockProber>) {
    let prober = Arc::new(prober);
    (NetworkDiagnostics::with_prober(prober.clone()), prober)
}

fn quick_ping(count: u32) -> PingOptions {
    PingOptions::new(count, Duration::from_millis(200)).with_interval(Duration::ZERO)
}

mod ping_tests {
    use super::*;

    #[tokio::test]
    async fn test_partial_loss_still_succeeds() {
        let (engine, prober) = engine(MockProber::new().with_echo(vec![Some(10), None, Some(30), Some(20)]));

        let result = engine.ping("192.0.2.1", &quick_ping(4)).await;
        assert!(result.succeeded);
        assert!(result.error.is_none());

        let stats = result.payload.unwrap();
        assert_eq!(stats.sent, 4);
        assert_eq!(stats.received, 3);
        assert!((stats.loss_ratio - 0.25).abs() < 1e-9);
        assert_eq!(stats.min_ms, Some(10.0));
        assert_eq!(stats.max_ms, Some(30.0));
        assert_eq!(prober.calls(), 4);
    }

    #[tokio::test]
    async fn test_total_loss_fails_with_statistics() {
        let (engine, _) = engine(MockProber::new().with_echo(vec![None]));

        let result = engine.ping("192.0.2.1", &quick_ping(3)).await;
        assert!(!result.succeeded);
        assert_eq!(result.error_kind(), Some(ErrorKind::Unreachable));

        let stats = result.payload.unwrap();
        assert_eq!(stats.received, 0);
        assert_eq!(stats.loss_ratio, 1.0);
        assert_eq!(stats.mean_ms, None);
    }

    #[tokio::test]
    async fn test_permission_denied_is_reported() {
        let (engine, _) = engine(MockProber::new().with_echo_error(ErrorKind::PermissionDenied));

        let result = engine.ping("192.0.2.1", &quick_ping(2)).await;
        assert!(!result.succeeded);
        assert_eq!(result.error_kind(), Some(ErrorKind::PermissionDenied));
    }

    #[tokio::test]
    async fn test_invalid_input_never_touches_network() {
        let (engine, prober) = engine(MockProber::new());

        let bad_count = engine.ping("192.0.2.1", &quick_ping(0)).await;
        assert_eq!(bad_count.error_kind(), Some(ErrorKind::Validation));
        assert!(bad_count.payload.is_none());

        let bad_target = engine.ping("not a host!", &quick_ping(2)).await;
        assert_eq!(bad_target.error_kind(), Some(ErrorKind::Validation));
        assert_eq!(bad_target.target, "not a host!");

        assert_eq!(prober.calls(), 0);
    }

    #[tokio::test]
    async fn test_unknown_host_fails_resolution() {
        let (engine, prober) = engine(MockProber::new());

        let result = engine.ping("nowhere.invalid", &quick_ping(2)).await;
        assert_eq!(result.error_kind(), Some(ErrorKind::ResolutionFailed));
        assert!(result.payload.is_none());
        // Only the resolution attempt
        assert_eq!(prober.calls(), 1);
    }

    #[tokio::test]
    async fn test_hostname_target_is_resolved_once() {
        let (engine, prober) = engine(MockProber::new().with_host("example.com", "93.184.216.34"));

        let result = engine.ping("example.com", &quick_ping(2)).await;
        assert!(result.succeeded);
        assert_eq!(result.operation, OperationKind::Ping);
        assert_eq!(prober.calls(), 3);
    }
}

mod quality_tests {
    use super::*;

    #[tokio::test]
    async fn test_steady_link_scores_high() {
        let (engine, _) = engine(MockProber::new().with_echo(vec![Some(20)]));
        let options = QualityOptions {
            ping: quick_ping(5),
            ..QualityOptions::default()
        };

        let result = engine.connection_quality_test("192.0.2.1", &options).await;
        assert!(result.succeeded);
        let score = result.payload.unwrap();
        assert!(score.score >= 90, "score was {}", score.score);
        assert_eq!(score.latency.received, 5);
    }

    #[tokio::test]
    async fn test_dead_link_scores_zero_and_fails() {
        let (engine, _) = engine(MockProber::new().with_echo(vec![None]));
        let options = QualityOptions {
            ping: quick_ping(3),
            ..QualityOptions::default()
        };

        let result = engine.connection_quality_test("192.0.2.1", &options).await;
        assert!(!result.succeeded);
        let score = result.payload.unwrap();
        assert_eq!(score.score, 0);
        assert!(!score.recommendations.is_empty());
    }
}

mod dns_tests {
    use super::*;
    use std::net::Ipv4Addr;

    fn a(ip: &str) -> DnsRecord {
        DnsRecord::A(ip.parse().unwrap())
    }

    #[tokio::test]
    async fn test_lookup_returns_records() {
        let (engine, _) = engine(MockProber::new().with_records(
            "example.com",
            RecordType::A,
            vec![a("93.184.216.34")],
        ));

        let result = engine.dns_lookup("example.com", &DnsLookupOptions::new(RecordType::A)).await;
        assert!(result.succeeded);
        let records = result.payload.unwrap();
        assert_eq!(records.record_type, RecordType::A);
        assert_eq!(records.resolver, "system");
        assert_eq!(records.addresses(), vec!["93.184.216.34".parse::<IpAddr>().unwrap()]);
    }

    #[tokio::test]
    async fn test_repeated_lookups_agree() {
        let (engine, prober) = engine(MockProber::new().with_records(
            "example.test",
            RecordType::A,
            vec![a("192.0.2.7")],
        ));
        let options = DnsLookupOptions::new(RecordType::A);

        let first = engine.dns_lookup("example.test", &options).await;
        let second = engine.dns_lookup("example.test", &options).await;
        assert_eq!(first.payload, second.payload);
        assert_eq!(prober.calls(), 2);
    }

    #[tokio::test]
    async fn test_nxdomain_is_name_not_found() {
        let (engine, _) = engine(MockProber::new());

        let result = engine.dns_lookup("missing.example", &DnsLookupOptions::new(RecordType::Mx)).await;
        assert!(!result.succeeded);
        assert_eq!(result.error_kind(), Some(ErrorKind::NameNotFound));
    }

    #[tokio::test]
    async fn test_ptr_query_for_address_uses_reverse_lookup() {
        let (engine, _) = engine(MockProber::new().with_ptr("8.8.8.8", &["dns.google"]));

        let result = engine.dns_lookup("8.8.8.8", &DnsLookupOptions::new(RecordType::Ptr)).await;
        assert!(result.succeeded);
        assert_eq!(result.payload.unwrap().records, vec![DnsRecord::Ptr("dns.google".to_string())]);
    }

    #[tokio::test]
    async fn test_reverse_dns() {
        let (engine, prober) = engine(MockProber::new().with_ptr("1.1.1.1", &["one.one.one.one"]));

        let found = engine.reverse_dns("1.1.1.1", &ReverseDnsOptions::default()).await;
        assert_eq!(found.payload.unwrap().primary(), Some("one.one.one.one"));

        let missing = engine.reverse_dns("192.0.2.9", &ReverseDnsOptions::default()).await;
        assert_eq!(missing.error_kind(), Some(ErrorKind::NoPtrRecord));

        let invalid = engine.reverse_dns("example.com", &ReverseDnsOptions::default()).await;
        assert_eq!(invalid.error_kind(), Some(ErrorKind::Validation));
        assert_eq!(prober.calls(), 2);
    }

    #[tokio::test]
    async fn test_bulk_lookup_dedupes_and_keeps_order() {
        let (engine, prober) = engine(
            MockProber::new()
                .with_records("b.example", RecordType::A, vec![a("192.0.2.2")])
                .with_records("a.example", RecordType::A, vec![a("192.0.2.1")]),
        );
        let names: Vec<String> = ["b.example", "a.example", "B.example", "gone.example"]
            .iter()
            .map(|s| s.to_string())
            .collect();

        let result = engine.dns_bulk_lookup(&names, &DnsLookupOptions::new(RecordType::A)).await;
        assert!(result.succeeded);
        let bulk = result.payload.unwrap();
        assert_eq!(bulk.total, 3);
        assert_eq!(bulk.successful, 2);
        assert_eq!(bulk.failed, 1);
        assert_eq!(bulk.results[0].target, "b.example");
        assert_eq!(bulk.results[2].error_kind(), Some(ErrorKind::NameNotFound));
        assert_eq!(prober.calls(), 3);
    }

    #[tokio::test]
    async fn test_bulk_lookup_needs_names() {
        let (engine, _) = engine(MockProber::new());
        let result = engine.dns_bulk_lookup(&[], &DnsLookupOptions::default()).await;
        assert_eq!(result.error_kind(), Some(ErrorKind::Validation));
    }

    #[tokio::test]
    async fn test_dns_info_collects_reverse_names() {
        let (engine, _) = engine(
            MockProber::new()
                .with_records("example.com", RecordType::A, vec![a("192.0.2.1"), a("192.0.2.2")])
                .with_ptr("192.0.2.1", &["web.example.com"]),
        );

        let result = engine.dns_info("example.com", &DnsLookupOptions::default()).await;
        assert!(result.succeeded);
        let info = result.payload.unwrap();
        assert_eq!(info.ipv4, vec![Ipv4Addr::new(192, 0, 2, 1), Ipv4Addr::new(192, 0, 2, 2)]);
        assert!(info.ipv6.is_empty());
        assert_eq!(info.reverse.len(), 2);
        assert_eq!(info.reverse[0].hostnames, vec!["web.example.com"]);
        assert_eq!(info.reverse[1].error, Some(ErrorKind::NoPtrRecord));
    }

    #[tokio::test]
    async fn test_dns_info_fails_when_name_has_no_addresses() {
        let (engine, _) = engine(MockProber::new());
        let result = engine.dns_info("missing.example", &DnsLookupOptions::default()).await;
        assert_eq!(result.error_kind(), Some(ErrorKind::NameNotFound));
    }

    #[tokio::test]
    async fn test_benchmark_ranks_and_validates() {
        let (engine, _) = engine(
            MockProber::new()
                .with_records("example.com", RecordType::A, vec![a("192.0.2.1")])
                .with_server_latency("1.1.1.1", 4)
                .with_server_latency("8.8.8.8", 12),
        );
        let domains = vec!["example.com".to_string()];
        let resolvers = vec![
            ResolverSelection::server("8.8.8.8".parse().unwrap()),
            ResolverSelection::server("1.1.1.1".parse().unwrap()),
        ];

        let result = engine
            .dns_benchmark(&domains, &resolvers, &DnsBenchmarkOptions::default())
            .await;
        assert!(result.succeeded);
        assert_eq!(result.payload.unwrap().fastest().unwrap().resolver, "1.1.1.1");

        let empty = engine.dns_benchmark(&[], &resolvers, &DnsBenchmarkOptions::default()).await;
        assert_eq!(empty.error_kind(), Some(ErrorKind::Validation));
    }

    #[tokio::test]
    async fn test_benchmark_fails_when_nothing_answers() {
        let (engine, _) = engine(MockProber::new());
        let domains = vec!["missing.example".to_string()];
        let resolvers = vec![ResolverSelection::System];

        let result = engine
            .dns_benchmark(&domains, &resolvers, &DnsBenchmarkOptions::default())
            .await;
        assert!(!result.succeeded);
        assert_eq!(result.error_kind(), Some(ErrorKind::NameNotFound));
        assert!(result.payload.is_some());
    }
}

mod scan_tests {
    use super::*;

    fn scan_options() -> PortScanOptions {
        PortScanOptions::new(Duration::from_millis(100), 8)
    }

    #[tokio::test]
    async fn test_scan_reports_each_port_once() {
        let (engine, prober) = engine(MockProber::new().with_open_ports(&[22, 443]).with_filtered_ports(&[8080]));

        let result = engine
            .port_scan("127.0.0.1", &[443, 22, 80, 8080, 22], &scan_options())
            .await;
        assert!(result.succeeded);
        let report = result.payload.unwrap();
        assert_eq!(report.len(), 4);
        assert_eq!(report.open_ports(), vec![22, 443]);
        assert_eq!(report.ports[&80].status, PortStatus::Closed);
        assert_eq!(report.ports[&8080].status, PortStatus::Filtered);
        assert_eq!(prober.calls(), 4);
    }

    #[tokio::test]
    async fn test_hostname_resolution_uses_scan_timeout() {
        let (engine, prober) = engine(MockProber::new().with_host("gw.lan", "10.0.0.1").with_open_ports(&[22]));
        let options = PortScanOptions::new(Duration::from_millis(750), 2);

        let result = engine.port_scan("gw.lan", &[22], &options).await;
        assert!(result.succeeded);
        assert_eq!(prober.resolve_timeouts(), vec![Duration::from_millis(750)]);
    }

    #[tokio::test]
    async fn test_all_filtered_fails_with_timeout() {
        let (engine, _) = engine(MockProber::new().with_filtered_ports(&[81, 82]));

        let result = engine.port_scan("127.0.0.1", &[81, 82], &scan_options()).await;
        assert!(!result.succeeded);
        assert_eq!(result.error_kind(), Some(ErrorKind::Timeout));
        assert_eq!(result.payload.unwrap().count(PortStatus::Filtered), 2);
    }

    #[tokio::test]
    async fn test_invalid_ports_run_nothing() {
        let (engine, prober) = engine(MockProber::new());

        for ports in [&[][..], &[0][..], &[65536][..]] {
            let result = engine.port_scan("127.0.0.1", ports, &scan_options()).await;
            assert_eq!(result.error_kind(), Some(ErrorKind::Validation));
        }
        let zero_pool = engine
            .port_scan("127.0.0.1", &[80], &PortScanOptions::new(Duration::from_millis(100), 0))
            .await;
        assert_eq!(zero_pool.error_kind(), Some(ErrorKind::Validation));
        assert_eq!(prober.calls(), 0);
    }

    #[tokio::test]
    async fn test_common_ports() {
        let (engine, _) = engine(MockProber::new().with_open_ports(&[443]));

        let result = engine.scan_common_ports("127.0.0.1", &scan_options()).await;
        let report = result.payload.unwrap();
        assert_eq!(report.len(), crate::utils::COMMON_PORTS.len());
        assert_eq!(report.ports[&443].service.as_deref(), Some("HTTPS"));
    }
}

mod trace_tests {
    use super::*;

    fn trace_options(max_hops: u8) -> TracerouteOptions {
        TracerouteOptions::new(max_hops, Duration::from_millis(100))
    }

    #[tokio::test]
    async fn test_trace_reaches_destination() {
        let (engine, _) = engine(MockProber::new().with_path(vec![Some("10.0.0.1"), None, Some("198.51.100.1")]));

        let result = engine.traceroute("203.0.113.5", &trace_options(10)).await;
        assert!(result.succeeded);
        let route = result.payload.unwrap();
        assert!(route.destination_reached);
        assert_eq!(route.hops.len(), 4);
        assert!(route.hops[1].timed_out());
        assert_eq!(route.hops[3].address, Some("203.0.113.5".parse().unwrap()));
    }

    #[tokio::test]
    async fn test_unprivileged_trace_fails_with_partial_route() {
        let (engine, prober) = engine(MockProber::new().with_ttl_error(ErrorKind::PermissionDenied));

        let result = engine.traceroute("203.0.113.5", &trace_options(10)).await;
        assert!(!result.succeeded);
        assert_eq!(result.error_kind(), Some(ErrorKind::PermissionDenied));
        assert!(result.payload.is_some());
        assert_eq!(prober.seen_ttls(), vec![1]);
    }

    #[tokio::test]
    async fn test_unreachable_report_stops_before_max_hops() {
        let (engine, prober) = engine(
            MockProber::new()
                .with_path(vec![Some("10.0.0.1"), None, None, None])
                .with_unreachable_at(1),
        );

        let result = engine.traceroute("203.0.113.5", &trace_options(10)).await;
        assert!(result.succeeded);
        let route = result.payload.unwrap();
        assert_eq!(route.unreachable_at, Some(1));
        assert!(!route.destination_reached);
        assert_eq!(route.hops.len(), 1);
        assert_eq!(prober.seen_ttls(), vec![1]);
    }

    #[tokio::test]
    async fn test_silent_path_fails() {
        let (engine, _) = engine(MockProber::new().with_path(vec![None, None, None]));

        let result = engine.traceroute("203.0.113.5", &trace_options(3)).await;
        assert!(!result.succeeded);
        assert_eq!(result.error_kind(), Some(ErrorKind::Timeout));
        assert_eq!(result.payload.unwrap().hops.len(), 3);
    }

    #[tokio::test]
    async fn test_zero_hops_is_rejected() {
        let (engine, prober) = engine(MockProber::new());
        let result = engine.traceroute("203.0.113.5", &trace_options(0)).await;
        assert_eq!(result.error_kind(), Some(ErrorKind::Validation));
        assert_eq!(prober.calls(), 0);
    }
}

mod public_ip_tests {
    use super::*;

    #[tokio::test]
    async fn test_no_services_is_a_validation_failure() {
        let (engine, _) = engine(MockProber::new());
        let engine = engine.with_public_ip_services(Vec::new());

        let result = engine.public_ip().await;
        assert!(!result.succeeded);
        assert_eq!(result.error_kind(), Some(ErrorKind::Validation));
        assert_eq!(result.operation, OperationKind::PublicIp);
    }
}

mod host_config_tests {
    use super::*;

    fn check_options() -> NetworkConfigOptions {
        NetworkConfigOptions {
            ping: PingOptions::new(3, Duration::from_millis(200)).with_interval(Duration::ZERO),
            ..NetworkConfigOptions::default()
        }
    }

    fn healthy() -> MockProber {
        MockProber::new()
            .with_interface("lo", Some("127.0.0.1"))
            .with_interface("eth0", Some("192.0.2.10"))
            .with_gateway("192.0.2.1", "eth0")
            .with_records("google.com", RecordType::A, vec![DnsRecord::A("142.250.1.1".parse().unwrap())])
    }

    #[tokio::test]
    async fn test_interfaces_listed() {
        let (engine, _) = engine(healthy());

        let result = engine.interfaces().await;
        assert_eq!(result.operation, OperationKind::Interfaces);
        let interfaces = result.payload.unwrap();
        assert_eq!(interfaces.len(), 2);
        assert!(interfaces[0].is_loopback);
        assert!(interfaces[1].is_active());
    }

    #[tokio::test]
    async fn test_gateway_found_and_missing() {
        let (engine, _) = engine(healthy());
        let result = engine.default_gateway().await;
        assert!(result.succeeded);
        assert_eq!(result.payload.unwrap().interface.as_deref(), Some("eth0"));

        let (engine, _) = engine_without_gateway();
        let result = engine.default_gateway().await;
        assert!(!result.succeeded);
        assert_eq!(result.error_kind(), Some(ErrorKind::Unreachable));
    }

    fn engine_without_gateway() -> (NetworkDiagnostics, Arc<MockProber>) {
        engine(MockProber::new().with_interface("eth0", Some("192.0.2.10")))
    }

    #[tokio::test]
    async fn test_healthy_config_has_no_issues() {
        let (engine, _) = engine(healthy());

        let result = engine.network_config(&check_options()).await;
        assert!(result.succeeded);
        let config = result.payload.unwrap();
        assert_eq!(config.primary_interface.as_deref(), Some("eth0"));
        assert!(config.dns_working);
        assert!(config.internet_connectivity);
        assert_eq!(config.connectivity.unwrap().received, 3);
        assert!(config.issues.is_empty(), "{:?}", config.issues);
    }

    #[tokio::test]
    async fn test_broken_checks_become_issues() {
        let prober = MockProber::new()
            .with_interface("eth0", Some("192.0.2.10"))
            .with_echo(vec![None])
            .with_dns_error("google.com", RecordType::A, ErrorKind::ResolverUnavailable);
        let (engine, _) = engine(prober);

        let result = engine.network_config(&check_options()).await;
        assert!(result.succeeded);
        let config = result.payload.unwrap();
        assert!(!config.dns_working);
        assert!(!config.internet_connectivity);
        assert_eq!(
            config.issues,
            vec!["No default gateway found", "DNS resolution not working", "No internet connectivity"]
        );
    }

    #[tokio::test]
    async fn test_invalid_config_target_is_rejected() {
        let (engine, prober) = engine(healthy());
        let options = NetworkConfigOptions {
            connectivity_target: "bad host!".to_string(),
            ..check_options()
        };

        let result = engine.network_config(&options).await;
        assert_eq!(result.error_kind(), Some(ErrorKind::Validation));
        assert_eq!(prober.calls(), 0);
    }

    #[tokio::test]
    async fn test_bandwidth_rejects_non_http_server() {
        let (engine, _) = engine(MockProber::new());
        let options = BandwidthOptions::default().with_urls(vec!["ftp://mirror.example/1MB".to_string()]);

        let result = engine.bandwidth_test(&options).await;
        assert_eq!(result.operation, OperationKind::Bandwidth);
        assert_eq!(result.error_kind(), Some(ErrorKind::Validation));
        assert_eq!(result.target, "1MB");
    }
}

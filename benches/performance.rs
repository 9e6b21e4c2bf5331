//! Performance benchmarks for the diagnostics engine
//!
//! Input parsing, statistics folding and the aggregators driven by a prober
//! that answers instantly, so only engine overhead is measured.

use async_trait::async_trait;
use clap::Parser;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use netdiag::{
    cli::Cli,
    config::parser::ConfigParser,
    models::{Config, DnsRecord, LatencyStats, ProbeSample},
    probe::{Answer, DnsAnswer, HopProbe, Prober, ReverseAnswer, TcpProbe},
    stats::{QualityCalculator, QualityWeights},
    utils::parse_port_spec,
    NetworkDiagnostics, PingOptions, PortScanOptions, PortStatus, RecordType, ResolverSelection, Target,
};
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

/// Prober that answers every primitive immediately
struct InstantProber;

#[async_trait]
impl Prober for InstantProber {
    async fn resolve(&self, target: &Target, _: &ResolverSelection, _: Duration) -> netdiag::Result<IpAddr> {
        Ok(target.ip().unwrap_or(IpAddr::from([192, 0, 2, 1])))
    }

    async fn echo(&self, _: IpAddr, _: Duration) -> ProbeSample {
        ProbeSample::success(Duration::from_micros(250))
    }

    async fn dns(&self, _: &str, _: RecordType, _: &ResolverSelection, _: Duration) -> DnsAnswer {
        Answer::ok(vec![DnsRecord::A([192, 0, 2, 1].into())], Duration::from_micros(100))
    }

    async fn reverse_dns(&self, _: IpAddr, _: &ResolverSelection, _: Duration) -> ReverseAnswer {
        Answer::ok(vec!["host.example".to_string()], Duration::from_micros(100))
    }

    async fn tcp_connect(&self, addr: SocketAddr, _: Duration, _: bool) -> TcpProbe {
        let status = if addr.port() % 10 == 0 { PortStatus::Open } else { PortStatus::Closed };
        TcpProbe {
            sample: ProbeSample::success(Duration::from_micros(50)),
            status,
            banner: None,
        }
    }

    async fn ttl(&self, address: IpAddr, _: u8, _: Duration) -> HopProbe {
        HopProbe::answered(ProbeSample::success(Duration::from_micros(50)), address, true)
    }
}

fn create_sample_rtts(count: usize) -> Vec<ProbeSample> {
    (0..count)
        .map(|i| {
            if i % 10 == 0 {
                ProbeSample::timeout(Duration::from_secs(1))
            } else {
                ProbeSample::success(Duration::from_micros(10_000 + (i as u64 * 7919) % 40_000))
            }
        })
        .collect()
}

/// Benchmark parsing of user input
fn benchmark_input_parsing(c: &mut Criterion) {
    let mut group = c.benchmark_group("input_parsing");

    group.bench_function("parse_targets", |b| {
        let targets = ["example.com", "192.0.2.1", "[2001:db8::1]", "sub.domain-1.example.org"];
        b.iter(|| {
            let parsed: Vec<Target> = targets.iter().filter_map(|t| Target::parse(black_box(t)).ok()).collect();
            black_box(parsed);
        });
    });

    group.bench_function("parse_port_spec", |b| {
        b.iter(|| {
            let ports = parse_port_spec(black_box("22,80,443,8000-8100,9000-9999")).unwrap();
            black_box(ports);
        });
    });

    group.bench_function("parse_resolvers", |b| {
        let specs = ["system", "1.1.1.1,8.8.8.8", "https://dns.google/resolve"];
        b.iter(|| {
            let parsed: Vec<ResolverSelection> = specs
                .iter()
                .filter_map(|s| ResolverSelection::parse(black_box(s)).ok())
                .collect();
            black_box(parsed);
        });
    });

    group.finish();
}

/// Benchmark configuration parsing from various sources
fn benchmark_config_parsing(c: &mut Criterion) {
    let mut group = c.benchmark_group("config_parsing");

    let args = vec!["netdiag", "--timeout", "10", "--dns-server", "8.8.8.8,1.1.1.1", "ping", "example.com", "--count", "5"];

    group.bench_function("parse_cli_args", |b| {
        b.iter(|| {
            let cli = Cli::try_parse_from(black_box(&args)).unwrap();
            black_box(cli);
        });
    });

    group.bench_function("validate_config", |b| {
        let config = Config::default();
        b.iter(|| {
            let result = config.validate();
            black_box(result.is_ok());
        });
    });

    group.bench_function("parse_from_cli", |b| {
        let cli = Cli::try_parse_from(&args).unwrap();
        b.iter(|| {
            let parser = ConfigParser::new(black_box(cli.clone()));
            black_box(parser.parse().is_ok());
        });
    });

    group.finish();
}

/// Benchmark statistics folding
fn benchmark_statistics(c: &mut Criterion) {
    let mut group = c.benchmark_group("statistics");
    let calculator = QualityCalculator::new(QualityWeights::default());

    for size in [10, 100, 1000] {
        let samples = create_sample_rtts(size);

        group.bench_with_input(BenchmarkId::new("latency_stats", size), &samples, |b, samples| {
            b.iter(|| black_box(LatencyStats::from_samples(samples)));
        });

        let stats = LatencyStats::from_samples(&samples);
        group.bench_with_input(BenchmarkId::new("quality_score", size), &stats, |b, stats| {
            b.iter(|| black_box(calculator.assess(stats.clone())));
        });
    }

    group.finish();
}

/// Benchmark the aggregators with no network latency
fn benchmark_engine_overhead(c: &mut Criterion) {
    let mut group = c.benchmark_group("engine_overhead");
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let engine = NetworkDiagnostics::with_prober(Arc::new(InstantProber));

    group.bench_function("ping_100", |b| {
        let options = PingOptions::new(100, Duration::from_secs(1)).with_interval(Duration::ZERO);
        b.iter(|| black_box(runtime.block_on(engine.ping("192.0.2.1", &options))));
    });

    for concurrency in [1usize, 64, 512] {
        let ports: Vec<u32> = (1..=1024).collect();
        let options = PortScanOptions::new(Duration::from_secs(1), concurrency);
        group.bench_with_input(BenchmarkId::new("scan_1024_ports", concurrency), &options, |b, options| {
            b.iter(|| black_box(runtime.block_on(engine.port_scan("192.0.2.1", &ports, options))));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    benchmark_input_parsing,
    benchmark_config_parsing,
    benchmark_statistics,
    benchmark_engine_overhead
);

criterion_main!(benches);

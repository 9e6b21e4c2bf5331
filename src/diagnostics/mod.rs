//! Network diagnostics engine
//!
//! Every operation validates its input before touching the network, runs one
//! aggregator and seals what happened into a [`DiagnosticResult`]. Network
//! failures never surface as `Err`: they are folded into the result, and a
//! payload is attached whenever probing ran.

pub mod options;

#[cfg(test)]
mod comprehensive_tests;

pub use options::{
    validate_ports, validate_timeout, BandwidthOptions, DnsBenchmarkOptions, DnsLookupOptions,
    NetworkConfigOptions, PingOptions, PortScanOptions, QualityOptions, ReverseDnsOptions, TracerouteOptions,
};

use crate::bandwidth;
use crate::dns::DnsManager;
use crate::error::{AppError, DiagnosticError, ErrorKind, Result};
use crate::executor::{benchmark_resolvers, run_repeated, scan_ports, trace_hops, RepeatPlan};
use crate::logging::{LogLevel, Logger};
use crate::models::{
    BandwidthReport, BulkLookup, Config, DiagnosticResult, DnsBenchmark, DnsInfo, DnsRecord, GatewayInfo,
    InterfaceInfo, LatencyStats, LocalIpInfo, NetworkConfig, PortScanReport, ProbeSample, PublicIpInfo,
    QualityScore, ResolvedHostname, ResolvedRecords, ResultRecorder, ReverseEntry, TraceRoute,
};
use crate::netinfo;
use crate::probe::{Prober, SystemProber};
use crate::stats::QualityCalculator;
use crate::types::{OperationKind, RecordType, ResolverSelection, Target};
use crate::utils::common_ports;
use futures::future::join_all;
use futures::stream::{self, StreamExt};
use reqwest::Client;
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

/// Lookups in flight at once during a bulk lookup
const BULK_LOOKUP_CONCURRENCY: usize = 10;

/// Kind reported when every probe of a run failed: an environment failure
/// wins, otherwise the most frequent kind
fn prevailing_error(errors: impl IntoIterator<Item = ErrorKind>, fallback: ErrorKind) -> ErrorKind {
    let mut counts: HashMap<ErrorKind, usize> = HashMap::new();
    for kind in errors {
        if kind.is_environmental() {
            return kind;
        }
        *counts.entry(kind).or_default() += 1;
    }
    counts
        .into_iter()
        .max_by_key(|&(kind, count)| (count, kind == fallback))
        .map(|(kind, _)| kind)
        .unwrap_or(fallback)
}

fn validation_failure<T>(recorder: ResultRecorder, error: AppError) -> DiagnosticResult<T> {
    recorder.failure(error.into())
}

/// Diagnostics engine facade
pub struct NetworkDiagnostics {
    prober: Arc<dyn Prober>,
    http_client: Client,
    logger: Logger,
    public_ip_services: Vec<String>,
    public_ip_timeout: Duration,
}

impl NetworkDiagnostics {
    /// Engine backed by real sockets and resolvers
    pub fn new() -> Result<Self> {
        let http_client = build_http_client()?;
        let prober = SystemProber::with_dns(DnsManager::with_client(http_client.clone()));
        Ok(Self::with_prober(Arc::new(prober)).with_http_client(http_client))
    }

    /// Engine built from application configuration
    pub fn from_config(config: &Config, logger: Logger) -> Result<Self> {
        Ok(Self::new()?
            .with_logger(logger)
            .with_public_ip_services(config.public_ip_services.clone())
            .with_public_ip_timeout(config.timeout()))
    }

    /// Engine over any prober; used to script the network in tests
    pub fn with_prober(prober: Arc<dyn Prober>) -> Self {
        Self {
            prober,
            http_client: Client::new(),
            logger: Logger::new("ENGINE"),
            public_ip_services: crate::defaults::PUBLIC_IP_SERVICES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            public_ip_timeout: crate::defaults::DEFAULT_TIMEOUT,
        }
    }

    pub fn with_logger(mut self, logger: Logger) -> Self {
        self.logger = logger;
        self
    }

    pub fn with_http_client(mut self, http_client: Client) -> Self {
        self.http_client = http_client;
        self
    }

    pub fn with_public_ip_services(mut self, services: Vec<String>) -> Self {
        self.public_ip_services = services;
        self
    }

    pub fn with_public_ip_timeout(mut self, timeout: Duration) -> Self {
        self.public_ip_timeout = timeout;
        self
    }

    /// Log start and end of one operation around `run`
    async fn observe<T, F, Fut>(&self, operation: OperationKind, target: &str, run: F) -> DiagnosticResult<T>
    where
        F: FnOnce(ResultRecorder) -> Fut,
        Fut: Future<Output = DiagnosticResult<T>>,
    {
        let name = operation.to_string();
        let correlation_id = self.logger.start_operation(&name, target).await;

        let result = run(ResultRecorder::start(operation, target)).await;

        if let Some(error) = &result.error {
            let level = if error.kind == ErrorKind::PermissionDenied {
                LogLevel::Warn
            } else {
                LogLevel::Debug
            };
            self.logger
                .log(level, &format!("{} {} failed: {}", name, target, error.detail))
                .correlation_id(&correlation_id)
                .diagnostic(error)
                .log()
                .await;
        }
        self.logger
            .end_operation(&correlation_id, &name, result.succeeded, result.duration())
            .await;

        result
    }

    async fn resolve(&self, target: &Target, resolver: &ResolverSelection, timeout: Duration) -> Result<IpAddr> {
        let address = self.prober.resolve(target, resolver, timeout).await?;
        if !target.is_ip() {
            crate::log_debug!(self.logger, "{} resolved to {}", target, address);
        }
        Ok(address)
    }

    /// Shared by ping and the quality test: statistics of one echo run, plus
    /// the error to report when nothing answered. `Err` means no probe ran.
    async fn measure(
        &self,
        raw: &str,
        options: &PingOptions,
    ) -> std::result::Result<(LatencyStats, Option<DiagnosticError>), DiagnosticError> {
        let target = Target::parse(raw)?;
        options.validate()?;
        let address = self.resolve(&target, &options.resolver, options.timeout).await?;

        let prober = &self.prober;
        let samples = run_repeated(RepeatPlan::from(options), |_| prober.echo(address, options.timeout)).await;
        let stats = LatencyStats::from_samples(&samples);

        let error = (!stats.has_responses()).then(|| {
            let kind = prevailing_error(samples.iter().filter_map(|s| s.error), ErrorKind::Unreachable);
            DiagnosticError::new(kind, format!("no replies from {} after {} probes", address, samples.len()))
        });
        Ok((stats, error))
    }

    /// Echo `count` times and summarize. Succeeds when any reply arrived;
    /// loss is reported in the statistics, never as a failure.
    pub async fn ping(&self, target: &str, options: &PingOptions) -> DiagnosticResult<LatencyStats> {
        self.observe(OperationKind::Ping, target, |recorder| async move {
            match self.measure(target, options).await {
                Ok((stats, None)) => recorder.success(stats),
                Ok((stats, Some(error))) => recorder.failure_with(error, stats),
                Err(error) => recorder.failure(error),
            }
        })
        .await
    }

    /// Ping with a quality score derived from latency, jitter and loss
    pub async fn connection_quality_test(&self, target: &str, options: &QualityOptions) -> DiagnosticResult<QualityScore> {
        self.observe(OperationKind::ConnectionQuality, target, |recorder| async move {
            let calculator = QualityCalculator::new(options.weights);
            match self.measure(target, &options.ping).await {
                Ok((stats, None)) => recorder.success(calculator.assess(stats)),
                Ok((stats, Some(error))) => recorder.failure_with(error, calculator.assess(stats)),
                Err(error) => recorder.failure(error),
            }
        })
        .await
    }

    /// One forward query. A PTR query for an IP literal is turned into a
    /// reverse lookup.
    pub async fn dns_lookup(&self, name: &str, options: &DnsLookupOptions) -> DiagnosticResult<ResolvedRecords> {
        self.observe(OperationKind::DnsLookup, name, |recorder| async move {
            let target = match Target::parse(name) {
                Ok(target) => target,
                Err(e) => return validation_failure(recorder, e),
            };
            if let Err(e) = options.validate() {
                return validation_failure(recorder, e);
            }

            let answer = match (options.record_type, target.ip()) {
                (RecordType::Ptr, Some(address)) => {
                    let reverse = self.prober.reverse_dns(address, &options.resolver, options.timeout).await;
                    reverse
                        .outcome
                        .map(|names| names.into_iter().map(DnsRecord::Ptr).collect::<Vec<_>>())
                }
                _ => {
                    self.prober
                        .dns(target.as_str(), options.record_type, &options.resolver, options.timeout)
                        .await
                        .outcome
                }
            };

            match answer {
                Ok(records) => recorder.success(ResolvedRecords {
                    name: target.as_str().to_string(),
                    record_type: options.record_type,
                    resolver: options.resolver.name(),
                    records,
                }),
                Err(error) => recorder.failure(error),
            }
        })
        .await
    }

    /// PTR lookup of an IP address
    pub async fn reverse_dns(&self, ip: &str, options: &ReverseDnsOptions) -> DiagnosticResult<ResolvedHostname> {
        self.observe(OperationKind::ReverseDns, ip, |recorder| async move {
            let address = match ip.trim().parse::<IpAddr>() {
                Ok(address) => address,
                Err(_) => {
                    return validation_failure(recorder, AppError::validation(format!("'{}' is not an IP address", ip)))
                }
            };
            if let Err(e) = options.validate() {
                return validation_failure(recorder, e);
            }

            let answer = self.prober.reverse_dns(address, &options.resolver, options.timeout).await;
            match answer.outcome {
                Ok(hostnames) => recorder.success(ResolvedHostname { address, hostnames }),
                Err(error) => recorder.failure(error),
            }
        })
        .await
    }

    /// Scan `ports` on `target`. Duplicates are scanned once. Fails only when
    /// no port gave a definitive open or closed answer.
    pub async fn port_scan(&self, target: &str, ports: &[u32], options: &PortScanOptions) -> DiagnosticResult<PortScanReport> {
        self.observe(OperationKind::PortScan, target, |recorder| async move {
            let parsed = match Target::parse(target) {
                Ok(parsed) => parsed,
                Err(e) => return validation_failure(recorder, e),
            };
            let ports = match options.validate().and_then(|_| validate_ports(ports)) {
                Ok(ports) => ports,
                Err(e) => return validation_failure(recorder, e),
            };
            let address = match self.resolve(&parsed, &options.resolver, options.timeout).await {
                Ok(address) => address,
                Err(e) => return recorder.failure(e.into()),
            };

            let report = scan_ports(self.prober.clone(), address, &ports, options).await;
            if report.ports.values().any(|p| p.status.is_definitive()) {
                return recorder.success(report);
            }

            let kind = if report.cancelled {
                ErrorKind::Timeout
            } else {
                prevailing_error(report.ports.values().filter_map(|p| p.error), ErrorKind::Timeout)
            };
            let error = DiagnosticError::new(kind, format!("no port on {} answered", address));
            recorder.failure_with(error, report)
        })
        .await
    }

    /// Scan the well-known service ports
    pub async fn scan_common_ports(&self, target: &str, options: &PortScanOptions) -> DiagnosticResult<PortScanReport> {
        self.port_scan(target, &common_ports(), options).await
    }

    /// Walk the path hop by hop. Fails when probing was not permitted or
    /// when no hop answered at all.
    pub async fn traceroute(&self, target: &str, options: &TracerouteOptions) -> DiagnosticResult<TraceRoute> {
        self.observe(OperationKind::Traceroute, target, |recorder| async move {
            let parsed = match Target::parse(target) {
                Ok(parsed) => parsed,
                Err(e) => return validation_failure(recorder, e),
            };
            if let Err(e) = options.validate() {
                return validation_failure(recorder, e);
            }
            let address = match self.resolve(&parsed, &options.resolver, options.timeout).await {
                Ok(address) => address,
                Err(e) => return recorder.failure(e.into()),
            };

            let trace = trace_hops(self.prober.as_ref(), address, options).await;
            if let Some(kind) = trace.aborted {
                let error = DiagnosticError::new(kind, "hop-limited probes need raw socket privilege");
                return recorder.failure_with(error, trace.route);
            }
            if trace.route.responding_hops() == 0 {
                let error = DiagnosticError::new(
                    ErrorKind::Timeout,
                    format!("no hop answered within {} hops", trace.route.hops.len()),
                );
                return recorder.failure_with(error, trace.route);
            }
            recorder.success(trace.route)
        })
        .await
    }

    /// Time every resolver against every domain. Fails when no resolver
    /// answered a single query.
    pub async fn dns_benchmark(
        &self,
        domains: &[String],
        resolvers: &[ResolverSelection],
        options: &DnsBenchmarkOptions,
    ) -> DiagnosticResult<DnsBenchmark> {
        let label = format!("{} resolvers", resolvers.len());
        self.observe(OperationKind::DnsBenchmark, &label, |recorder| async move {
            if domains.is_empty() || resolvers.is_empty() {
                return validation_failure(recorder, AppError::validation("benchmark needs at least one domain and one resolver"));
            }
            let mut names = Vec::with_capacity(domains.len());
            for domain in domains {
                match Target::parse(domain) {
                    Ok(target) => names.push(target.as_str().to_string()),
                    Err(e) => return validation_failure(recorder, e),
                }
            }
            if let Err(e) = options.validate() {
                return validation_failure(recorder, e);
            }

            let bench = benchmark_resolvers(self.prober.as_ref(), &names, resolvers, options.record_type, options.timeout).await;
            if bench.fastest().is_some() {
                return recorder.success(bench);
            }

            let kind = prevailing_error(
                bench.resolvers.iter().flat_map(|r| r.failures.iter().map(|f| f.kind)),
                ErrorKind::ResolverUnavailable,
            );
            recorder.failure_with(DiagnosticError::new(kind, "no resolver answered"), bench)
        })
        .await
    }

    /// Look up many names with the same options. Each name is looked up
    /// once; results keep the input order.
    pub async fn dns_bulk_lookup(&self, names: &[String], options: &DnsLookupOptions) -> DiagnosticResult<BulkLookup> {
        let label = format!("{} names", names.len());
        self.observe(OperationKind::DnsBulkLookup, &label, |recorder| async move {
            let mut seen = HashSet::new();
            let unique: Vec<&String> = names.iter().filter(|n| seen.insert(n.trim().to_lowercase())).collect();
            if unique.is_empty() {
                return validation_failure(recorder, AppError::validation("at least one name is required"));
            }
            if let Err(e) = options.validate() {
                return validation_failure(recorder, e);
            }

            let results: Vec<DiagnosticResult<ResolvedRecords>> = stream::iter(unique)
                .map(|name| self.dns_lookup(name, options))
                .buffered(BULK_LOOKUP_CONCURRENCY)
                .collect()
                .await;

            let successful = results.iter().filter(|r| r.succeeded).count();
            let bulk = BulkLookup {
                record_type: options.record_type,
                total: results.len(),
                successful,
                failed: results.len() - successful,
                results,
            };

            if successful > 0 {
                recorder.success(bulk)
            } else {
                let kind = prevailing_error(bulk.results.iter().filter_map(|r| r.error_kind()), ErrorKind::NameNotFound);
                recorder.failure_with(DiagnosticError::new(kind, "no name resolved"), bulk)
            }
        })
        .await
    }

    /// A and AAAA records of a name plus the PTR names of every address.
    /// Reverse failures are recorded per address and never fail the call.
    pub async fn dns_info(&self, name: &str, options: &DnsLookupOptions) -> DiagnosticResult<DnsInfo> {
        self.observe(OperationKind::DnsInfo, name, |recorder| async move {
            let target = match Target::parse(name) {
                Ok(target) if !target.is_ip() => target,
                Ok(_) => return validation_failure(recorder, AppError::validation("dns info needs a hostname")),
                Err(e) => return validation_failure(recorder, e),
            };
            if let Err(e) = options.validate() {
                return validation_failure(recorder, e);
            }

            let host = target.as_str();
            let (v4, v6) = tokio::join!(
                self.prober.dns(host, RecordType::A, &options.resolver, options.timeout),
                self.prober.dns(host, RecordType::Aaaa, &options.resolver, options.timeout),
            );

            let (ipv4, ipv6) = match (v4.outcome, v6.outcome) {
                (Err(error), Err(_)) => return recorder.failure(error),
                (a, aaaa) => (a.unwrap_or_default(), aaaa.unwrap_or_default()),
            };
            let ipv4: Vec<_> = ipv4
                .into_iter()
                .filter_map(|r| match r {
                    DnsRecord::A(ip) => Some(ip),
                    _ => None,
                })
                .collect();
            let ipv6: Vec<_> = ipv6
                .into_iter()
                .filter_map(|r| match r {
                    DnsRecord::Aaaa(ip) => Some(ip),
                    _ => None,
                })
                .collect();

            let addresses: Vec<IpAddr> = ipv4
                .iter()
                .map(|&ip| IpAddr::V4(ip))
                .chain(ipv6.iter().map(|&ip| IpAddr::V6(ip)))
                .collect();
            let reverse = join_all(addresses.into_iter().map(|address| async move {
                let answer = self.prober.reverse_dns(address, &options.resolver, options.timeout).await;
                match answer.outcome {
                    Ok(hostnames) => ReverseEntry {
                        address,
                        hostnames,
                        error: None,
                    },
                    Err(error) => ReverseEntry {
                        address,
                        hostnames: Vec::new(),
                        error: Some(error.kind),
                    },
                }
            }))
            .await;

            recorder.success(DnsInfo {
                name: host.to_string(),
                ipv4,
                ipv6,
                reverse,
            })
        })
        .await
    }

    /// Address of the interface used for outbound traffic
    pub async fn local_ip(&self) -> DiagnosticResult<LocalIpInfo> {
        self.observe(OperationKind::LocalIp, "local", |recorder| async move {
            match netinfo::local_ip().await {
                Ok(info) => recorder.success(info),
                Err(e) => recorder.failure(e.into()),
            }
        })
        .await
    }

    /// Address the internet sees, from the first echo service that answers
    pub async fn public_ip(&self) -> DiagnosticResult<PublicIpInfo> {
        self.observe(OperationKind::PublicIp, "public", |recorder| async move {
            match netinfo::public_ip(&self.http_client, &self.public_ip_services, self.public_ip_timeout).await {
                Ok(info) => recorder.success(info),
                Err(e) => recorder.failure(e.into()),
            }
        })
        .await
    }

    /// Every interface of this host
    pub async fn interfaces(&self) -> DiagnosticResult<Vec<InterfaceInfo>> {
        self.observe(OperationKind::Interfaces, "local", |recorder| async move {
            match self.prober.interfaces().await {
                Ok(interfaces) => recorder.success(interfaces),
                Err(e) => recorder.failure(e.into()),
            }
        })
        .await
    }

    /// Next hop of the default route. Fails as unreachable when the host
    /// has no default route.
    pub async fn default_gateway(&self) -> DiagnosticResult<GatewayInfo> {
        self.observe(OperationKind::DefaultGateway, "local", |recorder| async move {
            match self.prober.default_gateway().await {
                Ok(Some(gateway)) => recorder.success(gateway),
                Ok(None) => recorder.failure(DiagnosticError::new(ErrorKind::Unreachable, "no default route")),
                Err(e) => recorder.failure(e.into()),
            }
        })
        .await
    }

    /// Interfaces, default route, a DNS check and a reachability check
    /// summarized with issues and advice. Only fails when the interfaces
    /// cannot be listed; failed checks are reported in the summary.
    pub async fn network_config(&self, options: &NetworkConfigOptions) -> DiagnosticResult<NetworkConfig> {
        self.observe(OperationKind::NetworkConfig, "local", |recorder| async move {
            if let Err(e) = options.validate() {
                return validation_failure(recorder, e);
            }
            let interfaces = match self.prober.interfaces().await {
                Ok(interfaces) => interfaces,
                Err(e) => return recorder.failure(e.into()),
            };

            let ping = options.ping.clone().with_resolver(options.resolver.clone());
            let (gateway, dns, reach) = tokio::join!(
                self.prober.default_gateway(),
                self.prober
                    .dns(&options.dns_name, RecordType::A, &options.resolver, options.dns_timeout),
                self.measure(&options.connectivity_target, &ping),
            );

            let gateway = match gateway {
                Ok(gateway) => gateway,
                Err(e) => {
                    crate::log_debug!(self.logger, "default route lookup failed: {}", e);
                    None
                }
            };
            let dns_working = dns.outcome.as_ref().is_ok_and(|records| !records.is_empty());
            let connectivity = reach.ok().map(|(stats, _)| stats);

            let config = netinfo::summarize_config(interfaces, gateway, dns_working, connectivity);
            if !config.issues.is_empty() {
                crate::log_info!(self.logger, "network configuration has {} issues", config.issues.len());
            }
            recorder.success(config)
        })
        .await
    }

    /// Time a download from the first server that completes one. Servers
    /// that fail are listed in the report.
    pub async fn bandwidth_test(&self, options: &BandwidthOptions) -> DiagnosticResult<BandwidthReport> {
        let label = options.size.to_string();
        self.observe(OperationKind::Bandwidth, &label, |recorder| async move {
            if let Err(e) = options.validate() {
                return validation_failure(recorder, e);
            }

            let mut errors = Vec::new();
            let mut last = None;
            for url in options.servers() {
                match bandwidth::download(&self.http_client, &url, options.timeout).await {
                    Ok(download) => {
                        return recorder.success(BandwidthReport {
                            download_speed_mbps: download.mbps(),
                            bytes_downloaded: download.bytes,
                            duration_ms: download.elapsed.as_secs_f64() * 1000.0,
                            url,
                            errors,
                        })
                    }
                    Err(e) => {
                        crate::log_warn!(self.logger, "bandwidth server {} failed: {}", url, e);
                        errors.push(format!("{}: {}", url, e));
                        last = Some(e);
                    }
                }
            }

            let kind = last.as_ref().map_or(ErrorKind::Unreachable, |e| e.kind());
            let detail = format!(
                "all test servers failed. Last error: {}",
                last.map_or_else(|| "none tried".to_string(), |e| e.detail())
            );
            recorder.failure(DiagnosticError::new(kind, detail))
        })
        .await
    }

    /// Echo samples without aggregation, for callers that fold them
    /// themselves
    pub async fn echo_samples(&self, address: IpAddr, options: &PingOptions) -> Result<Vec<ProbeSample>> {
        options.validate()?;
        let prober = &self.prober;
        Ok(run_repeated(RepeatPlan::from(options), |_| prober.echo(address, options.timeout)).await)
    }
}

fn build_http_client() -> Result<Client> {
    Client::builder()
        .user_agent(concat!("netdiag/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| AppError::internal(format!("Failed to create HTTP client: {}", e)))
}

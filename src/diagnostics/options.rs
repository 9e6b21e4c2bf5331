//! Per-call options for engine operations
//!
//! Every option struct carries its own resolver selection so nothing about a
//! call depends on process-wide state. `validate` runs before any probe.

use crate::bandwidth::TestSize;
use crate::defaults;
use crate::error::{AppError, Result};
use crate::executor::SystemResources;
use crate::stats::QualityWeights;
use crate::types::{RecordType, ResolverSelection, Target};
use std::collections::BTreeSet;
use std::time::Duration;

/// Reject zero and overly long timeouts
pub fn validate_timeout(timeout: Duration, what: &str) -> Result<()> {
    if timeout.is_zero() {
        return Err(AppError::validation(format!("{} timeout must be greater than 0", what)));
    }
    if timeout > defaults::MAX_TIMEOUT {
        return Err(AppError::validation(format!(
            "{} timeout cannot exceed {} seconds",
            what,
            defaults::MAX_TIMEOUT.as_secs()
        )));
    }
    Ok(())
}

/// Check that every port is in 1-65535 and return them sorted and deduplicated
pub fn validate_ports(ports: &[u32]) -> Result<Vec<u16>> {
    if ports.is_empty() {
        return Err(AppError::validation("at least one port is required"));
    }

    let mut unique = BTreeSet::new();
    for &port in ports {
        if port == 0 || port > u16::MAX as u32 {
            return Err(AppError::validation(format!("port {} is outside 1-65535", port)));
        }
        unique.insert(port as u16);
    }
    Ok(unique.into_iter().collect())
}

#[derive(Debug, Clone, PartialEq)]
pub struct PingOptions {
    pub count: u32,
    pub timeout: Duration,
    /// Pause between issuing consecutive probes
    pub interval: Duration,
    /// Probes allowed in flight at once; 1 means strictly sequential
    pub parallelism: usize,
    /// Used only when the target is a hostname
    pub resolver: ResolverSelection,
}

impl Default for PingOptions {
    fn default() -> Self {
        Self {
            count: defaults::DEFAULT_PING_COUNT,
            timeout: defaults::DEFAULT_TIMEOUT,
            interval: defaults::DEFAULT_PROBE_INTERVAL,
            parallelism: 1,
            resolver: ResolverSelection::System,
        }
    }
}

impl PingOptions {
    pub fn new(count: u32, timeout: Duration) -> Self {
        Self {
            count,
            timeout,
            ..Self::default()
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_parallelism(mut self, parallelism: usize) -> Self {
        self.parallelism = parallelism;
        self
    }

    pub fn with_resolver(mut self, resolver: ResolverSelection) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.count == 0 || self.count > defaults::MAX_PING_COUNT {
            return Err(AppError::validation(format!(
                "count must be between 1 and {}, got {}",
                defaults::MAX_PING_COUNT,
                self.count
            )));
        }
        if self.parallelism == 0 {
            return Err(AppError::validation("parallelism must be at least 1"));
        }
        if self.interval > defaults::MAX_TIMEOUT {
            return Err(AppError::validation(format!(
                "ping interval cannot exceed {} seconds",
                defaults::MAX_TIMEOUT.as_secs()
            )));
        }
        validate_timeout(self.timeout, "ping")
    }

    /// Worst-case wall clock for the whole run, saturating at `Duration::MAX`
    pub fn ceiling(&self) -> Duration {
        let parallelism = u32::try_from(self.parallelism.max(1)).unwrap_or(u32::MAX);
        let rounds = self.count.div_ceil(parallelism);
        self.timeout
            .checked_add(self.interval)
            .and_then(|round| round.checked_mul(rounds))
            .and_then(|total| total.checked_add(defaults::SCAN_DEADLINE_SLACK))
            .unwrap_or(Duration::MAX)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DnsLookupOptions {
    pub record_type: RecordType,
    pub resolver: ResolverSelection,
    pub timeout: Duration,
}

impl Default for DnsLookupOptions {
    fn default() -> Self {
        Self {
            record_type: RecordType::A,
            resolver: ResolverSelection::System,
            timeout: defaults::DEFAULT_TIMEOUT,
        }
    }
}

impl DnsLookupOptions {
    pub fn new(record_type: RecordType) -> Self {
        Self {
            record_type,
            ..Self::default()
        }
    }

    pub fn with_resolver(mut self, resolver: ResolverSelection) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn validate(&self) -> Result<()> {
        validate_timeout(self.timeout, "DNS")?;
        if let ResolverSelection::Custom { servers } = &self.resolver {
            if servers.is_empty() {
                return Err(AppError::validation("custom resolver needs at least one server"));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReverseDnsOptions {
    pub resolver: ResolverSelection,
    pub timeout: Duration,
}

impl Default for ReverseDnsOptions {
    fn default() -> Self {
        Self {
            resolver: ResolverSelection::System,
            timeout: defaults::DEFAULT_TIMEOUT,
        }
    }
}

impl ReverseDnsOptions {
    pub fn with_resolver(mut self, resolver: ResolverSelection) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn validate(&self) -> Result<()> {
        validate_timeout(self.timeout, "reverse DNS")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PortScanOptions {
    /// Per-port connect timeout
    pub timeout: Duration,
    /// Worker pool size, fixed for the whole scan
    pub concurrency: usize,
    pub grab_banners: bool,
    /// Hard ceiling for the whole scan; computed from the port count when unset
    pub deadline: Option<Duration>,
    pub resolver: ResolverSelection,
}

impl Default for PortScanOptions {
    fn default() -> Self {
        Self {
            timeout: defaults::DEFAULT_SCAN_TIMEOUT,
            concurrency: SystemResources::detect().scan_concurrency,
            grab_banners: false,
            deadline: None,
            resolver: ResolverSelection::System,
        }
    }
}

impl PortScanOptions {
    pub fn new(timeout: Duration, concurrency: usize) -> Self {
        Self {
            timeout,
            concurrency,
            ..Self::default()
        }
    }

    pub fn with_banners(mut self, grab: bool) -> Self {
        self.grab_banners = grab;
        self
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.concurrency == 0 || self.concurrency > defaults::MAX_SCAN_CONCURRENCY {
            return Err(AppError::validation(format!(
                "concurrency must be between 1 and {}, got {}",
                defaults::MAX_SCAN_CONCURRENCY,
                self.concurrency
            )));
        }
        if let Some(deadline) = self.deadline {
            if deadline.is_zero() {
                return Err(AppError::validation("scan deadline must be greater than 0"));
            }
        }
        validate_timeout(self.timeout, "port scan")
    }

    /// ceil(ports / concurrency) * timeout plus slack, unless set explicitly
    pub fn deadline_for(&self, port_count: usize) -> Duration {
        if let Some(deadline) = self.deadline {
            return deadline;
        }
        let rounds = port_count.div_ceil(self.concurrency.max(1)).max(1) as u32;
        self.timeout * rounds + defaults::SCAN_DEADLINE_SLACK
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TracerouteOptions {
    pub max_hops: u8,
    /// Per-probe timeout
    pub timeout: Duration,
    pub probes_per_hop: u8,
    /// Look up PTR names for hop addresses
    pub resolve_hostnames: bool,
    pub resolver: ResolverSelection,
}

impl Default for TracerouteOptions {
    fn default() -> Self {
        Self {
            max_hops: defaults::DEFAULT_MAX_HOPS,
            timeout: defaults::DEFAULT_TIMEOUT,
            probes_per_hop: defaults::DEFAULT_PROBES_PER_HOP,
            resolve_hostnames: false,
            resolver: ResolverSelection::System,
        }
    }
}

impl TracerouteOptions {
    pub fn new(max_hops: u8, timeout: Duration) -> Self {
        Self {
            max_hops,
            timeout,
            ..Self::default()
        }
    }

    pub fn with_probes_per_hop(mut self, probes: u8) -> Self {
        self.probes_per_hop = probes;
        self
    }

    pub fn with_hostnames(mut self, resolve: bool) -> Self {
        self.resolve_hostnames = resolve;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_hops == 0 {
            return Err(AppError::validation("max hops must be between 1 and 255"));
        }
        if self.probes_per_hop == 0 || self.probes_per_hop > defaults::MAX_PROBES_PER_HOP {
            return Err(AppError::validation(format!(
                "probes per hop must be between 1 and {}",
                defaults::MAX_PROBES_PER_HOP
            )));
        }
        validate_timeout(self.timeout, "traceroute")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct QualityOptions {
    pub ping: PingOptions,
    pub weights: QualityWeights,
}

impl Default for QualityOptions {
    fn default() -> Self {
        Self {
            ping: PingOptions {
                count: defaults::DEFAULT_QUALITY_COUNT,
                ..PingOptions::default()
            },
            weights: QualityWeights::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DnsBenchmarkOptions {
    pub record_type: RecordType,
    pub timeout: Duration,
}

impl Default for DnsBenchmarkOptions {
    fn default() -> Self {
        Self {
            record_type: RecordType::A,
            timeout: defaults::DEFAULT_TIMEOUT,
        }
    }
}

impl DnsBenchmarkOptions {
    pub fn validate(&self) -> Result<()> {
        validate_timeout(self.timeout, "DNS benchmark")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BandwidthOptions {
    pub size: TestSize,
    /// Servers to try in order; the public mirrors for `size` when empty
    pub urls: Vec<String>,
    /// Bound on each whole transfer
    pub timeout: Duration,
}

impl Default for BandwidthOptions {
    fn default() -> Self {
        Self {
            size: TestSize::default(),
            urls: Vec::new(),
            timeout: defaults::DEFAULT_BANDWIDTH_TIMEOUT,
        }
    }
}

impl BandwidthOptions {
    pub fn new(size: TestSize) -> Self {
        Self {
            size,
            ..Self::default()
        }
    }

    pub fn with_urls(mut self, urls: Vec<String>) -> Self {
        self.urls = urls;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Servers in the order they are tried
    pub fn servers(&self) -> Vec<String> {
        if self.urls.is_empty() {
            self.size.mirrors()
        } else {
            self.urls.clone()
        }
    }

    pub fn validate(&self) -> Result<()> {
        for raw in &self.urls {
            let parsed = url::Url::parse(raw).map_err(|e| AppError::validation(format!("'{}' is not a URL: {}", raw, e)))?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(AppError::validation(format!("'{}' must use http or https", raw)));
            }
        }
        validate_timeout(self.timeout, "bandwidth")
    }
}

/// Which name and host the network configuration report checks against
#[derive(Debug, Clone, PartialEq)]
pub struct NetworkConfigOptions {
    pub dns_name: String,
    pub connectivity_target: String,
    pub ping: PingOptions,
    pub dns_timeout: Duration,
    pub resolver: ResolverSelection,
}

impl Default for NetworkConfigOptions {
    fn default() -> Self {
        Self {
            dns_name: defaults::CONFIG_CHECK_NAME.to_string(),
            connectivity_target: defaults::CONFIG_CHECK_HOST.to_string(),
            ping: PingOptions::new(3, defaults::DEFAULT_TIMEOUT),
            dns_timeout: defaults::DEFAULT_TIMEOUT,
            resolver: ResolverSelection::System,
        }
    }
}

impl NetworkConfigOptions {
    pub fn validate(&self) -> Result<()> {
        let name = Target::parse(&self.dns_name)?;
        if name.is_ip() {
            return Err(AppError::validation("DNS check needs a hostname"));
        }
        Target::parse(&self.connectivity_target)?;
        self.ping.validate()?;
        validate_timeout(self.dns_timeout, "DNS check")
    }
}

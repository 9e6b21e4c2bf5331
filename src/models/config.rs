//! Configuration data model and validation

use crate::bandwidth::TestSize;
use crate::diagnostics::{
    BandwidthOptions, DnsBenchmarkOptions, DnsLookupOptions, NetworkConfigOptions, PingOptions, PortScanOptions,
    QualityOptions, ReverseDnsOptions, TracerouteOptions,
};
use crate::error::{AppError, Result};
use crate::executor::SystemResources;
use crate::types::{RecordType, ResolverSelection};
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::str::FromStr;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Echo probes per ping
    #[serde(default = "default_ping_count")]
    pub ping_count: u32,

    /// Per-probe timeout for ping, DNS and traceroute
    #[serde(default = "default_timeout_secs")]
    pub timeout_seconds: u64,

    /// Per-port connect timeout
    #[serde(default = "default_scan_timeout_ms")]
    pub scan_timeout_ms: u64,

    /// Connect probes in flight during a scan
    #[serde(default = "default_scan_concurrency")]
    pub scan_concurrency: usize,

    #[serde(default = "default_max_hops")]
    pub max_hops: u8,

    #[serde(default = "default_probes_per_hop")]
    pub probes_per_hop: u8,

    /// Pause between echo probes
    #[serde(default = "default_probe_interval_ms")]
    pub probe_interval_ms: u64,

    /// Echo probes in flight at once; 1 is sequential
    #[serde(default = "default_ping_parallelism")]
    pub ping_parallelism: usize,

    /// Custom DNS server IP addresses; empty means the system resolver
    #[serde(default)]
    pub dns_servers: Vec<String>,

    /// DNS-over-HTTPS endpoint; takes precedence over `dns_servers`
    #[serde(default)]
    pub doh_url: Option<String>,

    /// Servers compared by the DNS benchmark
    #[serde(default = "default_benchmark_servers")]
    pub benchmark_servers: Vec<String>,

    #[serde(default)]
    pub grab_banners: bool,

    /// Reverse-resolve traceroute hops
    #[serde(default)]
    pub resolve_hop_names: bool,

    /// Echo services tried in order by public IP discovery
    #[serde(default = "default_public_ip_services")]
    pub public_ip_services: Vec<String>,

    /// Enable colored terminal output
    #[serde(default = "default_enable_color")]
    pub enable_color: bool,

    /// Print results as JSON
    #[serde(default)]
    pub json_output: bool,

    /// Enable verbose output
    #[serde(default)]
    pub verbose: bool,

    /// Enable debug output
    #[serde(default)]
    pub debug: bool,

    /// Explicit log level (trace, debug, info, warn, error)
    #[serde(default)]
    pub log_level: Option<String>,

    /// Log output format (console, json, compact)
    #[serde(default)]
    pub log_format: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ping_count: default_ping_count(),
            timeout_seconds: default_timeout_secs(),
            scan_timeout_ms: default_scan_timeout_ms(),
            scan_concurrency: default_scan_concurrency(),
            max_hops: default_max_hops(),
            probes_per_hop: default_probes_per_hop(),
            probe_interval_ms: default_probe_interval_ms(),
            ping_parallelism: default_ping_parallelism(),
            dns_servers: Vec::new(),
            doh_url: None,
            benchmark_servers: default_benchmark_servers(),
            grab_banners: false,
            resolve_hop_names: false,
            public_ip_services: default_public_ip_services(),
            enable_color: default_enable_color(),
            json_output: false,
            verbose: false,
            debug: false,
            log_level: None,
            log_format: None,
        }
    }
}

/// Split a comma separated value, dropping empty entries
fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn parse_var<T: FromStr>(key: &str, value: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| AppError::config(format!("Invalid {} value '{}': {}", key, value, e)))
}

/// Accept the usual spellings of a boolean flag
fn parse_flag(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(AppError::config(format!("Invalid {} value '{}': expected true or false", key, value))),
    }
}

impl Config {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Get timeout as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    pub fn scan_timeout(&self) -> Duration {
        Duration::from_millis(self.scan_timeout_ms)
    }

    pub fn probe_interval(&self) -> Duration {
        Duration::from_millis(self.probe_interval_ms)
    }

    /// Validate the configuration and return any errors
    pub fn validate(&self) -> Result<()> {
        if self.ping_count == 0 || self.ping_count > crate::defaults::MAX_PING_COUNT {
            return Err(AppError::config(format!(
                "Ping count must be between 1 and {}",
                crate::defaults::MAX_PING_COUNT
            )));
        }

        if self.timeout_seconds == 0 {
            return Err(AppError::config("Timeout must be greater than 0"));
        }

        if self.timeout_seconds > crate::defaults::MAX_TIMEOUT.as_secs() {
            return Err(AppError::config("Timeout cannot exceed 300 seconds"));
        }

        if self.scan_timeout_ms == 0 || self.scan_timeout() > crate::defaults::MAX_TIMEOUT {
            return Err(AppError::config("Scan timeout must be between 1ms and 300 seconds"));
        }

        if self.scan_concurrency == 0 || self.scan_concurrency > crate::defaults::MAX_SCAN_CONCURRENCY {
            return Err(AppError::config(format!(
                "Scan concurrency must be between 1 and {}",
                crate::defaults::MAX_SCAN_CONCURRENCY
            )));
        }

        if self.max_hops == 0 {
            return Err(AppError::config("Max hops must be between 1 and 255"));
        }

        if self.probes_per_hop == 0 || self.probes_per_hop > crate::defaults::MAX_PROBES_PER_HOP {
            return Err(AppError::config(format!(
                "Probes per hop must be between 1 and {}",
                crate::defaults::MAX_PROBES_PER_HOP
            )));
        }

        if self.ping_parallelism == 0 {
            return Err(AppError::config("Ping parallelism must be at least 1"));
        }

        for dns_server in self.dns_servers.iter().chain(&self.benchmark_servers) {
            if IpAddr::from_str(dns_server).is_err() {
                return Err(AppError::config(format!("Invalid DNS server IP address: {}", dns_server)));
            }
        }

        if let Some(doh_url) = &self.doh_url {
            match url::Url::parse(doh_url) {
                Ok(parsed) if parsed.scheme() == "https" => {}
                Ok(_) => return Err(AppError::config(format!("DoH URL must use HTTPS: {}", doh_url))),
                Err(e) => return Err(AppError::config(format!("Invalid DoH URL '{}': {}", doh_url, e))),
            }
        }

        for service in &self.public_ip_services {
            url::Url::parse(service)
                .map_err(|e| AppError::config(format!("Invalid public IP service '{}': {}", service, e)))?;
        }

        if let Some(level) = &self.log_level {
            level.parse::<crate::logging::LogLevel>()?;
        }
        if let Some(format) = &self.log_format {
            format.parse::<crate::logging::LogFormat>()?;
        }

        Ok(())
    }

    /// Resolver every DNS operation uses: DoH if set, else the custom
    /// servers, else the system resolver
    pub fn resolver(&self) -> Result<ResolverSelection> {
        if let Some(url) = &self.doh_url {
            return Ok(ResolverSelection::DoH { url: url.clone() });
        }
        if self.dns_servers.is_empty() {
            return Ok(ResolverSelection::System);
        }

        let servers = self
            .dns_servers
            .iter()
            .map(|s| {
                IpAddr::from_str(s).map_err(|_| AppError::config(format!("Invalid DNS server IP address: {}", s)))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(ResolverSelection::Custom { servers })
    }

    /// One resolver per configured benchmark server
    pub fn benchmark_resolvers(&self) -> Result<Vec<ResolverSelection>> {
        self.benchmark_servers
            .iter()
            .map(|s| {
                IpAddr::from_str(s)
                    .map(ResolverSelection::server)
                    .map_err(|_| AppError::config(format!("Invalid DNS server IP address: {}", s)))
            })
            .collect()
    }

    pub fn ping_options(&self) -> Result<PingOptions> {
        Ok(PingOptions::new(self.ping_count, self.timeout())
            .with_interval(self.probe_interval())
            .with_parallelism(self.ping_parallelism)
            .with_resolver(self.resolver()?))
    }

    /// Quality runs keep their own probe count unless one was configured
    pub fn quality_options(&self, count: Option<u32>) -> Result<QualityOptions> {
        let mut options = QualityOptions::default();
        options.ping = self.ping_options()?;
        options.ping.count = count.unwrap_or(crate::defaults::DEFAULT_QUALITY_COUNT);
        Ok(options)
    }

    /// Configuration checks use the configured resolver and timeout
    pub fn network_config_options(&self) -> Result<NetworkConfigOptions> {
        Ok(NetworkConfigOptions {
            ping: PingOptions::new(3, self.timeout()).with_interval(self.probe_interval()),
            dns_timeout: self.timeout(),
            resolver: self.resolver()?,
            ..NetworkConfigOptions::default()
        })
    }

    pub fn bandwidth_options(&self, size: TestSize, urls: Vec<String>, transfer_timeout: Option<u64>) -> BandwidthOptions {
        let options = BandwidthOptions::new(size).with_urls(urls);
        match transfer_timeout {
            Some(secs) => options.with_timeout(Duration::from_secs(secs)),
            None => options,
        }
    }

    pub fn dns_options(&self, record_type: RecordType) -> Result<DnsLookupOptions> {
        Ok(DnsLookupOptions::new(record_type)
            .with_resolver(self.resolver()?)
            .with_timeout(self.timeout()))
    }

    pub fn reverse_options(&self) -> Result<ReverseDnsOptions> {
        Ok(ReverseDnsOptions {
            resolver: self.resolver()?,
            timeout: self.timeout(),
        })
    }

    pub fn scan_options(&self) -> Result<PortScanOptions> {
        let mut options = PortScanOptions::new(self.scan_timeout(), self.scan_concurrency).with_banners(self.grab_banners);
        options.resolver = self.resolver()?;
        Ok(options)
    }

    pub fn traceroute_options(&self) -> Result<TracerouteOptions> {
        let mut options = TracerouteOptions::new(self.max_hops, self.timeout())
            .with_probes_per_hop(self.probes_per_hop)
            .with_hostnames(self.resolve_hop_names);
        options.resolver = self.resolver()?;
        Ok(options)
    }

    pub fn benchmark_options(&self, record_type: RecordType) -> DnsBenchmarkOptions {
        DnsBenchmarkOptions {
            record_type,
            timeout: self.timeout(),
        }
    }

    /// Merge environment variables into this configuration
    pub fn merge_from_env(&mut self) -> Result<()> {
        self.merge_from_vars(|key| std::env::var(key).ok())
    }

    /// Merge `NETDIAG_*` settings from any key/value source
    pub fn merge_from_vars<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(count) = lookup("NETDIAG_COUNT") {
            self.ping_count = parse_var("NETDIAG_COUNT", &count)?;
        }

        if let Some(timeout) = lookup("NETDIAG_TIMEOUT") {
            self.timeout_seconds = parse_var("NETDIAG_TIMEOUT", &timeout)?;
        }

        if let Some(scan_timeout) = lookup("NETDIAG_SCAN_TIMEOUT_MS") {
            self.scan_timeout_ms = parse_var("NETDIAG_SCAN_TIMEOUT_MS", &scan_timeout)?;
        }

        if let Some(concurrency) = lookup("NETDIAG_CONCURRENCY") {
            self.scan_concurrency = parse_var("NETDIAG_CONCURRENCY", &concurrency)?;
        }

        if let Some(max_hops) = lookup("NETDIAG_MAX_HOPS") {
            self.max_hops = parse_var("NETDIAG_MAX_HOPS", &max_hops)?;
        }

        if let Some(interval) = lookup("NETDIAG_INTERVAL_MS") {
            self.probe_interval_ms = parse_var("NETDIAG_INTERVAL_MS", &interval)?;
        }

        if let Some(dns_servers) = lookup("NETDIAG_DNS_SERVERS") {
            self.dns_servers = split_list(&dns_servers);
        }

        if let Some(doh_url) = lookup("NETDIAG_DOH_URL") {
            let doh_url = doh_url.trim();
            self.doh_url = (!doh_url.is_empty()).then(|| doh_url.to_string());
        }

        if let Some(banners) = lookup("NETDIAG_BANNERS") {
            self.grab_banners = parse_flag("NETDIAG_BANNERS", &banners)?;
        }

        if let Some(no_color) = lookup("NETDIAG_NO_COLOR") {
            if parse_flag("NETDIAG_NO_COLOR", &no_color)? {
                self.enable_color = false;
            }
        }

        if let Some(level) = lookup("NETDIAG_LOG_LEVEL") {
            self.log_level = Some(level.trim().to_string());
        }

        if let Some(format) = lookup("NETDIAG_LOG_FORMAT") {
            self.log_format = Some(format.trim().to_string());
        }

        Ok(())
    }
}

// Default value functions for serde
fn default_ping_count() -> u32 {
    crate::defaults::DEFAULT_PING_COUNT
}

fn default_timeout_secs() -> u64 {
    crate::defaults::DEFAULT_TIMEOUT.as_secs()
}

fn default_scan_timeout_ms() -> u64 {
    crate::defaults::DEFAULT_SCAN_TIMEOUT.as_millis() as u64
}

fn default_scan_concurrency() -> usize {
    SystemResources::detect().scan_concurrency
}

fn default_max_hops() -> u8 {
    crate::defaults::DEFAULT_MAX_HOPS
}

fn default_probes_per_hop() -> u8 {
    crate::defaults::DEFAULT_PROBES_PER_HOP
}

fn default_probe_interval_ms() -> u64 {
    crate::defaults::DEFAULT_PROBE_INTERVAL.as_millis() as u64
}

fn default_ping_parallelism() -> usize {
    1
}

fn default_benchmark_servers() -> Vec<String> {
    crate::defaults::BENCHMARK_DNS_SERVERS
        .iter()
        .map(|&s| s.to_string())
        .collect()
}

fn default_public_ip_services() -> Vec<String> {
    crate::defaults::PUBLIC_IP_SERVICES
        .iter()
        .map(|&s| s.to_string())
        .collect()
}

fn default_enable_color() -> bool {
    crate::defaults::DEFAULT_ENABLE_COLOR
}

//! Network Diagnostics Engine
//!
//! Ping, DNS lookups, reverse DNS, TCP port scanning, traceroute, connection
//! quality scoring, host interface and route inspection and download
//! throughput, with every network failure reported as data inside a
//! [`DiagnosticResult`] rather than as an early return.

pub mod bandwidth;
pub mod cli;
pub mod config;
pub mod diagnostics;
pub mod dns;
pub mod error;
pub mod executor;
pub mod logging;
pub mod models;
pub mod netinfo;
pub mod output;
pub mod probe;
pub mod stats;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use bandwidth::TestSize;
pub use diagnostics::{
    BandwidthOptions, DnsBenchmarkOptions, DnsLookupOptions, NetworkConfigOptions, NetworkDiagnostics,
    PingOptions, PortScanOptions, QualityOptions, ReverseDnsOptions, TracerouteOptions,
};
pub use error::{AppError, DiagnosticError, ErrorKind, Result};
pub use models::{
    AnnotatedResult, BandwidthReport, Config, DiagnosticResult, DnsRecord, GatewayInfo, HopRecord,
    InterfaceInfo, InterfaceKind, LatencyStats, NetworkConfig, PortResult, PortScanReport, ProbeSample,
    QualityScore, ResolvedHostname, ResolvedRecords, TraceRoute,
};
pub use output::{ColoredFormatter, OutputFormatter, PlainFormatter};
pub use probe::{Prober, SystemProber};
pub use types::{OperationKind, PortStatus, RecordType, ResolverSelection, Target};

/// Application version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const PKG_NAME: &str = env!("CARGO_PKG_NAME");
pub const PKG_DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// Default configuration values
pub mod defaults {
    use std::time::Duration;

    pub const DEFAULT_PING_COUNT: u32 = 4;
    pub const DEFAULT_QUALITY_COUNT: u32 = 10;
    pub const MAX_PING_COUNT: u32 = 1000;
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);
    pub const MAX_TIMEOUT: Duration = Duration::from_secs(300);
    pub const DEFAULT_SCAN_TIMEOUT: Duration = Duration::from_secs(2);
    pub const DEFAULT_PROBE_INTERVAL: Duration = Duration::from_millis(100);
    pub const DEFAULT_MAX_HOPS: u8 = 30;
    pub const DEFAULT_PROBES_PER_HOP: u8 = 1;
    pub const MAX_PROBES_PER_HOP: u8 = 10;
    pub const MAX_SCAN_CONCURRENCY: usize = 1024;
    /// Read window for service banners after a successful connect
    pub const BANNER_READ_TIMEOUT: Duration = Duration::from_millis(500);
    /// Added on top of the computed scan ceiling
    pub const SCAN_DEADLINE_SLACK: Duration = Duration::from_secs(1);
    /// Hop name lookups must not dominate a traceroute
    pub const HOP_NAME_TIMEOUT: Duration = Duration::from_secs(2);
    pub const BENCHMARK_DNS_SERVERS: &[&str] = &[
        "8.8.8.8",         // Google
        "1.1.1.1",         // Cloudflare
        "9.9.9.9",         // Quad9
        "208.67.222.222",  // OpenDNS
    ];
    pub const BENCHMARK_DOMAINS: &[&str] = &["google.com", "cloudflare.com", "wikipedia.org"];
    pub const DEFAULT_DOH_URL: &str = "https://dns.google/resolve";
    pub const PUBLIC_IP_SERVICES: &[&str] = &[
        "https://api.ipify.org?format=json",
        "https://ipapi.co/json/",
        "https://httpbin.org/ip",
        "https://api.ipify.org",
    ];
    /// Name and host the network configuration report checks
    pub const CONFIG_CHECK_NAME: &str = "google.com";
    pub const CONFIG_CHECK_HOST: &str = "8.8.8.8";
    pub const DEFAULT_BANDWIDTH_TIMEOUT: Duration = Duration::from_secs(30);
    pub const DEFAULT_ENABLE_COLOR: bool = true;
}

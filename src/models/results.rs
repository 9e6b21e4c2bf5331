//! Result records returned by the diagnostics engine

use crate::error::{AppError, DiagnosticError, ErrorKind, Result};
use crate::models::metrics::LatencyStats;
use crate::types::{OperationKind, PortStatus, RecordType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::time::{Duration, Instant};

/// Top-level record for one engine invocation.
///
/// `succeeded` is always set. A failed result always carries an error kind.
/// The payload is present whenever probing ran, even if the operation as a
/// whole failed (for instance every ping lost).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticResult<T> {
    pub operation: OperationKind,
    pub target: String,
    pub issued_at: DateTime<Utc>,
    pub duration_ms: f64,
    pub succeeded: bool,
    pub error: Option<DiagnosticError>,
    pub payload: Option<T>,
}

impl<T> DiagnosticResult<T> {
    pub fn error_kind(&self) -> Option<ErrorKind> {
        self.error.as_ref().map(|e| e.kind)
    }

    pub fn payload(&self) -> Option<&T> {
        self.payload.as_ref()
    }

    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.duration_ms.max(0.0) / 1000.0)
    }

    /// Collapse into a `Result`, dropping the payload of failed runs
    pub fn into_result(self) -> Result<T> {
        match (self.succeeded, self.payload, self.error) {
            (true, Some(payload), _) => Ok(payload),
            (_, _, Some(error)) => Err(error.into()),
            _ => Err(AppError::internal(format!("{} produced no payload", self.operation))),
        }
    }
}

/// Captures issue time and elapsed time while an operation runs, then seals
/// the outcome into a [`DiagnosticResult`].
#[derive(Debug)]
pub struct ResultRecorder {
    operation: OperationKind,
    target: String,
    issued_at: DateTime<Utc>,
    started: Instant,
}

impl ResultRecorder {
    pub fn start<S: Into<String>>(operation: OperationKind, target: S) -> Self {
        Self {
            operation,
            target: target.into(),
            issued_at: Utc::now(),
            started: Instant::now(),
        }
    }

    pub fn operation(&self) -> OperationKind {
        self.operation
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    fn seal<T>(self, error: Option<DiagnosticError>, payload: Option<T>) -> DiagnosticResult<T> {
        DiagnosticResult {
            operation: self.operation,
            target: self.target,
            issued_at: self.issued_at,
            duration_ms: self.started.elapsed().as_secs_f64() * 1000.0,
            succeeded: error.is_none(),
            error,
            payload,
        }
    }

    pub fn success<T>(self, payload: T) -> DiagnosticResult<T> {
        self.seal(None, Some(payload))
    }

    /// Failure with no payload (validation or precondition failures)
    pub fn failure<T>(self, error: DiagnosticError) -> DiagnosticResult<T> {
        self.seal(Some(error), None)
    }

    /// Failure that still reports what the probes saw
    pub fn failure_with<T>(self, error: DiagnosticError, payload: T) -> DiagnosticResult<T> {
        self.seal(Some(error), Some(payload))
    }
}

/// One DNS answer, shaped by its record type
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "UPPERCASE")]
pub enum DnsRecord {
    A(Ipv4Addr),
    Aaaa(Ipv6Addr),
    Mx { preference: u16, exchange: String },
    Ns(String),
    Txt(String),
    Cname(String),
    Ptr(String),
}

impl DnsRecord {
    pub fn record_type(&self) -> RecordType {
        match self {
            Self::A(_) => RecordType::A,
            Self::Aaaa(_) => RecordType::Aaaa,
            Self::Mx { .. } => RecordType::Mx,
            Self::Ns(_) => RecordType::Ns,
            Self::Txt(_) => RecordType::Txt,
            Self::Cname(_) => RecordType::Cname,
            Self::Ptr(_) => RecordType::Ptr,
        }
    }

    /// Address carried by A/AAAA records
    pub fn ip(&self) -> Option<IpAddr> {
        match self {
            Self::A(ip) => Some(IpAddr::V4(*ip)),
            Self::Aaaa(ip) => Some(IpAddr::V6(*ip)),
            _ => None,
        }
    }
}

impl fmt::Display for DnsRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::A(ip) => write!(f, "{}", ip),
            Self::Aaaa(ip) => write!(f, "{}", ip),
            Self::Mx { preference, exchange } => write!(f, "{} {}", preference, exchange),
            Self::Ns(name) | Self::Cname(name) | Self::Ptr(name) => f.write_str(name),
            Self::Txt(text) => write!(f, "\"{}\"", text),
        }
    }
}

/// Answer to a forward lookup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedRecords {
    pub name: String,
    pub record_type: RecordType,
    pub resolver: String,
    pub records: Vec<DnsRecord>,
}

impl ResolvedRecords {
    pub fn addresses(&self) -> Vec<IpAddr> {
        self.records.iter().filter_map(DnsRecord::ip).collect()
    }
}

/// Answer to a PTR lookup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedHostname {
    pub address: IpAddr,
    pub hostnames: Vec<String>,
}

impl ResolvedHostname {
    pub fn primary(&self) -> Option<&str> {
        self.hostnames.first().map(String::as_str)
    }
}

/// One scanned port
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortResult {
    pub port: u16,
    pub is_open: bool,
    pub status: PortStatus,
    pub service: Option<String>,
    pub banner: Option<String>,
    /// Why the port is not definitive; never set for open or refused ports
    pub error: Option<ErrorKind>,
    pub response_ms: Option<f64>,
}

impl PortResult {
    pub fn new(port: u16, status: PortStatus) -> Self {
        Self {
            port,
            is_open: status.is_open(),
            status,
            service: None,
            banner: None,
            error: None,
            response_ms: None,
        }
    }

    /// Placeholder for a port the scan never finished
    pub fn indeterminate(port: u16) -> Self {
        Self::new(port, PortStatus::Indeterminate)
    }
}

/// Every port of one scan, keyed by port number
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortScanReport {
    pub address: IpAddr,
    pub ports: BTreeMap<u16, PortResult>,
    pub concurrency: usize,
    /// Scan deadline fired before every port finished
    pub cancelled: bool,
}

impl PortScanReport {
    pub fn open_ports(&self) -> Vec<u16> {
        self.ports.values().filter(|p| p.is_open).map(|p| p.port).collect()
    }

    pub fn count(&self, status: PortStatus) -> usize {
        self.ports.values().filter(|p| p.status == status).count()
    }

    pub fn len(&self) -> usize {
        self.ports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ports.is_empty()
    }
}

/// One position on a traceroute path
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HopRecord {
    /// 1-based TTL of the probe
    pub hop_index: u8,
    pub address: Option<IpAddr>,
    pub hostname: Option<String>,
    /// Mean of the answered probes at this hop
    pub round_trip_ms: Option<f64>,
    pub rtts_ms: Vec<f64>,
}

impl HopRecord {
    pub fn silent(hop_index: u8) -> Self {
        Self {
            hop_index,
            address: None,
            hostname: None,
            round_trip_ms: None,
            rtts_ms: Vec::new(),
        }
    }

    pub fn timed_out(&self) -> bool {
        self.address.is_none() && self.round_trip_ms.is_none()
    }
}

/// Ordered hops towards a destination
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceRoute {
    pub destination: IpAddr,
    pub max_hops: u8,
    pub destination_reached: bool,
    /// Hop whose router reported the destination unreachable; the walk
    /// stops there
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unreachable_at: Option<u8>,
    pub hops: Vec<HopRecord>,
}

impl TraceRoute {
    pub fn responding_hops(&self) -> usize {
        self.hops.iter().filter(|h| !h.timed_out()).count()
    }
}

/// Qualitative band of a quality score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QualityRating {
    Excellent,
    VeryGood,
    Good,
    Fair,
    Poor,
    VeryPoor,
}

impl QualityRating {
    pub fn from_score(score: u8) -> Self {
        match score {
            90..=u8::MAX => Self::Excellent,
            80..=89 => Self::VeryGood,
            70..=79 => Self::Good,
            60..=69 => Self::Fair,
            50..=59 => Self::Poor,
            _ => Self::VeryPoor,
        }
    }
}

impl fmt::Display for QualityRating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Excellent => "Excellent",
            Self::VeryGood => "Very Good",
            Self::Good => "Good",
            Self::Fair => "Fair",
            Self::Poor => "Poor",
            Self::VeryPoor => "Very Poor",
        };
        f.write_str(label)
    }
}

/// Points contributed by each term of the quality formula
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub latency: f64,
    pub jitter: f64,
    pub loss: f64,
}

impl ScoreBreakdown {
    pub fn total(&self) -> f64 {
        self.latency + self.jitter + self.loss
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityScore {
    pub score: u8,
    pub rating: QualityRating,
    pub breakdown: ScoreBreakdown,
    pub latency: LatencyStats,
    pub recommendations: Vec<String>,
}

/// A failed query inside a benchmark
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryFailure {
    pub domain: String,
    pub kind: ErrorKind,
}

/// Timing of one resolver over every benchmark domain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolverTiming {
    pub resolver: String,
    pub latency: LatencyStats,
    pub failures: Vec<QueryFailure>,
}

/// Resolvers ranked by mean query latency, fastest first
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DnsBenchmark {
    pub record_type: RecordType,
    pub domains: Vec<String>,
    pub resolvers: Vec<ResolverTiming>,
}

impl DnsBenchmark {
    pub fn fastest(&self) -> Option<&ResolverTiming> {
        self.resolvers.first().filter(|r| r.latency.has_responses())
    }
}

/// Many forward lookups at once
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulkLookup {
    pub record_type: RecordType,
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub results: Vec<DiagnosticResult<ResolvedRecords>>,
}

/// Reverse lookup of one address found by [`DnsInfo`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReverseEntry {
    pub address: IpAddr,
    pub hostnames: Vec<String>,
    pub error: Option<ErrorKind>,
}

/// Forward and reverse view of one name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnsInfo {
    pub name: String,
    pub ipv4: Vec<Ipv4Addr>,
    pub ipv6: Vec<Ipv6Addr>,
    pub reverse: Vec<ReverseEntry>,
}

/// Address of the interface used for outbound traffic
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalIpInfo {
    pub address: IpAddr,
    pub method: String,
}

/// Address the outside world sees
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicIpInfo {
    pub address: IpAddr,
    pub service: String,
    /// Services tried before the one that answered
    pub errors: Vec<String>,
}

/// Interface family guessed from the interface name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterfaceKind {
    Ethernet,
    Wireless,
    Loopback,
    Tunnel,
    PointToPoint,
    Virtual,
    Unknown,
}

impl InterfaceKind {
    pub fn from_name(name: &str) -> Self {
        let name = name.to_ascii_lowercase();
        let starts = |prefixes: &[&str]| prefixes.iter().any(|p| name.starts_with(p));
        if starts(&["lo"]) {
            Self::Loopback
        } else if starts(&["wlan", "wlp", "wifi", "wl"]) {
            Self::Wireless
        } else if starts(&["eth", "en", "lan"]) {
            Self::Ethernet
        } else if starts(&["tun", "tap", "wg", "utun"]) {
            Self::Tunnel
        } else if starts(&["ppp"]) {
            Self::PointToPoint
        } else if starts(&["veth", "docker", "br-", "virbr", "vmnet", "vbox"]) || name.contains("virtual") {
            Self::Virtual
        } else {
            Self::Unknown
        }
    }
}

impl fmt::Display for InterfaceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Ethernet => "ethernet",
            Self::Wireless => "wireless",
            Self::Loopback => "loopback",
            Self::Tunnel => "tunnel",
            Self::PointToPoint => "ppp",
            Self::Virtual => "virtual",
            Self::Unknown => "unknown",
        };
        f.write_str(label)
    }
}

/// One network interface of the host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceInfo {
    pub name: String,
    pub index: u32,
    pub mac: Option<String>,
    /// Addresses with their prefix length, e.g. `192.168.1.20/24`
    pub networks: Vec<String>,
    pub addresses: Vec<IpAddr>,
    pub is_up: bool,
    pub is_loopback: bool,
    pub kind: InterfaceKind,
}

impl InterfaceInfo {
    /// Up, addressed and not loopback
    pub fn is_active(&self) -> bool {
        self.is_up && !self.is_loopback && !self.addresses.is_empty()
    }
}

/// Next hop of the default route
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayInfo {
    pub address: IpAddr,
    pub interface: Option<String>,
}

/// Interfaces, default route, name resolution and reachability in one report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub interfaces: Vec<InterfaceInfo>,
    pub total_interfaces: usize,
    pub active_interfaces: usize,
    /// First active interface
    pub primary_interface: Option<String>,
    pub gateway: Option<GatewayInfo>,
    pub dns_working: bool,
    pub internet_connectivity: bool,
    /// Echo statistics towards the connectivity target, when probing ran
    pub connectivity: Option<LatencyStats>,
    pub issues: Vec<String>,
    pub recommendations: Vec<String>,
}

/// Outcome of one timed download
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BandwidthReport {
    pub url: String,
    pub bytes_downloaded: u64,
    pub duration_ms: f64,
    pub download_speed_mbps: f64,
    /// Servers tried before the one that completed
    pub errors: Vec<String>,
}

//! Type definitions shared across probes, aggregators and the engine

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;
use std::sync::OnceLock;

// Re-export commonly used types
pub use crate::error::{AppError, Result};

/// Longest hostname accepted, per RFC 1035 presentation form
pub const MAX_HOSTNAME_LENGTH: usize = 253;

static HOSTNAME_RE: OnceLock<Regex> = OnceLock::new();

fn hostname_regex() -> &'static Regex {
    HOSTNAME_RE.get_or_init(|| {
        Regex::new(r"^[a-zA-Z0-9]([a-zA-Z0-9\-]{0,61}[a-zA-Z0-9])?(\.[a-zA-Z0-9]([a-zA-Z0-9\-]{0,61}[a-zA-Z0-9])?)*$")
            .expect("hostname pattern is valid")
    })
}

/// A syntactically validated diagnostic target: hostname or IP literal.
///
/// Nothing is resolved at construction time; probes resolve the name when
/// they need an address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Target {
    host: String,
    ip: Option<IpAddr>,
}

impl Target {
    /// Validate user input into a target.
    ///
    /// Accepts IPv4 and IPv6 literals (optionally bracketed) and hostnames
    /// made of letter/digit/hyphen labels separated by dots, at most 253
    /// characters in total.
    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(AppError::validation("target must not be empty"));
        }

        let unbracketed = trimmed
            .strip_prefix('[')
            .and_then(|rest| rest.strip_suffix(']'))
            .unwrap_or(trimmed);
        if let Ok(ip) = unbracketed.parse::<IpAddr>() {
            return Ok(Self {
                host: ip.to_string(),
                ip: Some(ip),
            });
        }

        if trimmed.len() > MAX_HOSTNAME_LENGTH {
            return Err(AppError::validation(format!(
                "hostname is {} characters long, maximum is {}",
                trimmed.len(),
                MAX_HOSTNAME_LENGTH
            )));
        }

        if !hostname_regex().is_match(trimmed) {
            return Err(AppError::validation(format!(
                "'{}' is neither a valid hostname nor an IP address",
                trimmed
            )));
        }

        Ok(Self {
            host: trimmed.to_ascii_lowercase(),
            ip: None,
        })
    }

    /// Hostname or canonical IP text
    pub fn as_str(&self) -> &str {
        &self.host
    }

    /// The literal address, if the target is one
    pub fn ip(&self) -> Option<IpAddr> {
        self.ip
    }

    pub fn is_ip(&self) -> bool {
        self.ip.is_some()
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.host)
    }
}

impl FromStr for Target {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Target {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<Target> for String {
    fn from(target: Target) -> Self {
        target.host
    }
}

/// DNS record kinds a lookup can ask for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RecordType {
    A,
    Aaaa,
    Mx,
    Ns,
    Txt,
    Cname,
    Ptr,
}

impl RecordType {
    pub const ALL: [RecordType; 7] = [
        RecordType::A,
        RecordType::Aaaa,
        RecordType::Mx,
        RecordType::Ns,
        RecordType::Txt,
        RecordType::Cname,
        RecordType::Ptr,
    ];

    /// Presentation name, e.g. `AAAA`
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::A => "A",
            Self::Aaaa => "AAAA",
            Self::Mx => "MX",
            Self::Ns => "NS",
            Self::Txt => "TXT",
            Self::Cname => "CNAME",
            Self::Ptr => "PTR",
        }
    }

    /// Numeric TYPE value on the wire (RFC 1035 / RFC 3596)
    pub fn code(&self) -> u16 {
        match self {
            Self::A => 1,
            Self::Ns => 2,
            Self::Cname => 5,
            Self::Ptr => 12,
            Self::Mx => 15,
            Self::Txt => 16,
            Self::Aaaa => 28,
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "A" => Ok(Self::A),
            "AAAA" => Ok(Self::Aaaa),
            "MX" => Ok(Self::Mx),
            "NS" => Ok(Self::Ns),
            "TXT" => Ok(Self::Txt),
            "CNAME" => Ok(Self::Cname),
            "PTR" => Ok(Self::Ptr),
            other => Err(AppError::validation(format!(
                "unsupported record type '{}', expected one of A, AAAA, MX, NS, TXT, CNAME, PTR",
                other
            ))),
        }
    }
}

/// Which resolver a DNS operation talks to. Passed explicitly with every call.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ResolverSelection {
    /// Use system default DNS resolution
    #[default]
    System,
    /// Use custom DNS servers
    Custom { servers: Vec<IpAddr> },
    /// Use DNS-over-HTTPS with specified URL
    DoH { url: String },
}

impl ResolverSelection {
    /// Single custom server
    pub fn server(ip: IpAddr) -> Self {
        Self::Custom { servers: vec![ip] }
    }

    /// Get a human-readable name for this resolver
    pub fn name(&self) -> String {
        match self {
            Self::System => "system".to_string(),
            Self::Custom { servers } => {
                if servers.len() == 1 {
                    servers[0].to_string()
                } else {
                    let list: Vec<String> = servers.iter().map(|s| s.to_string()).collect();
                    list.join(",")
                }
            }
            Self::DoH { url } => {
                // Extract hostname from URL for display
                match url::Url::parse(url) {
                    Ok(parsed) => match parsed.host_str() {
                        Some(host) => format!("doh:{}", host),
                        None => "doh".to_string(),
                    },
                    Err(_) => "doh".to_string(),
                }
            }
        }
    }

    /// Parse a resolver spec as typed on the command line:
    /// `system`, an IP address, a comma separated IP list, or an https URL.
    pub fn parse(spec: &str) -> Result<Self> {
        let spec = spec.trim();
        if spec.is_empty() || spec.eq_ignore_ascii_case("system") {
            return Ok(Self::System);
        }
        if spec.starts_with("https://") {
            url::Url::parse(spec)?;
            return Ok(Self::DoH { url: spec.to_string() });
        }

        let servers = spec
            .split(',')
            .map(|part| {
                part.trim()
                    .parse::<IpAddr>()
                    .map_err(|_| AppError::validation(format!("invalid DNS server address '{}'", part.trim())))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::Custom { servers })
    }
}

impl fmt::Display for ResolverSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

/// State of one scanned port
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PortStatus {
    /// Handshake completed
    Open,
    /// Peer reset the connection
    Closed,
    /// No answer within the probe timeout, or the path rejected the probe
    Filtered,
    /// Scan deadline hit before this port was probed to completion
    Indeterminate,
}

impl PortStatus {
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Open)
    }

    /// Whether the probe produced an authoritative answer
    pub fn is_definitive(&self) -> bool {
        matches!(self, Self::Open | Self::Closed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Closed => "closed",
            Self::Filtered => "filtered",
            Self::Indeterminate => "indeterminate",
        }
    }
}

impl fmt::Display for PortStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operation tag carried by every diagnostic result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperationKind {
    Ping,
    DnsLookup,
    ReverseDns,
    PortScan,
    Traceroute,
    ConnectionQuality,
    DnsBenchmark,
    DnsBulkLookup,
    DnsInfo,
    LocalIp,
    PublicIp,
    Interfaces,
    DefaultGateway,
    NetworkConfig,
    Bandwidth,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Ping => "ping",
            Self::DnsLookup => "dns_lookup",
            Self::ReverseDns => "reverse_dns",
            Self::PortScan => "port_scan",
            Self::Traceroute => "traceroute",
            Self::ConnectionQuality => "connection_quality",
            Self::DnsBenchmark => "dns_benchmark",
            Self::DnsBulkLookup => "dns_bulk_lookup",
            Self::DnsInfo => "dns_info",
            Self::LocalIp => "local_ip",
            Self::PublicIp => "public_ip",
            Self::Interfaces => "interfaces",
            Self::DefaultGateway => "default_gateway",
            Self::NetworkConfig => "network_config",
            Self::Bandwidth => "bandwidth",
        };
        f.write_str(name)
    }
}

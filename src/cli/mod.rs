//! Command-line interface definitions

use crate::bandwidth::TestSize;
use crate::types::RecordType;
use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

/// netdiag - ping, DNS, port scanning, traceroute and connection quality checks
#[derive(Parser, Debug, Clone)]
#[command(name = "netdiag")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Per-probe timeout in seconds
    #[arg(short, long, global = true, value_parser = parse_duration)]
    pub timeout: Option<u64>,

    /// DNS servers to query instead of the system resolver (comma-separated IPs)
    #[arg(long = "dns-server", global = true, value_name = "IP[,IP...]")]
    pub dns_server: Option<String>,

    /// DNS-over-HTTPS JSON endpoint; takes precedence over --dns-server
    #[arg(long, global = true, value_name = "URL")]
    pub doh: Option<String>,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Force colored output
    #[arg(long, global = true)]
    pub color: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Enable verbose output
    #[arg(long, global = true)]
    pub verbose: bool,

    /// Enable debug output
    #[arg(long, global = true)]
    pub debug: bool,

    /// Environment file to load settings from
    #[arg(long, global = true, value_name = "PATH")]
    pub env_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Send ICMP echo requests and report latency statistics
    Ping {
        /// Hostname or IP address
        target: String,

        /// Number of echo requests
        #[arg(short, long)]
        count: Option<u32>,

        /// Pause between requests in milliseconds
        #[arg(long, value_name = "MS")]
        interval_ms: Option<u64>,

        /// Requests allowed in flight at once
        #[arg(long)]
        parallel: Option<usize>,
    },

    /// Look up DNS records for a name
    Dns {
        name: String,

        /// Record type (A, AAAA, MX, NS, TXT, CNAME, PTR)
        #[arg(short = 'r', long = "type", default_value = "A")]
        record_type: RecordType,
    },

    /// Find the hostnames of an IP address
    Reverse { address: String },

    /// Scan TCP ports
    Scan {
        target: String,

        /// Ports to scan, e.g. "22,80,8000-8010"
        #[arg(short, long, conflicts_with = "common")]
        ports: Option<String>,

        /// Scan the well-known service ports
        #[arg(long)]
        common: bool,

        /// Connect probes in flight at once
        #[arg(long)]
        concurrency: Option<usize>,

        /// Per-port connect timeout in milliseconds
        #[arg(long, value_name = "MS")]
        scan_timeout_ms: Option<u64>,

        /// Read the first line each open port sends
        #[arg(long)]
        banners: bool,
    },

    /// Trace the route to a host
    Trace {
        target: String,

        /// Maximum number of hops
        #[arg(long)]
        max_hops: Option<u8>,

        /// Probes sent per hop
        #[arg(long)]
        probes: Option<u8>,

        /// Look up hostnames of the hops
        #[arg(long)]
        resolve: bool,
    },

    /// Score connection quality from latency, jitter and loss
    Quality {
        target: String,

        /// Number of echo requests
        #[arg(short, long)]
        count: Option<u32>,
    },

    /// Compare DNS resolvers by query latency
    DnsBench {
        /// Resolvers to compare (defaults to well-known public resolvers)
        #[arg(long, value_delimiter = ',', action = ArgAction::Append)]
        servers: Vec<String>,

        /// Domains queried against every resolver
        #[arg(long, value_delimiter = ',', action = ArgAction::Append)]
        domains: Vec<String>,

        #[arg(short = 'r', long = "type", default_value = "A")]
        record_type: RecordType,
    },

    /// Look up many names at once
    Bulk {
        #[arg(required = true)]
        names: Vec<String>,

        #[arg(short = 'r', long = "type", default_value = "A")]
        record_type: RecordType,
    },

    /// Show the IPv4 and IPv6 addresses of a name and their reverse names
    DnsInfo { name: String },

    /// Show the address used for outbound traffic
    LocalIp,

    /// Show the address the internet sees
    PublicIp,

    /// List network interfaces with their addresses
    Interfaces,

    /// Show the next hop of the default route
    Gateway,

    /// Check interfaces, default route, DNS and internet reachability together
    NetConfig,

    /// Measure download speed against public test files
    Bandwidth {
        /// Download size: 1MB, 5MB or 10MB
        #[arg(short, long, default_value = "1MB")]
        size: TestSize,

        /// Servers to download from instead of the public mirrors
        #[arg(long, value_delimiter = ',', action = ArgAction::Append)]
        url: Vec<String>,

        /// Bound on the whole transfer in seconds
        #[arg(long, value_name = "SECS", value_parser = parse_duration)]
        transfer_timeout: Option<u64>,
    },
}

impl Command {
    /// Target shown in logs and summaries
    pub fn target(&self) -> Option<&str> {
        match self {
            Command::Ping { target, .. }
            | Command::Scan { target, .. }
            | Command::Trace { target, .. }
            | Command::Quality { target, .. } => Some(target),
            Command::Dns { name, .. } | Command::DnsInfo { name } => Some(name),
            Command::Reverse { address } => Some(address),
            Command::DnsBench { .. }
            | Command::Bulk { .. }
            | Command::LocalIp
            | Command::PublicIp
            | Command::Interfaces
            | Command::Gateway
            | Command::NetConfig
            | Command::Bandwidth { .. } => None,
        }
    }
}

impl Cli {
    /// Validate CLI arguments for conflicts and requirements
    pub fn validate(&self) -> Result<(), String> {
        if self.color && self.no_color {
            return Err("Cannot specify both --color and --no-color".to_string());
        }

        if let Command::Scan { ports, common, .. } = &self.command {
            if ports.is_none() && !common {
                return Err("Must specify ports via --ports or use --common".to_string());
            }
        }

        Ok(())
    }

    /// Check if colors should be enabled
    pub fn use_colors(&self) -> bool {
        if self.color {
            true
        } else if self.no_color || self.json {
            false
        } else {
            supports_color()
        }
    }

    /// Get configuration summary for display
    pub fn get_config_summary(&self) -> String {
        let mut summary = String::new();

        summary.push_str("Configuration Summary:\n");
        if let Some(target) = self.command.target() {
            summary.push_str(&format!("  Target: {}\n", target));
        }
        if let Some(timeout) = self.timeout {
            summary.push_str(&format!("  Timeout: {}s\n", timeout));
        }
        summary.push_str(&format!("  Colored output: {}\n", self.use_colors()));
        summary.push_str(&format!("  JSON output: {}\n", self.json));
        summary.push_str(&format!("  Verbose mode: {}\n", self.verbose));
        summary.push_str(&format!("  Debug mode: {}\n", self.debug));

        if let Some(ref dns_server) = self.dns_server {
            summary.push_str(&format!("  DNS servers: {}\n", dns_server));
        }

        if let Some(ref doh) = self.doh {
            summary.push_str(&format!("  DoH endpoint: {}\n", doh));
        }

        summary
    }
}

/// Parse duration from seconds string
fn parse_duration(s: &str) -> Result<u64, String> {
    // Reject strings with leading + sign or other invalid formats
    if s.starts_with('+') || s.starts_with("0x") || s.starts_with("0X") {
        return Err(format!("Invalid duration: {}", s));
    }

    s.parse::<u64>()
        .map_err(|_| format!("Invalid duration: {}", s))
        .and_then(|secs| {
            if secs == 0 {
                Err("Duration must be greater than 0".to_string())
            } else if secs > crate::defaults::MAX_TIMEOUT.as_secs() {
                Err("Duration cannot exceed 300 seconds".to_string())
            } else {
                Ok(secs)
            }
        })
}

/// Check if the terminal supports color output
fn supports_color() -> bool {
    if let Ok(term) = std::env::var("TERM") {
        if term == "dumb" {
            return false;
        }
    }

    if std::env::var("NO_COLOR").is_ok() {
        return false;
    }

    if std::env::var("FORCE_COLOR").is_ok() {
        return true;
    }

    #[cfg(target_os = "windows")]
    {
        if std::env::var("ANSICON").is_ok() || std::env::var("ConEmuANSI").is_ok() {
            return true;
        }
    }

    // Default to true on Unix-like systems, false on Windows
    #[cfg(unix)]
    {
        true
    }
    #[cfg(not(unix))]
    {
        false
    }
}

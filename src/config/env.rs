//! Environment variable handling and .env file management

use crate::error::{AppError, Result};
use std::collections::HashMap;
use std::path::Path;

/// Default location of the optional environment file
pub const DEFAULT_ENV_FILE: &str = ".env";

/// Environment variable configuration manager
pub struct EnvManager;

impl EnvManager {
    /// Read an environment file into a map without touching the process
    /// environment. A missing file yields an empty map.
    pub fn read_env_file(path: &Path, debug: bool) -> Result<HashMap<String, String>> {
        if !path.exists() {
            if debug {
                eprintln!("No {} file found, using defaults and CLI arguments", path.display());
            }
            return Ok(HashMap::new());
        }

        let mut values = HashMap::new();
        for item in dotenv::from_path_iter(path)? {
            let (key, value) =
                item.map_err(|e| AppError::config(format!("Failed to load {}: {}", path.display(), e)))?;
            values.insert(key, value);
        }

        if debug {
            eprintln!("Loaded {} setting(s) from {}", values.len(), path.display());
        }
        Ok(values)
    }

    /// Create example .env file content
    pub fn create_example_env_content() -> String {
        r#"# netdiag configuration
#
# Values here act as defaults. Environment variables override them and
# command-line arguments override both.

# Echo probes per ping (1-1000)
# NETDIAG_COUNT=4

# Per-probe timeout in seconds (1-300)
# NETDIAG_TIMEOUT=5

# Per-port connect timeout for scans, in milliseconds
# NETDIAG_SCAN_TIMEOUT_MS=2000

# Connect probes in flight during a scan (1-1024)
# NETDIAG_CONCURRENCY=20

# Maximum traceroute hops (1-255)
# NETDIAG_MAX_HOPS=30

# Pause between echo probes, in milliseconds
# NETDIAG_INTERVAL_MS=100

# Custom DNS servers (comma-separated IP addresses)
# NETDIAG_DNS_SERVERS=8.8.8.8,1.1.1.1

# DNS-over-HTTPS endpoint (JSON API); overrides NETDIAG_DNS_SERVERS
# NETDIAG_DOH_URL=https://dns.google/resolve

# Read service banners from open ports (true/false)
# NETDIAG_BANNERS=false

# Disable colored output (true/false)
# NETDIAG_NO_COLOR=false

# Log level (trace, debug, info, warn, error) and format (console, json, compact)
# NETDIAG_LOG_LEVEL=info
# NETDIAG_LOG_FORMAT=console
"#
        .to_string()
    }

    /// Save example .env file to disk
    pub fn save_example_env_file(path: &Path) -> Result<()> {
        let content = Self::create_example_env_content();
        std::fs::write(path, content)
            .map_err(|e| AppError::config(format!("Failed to write example .env file: {}", e)))?;

        Ok(())
    }

    /// Validate environment variable format before parsing
    pub fn validate_env_var(key: &str, value: &str) -> Result<()> {
        fn bounded(key: &str, value: &str, min: u64, max: u64) -> Result<()> {
            let number: u64 = value
                .trim()
                .parse()
                .map_err(|e| AppError::config(format!("Invalid {} value '{}': {}", key, value, e)))?;
            if number < min || number > max {
                return Err(AppError::config(format!(
                    "{} must be between {} and {}, got: {}",
                    key, min, max, number
                )));
            }
            Ok(())
        }

        match key {
            "NETDIAG_COUNT" => bounded(key, value, 1, u64::from(crate::defaults::MAX_PING_COUNT))?,
            "NETDIAG_TIMEOUT" => bounded(key, value, 1, crate::defaults::MAX_TIMEOUT.as_secs())?,
            "NETDIAG_SCAN_TIMEOUT_MS" => bounded(key, value, 1, crate::defaults::MAX_TIMEOUT.as_millis() as u64)?,
            "NETDIAG_CONCURRENCY" => bounded(key, value, 1, crate::defaults::MAX_SCAN_CONCURRENCY as u64)?,
            "NETDIAG_MAX_HOPS" => bounded(key, value, 1, 255)?,
            "NETDIAG_INTERVAL_MS" => bounded(key, value, 0, 60_000)?,
            "NETDIAG_DNS_SERVERS" => {
                for server in value.split(',') {
                    let server = server.trim();
                    if !server.is_empty() {
                        server
                            .parse::<std::net::IpAddr>()
                            .map_err(|e| AppError::config(format!("Invalid {} entry '{}': {}", key, server, e)))?;
                    }
                }
            }
            "NETDIAG_DOH_URL" => {
                let parsed = url::Url::parse(value.trim())
                    .map_err(|e| AppError::config(format!("Invalid {} value '{}': {}", key, value, e)))?;
                if parsed.scheme() != "https" {
                    return Err(AppError::config(format!("DoH URL must use HTTPS: {}", value)));
                }
            }
            "NETDIAG_BANNERS" | "NETDIAG_NO_COLOR" => {
                value
                    .trim()
                    .parse::<bool>()
                    .map_err(|e| AppError::config(format!("Invalid {} value '{}': {}", key, value, e)))?;
            }
            "NETDIAG_LOG_LEVEL" => {
                value.parse::<crate::logging::LogLevel>()?;
            }
            "NETDIAG_LOG_FORMAT" => {
                value.parse::<crate::logging::LogFormat>()?;
            }
            _ => {
                // Unknown environment variable, ignore
            }
        }

        Ok(())
    }

    /// Get list of all supported environment variables with descriptions
    pub fn get_supported_env_vars() -> Vec<(&'static str, &'static str, &'static str)> {
        vec![
            ("NETDIAG_COUNT", "Echo probes per ping (1-1000)", "4"),
            ("NETDIAG_TIMEOUT", "Per-probe timeout in seconds (1-300)", "5"),
            ("NETDIAG_SCAN_TIMEOUT_MS", "Per-port connect timeout in milliseconds", "2000"),
            ("NETDIAG_CONCURRENCY", "Connect probes in flight during a scan (1-1024)", "20"),
            ("NETDIAG_MAX_HOPS", "Maximum traceroute hops (1-255)", "30"),
            ("NETDIAG_INTERVAL_MS", "Pause between echo probes in milliseconds", "100"),
            ("NETDIAG_DNS_SERVERS", "Comma-separated list of DNS server IPs", "8.8.8.8,1.1.1.1"),
            ("NETDIAG_DOH_URL", "DNS-over-HTTPS JSON endpoint", "https://dns.google/resolve"),
            ("NETDIAG_BANNERS", "Read service banners from open ports", "false"),
            ("NETDIAG_NO_COLOR", "Disable colored output", "false"),
            ("NETDIAG_LOG_LEVEL", "Log level (trace, debug, info, warn, error)", "info"),
            ("NETDIAG_LOG_FORMAT", "Log format (console, json, compact)", "console"),
        ]
    }

    /// Display environment variable help
    pub fn display_env_help() -> String {
        let mut help = String::new();
        help.push_str("Supported Environment Variables:\n\n");

        for (var, description, example) in Self::get_supported_env_vars() {
            help.push_str(&format!("  {:<24} {}\n", var, description));
            help.push_str(&format!("  {:<24} Example: {}\n\n", "", example));
        }

        help.push_str("Configuration Priority (highest to lowest):\n");
        help.push_str("  1. Command-line arguments\n");
        help.push_str("  2. Environment variables\n");
        help.push_str("  3. .env file values\n");
        help.push_str("  4. Default values\n");

        help
    }

    /// Validate all currently set environment variables
    pub fn validate_current_env() -> Vec<String> {
        Self::get_supported_env_vars()
            .into_iter()
            .filter_map(|(var_name, _, _)| {
                let value = std::env::var(var_name).ok()?;
                Self::validate_env_var(var_name, &value)
                    .err()
                    .map(|e| format!("Warning: {}", e))
            })
            .collect()
    }

    /// Validate the contents of an environment file, one warning per bad entry
    pub fn check_env_file(path: &Path) -> Result<Option<Vec<String>>> {
        if !path.exists() {
            return Ok(None);
        }

        let values = Self::read_env_file(path, false)?;
        let mut warnings: Vec<String> = values
            .iter()
            .filter_map(|(key, value)| {
                Self::validate_env_var(key, value)
                    .err()
                    .map(|e| format!("{}: {}", key, e))
            })
            .collect();
        warnings.sort();

        Ok(Some(warnings))
    }
}

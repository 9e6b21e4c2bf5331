//! Additional comprehensive tests for configuration parsing and validation

use super::{display_config_summary, ConfigParser, EnvManager};
use crate::{cli::Cli, models::Config, types::ResolverSelection};
use clap::Parser;
use std::env;
use std::sync::Mutex;
use tempfile::TempDir;

// Parsing reads the process environment, so every test that parses or
// mutates NETDIAG_* variables holds this lock
static ENV_LOCK: Mutex<()> = Mutex::new(());

fn write_env_file(dir: &TempDir, content: &str) -> String {
    let path = dir.path().join("netdiag.env");
    std::fs::write(&path, content).unwrap();
    path.to_string_lossy().into_owned()
}

fn parse(args: &[&str]) -> crate::error::Result<Config> {
    ConfigParser::new(Cli::parse_from(args)).parse()
}

/// Test edge cases in configuration parsing
mod config_edge_cases {
    use super::*;

    #[test]
    fn test_config_with_boundary_values() {
        let mut config = Config::default();
        config.ping_count = 1000;
        config.timeout_seconds = 300;
        config.scan_concurrency = 1024;
        config.max_hops = 255;
        assert!(config.validate().is_ok());

        config.ping_count = 1001;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_with_mixed_ip_types() {
        let mut config = Config::default();
        config.dns_servers = vec![
            "8.8.8.8".to_string(),
            "2001:4860:4860::8888".to_string(),
            "1.1.1.1".to_string(),
        ];

        assert!(config.validate().is_ok());
        match config.resolver().unwrap() {
            ResolverSelection::Custom { servers } => assert_eq!(servers.len(), 3),
            other => panic!("unexpected resolver {:?}", other),
        }
    }

    #[test]
    fn test_config_serde_fills_defaults() {
        let config: Config = serde_json::from_str(r#"{"ping_count": 12}"#).unwrap();
        assert_eq!(config.ping_count, 12);
        assert_eq!(config.max_hops, 30);
        assert_eq!(config.benchmark_servers.len(), 4);
    }
}

/// Test environment variable parsing edge cases
mod env_parsing_tests {
    use super::*;

    #[test]
    fn test_env_file_quotes_and_comments() {
        let dir = TempDir::new().unwrap();
        let path = write_env_file(
            &dir,
            "# comment\nNETDIAG_DNS_SERVERS=\"1.1.1.1,9.9.9.9\"\n\nNETDIAG_MAX_HOPS=12\n",
        );

        let values = EnvManager::read_env_file(std::path::Path::new(&path), false).unwrap();
        assert_eq!(values.get("NETDIAG_DNS_SERVERS").map(String::as_str), Some("1.1.1.1,9.9.9.9"));
        assert_eq!(values.get("NETDIAG_MAX_HOPS").map(String::as_str), Some("12"));
    }

    #[test]
    fn test_env_var_boundary_values() {
        assert!(EnvManager::validate_env_var("NETDIAG_TIMEOUT", "1").is_ok());
        assert!(EnvManager::validate_env_var("NETDIAG_TIMEOUT", "300").is_ok());
        assert!(EnvManager::validate_env_var("NETDIAG_TIMEOUT", "301").is_err());
        assert!(EnvManager::validate_env_var("NETDIAG_CONCURRENCY", "1025").is_err());
        assert!(EnvManager::validate_env_var("NETDIAG_INTERVAL_MS", "0").is_ok());
    }
}

/// Test configuration merging priorities
mod config_priority_tests {
    use super::*;

    #[test]
    fn test_env_file_values_are_applied() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let dir = TempDir::new().unwrap();
        let path = write_env_file(&dir, "NETDIAG_COUNT=15\nNETDIAG_BANNERS=true\n");

        let config = parse(&["netdiag", "--env-file", &path, "local-ip"]).unwrap();
        assert_eq!(config.ping_count, 15);
        assert!(config.grab_banners);
    }

    #[test]
    fn test_priority_order() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let dir = TempDir::new().unwrap();
        let path = write_env_file(&dir, "NETDIAG_COUNT=15\nNETDIAG_MAX_HOPS=20\n");

        // Environment overrides the file
        env::set_var("NETDIAG_COUNT", "25");
        let from_env = parse(&["netdiag", "--env-file", &path, "ping", "example.com"]);
        // CLI overrides both
        let from_cli = parse(&["netdiag", "--env-file", &path, "ping", "example.com", "--count", "35"]);
        env::remove_var("NETDIAG_COUNT");

        let from_env = from_env.unwrap();
        assert_eq!(from_env.ping_count, 25);
        assert_eq!(from_env.max_hops, 20);
        assert_eq!(from_cli.unwrap().ping_count, 35);
    }

    #[test]
    fn test_missing_explicit_env_file_is_an_error() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope.env");

        let err = parse(&["netdiag", "--env-file", missing.to_str().unwrap(), "local-ip"]).unwrap_err();
        assert!(err.to_string().contains("Environment file not found"));
    }

    #[test]
    fn test_invalid_file_value_fails_parsing() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let dir = TempDir::new().unwrap();
        let path = write_env_file(&dir, "NETDIAG_TIMEOUT=soon\n");

        assert!(parse(&["netdiag", "--env-file", &path, "local-ip"]).is_err());
    }
}

/// Test CLI overrides per subcommand
mod cli_override_tests {
    use super::*;

    #[test]
    fn test_scan_and_trace_overrides() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());

        let scan = parse(&[
            "netdiag",
            "scan",
            "127.0.0.1",
            "--common",
            "--concurrency",
            "7",
            "--scan-timeout-ms",
            "300",
            "--banners",
        ])
        .unwrap();
        assert_eq!(scan.scan_concurrency, 7);
        assert_eq!(scan.scan_timeout_ms, 300);
        assert!(scan.grab_banners);

        let trace = parse(&["netdiag", "trace", "example.com", "--max-hops", "9", "--probes", "3", "--resolve"]).unwrap();
        assert_eq!(trace.max_hops, 9);
        assert_eq!(trace.probes_per_hop, 3);
        assert!(trace.resolve_hop_names);
    }

    #[test]
    fn test_resolver_flags() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());

        let custom = parse(&["netdiag", "--dns-server", "1.1.1.1, 8.8.4.4", "dns", "example.com"]).unwrap();
        assert_eq!(custom.dns_servers, vec!["1.1.1.1", "8.8.4.4"]);

        let system = parse(&["netdiag", "--dns-server", "system", "dns", "example.com"]).unwrap();
        assert_eq!(system.resolver().unwrap(), ResolverSelection::System);

        let doh = parse(&["netdiag", "--doh", "https://dns.google/resolve", "dns", "example.com"]).unwrap();
        assert!(matches!(doh.resolver().unwrap(), ResolverSelection::DoH { .. }));

        assert!(parse(&["netdiag", "--dns-server", "not-an-ip", "dns", "example.com"]).is_err());
    }

    #[test]
    fn test_json_disables_color() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());

        let config = parse(&["netdiag", "--json", "public-ip"]).unwrap();
        assert!(config.json_output);
        assert!(!config.enable_color);
    }

    #[test]
    fn test_bench_servers_override() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());

        let config = parse(&["netdiag", "dns-bench", "--servers", "9.9.9.9"]).unwrap();
        assert_eq!(config.benchmark_servers, vec!["9.9.9.9"]);
        assert!(parse(&["netdiag", "dns-bench", "--servers", "quad9"]).is_err());
    }
}

/// Test that summaries and errors are readable
mod summary_tests {
    use super::*;

    #[test]
    fn test_summary_lists_resolver_and_limits() {
        let mut config = Config::default();
        config.dns_servers = vec!["1.1.1.1".to_string()];
        let summary = display_config_summary(&config);

        assert!(summary.contains("Resolver: 1.1.1.1"));
        assert!(summary.contains("Ping Count: 4"));
        assert!(summary.contains("30 hops max"));
    }

    #[test]
    fn test_error_messages_are_helpful() {
        let mut config = Config::default();
        config.dns_servers = vec!["999.1.1.1".to_string()];
        let message = config.validate().unwrap_err().to_string();
        assert!(message.contains("999.1.1.1"));
    }
}

//! Configuration parsing from CLI arguments and environment variables

use crate::{
    cli::{Cli, Command},
    config::env::{EnvManager, DEFAULT_ENV_FILE},
    error::{AppError, Result},
    models::Config,
};
use std::path::{Path, PathBuf};

/// Configuration parser that combines CLI arguments with environment variables
pub struct ConfigParser {
    cli: Cli,
}

impl ConfigParser {
    /// Create a new configuration parser with CLI arguments
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Parse and build the complete configuration
    pub fn parse(&self) -> Result<Config> {
        // Start with default configuration
        let mut config = Config::default();

        // Values from the environment file sit below the real environment
        let file_values = self.load_env_file()?;
        config.merge_from_vars(|key| file_values.get(key).cloned())?;

        config.merge_from_env()?;

        self.apply_cli_overrides(&mut config)?;

        config.validate()?;

        Ok(config)
    }

    fn env_file_path(&self) -> PathBuf {
        self.cli
            .env_file
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_ENV_FILE))
    }

    /// Load the environment file; only an explicitly named file must exist
    fn load_env_file(&self) -> Result<std::collections::HashMap<String, String>> {
        let path = self.env_file_path();
        if self.cli.env_file.is_some() && !Path::new(&path).exists() {
            return Err(AppError::config(format!("Environment file not found: {}", path.display())));
        }
        EnvManager::read_env_file(&path, self.cli.debug)
    }

    /// Apply CLI argument overrides to configuration
    fn apply_cli_overrides(&self, config: &mut Config) -> Result<()> {
        let cli = &self.cli;

        if let Some(timeout) = cli.timeout {
            config.timeout_seconds = timeout;
        }

        if let Some(ref servers) = cli.dns_server {
            config.dns_servers = if servers.trim().eq_ignore_ascii_case("system") {
                Vec::new()
            } else {
                servers
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            };
        }

        if let Some(ref doh) = cli.doh {
            config.doh_url = Some(doh.clone());
        }

        if cli.no_color || cli.json {
            config.enable_color = false;
        } else if cli.color {
            config.enable_color = true;
        }

        // These are CLI-only
        config.json_output = cli.json;
        config.verbose = cli.verbose;
        config.debug = cli.debug;

        match &cli.command {
            Command::Ping {
                count,
                interval_ms,
                parallel,
                ..
            } => {
                if let Some(count) = count {
                    config.ping_count = *count;
                }
                if let Some(interval_ms) = interval_ms {
                    config.probe_interval_ms = *interval_ms;
                }
                if let Some(parallel) = parallel {
                    config.ping_parallelism = *parallel;
                }
            }
            Command::Scan {
                concurrency,
                scan_timeout_ms,
                banners,
                ..
            } => {
                if let Some(concurrency) = concurrency {
                    config.scan_concurrency = *concurrency;
                }
                if let Some(scan_timeout_ms) = scan_timeout_ms {
                    config.scan_timeout_ms = *scan_timeout_ms;
                }
                config.grab_banners |= *banners;
            }
            Command::Trace {
                max_hops,
                probes,
                resolve,
                ..
            } => {
                if let Some(max_hops) = max_hops {
                    config.max_hops = *max_hops;
                }
                if let Some(probes) = probes {
                    config.probes_per_hop = *probes;
                }
                config.resolve_hop_names |= *resolve;
            }
            Command::DnsBench { servers, .. } if !servers.is_empty() => {
                config.benchmark_servers = servers.clone();
            }
            _ => {}
        }

        if config.debug {
            eprintln!("Applied CLI overrides to configuration");
            eprintln!(
                "Final config: ping_count={}, timeout={}s, enable_color={}",
                config.ping_count, config.timeout_seconds, config.enable_color
            );
        }

        Ok(())
    }
}

/// Convenience function to load complete configuration from CLI arguments
pub fn load_config(cli: Cli) -> Result<Config> {
    ConfigParser::new(cli).parse()
}

/// Display configuration summary for debug purposes
pub fn display_config_summary(config: &Config) -> String {
    let mut summary = Vec::new();

    let resolver = config
        .resolver()
        .map(|r| r.name())
        .unwrap_or_else(|e| format!("invalid ({})", e));
    summary.push(format!("Resolver: {}", resolver));
    summary.push(format!("Ping Count: {}", config.ping_count));
    summary.push(format!("Timeout: {}s", config.timeout_seconds));
    summary.push(format!("Probe Interval: {}ms", config.probe_interval_ms));
    summary.push(format!(
        "Port Scan: {}ms per port, {} concurrent, banners {}",
        config.scan_timeout_ms,
        config.scan_concurrency,
        if config.grab_banners { "on" } else { "off" }
    ));
    summary.push(format!(
        "Traceroute: {} hops max, {} probe(s) per hop",
        config.max_hops, config.probes_per_hop
    ));
    summary.push(format!("Color Output: {}", config.enable_color));
    summary.push(format!("JSON Output: {}", config.json_output));
    summary.push(format!("Verbose: {}", config.verbose));
    summary.push(format!("Debug: {}", config.debug));

    summary.join("\n")
}

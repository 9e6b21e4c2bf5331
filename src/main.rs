//! netdiag - Network diagnostics CLI
//!
//! One subcommand per engine operation. Results go to stdout as text or JSON;
//! logs and errors go to stderr.

use clap::Parser;
use netdiag::{
    cli::{Cli, Command},
    config::{display_config_summary, load_config},
    error::{AppError, ErrorKind, ErrorReporter, Result},
    logging::LoggerFactory,
    models::{AnnotatedResult, AnnotationTemplate, Config, DiagnosticResult},
    output::{OutputCoordinator, OutputFormatter},
    types::RecordType,
    utils::{common_ports, parse_port_spec},
    NetworkDiagnostics, PKG_NAME, VERSION,
};
use serde::Serialize;
use std::process;

#[tokio::main]
async fn main() {
    // Set up better panic handling
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("Application panic: {}", panic_info);
        eprintln!("Please report this issue at: {}/issues", env!("CARGO_PKG_REPOSITORY"));
        process::exit(99);
    }));

    let cli = Cli::parse();
    let reporter = ErrorReporter::new(cli.use_colors(), cli.verbose);

    match run_application(cli).await {
        Ok(code) => process::exit(code),
        Err(e) => {
            reporter.report_error(&e);
            print_error_suggestions(&e);
            process::exit(e.exit_code());
        }
    }
}

/// Run one subcommand and return the process exit code
async fn run_application(cli: Cli) -> Result<i32> {
    cli.validate().map_err(AppError::validation)?;

    if cli.debug {
        eprintln!("{} v{} ({})", PKG_NAME, VERSION, option_env!("GIT_COMMIT").unwrap_or("unknown"));
        eprintln!("Debug mode enabled");
        eprintln!();
    }

    let config = load_config(cli.clone())?;
    if config.debug {
        eprintln!("{}", display_config_summary(&config));
    }

    let factory = LoggerFactory::new(config.clone());
    let logger = factory.create_logger("NETDIAG").await;
    let engine = NetworkDiagnostics::from_config(&config, logger)?;
    let output = OutputCoordinator::from_config(&config);
    let template = AnnotationTemplate::new()
        .metadata("session_id", factory.session_id())
        .metadata("version", VERSION);

    let session = Session {
        config: &config,
        output: &output,
        template: &template,
    };

    match cli.command {
        Command::Ping { target, .. } => {
            let result = engine.ping(&target, &config.ping_options()?).await;
            session.emit("ping", result, |f, r| f.format_ping(r))
        }
        Command::Quality { target, count } => {
            let result = engine
                .connection_quality_test(&target, &config.quality_options(count)?)
                .await;
            session.emit("quality", result, |f, r| f.format_quality(r))
        }
        Command::Dns { name, record_type } => {
            let result = engine.dns_lookup(&name, &config.dns_options(record_type)?).await;
            session.emit("dns", result, |f, r| f.format_dns_lookup(r))
        }
        Command::Reverse { address } => {
            let result = engine.reverse_dns(&address, &config.reverse_options()?).await;
            session.emit("reverse", result, |f, r| f.format_reverse_dns(r))
        }
        Command::Scan { target, ports, .. } => {
            let ports = match ports {
                Some(spec) => parse_port_spec(&spec)?,
                None => common_ports(),
            };
            let result = engine.port_scan(&target, &ports, &config.scan_options()?).await;
            session.emit("scan", result, |f, r| f.format_port_scan(r))
        }
        Command::Trace { target, .. } => {
            let result = engine.traceroute(&target, &config.traceroute_options()?).await;
            session.emit("trace", result, |f, r| f.format_traceroute(r))
        }
        Command::DnsBench {
            domains, record_type, ..
        } => {
            let domains = if domains.is_empty() {
                netdiag::defaults::BENCHMARK_DOMAINS
                    .iter()
                    .map(|d| d.to_string())
                    .collect()
            } else {
                domains
            };
            let resolvers = config.benchmark_resolvers()?;
            let result = engine
                .dns_benchmark(&domains, &resolvers, &config.benchmark_options(record_type))
                .await;
            session.emit("dns-bench", result, |f, r| f.format_dns_benchmark(r))
        }
        Command::Bulk { names, record_type } => {
            let result = engine.dns_bulk_lookup(&names, &config.dns_options(record_type)?).await;
            session.emit("bulk", result, |f, r| f.format_bulk_lookup(r))
        }
        Command::DnsInfo { name } => {
            let result = engine.dns_info(&name, &config.dns_options(RecordType::A)?).await;
            session.emit("dns-info", result, |f, r| f.format_dns_info(r))
        }
        Command::LocalIp => {
            let result = engine.local_ip().await;
            session.emit("local-ip", result, |f, r| f.format_local_ip(r))
        }
        Command::PublicIp => {
            let result = engine.public_ip().await;
            session.emit("public-ip", result, |f, r| f.format_public_ip(r))
        }
        Command::Interfaces => {
            let result = engine.interfaces().await;
            session.emit("interfaces", result, |f, r| f.format_interfaces(r))
        }
        Command::Gateway => {
            let result = engine.default_gateway().await;
            session.emit("gateway", result, |f, r| f.format_gateway(r))
        }
        Command::NetConfig => {
            let result = engine.network_config(&config.network_config_options()?).await;
            session.emit("net-config", result, |f, r| f.format_network_config(r))
        }
        Command::Bandwidth {
            size,
            url,
            transfer_timeout,
        } => {
            let result = engine
                .bandwidth_test(&config.bandwidth_options(size, url, transfer_timeout))
                .await;
            session.emit("bandwidth", result, |f, r| f.format_bandwidth(r))
        }
    }
}

/// Shared rendering state for one invocation
struct Session<'a> {
    config: &'a Config,
    output: &'a OutputCoordinator,
    template: &'a AnnotationTemplate,
}

impl Session<'_> {
    /// Print the result and map its outcome to an exit code
    fn emit<T, F>(&self, command: &str, result: DiagnosticResult<T>, text: F) -> Result<i32>
    where
        T: Serialize,
        F: FnOnce(&dyn OutputFormatter, &DiagnosticResult<T>) -> Result<String>,
    {
        let annotated: AnnotatedResult<T> = self.template.apply(result).with_tag(command);
        println!("{}", self.output.render(&annotated, text)?);

        let Some(error) = &annotated.result().error else {
            return Ok(0);
        };
        if error.kind == ErrorKind::PermissionDenied && !self.config.json_output {
            eprintln!("{}", self.output.formatter().format_warning(PERMISSION_HINT)?);
        }
        Ok(AppError::from(error.clone()).exit_code())
    }
}

const PERMISSION_HINT: &str =
    "ICMP probes need raw socket privilege (root or CAP_NET_RAW). `netdiag scan <target> -p 443` checks TCP reachability without it.";

/// Print helpful suggestions for common errors
fn print_error_suggestions(error: &AppError) {
    match error {
        AppError::Config(_) => {
            eprintln!();
            eprintln!("Configuration help:");
            eprintln!("  - Check your .env file format");
            eprintln!("  - Ensure DNS server IPs are valid");
            eprintln!("  - DoH URLs must use HTTPS");
        }
        AppError::Validation(_) => {
            eprintln!();
            eprintln!("Usage help:");
            eprintln!("  - Targets are hostnames or IPv4/IPv6 addresses");
            eprintln!("  - Ports are 1-65535, e.g. 22,80,8000-8100");
            eprintln!("  - Run `netdiag <command> --help` for options");
        }
        AppError::Network(_) | AppError::ResolutionFailed(_) => {
            eprintln!();
            eprintln!("Network troubleshooting:");
            eprintln!("  - Check your internet connection");
            eprintln!("  - Try different DNS servers with --dns-server");
            eprintln!("  - Verify firewall settings");
        }
        _ => {}
    }
}

//! Colored formatter implementation with terminal color support
//!
//! Same tables and sections as the plain formatter, with ANSI colors keyed to
//! latency bands, port states and pass/fail status.

use super::formatter::{
    bandwidth_line, benchmark_rows, benchmark_table, bulk_rows, bulk_table, describe_error, fmt_err, format_ms,
    format_opt_ms, format_percentage, gateway_line, interface_rows, interface_table, scan_rows, scan_summary,
    scan_table, trace_rows, trace_table, FormattingOptions, OutputFormatter, PlainFormatter,
};
use crate::{
    error::Result,
    models::{
        BandwidthReport, BulkLookup, DiagnosticResult, DnsBenchmark, DnsInfo, GatewayInfo, InterfaceInfo,
        LatencyStats, LocalIpInfo, NetworkConfig, PortScanReport, PublicIpInfo, QualityRating, QualityScore,
        ResolvedHostname, ResolvedRecords, TraceRoute,
    },
};
use colored::*;
use std::fmt::Write as _;

/// Performance level classification for color coding
#[derive(Debug, Clone, PartialEq)]
pub enum PerformanceLevel {
    Excellent,  // < 20ms
    Good,       // 20-50ms
    Fair,       // 50-100ms
    Poor,       // 100-300ms
    VeryPoor,   // > 300ms
}

impl PerformanceLevel {
    /// Determine performance level from a round trip in milliseconds
    pub fn from_response_time(time_ms: f64) -> Self {
        if time_ms < 20.0 {
            Self::Excellent
        } else if time_ms < 50.0 {
            Self::Good
        } else if time_ms < 100.0 {
            Self::Fair
        } else if time_ms < 300.0 {
            Self::Poor
        } else {
            Self::VeryPoor
        }
    }

    /// Get color for this performance level
    pub fn color(&self) -> Color {
        match self {
            Self::Excellent => Color::Green,
            Self::Good => Color::Cyan,
            Self::Fair => Color::Yellow,
            Self::Poor => Color::Magenta,
            Self::VeryPoor => Color::Red,
        }
    }

    /// Get descriptive text
    pub fn description(&self) -> &'static str {
        match self {
            Self::Excellent => "Excellent",
            Self::Good => "Good",
            Self::Fair => "Fair",
            Self::Poor => "Poor",
            Self::VeryPoor => "Very Poor",
        }
    }
}

/// Color scheme configuration
#[derive(Debug, Clone)]
pub struct ColorScheme {
    pub header: Color,
    pub success: Color,
    pub warning: Color,
    pub error: Color,
    pub info: Color,
    pub muted: Color,
    pub border: Color,
}

impl Default for ColorScheme {
    fn default() -> Self {
        Self {
            header: Color::Blue,
            success: Color::Green,
            warning: Color::Yellow,
            error: Color::Red,
            info: Color::Cyan,
            muted: Color::BrightBlack,
            border: Color::BrightBlack,
        }
    }
}

/// Colored formatter implementation
pub struct ColoredFormatter {
    plain_formatter: PlainFormatter,
    options: FormattingOptions,
    color_scheme: ColorScheme,
}

impl ColoredFormatter {
    /// Create a new colored formatter with options
    pub fn new(options: FormattingOptions) -> Self {
        Self::with_color_scheme(options, ColorScheme::default())
    }

    /// Create a colored formatter with custom color scheme
    pub fn with_color_scheme(options: FormattingOptions, color_scheme: ColorScheme) -> Self {
        let plain_formatter = PlainFormatter::new(options.clone());
        Self {
            plain_formatter,
            options,
            color_scheme,
        }
    }

    /// Apply color to text if colors are enabled
    fn colorize(&self, text: &str, color: Color) -> ColoredString {
        if self.options.enable_color {
            text.color(color)
        } else {
            text.normal()
        }
    }

    /// Apply bold formatting if colors are enabled
    fn bold(&self, text: &str) -> ColoredString {
        if self.options.enable_color {
            text.bold()
        } else {
            text.normal()
        }
    }

    fn dimmed(&self, text: &str) -> ColoredString {
        if self.options.enable_color {
            text.dimmed()
        } else {
            text.normal()
        }
    }

    /// Round trip colored by performance band
    fn format_rtt(&self, rtt_ms: Option<f64>) -> ColoredString {
        match rtt_ms {
            Some(ms) => self.colorize(&format_ms(ms), PerformanceLevel::from_response_time(ms).color()),
            None => self.dimmed("-"),
        }
    }

    /// Loss percentage: green when nothing was lost, red past 5%
    fn format_loss(&self, loss_percent: f64) -> ColoredString {
        let color = if loss_percent == 0.0 {
            self.color_scheme.success
        } else if loss_percent <= 5.0 {
            self.color_scheme.warning
        } else {
            self.color_scheme.error
        };
        self.colorize(&format_percentage(loss_percent), color)
    }

    fn rating_color(&self, rating: QualityRating) -> Color {
        match rating {
            QualityRating::Excellent | QualityRating::VeryGood => self.color_scheme.success,
            QualityRating::Good => self.color_scheme.info,
            QualityRating::Fair => self.color_scheme.warning,
            QualityRating::Poor | QualityRating::VeryPoor => self.color_scheme.error,
        }
    }

    /// Create a colored section header
    fn create_section_header(&self, title: &str) -> String {
        if self.options.enable_color {
            format!("▸ {}", title.bold().color(self.color_scheme.header))
        } else {
            format!("▸ {}", title)
        }
    }

    fn status_line<T>(&self, result: &DiagnosticResult<T>) -> String {
        let elapsed = self.dimmed(&format_ms(result.duration_ms));
        match &result.error {
            None => format!("{} {} {}", self.colorize("✓", self.color_scheme.success), result.operation, elapsed),
            Some(error) => format!(
                "{} {} {} {}",
                self.colorize("✗", self.color_scheme.error),
                result.operation,
                self.colorize(&describe_error(error), self.color_scheme.error),
                elapsed
            ),
        }
    }

    fn latency_lines(&self, output: &mut String, stats: &LatencyStats) -> Result<()> {
        writeln!(
            output,
            "  {} sent, {} received, {} loss",
            stats.sent,
            self.colorize(&stats.received.to_string(), self.color_scheme.info),
            self.format_loss(stats.packet_loss_percent())
        )
        .map_err(fmt_err)?;
        if stats.has_responses() {
            writeln!(
                output,
                "  min {}  avg {}  max {}  jitter {}  p95 {}",
                self.format_rtt(stats.min_ms),
                self.format_rtt(stats.mean_ms),
                self.format_rtt(stats.max_ms),
                self.dimmed(&format_opt_ms(stats.jitter_ms)),
                self.format_rtt(stats.p95_ms)
            )
            .map_err(fmt_err)?;
        }
        Ok(())
    }

    fn port_state_color(&self, state: &str) -> Color {
        match state {
            "open" => self.color_scheme.success,
            "closed" => self.color_scheme.muted,
            "filtered" => self.color_scheme.warning,
            _ => self.color_scheme.error,
        }
    }
}

impl OutputFormatter for ColoredFormatter {
    fn format_header(&self, title: &str) -> Result<String> {
        let mut output = String::new();
        let border = "═".repeat(title.chars().count() + 4);

        writeln!(output, "{}", self.colorize(&border, self.color_scheme.border)).map_err(fmt_err)?;
        writeln!(output, "  {}  ", self.bold(title).color(self.color_scheme.header)).map_err(fmt_err)?;
        write!(output, "{}", self.colorize(&border, self.color_scheme.border)).map_err(fmt_err)?;

        Ok(output)
    }

    fn format_ping(&self, result: &DiagnosticResult<LatencyStats>) -> Result<String> {
        let mut output = String::new();
        writeln!(output, "{}", self.create_section_header(&format!("PING {}", result.target))).map_err(fmt_err)?;
        if let Some(stats) = &result.payload {
            self.latency_lines(&mut output, stats)?;
        }
        write!(output, "{}", self.status_line(result)).map_err(fmt_err)?;
        Ok(output)
    }

    fn format_quality(&self, result: &DiagnosticResult<QualityScore>) -> Result<String> {
        let mut output = String::new();
        writeln!(
            output,
            "{}",
            self.create_section_header(&format!("Connection quality for {}", result.target))
        )
        .map_err(fmt_err)?;

        if let Some(score) = &result.payload {
            let color = self.rating_color(score.rating);
            writeln!(
                output,
                "  Score: {} ({})",
                self.bold(&format!("{}/100", score.score)).color(color),
                self.colorize(&score.rating.to_string(), color)
            )
            .map_err(fmt_err)?;
            writeln!(
                output,
                "  {}",
                self.dimmed(&format!(
                    "latency {:.1} + jitter {:.1} + loss {:.1}",
                    score.breakdown.latency, score.breakdown.jitter, score.breakdown.loss
                ))
            )
            .map_err(fmt_err)?;
            self.latency_lines(&mut output, &score.latency)?;
            for advice in &score.recommendations {
                writeln!(output, "  • {}", self.colorize(advice, self.color_scheme.info)).map_err(fmt_err)?;
            }
        }

        write!(output, "{}", self.status_line(result)).map_err(fmt_err)?;
        Ok(output)
    }

    fn format_dns_lookup(&self, result: &DiagnosticResult<ResolvedRecords>) -> Result<String> {
        let mut output = String::new();
        if let Some(records) = &result.payload {
            writeln!(
                output,
                "{} {}",
                self.create_section_header(&format!("{} {}", records.name, records.record_type)),
                self.dimmed(&format!("via {}", records.resolver))
            )
            .map_err(fmt_err)?;
            if records.records.is_empty() {
                writeln!(output, "  {}", self.dimmed("(no records)")).map_err(fmt_err)?;
            }
            for record in &records.records {
                writeln!(output, "  {}", self.colorize(&record.to_string(), self.color_scheme.info)).map_err(fmt_err)?;
            }
        }
        write!(output, "{}", self.status_line(result)).map_err(fmt_err)?;
        Ok(output)
    }

    fn format_reverse_dns(&self, result: &DiagnosticResult<ResolvedHostname>) -> Result<String> {
        let mut output = String::new();
        if let Some(resolved) = &result.payload {
            for name in &resolved.hostnames {
                writeln!(
                    output,
                    "  {} → {}",
                    resolved.address,
                    self.colorize(name, self.color_scheme.info)
                )
                .map_err(fmt_err)?;
            }
        }
        write!(output, "{}", self.status_line(result)).map_err(fmt_err)?;
        Ok(output)
    }

    fn format_port_scan(&self, result: &DiagnosticResult<PortScanReport>) -> Result<String> {
        let mut output = String::new();

        if let Some(report) = &result.payload {
            writeln!(
                output,
                "{}",
                self.create_section_header(&format!("Port scan of {} ({})", result.target, report.address))
            )
            .map_err(fmt_err)?;

            let rows = scan_rows(report, self.options.verbose_mode);
            if rows.is_empty() {
                writeln!(output, "  {}", self.dimmed("No open ports found.")).map_err(fmt_err)?;
            } else {
                let table = self.plain_formatter.render_table(
                    &scan_table(self.options.table_borders),
                    &rows,
                    &|column, raw, padded| match column {
                        1 => self.colorize(padded, self.port_state_color(raw)).to_string(),
                        4 => self.dimmed(padded).to_string(),
                        _ => padded.to_string(),
                    },
                );
                writeln!(output, "{}", table).map_err(fmt_err)?;
            }
            writeln!(output, "{}", scan_summary(report)).map_err(fmt_err)?;
            if report.cancelled {
                writeln!(
                    output,
                    "{}",
                    self.colorize(
                        "Scan deadline reached; unfinished ports are indeterminate.",
                        self.color_scheme.warning
                    )
                )
                .map_err(fmt_err)?;
            }
        }

        write!(output, "{}", self.status_line(result)).map_err(fmt_err)?;
        Ok(output)
    }

    fn format_traceroute(&self, result: &DiagnosticResult<TraceRoute>) -> Result<String> {
        let mut output = String::new();

        if let Some(route) = &result.payload {
            writeln!(
                output,
                "{} {}",
                self.create_section_header(&format!("traceroute to {} ({})", result.target, route.destination)),
                self.dimmed(&format!("{} hops max", route.max_hops))
            )
            .map_err(fmt_err)?;

            if !route.hops.is_empty() {
                let table = self.plain_formatter.render_table(
                    &trace_table(self.options.table_borders),
                    &trace_rows(route),
                    &|column, raw, padded| match (column, raw) {
                        (_, "*") => self.dimmed(padded).to_string(),
                        (2, _) => self.colorize(padded, self.color_scheme.info).to_string(),
                        _ => padded.to_string(),
                    },
                );
                writeln!(output, "{}", table).map_err(fmt_err)?;
            }

            let reached = if route.destination_reached {
                self.colorize("reached", self.color_scheme.success)
            } else {
                self.colorize("not reached", self.color_scheme.warning)
            };
            writeln!(output, "Destination {} after {} hops", reached, route.hops.len()).map_err(fmt_err)?;
            if let Some(hop) = route.unreachable_at {
                let note = format!("Hop {} reported the destination unreachable", hop);
                writeln!(output, "{}", self.colorize(&note, self.color_scheme.error)).map_err(fmt_err)?;
            }
        }

        write!(output, "{}", self.status_line(result)).map_err(fmt_err)?;
        Ok(output)
    }

    fn format_dns_benchmark(&self, result: &DiagnosticResult<DnsBenchmark>) -> Result<String> {
        let mut output = String::new();

        if let Some(bench) = &result.payload {
            writeln!(
                output,
                "{}",
                self.create_section_header(&format!(
                    "DNS benchmark: {} record over {} domains",
                    bench.record_type,
                    bench.domains.len()
                ))
            )
            .map_err(fmt_err)?;

            let table = self.plain_formatter.render_table(
                &benchmark_table(self.options.table_borders),
                &benchmark_rows(bench),
                &|column, raw, padded| match column {
                    0 if raw == "1" => self.colorize(padded, self.color_scheme.success).to_string(),
                    1 => self.bold(padded).to_string(),
                    _ => padded.to_string(),
                },
            );
            writeln!(output, "{}", table).map_err(fmt_err)?;

            if self.options.verbose_mode {
                for timing in &bench.resolvers {
                    for failure in &timing.failures {
                        writeln!(
                            output,
                            "  {} {} {}",
                            timing.resolver,
                            failure.domain,
                            self.colorize(failure.kind.label(), self.color_scheme.error)
                        )
                        .map_err(fmt_err)?;
                    }
                }
            }
            if let Some(fastest) = bench.fastest() {
                writeln!(
                    output,
                    "Fastest: {} ({})",
                    self.colorize(&fastest.resolver, self.color_scheme.success),
                    self.format_rtt(fastest.latency.mean_ms)
                )
                .map_err(fmt_err)?;
            }
        }

        write!(output, "{}", self.status_line(result)).map_err(fmt_err)?;
        Ok(output)
    }

    fn format_bulk_lookup(&self, result: &DiagnosticResult<BulkLookup>) -> Result<String> {
        let mut output = String::new();

        if let Some(bulk) = &result.payload {
            let table = self.plain_formatter.render_table(
                &bulk_table(self.options.table_borders),
                &bulk_rows(bulk),
                &|column, raw, padded| match (column, raw) {
                    (1, "ok") => self.colorize(padded, self.color_scheme.success).to_string(),
                    (1, _) => self.colorize(padded, self.color_scheme.error).to_string(),
                    _ => padded.to_string(),
                },
            );
            writeln!(output, "{}", table).map_err(fmt_err)?;
            writeln!(
                output,
                "{} names: {} resolved, {} failed",
                bulk.total,
                self.colorize(&bulk.successful.to_string(), self.color_scheme.success),
                self.colorize(&bulk.failed.to_string(), self.color_scheme.error)
            )
            .map_err(fmt_err)?;
        }

        write!(output, "{}", self.status_line(result)).map_err(fmt_err)?;
        Ok(output)
    }

    fn format_dns_info(&self, result: &DiagnosticResult<DnsInfo>) -> Result<String> {
        let mut output = String::new();

        if let Some(info) = &result.payload {
            writeln!(output, "{}", self.create_section_header(&format!("DNS information for {}", info.name)))
                .map_err(fmt_err)?;
            for ip in &info.ipv4 {
                writeln!(output, "  A     {}", self.colorize(&ip.to_string(), self.color_scheme.info)).map_err(fmt_err)?;
            }
            for ip in &info.ipv6 {
                writeln!(output, "  AAAA  {}", self.colorize(&ip.to_string(), self.color_scheme.info))
                    .map_err(fmt_err)?;
            }
            for entry in &info.reverse {
                let names = match entry.error {
                    None => self.colorize(&entry.hostnames.join(", "), self.color_scheme.success),
                    Some(kind) => self.dimmed(&format!("({})", kind.label())),
                };
                writeln!(output, "  PTR   {} → {}", entry.address, names).map_err(fmt_err)?;
            }
        }

        write!(output, "{}", self.status_line(result)).map_err(fmt_err)?;
        Ok(output)
    }

    fn format_local_ip(&self, result: &DiagnosticResult<LocalIpInfo>) -> Result<String> {
        match &result.payload {
            Some(info) => Ok(format!(
                "Local IP: {} {}",
                self.bold(&info.address.to_string()).color(self.color_scheme.info),
                self.dimmed(&format!("({})", info.method))
            )),
            None => Ok(self.status_line(result)),
        }
    }

    fn format_public_ip(&self, result: &DiagnosticResult<PublicIpInfo>) -> Result<String> {
        let mut output = String::new();
        match &result.payload {
            Some(info) => {
                write!(
                    output,
                    "Public IP: {} {}",
                    self.bold(&info.address.to_string()).color(self.color_scheme.info),
                    self.dimmed(&format!("(via {})", info.service))
                )
                .map_err(fmt_err)?;
                if self.options.verbose_mode {
                    for error in &info.errors {
                        write!(output, "\n  {}", self.colorize(&format!("skipped {}", error), self.color_scheme.warning))
                            .map_err(fmt_err)?;
                    }
                }
            }
            None => output.push_str(&self.status_line(result)),
        }
        Ok(output)
    }

    fn format_interfaces(&self, result: &DiagnosticResult<Vec<InterfaceInfo>>) -> Result<String> {
        let mut output = String::new();

        if let Some(interfaces) = &result.payload {
            writeln!(output, "{}", self.interface_table(interfaces)).map_err(fmt_err)?;
            let active = interfaces.iter().filter(|i| i.is_active()).count();
            writeln!(
                output,
                "{} interfaces, {} active",
                interfaces.len(),
                self.colorize(&active.to_string(), self.color_scheme.success)
            )
            .map_err(fmt_err)?;
        }

        write!(output, "{}", self.status_line(result)).map_err(fmt_err)?;
        Ok(output)
    }

    fn format_gateway(&self, result: &DiagnosticResult<GatewayInfo>) -> Result<String> {
        match &result.payload {
            Some(gateway) => Ok(self.colorize(&gateway_line(gateway), self.color_scheme.info).to_string()),
            None => Ok(self.status_line(result)),
        }
    }

    fn format_network_config(&self, result: &DiagnosticResult<NetworkConfig>) -> Result<String> {
        let mut output = String::new();

        if let Some(config) = &result.payload {
            writeln!(output, "{}", self.create_section_header("Network configuration")).map_err(fmt_err)?;
            writeln!(output, "{}", self.interface_table(&config.interfaces)).map_err(fmt_err)?;
            writeln!(
                output,
                "Interfaces: {} total, {} active, primary {}",
                config.total_interfaces,
                config.active_interfaces,
                self.bold(config.primary_interface.as_deref().unwrap_or("none"))
            )
            .map_err(fmt_err)?;
            match &config.gateway {
                Some(gateway) => writeln!(output, "{}", gateway_line(gateway)).map_err(fmt_err)?,
                None => writeln!(output, "Default gateway: {}", self.colorize("none", self.color_scheme.error))
                    .map_err(fmt_err)?,
            }
            let check = |ok: bool| {
                if ok {
                    self.colorize("yes", self.color_scheme.success)
                } else {
                    self.colorize("no", self.color_scheme.error)
                }
            };
            writeln!(output, "DNS working: {}", check(config.dns_working)).map_err(fmt_err)?;
            writeln!(output, "Internet connectivity: {}", check(config.internet_connectivity)).map_err(fmt_err)?;
            for issue in &config.issues {
                writeln!(output, "{} {}", self.colorize("!", self.color_scheme.warning), issue).map_err(fmt_err)?;
            }
            for advice in &config.recommendations {
                writeln!(output, "  → {}", advice).map_err(fmt_err)?;
            }
        }

        write!(output, "{}", self.status_line(result)).map_err(fmt_err)?;
        Ok(output)
    }

    fn format_bandwidth(&self, result: &DiagnosticResult<BandwidthReport>) -> Result<String> {
        let mut output = String::new();

        if let Some(report) = &result.payload {
            writeln!(output, "{}", self.create_section_header(&format!("Bandwidth test via {}", report.url)))
                .map_err(fmt_err)?;
            writeln!(output, "{}", self.bold(&bandwidth_line(report))).map_err(fmt_err)?;
            if self.options.verbose_mode {
                for error in &report.errors {
                    writeln!(output, "  {}", self.colorize(&format!("skipped {}", error), self.color_scheme.warning))
                        .map_err(fmt_err)?;
                }
            }
        }

        write!(output, "{}", self.status_line(result)).map_err(fmt_err)?;
        Ok(output)
    }

    fn format_error(&self, error: &str) -> Result<String> {
        Ok(format!("✗ {}", self.colorize(error, self.color_scheme.error)))
    }

    fn format_warning(&self, warning: &str) -> Result<String> {
        Ok(format!("! {}", self.colorize(warning, self.color_scheme.warning)))
    }

    fn format_success(&self, message: &str) -> Result<String> {
        Ok(format!("✓ {}", self.colorize(message, self.color_scheme.success)))
    }
}

/// Helper functions for color management
impl ColoredFormatter {
    fn interface_table(&self, interfaces: &[InterfaceInfo]) -> String {
        self.plain_formatter.render_table(
            &interface_table(self.options.table_borders),
            &interface_rows(interfaces),
            &|column, raw, padded| match (column, raw) {
                (1, "up") => self.colorize(padded, self.color_scheme.success).to_string(),
                (1, _) => self.colorize(padded, self.color_scheme.error).to_string(),
                _ => padded.to_string(),
            },
        )
    }

    /// Check if terminal supports colors
    pub fn supports_color() -> bool {
        std::env::var("NO_COLOR").is_err() && std::env::var("TERM").map(|term| term != "dumb").unwrap_or(true)
    }

    /// Enable or disable colors at runtime
    pub fn set_colors_enabled(&mut self, enabled: bool) {
        self.options.enable_color = enabled && Self::supports_color();
    }
}

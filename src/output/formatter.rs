//! Core formatting traits and implementations
//!
//! This module defines the output formatting interface and provides
//! a plain text implementation with table formatting capabilities.

use crate::{
    error::{AppError, DiagnosticError, Result},
    models::{
        BandwidthReport, BulkLookup, DiagnosticResult, DnsBenchmark, DnsInfo, GatewayInfo, InterfaceInfo,
        LatencyStats, LocalIpInfo, NetworkConfig, PortScanReport, PublicIpInfo, QualityScore, ResolvedHostname,
        ResolvedRecords, TraceRoute,
    },
    types::PortStatus,
};
use std::fmt::Write as _;

/// Main trait for output formatting
pub trait OutputFormatter {
    /// Format a header section
    fn format_header(&self, title: &str) -> Result<String>;

    fn format_ping(&self, result: &DiagnosticResult<LatencyStats>) -> Result<String>;

    fn format_quality(&self, result: &DiagnosticResult<QualityScore>) -> Result<String>;

    fn format_dns_lookup(&self, result: &DiagnosticResult<ResolvedRecords>) -> Result<String>;

    fn format_reverse_dns(&self, result: &DiagnosticResult<ResolvedHostname>) -> Result<String>;

    /// Port table; closed ports are listed only in verbose mode
    fn format_port_scan(&self, result: &DiagnosticResult<PortScanReport>) -> Result<String>;

    fn format_traceroute(&self, result: &DiagnosticResult<TraceRoute>) -> Result<String>;

    /// Resolvers ranked fastest first
    fn format_dns_benchmark(&self, result: &DiagnosticResult<DnsBenchmark>) -> Result<String>;

    fn format_bulk_lookup(&self, result: &DiagnosticResult<BulkLookup>) -> Result<String>;

    fn format_dns_info(&self, result: &DiagnosticResult<DnsInfo>) -> Result<String>;

    fn format_local_ip(&self, result: &DiagnosticResult<LocalIpInfo>) -> Result<String>;

    fn format_public_ip(&self, result: &DiagnosticResult<PublicIpInfo>) -> Result<String>;

    fn format_interfaces(&self, result: &DiagnosticResult<Vec<InterfaceInfo>>) -> Result<String>;

    fn format_gateway(&self, result: &DiagnosticResult<GatewayInfo>) -> Result<String>;

    /// Interface table followed by the check summary, issues and advice
    fn format_network_config(&self, result: &DiagnosticResult<NetworkConfig>) -> Result<String>;

    fn format_bandwidth(&self, result: &DiagnosticResult<BandwidthReport>) -> Result<String>;

    /// Format error messages
    fn format_error(&self, error: &str) -> Result<String>;

    /// Format warning messages
    fn format_warning(&self, warning: &str) -> Result<String>;

    /// Format success messages
    fn format_success(&self, message: &str) -> Result<String>;
}

/// Configuration options for formatting
#[derive(Debug, Clone)]
pub struct FormattingOptions {
    /// Enable colored output
    pub enable_color: bool,
    /// Enable verbose mode with detailed information
    pub verbose_mode: bool,
    /// Show table borders
    pub table_borders: bool,
    /// Maximum output width
    pub max_width: usize,
}

impl Default for FormattingOptions {
    fn default() -> Self {
        Self {
            enable_color: true,
            verbose_mode: false,
            table_borders: true,
            max_width: 120,
        }
    }
}

/// Table formatting configuration
#[derive(Debug, Clone)]
pub struct TableFormat {
    /// Column definitions
    pub columns: Vec<Column>,
    /// Show borders around table
    pub show_borders: bool,
    /// Show header row
    pub show_header: bool,
    /// Minimum column width
    pub min_column_width: usize,
    /// Maximum column width
    pub max_column_width: usize,
}

impl TableFormat {
    pub(super) fn new(columns: Vec<Column>, show_borders: bool) -> Self {
        Self {
            columns,
            show_borders,
            show_header: true,
            min_column_width: 4,
            max_column_width: 50,
        }
    }
}

/// Column definition for table formatting
#[derive(Debug, Clone)]
pub struct Column {
    /// Column header
    pub header: String,
    /// Column alignment
    pub alignment: Alignment,
    /// Minimum width
    pub min_width: usize,
    /// Maximum width
    pub max_width: usize,
}

impl Column {
    pub(super) fn left(header: &str, min_width: usize, max_width: usize) -> Self {
        Self {
            header: header.to_string(),
            alignment: Alignment::Left,
            min_width,
            max_width,
        }
    }

    pub(super) fn right(header: &str, min_width: usize, max_width: usize) -> Self {
        Self {
            header: header.to_string(),
            alignment: Alignment::Right,
            min_width,
            max_width,
        }
    }
}

/// Text alignment options
#[derive(Debug, Clone)]
pub enum Alignment {
    Left,
    Right,
    Center,
}

/// Row data for table formatting
pub type RowData = Vec<String>;

pub(super) fn fmt_err(e: std::fmt::Error) -> AppError {
    AppError::io(format!("Failed to format output: {}", e))
}

/// Format a millisecond value in human-readable form
pub(super) fn format_ms(duration_ms: f64) -> String {
    if duration_ms < 1.0 {
        format!("{:.0}μs", duration_ms * 1000.0)
    } else if duration_ms < 1000.0 {
        format!("{:.1}ms", duration_ms)
    } else if duration_ms < 60000.0 {
        format!("{:.2}s", duration_ms / 1000.0)
    } else {
        let minutes = (duration_ms / 60000.0) as u32;
        let seconds = (duration_ms % 60000.0) / 1000.0;
        format!("{}m{:.1}s", minutes, seconds)
    }
}

pub(super) fn format_opt_ms(value: Option<f64>) -> String {
    value.map(format_ms).unwrap_or_else(|| "-".to_string())
}

/// Format percentage with appropriate precision
pub(super) fn format_percentage(percentage: f64) -> String {
    if percentage >= 99.95 {
        "100.0%".to_string()
    } else if percentage < 0.05 {
        "0.0%".to_string()
    } else {
        format!("{:.1}%", percentage)
    }
}

/// `[KIND] detail` for a failed result
pub(super) fn describe_error(error: &DiagnosticError) -> String {
    format!("[{}] {}", error.kind.label(), error.detail)
}

pub(super) fn scan_table(show_borders: bool) -> TableFormat {
    TableFormat::new(
        vec![
            Column::right("Port", 4, 5),
            Column::left("State", 6, 13),
            Column::left("Service", 7, 16),
            Column::right("Time", 6, 10),
            Column::left("Banner", 6, 40),
        ],
        show_borders,
    )
}

pub(super) fn scan_rows(report: &PortScanReport, verbose: bool) -> Vec<RowData> {
    report
        .ports
        .values()
        .filter(|p| verbose || p.status != PortStatus::Closed)
        .map(|p| {
            vec![
                p.port.to_string(),
                p.status.as_str().to_string(),
                p.service.clone().unwrap_or_default(),
                format_opt_ms(p.response_ms),
                p.banner.as_deref().unwrap_or("").replace(['\r', '\n'], " "),
            ]
        })
        .collect()
}

pub(super) fn scan_summary(report: &PortScanReport) -> String {
    format!(
        "{} ports: {} open, {} closed, {} filtered, {} indeterminate",
        report.len(),
        report.count(PortStatus::Open),
        report.count(PortStatus::Closed),
        report.count(PortStatus::Filtered),
        report.count(PortStatus::Indeterminate)
    )
}

pub(super) fn trace_table(show_borders: bool) -> TableFormat {
    TableFormat::new(
        vec![
            Column::right("Hop", 3, 3),
            Column::left("Address", 7, 39),
            Column::left("Hostname", 8, 40),
            Column::right("RTT", 6, 10),
        ],
        show_borders,
    )
}

pub(super) fn trace_rows(route: &TraceRoute) -> Vec<RowData> {
    route
        .hops
        .iter()
        .map(|hop| {
            vec![
                hop.hop_index.to_string(),
                hop.address.map(|a| a.to_string()).unwrap_or_else(|| "*".to_string()),
                hop.hostname.clone().unwrap_or_default(),
                hop.round_trip_ms.map(format_ms).unwrap_or_else(|| "*".to_string()),
            ]
        })
        .collect()
}

pub(super) fn benchmark_table(show_borders: bool) -> TableFormat {
    TableFormat::new(
        vec![
            Column::right("Rank", 4, 4),
            Column::left("Resolver", 8, 40),
            Column::right("Mean", 6, 10),
            Column::right("Min/Max", 7, 21),
            Column::right("Success", 7, 8),
        ],
        show_borders,
    )
}

pub(super) fn benchmark_rows(bench: &DnsBenchmark) -> Vec<RowData> {
    bench
        .resolvers
        .iter()
        .enumerate()
        .map(|(idx, timing)| {
            let latency = &timing.latency;
            vec![
                (idx + 1).to_string(),
                timing.resolver.clone(),
                format_opt_ms(latency.mean_ms),
                format!("{}/{}", format_opt_ms(latency.min_ms), format_opt_ms(latency.max_ms)),
                format_percentage(100.0 - latency.packet_loss_percent()),
            ]
        })
        .collect()
}

pub(super) fn bulk_table(show_borders: bool) -> TableFormat {
    TableFormat::new(
        vec![
            Column::left("Name", 4, 48),
            Column::left("Status", 6, 11),
            Column::left("Records", 7, 60),
        ],
        show_borders,
    )
}

pub(super) fn bulk_rows(bulk: &BulkLookup) -> Vec<RowData> {
    bulk.results
        .iter()
        .map(|result| {
            let (status, detail) = match (&result.payload, &result.error) {
                (Some(records), _) => {
                    let list: Vec<String> = records.records.iter().map(|r| r.to_string()).collect();
                    ("ok".to_string(), list.join(", "))
                }
                (None, Some(error)) => (error.kind.label().to_lowercase(), error.detail.clone()),
                (None, None) => ("unknown".to_string(), String::new()),
            };
            vec![result.target.clone(), status, detail]
        })
        .collect()
}

pub(super) fn interface_table(show_borders: bool) -> TableFormat {
    TableFormat::new(
        vec![
            Column::left("Interface", 9, 24),
            Column::left("State", 5, 8),
            Column::left("Kind", 4, 9),
            Column::left("MAC", 3, 17),
            Column::left("Addresses", 9, 60),
        ],
        show_borders,
    )
}

pub(super) fn interface_rows(interfaces: &[InterfaceInfo]) -> Vec<RowData> {
    interfaces
        .iter()
        .map(|iface| {
            vec![
                iface.name.clone(),
                if iface.is_up { "up" } else { "down" }.to_string(),
                iface.kind.to_string(),
                iface.mac.clone().unwrap_or_default(),
                iface.networks.join(", "),
            ]
        })
        .collect()
}

pub(super) fn gateway_line(gateway: &GatewayInfo) -> String {
    match &gateway.interface {
        Some(interface) => format!("Default gateway: {} via {}", gateway.address, interface),
        None => format!("Default gateway: {}", gateway.address),
    }
}

pub(super) fn bandwidth_line(report: &BandwidthReport) -> String {
    format!(
        "Download: {:.2} Mbps ({} bytes in {:.2}s)",
        report.download_speed_mbps,
        report.bytes_downloaded,
        report.duration_ms / 1000.0
    )
}

/// Plain text formatter implementation
pub struct PlainFormatter {
    options: FormattingOptions,
}

impl PlainFormatter {
    /// Create a new plain formatter with options
    pub fn new(options: FormattingOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &FormattingOptions {
        &self.options
    }

    /// Create a table with the given format and data
    fn create_table(&self, format: &TableFormat, rows: &[RowData]) -> String {
        self.render_table(format, rows, &|_, _, padded| padded.to_string())
    }

    /// Lay out a table, handing every padded data cell to `paint` along with
    /// its column index and raw text. Widths are computed on the raw text.
    pub(super) fn render_table(
        &self,
        format: &TableFormat,
        rows: &[RowData],
        paint: &dyn Fn(usize, &str, &str) -> String,
    ) -> String {
        if rows.is_empty() {
            return String::new();
        }

        let column_widths = self.calculate_column_widths(format, rows);
        let mut output = String::new();

        if format.show_header && !format.columns.is_empty() {
            if format.show_borders {
                output.push_str(&self.create_horizontal_border(&column_widths));
                output.push('\n');
            }

            let headers: Vec<String> = format.columns.iter().map(|c| c.header.clone()).collect();
            output.push_str(&self.create_row(&headers, &column_widths, format, &|_, _, padded| padded.to_string()));
            output.push('\n');

            if format.show_borders {
                output.push_str(&self.create_horizontal_border(&column_widths));
                output.push('\n');
            }
        }

        for row in rows {
            output.push_str(&self.create_row(row, &column_widths, format, paint));
            output.push('\n');
        }

        if format.show_borders {
            output.push_str(&self.create_horizontal_border(&column_widths));
        }

        output.trim_end_matches('\n').to_string()
    }

    /// Calculate optimal column widths
    fn calculate_column_widths(&self, format: &TableFormat, rows: &[RowData]) -> Vec<usize> {
        let num_columns = format
            .columns
            .len()
            .max(rows.iter().map(|r| r.len()).max().unwrap_or(0));

        (0..num_columns)
            .map(|col_idx| {
                let column = format.columns.get(col_idx);
                let mut width = column
                    .map(|c| c.min_width.max(c.header.chars().count()))
                    .unwrap_or(format.min_column_width);

                for row in rows {
                    if let Some(cell) = row.get(col_idx) {
                        width = width.max(cell.chars().count());
                    }
                }

                width.min(column.map(|c| c.max_width).unwrap_or(format.max_column_width))
            })
            .collect()
    }

    /// Create a table row
    fn create_row(
        &self,
        data: &[String],
        widths: &[usize],
        format: &TableFormat,
        paint: &dyn Fn(usize, &str, &str) -> String,
    ) -> String {
        let mut row = String::new();

        if format.show_borders {
            row.push('|');
        }

        for (idx, (cell, &width)) in data.iter().zip(widths.iter()).enumerate() {
            let alignment = format
                .columns
                .get(idx)
                .map(|c| &c.alignment)
                .unwrap_or(&Alignment::Left);

            let padded_cell = self.align_text(cell, width, alignment);

            if format.show_borders {
                row.push(' ');
            }
            row.push_str(&paint(idx, cell, &padded_cell));
            if format.show_borders {
                row.push_str(" |");
            } else {
                row.push_str("  ");
            }
        }

        row.trim_end().to_string()
    }

    /// Create horizontal border for table
    fn create_horizontal_border(&self, widths: &[usize]) -> String {
        let mut border = String::new();

        if !widths.is_empty() {
            border.push('+');
            for &width in widths {
                border.push_str(&"-".repeat(width + 2));
                border.push('+');
            }
        }

        border
    }

    /// Align text within specified width
    fn align_text(&self, text: &str, width: usize, alignment: &Alignment) -> String {
        let length = text.chars().count();
        if length >= width {
            return text.chars().take(width).collect();
        }

        let padding = width - length;
        match alignment {
            Alignment::Left => format!("{}{}", text, " ".repeat(padding)),
            Alignment::Right => format!("{}{}", " ".repeat(padding), text),
            Alignment::Center => {
                let left_pad = padding / 2;
                let right_pad = padding - left_pad;
                format!("{}{}{}", " ".repeat(left_pad), text, " ".repeat(right_pad))
            }
        }
    }

    fn status_line<T>(&self, result: &DiagnosticResult<T>) -> String {
        match &result.error {
            None => format!("{} {}: OK in {}", result.operation, result.target, format_ms(result.duration_ms)),
            Some(error) => format!(
                "{} {}: FAILED {} after {}",
                result.operation,
                result.target,
                describe_error(error),
                format_ms(result.duration_ms)
            ),
        }
    }

    fn latency_lines(&self, output: &mut String, stats: &LatencyStats) -> Result<()> {
        writeln!(
            output,
            "{} sent, {} received, {} loss",
            stats.sent,
            stats.received,
            format_percentage(stats.packet_loss_percent())
        )
        .map_err(fmt_err)?;
        if stats.has_responses() {
            writeln!(
                output,
                "rtt min/avg/max/jitter = {}/{}/{}/{}, p95 {}",
                format_opt_ms(stats.min_ms),
                format_opt_ms(stats.mean_ms),
                format_opt_ms(stats.max_ms),
                format_opt_ms(stats.jitter_ms),
                format_opt_ms(stats.p95_ms)
            )
            .map_err(fmt_err)?;
        }
        Ok(())
    }
}

impl OutputFormatter for PlainFormatter {
    fn format_header(&self, title: &str) -> Result<String> {
        let mut output = String::new();
        let border = "=".repeat(title.chars().count() + 4);

        writeln!(output, "{}", border).map_err(fmt_err)?;
        writeln!(output, "  {}  ", title).map_err(fmt_err)?;
        write!(output, "{}", border).map_err(fmt_err)?;

        Ok(output)
    }

    fn format_ping(&self, result: &DiagnosticResult<LatencyStats>) -> Result<String> {
        let mut output = String::new();
        writeln!(output, "PING {}", result.target).map_err(fmt_err)?;
        if let Some(stats) = &result.payload {
            self.latency_lines(&mut output, stats)?;
        }
        write!(output, "{}", self.status_line(result)).map_err(fmt_err)?;
        Ok(output)
    }

    fn format_quality(&self, result: &DiagnosticResult<QualityScore>) -> Result<String> {
        let mut output = String::new();
        writeln!(output, "Connection quality for {}", result.target).map_err(fmt_err)?;

        if let Some(score) = &result.payload {
            writeln!(output, "Score: {}/100 ({})", score.score, score.rating).map_err(fmt_err)?;
            writeln!(
                output,
                "  latency {:.1}, jitter {:.1}, loss {:.1}",
                score.breakdown.latency, score.breakdown.jitter, score.breakdown.loss
            )
            .map_err(fmt_err)?;
            self.latency_lines(&mut output, &score.latency)?;
            if !score.recommendations.is_empty() {
                writeln!(output, "Recommendations:").map_err(fmt_err)?;
                for advice in &score.recommendations {
                    writeln!(output, "  - {}", advice).map_err(fmt_err)?;
                }
            }
        }

        write!(output, "{}", self.status_line(result)).map_err(fmt_err)?;
        Ok(output)
    }

    fn format_dns_lookup(&self, result: &DiagnosticResult<ResolvedRecords>) -> Result<String> {
        let mut output = String::new();
        match &result.payload {
            Some(records) => {
                writeln!(output, "{} {} via {}:", records.name, records.record_type, records.resolver)
                    .map_err(fmt_err)?;
                if records.records.is_empty() {
                    writeln!(output, "  (no records)").map_err(fmt_err)?;
                }
                for record in &records.records {
                    writeln!(output, "  {}", record).map_err(fmt_err)?;
                }
            }
            None => {
                writeln!(output, "{}", result.target).map_err(fmt_err)?;
            }
        }
        write!(output, "{}", self.status_line(result)).map_err(fmt_err)?;
        Ok(output)
    }

    fn format_reverse_dns(&self, result: &DiagnosticResult<ResolvedHostname>) -> Result<String> {
        let mut output = String::new();
        if let Some(resolved) = &result.payload {
            for name in &resolved.hostnames {
                writeln!(output, "{} -> {}", resolved.address, name).map_err(fmt_err)?;
            }
        }
        write!(output, "{}", self.status_line(result)).map_err(fmt_err)?;
        Ok(output)
    }

    fn format_port_scan(&self, result: &DiagnosticResult<PortScanReport>) -> Result<String> {
        let mut output = String::new();

        if let Some(report) = &result.payload {
            writeln!(output, "Port scan of {} ({})", result.target, report.address).map_err(fmt_err)?;
            let rows = scan_rows(report, self.options.verbose_mode);
            if rows.is_empty() {
                writeln!(output, "No open ports found.").map_err(fmt_err)?;
            } else {
                writeln!(output, "{}", self.create_table(&scan_table(self.options.table_borders), &rows))
                    .map_err(fmt_err)?;
            }
            writeln!(output, "{}", scan_summary(report)).map_err(fmt_err)?;
            if report.cancelled {
                writeln!(output, "Scan deadline reached; unfinished ports are indeterminate.").map_err(fmt_err)?;
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
                "traceroute to {} ({}), {} hops max",
                result.target, route.destination, route.max_hops
            )
            .map_err(fmt_err)?;
            if !route.hops.is_empty() {
                writeln!(
                    output,
                    "{}",
                    self.create_table(&trace_table(self.options.table_borders), &trace_rows(route))
                )
                .map_err(fmt_err)?;
            }
            let reached = if route.destination_reached { "reached" } else { "not reached" };
            writeln!(output, "Destination {} after {} hops", reached, route.hops.len()).map_err(fmt_err)?;
            if let Some(hop) = route.unreachable_at {
                writeln!(output, "Hop {} reported the destination unreachable", hop).map_err(fmt_err)?;
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
                "DNS benchmark: {} record over {} domains",
                bench.record_type,
                bench.domains.len()
            )
            .map_err(fmt_err)?;
            writeln!(
                output,
                "{}",
                self.create_table(&benchmark_table(self.options.table_borders), &benchmark_rows(bench))
            )
            .map_err(fmt_err)?;

            if self.options.verbose_mode {
                for timing in bench.resolvers.iter().filter(|t| !t.failures.is_empty()) {
                    for failure in &timing.failures {
                        writeln!(output, "  {} {}: {}", timing.resolver, failure.domain, failure.kind.label())
                            .map_err(fmt_err)?;
                    }
                }
            }
            if let Some(fastest) = bench.fastest() {
                writeln!(output, "Fastest: {} ({})", fastest.resolver, fastest.latency.format_mean())
                    .map_err(fmt_err)?;
            }
        }

        write!(output, "{}", self.status_line(result)).map_err(fmt_err)?;
        Ok(output)
    }

    fn format_bulk_lookup(&self, result: &DiagnosticResult<BulkLookup>) -> Result<String> {
        let mut output = String::new();

        if let Some(bulk) = &result.payload {
            writeln!(
                output,
                "{}",
                self.create_table(&bulk_table(self.options.table_borders), &bulk_rows(bulk))
            )
            .map_err(fmt_err)?;
            writeln!(
                output,
                "{} names: {} resolved, {} failed",
                bulk.total, bulk.successful, bulk.failed
            )
            .map_err(fmt_err)?;
        }

        write!(output, "{}", self.status_line(result)).map_err(fmt_err)?;
        Ok(output)
    }

    fn format_dns_info(&self, result: &DiagnosticResult<DnsInfo>) -> Result<String> {
        let mut output = String::new();

        if let Some(info) = &result.payload {
            writeln!(output, "DNS information for {}", info.name).map_err(fmt_err)?;
            writeln!(output, "IPv4:").map_err(fmt_err)?;
            for ip in &info.ipv4 {
                writeln!(output, "  {}", ip).map_err(fmt_err)?;
            }
            writeln!(output, "IPv6:").map_err(fmt_err)?;
            for ip in &info.ipv6 {
                writeln!(output, "  {}", ip).map_err(fmt_err)?;
            }
            writeln!(output, "Reverse:").map_err(fmt_err)?;
            for entry in &info.reverse {
                let names = match entry.error {
                    None => entry.hostnames.join(", "),
                    Some(kind) => format!("({})", kind.label()),
                };
                writeln!(output, "  {} -> {}", entry.address, names).map_err(fmt_err)?;
            }
        }

        write!(output, "{}", self.status_line(result)).map_err(fmt_err)?;
        Ok(output)
    }

    fn format_local_ip(&self, result: &DiagnosticResult<LocalIpInfo>) -> Result<String> {
        match &result.payload {
            Some(info) => Ok(format!("Local IP: {} ({})", info.address, info.method)),
            None => Ok(self.status_line(result)),
        }
    }

    fn format_public_ip(&self, result: &DiagnosticResult<PublicIpInfo>) -> Result<String> {
        let mut output = String::new();
        match &result.payload {
            Some(info) => {
                write!(output, "Public IP: {} (via {})", info.address, info.service).map_err(fmt_err)?;
                if self.options.verbose_mode {
                    for error in &info.errors {
                        write!(output, "\n  skipped {}", error).map_err(fmt_err)?;
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
            let table = interface_table(self.options.table_borders);
            writeln!(output, "{}", self.create_table(&table, &interface_rows(interfaces))).map_err(fmt_err)?;
            let active = interfaces.iter().filter(|i| i.is_active()).count();
            writeln!(output, "{} interfaces, {} active", interfaces.len(), active).map_err(fmt_err)?;
        }

        write!(output, "{}", self.status_line(result)).map_err(fmt_err)?;
        Ok(output)
    }

    fn format_gateway(&self, result: &DiagnosticResult<GatewayInfo>) -> Result<String> {
        match &result.payload {
            Some(gateway) => Ok(gateway_line(gateway)),
            None => Ok(self.status_line(result)),
        }
    }

    fn format_network_config(&self, result: &DiagnosticResult<NetworkConfig>) -> Result<String> {
        let mut output = String::new();

        if let Some(config) = &result.payload {
            writeln!(output, "Network configuration").map_err(fmt_err)?;
            let table = interface_table(self.options.table_borders);
            writeln!(output, "{}", self.create_table(&table, &interface_rows(&config.interfaces))).map_err(fmt_err)?;
            writeln!(
                output,
                "Interfaces: {} total, {} active, primary {}",
                config.total_interfaces,
                config.active_interfaces,
                config.primary_interface.as_deref().unwrap_or("none")
            )
            .map_err(fmt_err)?;
            match &config.gateway {
                Some(gateway) => writeln!(output, "{}", gateway_line(gateway)).map_err(fmt_err)?,
                None => writeln!(output, "Default gateway: none").map_err(fmt_err)?,
            }
            let yes_no = |ok: bool| if ok { "yes" } else { "no" };
            writeln!(output, "DNS working: {}", yes_no(config.dns_working)).map_err(fmt_err)?;
            writeln!(output, "Internet connectivity: {}", yes_no(config.internet_connectivity)).map_err(fmt_err)?;
            for issue in &config.issues {
                writeln!(output, "Issue: {}", issue).map_err(fmt_err)?;
            }
            for advice in &config.recommendations {
                writeln!(output, "  - {}", advice).map_err(fmt_err)?;
            }
        }

        write!(output, "{}", self.status_line(result)).map_err(fmt_err)?;
        Ok(output)
    }

    fn format_bandwidth(&self, result: &DiagnosticResult<BandwidthReport>) -> Result<String> {
        let mut output = String::new();

        if let Some(report) = &result.payload {
            writeln!(output, "Bandwidth test via {}", report.url).map_err(fmt_err)?;
            writeln!(output, "{}", bandwidth_line(report)).map_err(fmt_err)?;
            if self.options.verbose_mode {
                for error in &report.errors {
                    writeln!(output, "  skipped {}", error).map_err(fmt_err)?;
                }
            }
        }

        write!(output, "{}", self.status_line(result)).map_err(fmt_err)?;
        Ok(output)
    }

    fn format_error(&self, error: &str) -> Result<String> {
        Ok(format!("ERROR: {}", error))
    }

    fn format_warning(&self, warning: &str) -> Result<String> {
        Ok(format!("WARNING: {}", warning))
    }

    fn format_success(&self, message: &str) -> Result<String> {
        Ok(format!("SUCCESS: {}", message))
    }
}

//! Well-known ports, port list parsing and duration formatting

use crate::error::{AppError, Result};
use std::time::Duration;

/// Ports probed by a common-ports scan, with their usual service
pub const COMMON_PORTS: &[(u16, &str)] = &[
    (21, "FTP"),
    (22, "SSH"),
    (23, "Telnet"),
    (25, "SMTP"),
    (53, "DNS"),
    (80, "HTTP"),
    (110, "POP3"),
    (135, "RPC"),
    (139, "NetBIOS"),
    (143, "IMAP"),
    (443, "HTTPS"),
    (445, "SMB"),
    (465, "SMTP-SSL"),
    (587, "SMTP-TLS"),
    (993, "IMAPS"),
    (995, "POP3S"),
    (1433, "MSSQL"),
    (3306, "MySQL"),
    (3389, "RDP"),
    (5432, "PostgreSQL"),
    (5900, "VNC"),
    (6379, "Redis"),
    (8080, "HTTP-Alt"),
    (8443, "HTTPS-Alt"),
    (27017, "MongoDB"),
];

/// Named in results but not part of the common scan
const OTHER_SERVICES: &[(u16, &str)] = &[(67, "DHCP"), (68, "DHCP"), (69, "TFTP"), (123, "NTP"), (161, "SNMP")];

/// Port numbers of [`COMMON_PORTS`]
pub fn common_ports() -> Vec<u32> {
    COMMON_PORTS.iter().map(|&(port, _)| u32::from(port)).collect()
}

/// Conventional service name for a port, if it has one
pub fn service_name(port: u16) -> Option<&'static str> {
    COMMON_PORTS
        .iter()
        .chain(OTHER_SERVICES)
        .find(|&&(p, _)| p == port)
        .map(|&(_, name)| name)
}

/// Parse `22,80,8000-8010` style port lists.
///
/// Values are returned unchecked against 1-65535 so the engine reports range
/// errors uniformly; only syntax is checked here.
pub fn parse_port_spec(spec: &str) -> Result<Vec<u32>> {
    let mut ports = Vec::new();

    for part in spec.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        match part.split_once('-') {
            Some((start, end)) => {
                let start = parse_port_number(start)?;
                let end = parse_port_number(end)?;
                if start > end {
                    return Err(AppError::validation(format!(
                        "port range {} starts after it ends",
                        part
                    )));
                }
                if end - start > u32::from(u16::MAX) {
                    return Err(AppError::validation(format!("port range {} is too large", part)));
                }
                ports.extend(start..=end);
            }
            None => ports.push(parse_port_number(part)?),
        }
    }

    if ports.is_empty() {
        return Err(AppError::validation(format!("no ports in '{}'", spec)));
    }
    Ok(ports)
}

fn parse_port_number(text: &str) -> Result<u32> {
    text.trim()
        .parse::<u32>()
        .map_err(|_| AppError::validation(format!("'{}' is not a port number", text.trim())))
}

/// Human readable duration: `12.3ms`, `4.20s`, `2m 5.0s`, `1h 3m`
pub fn format_duration(duration: Duration) -> String {
    let seconds = duration.as_secs_f64();
    if seconds < 1.0 {
        format!("{:.1}ms", seconds * 1000.0)
    } else if seconds < 60.0 {
        format!("{:.2}s", seconds)
    } else if seconds < 3600.0 {
        let minutes = (seconds / 60.0).floor();
        format!("{}m {:.1}s", minutes as u64, seconds - minutes * 60.0)
    } else {
        let total = duration.as_secs();
        format!("{}h {}m", total / 3600, (total % 3600) / 60)
    }
}

//! Local and public address discovery, interfaces and the default route

use crate::error::{AppError, Result};
use crate::models::metrics::LatencyStats;
use crate::models::results::{GatewayInfo, InterfaceInfo, InterfaceKind, LocalIpInfo, NetworkConfig, PublicIpInfo};
use reqwest::Client;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;
use tokio::net::UdpSocket;

/// Well-known address used only to pick a route; no packet is sent
const ROUTE_PROBE_ADDR: SocketAddr = SocketAddr::new(IpAddr::V4(Ipv4Addr::new(8, 8, 8, 8)), 80);

/// Address of the interface the OS would use for outbound traffic.
///
/// Connecting a UDP socket only selects a route, so nothing leaves the host.
pub async fn local_ip() -> Result<LocalIpInfo> {
    let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0)).await?;
    socket
        .connect(ROUTE_PROBE_ADDR)
        .await
        .map_err(|e| AppError::network(format!("no route for outbound traffic: {}", e)))?;
    let address = socket.local_addr()?.ip();

    if address.is_unspecified() {
        return Err(AppError::network("no outbound interface has an address"));
    }

    Ok(LocalIpInfo {
        address,
        method: "udp-route".to_string(),
    })
}

/// Pull an address out of an echo service body: a JSON object with an `ip`
/// or `origin` key, or the bare address as plain text.
pub fn extract_ip(body: &str) -> Option<IpAddr> {
    let body = body.trim();
    if let Ok(json) = serde_json::from_str::<serde_json::Value>(body) {
        let value = json.get("ip").or_else(|| json.get("origin"))?.as_str()?;
        // httpbin-style origins may list proxies after the client address
        return value.split(',').next()?.trim().parse().ok();
    }
    body.parse().ok()
}

async fn query_service(client: &Client, service: &str, timeout: Duration) -> Result<IpAddr> {
    let response = client.get(service).timeout(timeout).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(AppError::http_request(format!("HTTP {}", status)));
    }

    let body = response.text().await?;
    extract_ip(&body).ok_or_else(|| AppError::parse("response did not contain an IP address"))
}

/// Ask each service in order and return the first address one reports.
/// Failures of earlier services are kept in `errors`.
pub async fn public_ip(client: &Client, services: &[String], timeout: Duration) -> Result<PublicIpInfo> {
    if services.is_empty() {
        return Err(AppError::validation("at least one public IP service is required"));
    }

    let mut errors = Vec::new();
    for service in services {
        match query_service(client, service, timeout).await {
            Ok(address) => {
                return Ok(PublicIpInfo {
                    address,
                    service: service.clone(),
                    errors,
                })
            }
            Err(e) => errors.push(format!("{}: {}", service, e)),
        }
    }

    Err(AppError::network(format!(
        "no public IP service answered ({})",
        errors.join("; ")
    )))
}

/// Every interface the OS reports, in OS order
pub fn interfaces() -> Vec<InterfaceInfo> {
    pnet::datalink::interfaces()
        .iter()
        .map(|iface| InterfaceInfo {
            name: iface.name.clone(),
            index: iface.index,
            mac: iface.mac.filter(|mac| !mac.is_zero()).map(|mac| mac.to_string()),
            networks: iface.ips.iter().map(|net| net.to_string()).collect(),
            addresses: iface.ips.iter().map(|net| net.ip()).collect(),
            is_up: iface.is_up(),
            is_loopback: iface.is_loopback(),
            kind: if iface.is_loopback() {
                InterfaceKind::Loopback
            } else {
                InterfaceKind::from_name(&iface.name)
            },
        })
        .collect()
}

const RTF_UP: u32 = 0x1;
const RTF_GATEWAY: u32 = 0x2;

/// Default route from the Linux `/proc/net/route` table. Addresses are
/// little-endian hex; the lowest metric wins when several defaults exist.
pub fn parse_proc_route(table: &str) -> Option<GatewayInfo> {
    table
        .lines()
        .skip(1)
        .filter_map(|line| {
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() < 7 || fields[1] != "00000000" {
                return None;
            }
            let gateway = u32::from_str_radix(fields[2], 16).ok()?;
            let flags = u32::from_str_radix(fields[3], 16).ok()?;
            let metric: u32 = fields[6].parse().ok()?;
            if flags & (RTF_UP | RTF_GATEWAY) != RTF_UP | RTF_GATEWAY || gateway == 0 {
                return None;
            }
            Some((metric, fields[0], Ipv4Addr::from(gateway.to_le_bytes())))
        })
        .min_by_key(|&(metric, _, _)| metric)
        .map(|(_, iface, address)| GatewayInfo {
            address: IpAddr::V4(address),
            interface: Some(iface.to_string()),
        })
}

/// Default route from the BSD `route -n get default` report
pub fn parse_route_get(report: &str) -> Option<GatewayInfo> {
    let field = |key: &str| {
        report.lines().find_map(|line| {
            let (name, value) = line.trim().split_once(':')?;
            (name.trim() == key).then(|| value.trim().to_string())
        })
    };
    let address = field("gateway")?.parse().ok()?;
    Some(GatewayInfo {
        address,
        interface: field("interface"),
    })
}

/// Next hop of the IPv4 default route; `None` when there is none
pub async fn default_gateway() -> Result<Option<GatewayInfo>> {
    if cfg!(target_os = "linux") {
        let table = tokio::fs::read_to_string("/proc/net/route").await?;
        return Ok(parse_proc_route(&table));
    }
    if cfg!(any(target_os = "macos", target_os = "freebsd", target_os = "openbsd")) {
        let output = tokio::process::Command::new("route")
            .args(["-n", "get", "default"])
            .output()
            .await?;
        if !output.status.success() {
            return Ok(None);
        }
        return Ok(parse_route_get(&String::from_utf8_lossy(&output.stdout)));
    }
    Err(AppError::internal("default route lookup is not supported on this platform"))
}

/// Fold the individual checks into one report with issues and advice
pub fn summarize_config(
    interfaces: Vec<InterfaceInfo>,
    gateway: Option<GatewayInfo>,
    dns_working: bool,
    connectivity: Option<LatencyStats>,
) -> NetworkConfig {
    let active: Vec<&InterfaceInfo> = interfaces.iter().filter(|i| i.is_active()).collect();
    let active_interfaces = active.len();
    let primary_interface = active.first().map(|i| i.name.clone());
    let internet_connectivity = connectivity.as_ref().is_some_and(|stats| stats.has_responses());

    let mut issues = Vec::new();
    let mut recommendations = Vec::new();
    let mut flag = |issue: &str, advice: &str| {
        issues.push(issue.to_string());
        recommendations.push(advice.to_string());
    };
    if gateway.is_none() {
        flag("No default gateway found", "Check network configuration and router connection");
    }
    if !dns_working {
        flag("DNS resolution not working", "Check DNS server configuration");
    }
    if !internet_connectivity {
        flag("No internet connectivity", "Check internet connection and firewall settings");
    }
    if active_interfaces == 0 {
        flag("No active network interfaces", "Check network adapter drivers and connections");
    }
    if active_interfaces > 3 {
        recommendations.push("Consider disabling unused network interfaces".to_string());
    }

    NetworkConfig {
        total_interfaces: interfaces.len(),
        active_interfaces,
        primary_interface,
        interfaces,
        gateway,
        dns_working,
        internet_connectivity,
        connectivity,
        issues,
        recommendations,
    }
}

//! Scripted prober for unit tests

use super::{Answer, DnsAnswer, HopProbe, Prober, ReverseAnswer, TcpProbe};
use crate::error::{AppError, DiagnosticError, ErrorKind, Result};
use crate::models::{
    metrics::ProbeSample,
    results::{DnsRecord, GatewayInfo, InterfaceInfo, InterfaceKind},
};
use crate::types::{PortStatus, RecordType, ResolverSelection, Target};
use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap};
use std::net::{IpAddr, SocketAddr};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

fn ms(value: u64) -> Duration {
    Duration::from_millis(value)
}

/// Every primitive answers from a script and bumps a shared call counter
#[derive(Default)]
pub struct MockProber {
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
    /// Echo round trips, cycled per call; `None` is a lost probe
    echo_script: Vec<Option<u64>>,
    echo_error: Option<ErrorKind>,
    hosts: HashMap<String, IpAddr>,
    records: HashMap<(String, RecordType), std::result::Result<Vec<DnsRecord>, ErrorKind>>,
    /// Per-server latency for DNS calls
    server_latency: HashMap<String, u64>,
    ptr: HashMap<IpAddr, Vec<String>>,
    open_ports: BTreeSet<u16>,
    filtered_ports: BTreeSet<u16>,
    tcp_delay: Option<Duration>,
    /// Responder per TTL; past the end the destination answers
    path: Vec<Option<IpAddr>>,
    ttl_error: Option<ErrorKind>,
    /// TTL at which the responder reports the destination unreachable
    unreachable_at: Option<u8>,
    seen_ttls: Mutex<Vec<u8>>,
    resolve_timeouts: Mutex<Vec<Duration>>,
    interfaces: Vec<InterfaceInfo>,
    gateway: Option<GatewayInfo>,
}

impl MockProber {
    pub fn new() -> Self {
        Self {
            echo_script: vec![Some(10)],
            ..Self::default()
        }
    }

    pub fn with_echo(mut self, script: Vec<Option<u64>>) -> Self {
        self.echo_script = script;
        self
    }

    pub fn with_echo_error(mut self, kind: ErrorKind) -> Self {
        self.echo_error = Some(kind);
        self
    }

    pub fn with_host(mut self, name: &str, ip: &str) -> Self {
        self.hosts.insert(name.to_string(), ip.parse().expect("test ip"));
        self
    }

    pub fn with_records(mut self, name: &str, record_type: RecordType, records: Vec<DnsRecord>) -> Self {
        self.records.insert((name.to_string(), record_type), Ok(records));
        self
    }

    pub fn with_dns_error(mut self, name: &str, record_type: RecordType, kind: ErrorKind) -> Self {
        self.records.insert((name.to_string(), record_type), Err(kind));
        self
    }

    pub fn with_server_latency(mut self, server: &str, millis: u64) -> Self {
        self.server_latency.insert(server.to_string(), millis);
        self
    }

    pub fn with_ptr(mut self, ip: &str, names: &[&str]) -> Self {
        self.ptr.insert(
            ip.parse().expect("test ip"),
            names.iter().map(|n| n.to_string()).collect(),
        );
        self
    }

    pub fn with_open_ports(mut self, ports: &[u16]) -> Self {
        self.open_ports.extend(ports);
        self
    }

    pub fn with_filtered_ports(mut self, ports: &[u16]) -> Self {
        self.filtered_ports.extend(ports);
        self
    }

    pub fn with_tcp_delay(mut self, delay: Duration) -> Self {
        self.tcp_delay = Some(delay);
        self
    }

    pub fn with_path(mut self, path: Vec<Option<&str>>) -> Self {
        self.path = path
            .into_iter()
            .map(|hop| hop.map(|ip| ip.parse().expect("test ip")))
            .collect();
        self
    }

    pub fn with_ttl_error(mut self, kind: ErrorKind) -> Self {
        self.ttl_error = Some(kind);
        self
    }

    /// Up interface; `address` of `None` leaves it unconfigured
    pub fn with_interface(mut self, name: &str, address: Option<&str>) -> Self {
        let addresses: Vec<IpAddr> = address.into_iter().map(|a| a.parse().expect("test ip")).collect();
        self.interfaces.push(InterfaceInfo {
            name: name.to_string(),
            index: self.interfaces.len() as u32 + 1,
            mac: None,
            networks: addresses.iter().map(|a| format!("{}/24", a)).collect(),
            addresses,
            is_up: true,
            is_loopback: name.starts_with("lo"),
            kind: InterfaceKind::from_name(name),
        });
        self
    }

    pub fn with_gateway(mut self, address: &str, interface: &str) -> Self {
        self.gateway = Some(GatewayInfo {
            address: address.parse().expect("test ip"),
            interface: Some(interface.to_string()),
        });
        self
    }

    pub fn with_unreachable_at(mut self, ttl: u8) -> Self {
        self.unreachable_at = Some(ttl);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    pub fn seen_ttls(&self) -> Vec<u8> {
        self.seen_ttls.lock().expect("ttl log").clone()
    }

    /// Timeouts passed to hostname resolution, in call order
    pub fn resolve_timeouts(&self) -> Vec<Duration> {
        self.resolve_timeouts.lock().expect("resolve log").clone()
    }

    fn record_call(&self) -> usize {
        self.calls.fetch_add(1, Ordering::SeqCst)
    }
}

#[async_trait]
impl Prober for MockProber {
    async fn resolve(&self, target: &Target, _resolver: &ResolverSelection, timeout: Duration) -> Result<IpAddr> {
        if let Some(ip) = target.ip() {
            return Ok(ip);
        }
        self.record_call();
        self.resolve_timeouts.lock().expect("resolve log").push(timeout);
        self.hosts
            .get(target.as_str())
            .copied()
            .ok_or_else(|| AppError::resolution_failed(format!("unknown host {}", target)))
    }

    async fn echo(&self, _address: IpAddr, timeout: Duration) -> ProbeSample {
        let index = self.record_call();
        if let Some(kind) = self.echo_error {
            return ProbeSample::failure(kind, Duration::ZERO);
        }
        match self.echo_script[index % self.echo_script.len()] {
            Some(rtt) => ProbeSample::success(ms(rtt)),
            None => ProbeSample::failure(ErrorKind::Unreachable, timeout),
        }
    }

    async fn dns(&self, name: &str, record_type: RecordType, resolver: &ResolverSelection, _timeout: Duration) -> DnsAnswer {
        self.record_call();
        let elapsed = ms(self.server_latency.get(&resolver.name()).copied().unwrap_or(5));
        match self.records.get(&(name.to_string(), record_type)) {
            Some(Ok(records)) => Answer::ok(records.clone(), elapsed),
            Some(Err(kind)) => Answer::err(DiagnosticError::new(*kind, format!("{} {}", record_type, name)), elapsed),
            None => Answer::err(
                DiagnosticError::new(ErrorKind::NameNotFound, format!("{} does not exist", name)),
                elapsed,
            ),
        }
    }

    async fn reverse_dns(&self, address: IpAddr, _resolver: &ResolverSelection, _timeout: Duration) -> ReverseAnswer {
        self.record_call();
        match self.ptr.get(&address) {
            Some(names) => Answer::ok(names.clone(), ms(3)),
            None => Answer::err(DiagnosticError::new(ErrorKind::NoPtrRecord, address.to_string()), ms(3)),
        }
    }

    async fn tcp_connect(&self, addr: SocketAddr, timeout: Duration, grab_banner: bool) -> TcpProbe {
        self.record_call();
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);

        if let Some(delay) = self.tcp_delay {
            tokio::time::sleep(delay).await;
        } else {
            tokio::task::yield_now().await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let port = addr.port();
        if self.open_ports.contains(&port) {
            TcpProbe {
                sample: ProbeSample::success(ms(1)),
                status: PortStatus::Open,
                banner: grab_banner.then(|| format!("hello from {}", port)),
            }
        } else if self.filtered_ports.contains(&port) {
            TcpProbe {
                sample: ProbeSample::timeout(timeout),
                status: PortStatus::Filtered,
                banner: None,
            }
        } else {
            TcpProbe {
                sample: ProbeSample::failure(ErrorKind::ConnectionRefused, ms(1)),
                status: PortStatus::Closed,
                banner: None,
            }
        }
    }

    async fn ttl(&self, address: IpAddr, ttl: u8, timeout: Duration) -> HopProbe {
        self.record_call();
        self.seen_ttls.lock().expect("ttl log").push(ttl);
        if let Some(kind) = self.ttl_error {
            return HopProbe::silent(ProbeSample::failure(kind, Duration::ZERO));
        }

        let sample = ProbeSample::success(ms(u64::from(ttl) * 2));
        match self.path.get(usize::from(ttl) - 1) {
            Some(Some(router)) => HopProbe {
                unreachable: self.unreachable_at == Some(ttl),
                ..HopProbe::answered(sample, *router, *router == address)
            },
            Some(None) => HopProbe::silent(ProbeSample::timeout(timeout)),
            None => HopProbe::answered(sample, address, true),
        }
    }

    async fn interfaces(&self) -> Result<Vec<InterfaceInfo>> {
        Ok(self.interfaces.clone())
    }

    async fn default_gateway(&self) -> Result<Option<GatewayInfo>> {
        Ok(self.gateway.clone())
    }
}

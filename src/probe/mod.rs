//! Probe primitives: exactly one network operation each, with a bounded wait
//!
//! The [`Prober`] trait is the seam between the aggregators and the network.
//! [`SystemProber`] talks to real sockets and resolvers; tests substitute a
//! recording mock.

pub mod icmp;
pub mod tcp;

#[cfg(test)]
pub(crate) mod mock;

pub use tcp::TcpProbe;

use crate::{
    dns::DnsManager,
    error::{AppError, DiagnosticError, ErrorKind, Result},
    models::{
        metrics::ProbeSample,
        results::{DnsRecord, GatewayInfo, InterfaceInfo},
    },
    netinfo,
    types::{RecordType, ResolverSelection, Target},
};
use async_trait::async_trait;
use icmp::{IcmpOutcome, IcmpReply};
use std::{
    net::{IpAddr, SocketAddr},
    time::{Duration, Instant},
};

/// Timed outcome of a probe that also produces a value
#[derive(Debug, Clone, PartialEq)]
pub struct Answer<T> {
    pub elapsed: Duration,
    pub outcome: std::result::Result<T, DiagnosticError>,
}

impl<T> Answer<T> {
    pub fn ok(value: T, elapsed: Duration) -> Self {
        Self {
            elapsed,
            outcome: Ok(value),
        }
    }

    pub fn err(error: DiagnosticError, elapsed: Duration) -> Self {
        Self {
            elapsed,
            outcome: Err(error),
        }
    }

    /// The bare sample, for aggregation
    pub fn sample(&self) -> ProbeSample {
        match &self.outcome {
            Ok(_) => ProbeSample::success(self.elapsed),
            Err(e) => ProbeSample::failure(e.kind, self.elapsed),
        }
    }
}

pub type DnsAnswer = Answer<Vec<DnsRecord>>;
pub type ReverseAnswer = Answer<Vec<String>>;

/// Result of one hop-limited probe
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HopProbe {
    pub sample: ProbeSample,
    /// Router or destination that answered
    pub responder: Option<IpAddr>,
    /// The destination itself answered
    pub reached: bool,
    /// A router reported the destination unreachable
    pub unreachable: bool,
}

impl HopProbe {
    pub fn silent(sample: ProbeSample) -> Self {
        Self {
            sample,
            responder: None,
            reached: false,
            unreachable: false,
        }
    }

    /// Answer from `responder`; `reached` when that is the destination
    pub fn answered(sample: ProbeSample, responder: IpAddr, reached: bool) -> Self {
        Self {
            sample,
            responder: Some(responder),
            reached,
            unreachable: false,
        }
    }
}

/// Map an ICMP answer to a hop-limited probe towards `destination`
pub fn hop_from_outcome(destination: IpAddr, outcome: &IcmpOutcome) -> HopProbe {
    let reached = outcome.reply == IcmpReply::EchoReply || outcome.responder == destination;
    HopProbe {
        unreachable: !reached && matches!(outcome.reply, IcmpReply::Unreachable { .. }),
        ..HopProbe::answered(ProbeSample::success(outcome.elapsed), outcome.responder, reached)
    }
}

/// Single-shot network operations. Implementations never mutate shared state
/// and every call is independently retryable.
#[async_trait]
pub trait Prober: Send + Sync {
    /// Turn a target into one address; IP literals never touch the network
    async fn resolve(&self, target: &Target, resolver: &ResolverSelection, timeout: Duration) -> Result<IpAddr>;

    /// One echo request
    async fn echo(&self, address: IpAddr, timeout: Duration) -> ProbeSample;

    /// One forward query
    async fn dns(&self, name: &str, record_type: RecordType, resolver: &ResolverSelection, timeout: Duration) -> DnsAnswer;

    /// One PTR query
    async fn reverse_dns(&self, address: IpAddr, resolver: &ResolverSelection, timeout: Duration) -> ReverseAnswer;

    /// One TCP handshake attempt
    async fn tcp_connect(&self, addr: SocketAddr, timeout: Duration, grab_banner: bool) -> TcpProbe;

    /// One echo request with the given hop limit
    async fn ttl(&self, address: IpAddr, ttl: u8, timeout: Duration) -> HopProbe;

    /// Interfaces of this host
    async fn interfaces(&self) -> Result<Vec<InterfaceInfo>> {
        Ok(netinfo::interfaces())
    }

    /// Next hop of the default route, if there is one
    async fn default_gateway(&self) -> Result<Option<GatewayInfo>> {
        netinfo::default_gateway().await
    }
}

/// Prober backed by the operating system's sockets and resolvers
#[derive(Clone)]
pub struct SystemProber {
    dns: DnsManager,
}

impl SystemProber {
    pub fn new() -> Result<Self> {
        Ok(Self { dns: DnsManager::new()? })
    }

    pub fn with_dns(dns: DnsManager) -> Self {
        Self { dns }
    }
}

#[async_trait]
impl Prober for SystemProber {
    async fn resolve(&self, target: &Target, resolver: &ResolverSelection, timeout: Duration) -> Result<IpAddr> {
        if let Some(ip) = target.ip() {
            return Ok(ip);
        }

        let addresses = self
            .dns
            .resolve_host(target.as_str(), resolver, timeout)
            .await
            .map_err(|e| AppError::resolution_failed(format!("{} via {}: {}", target, resolver.name(), e.detail())))?;
        addresses
            .first()
            .copied()
            .ok_or_else(|| AppError::resolution_failed(format!("no addresses for {}", target)))
    }

    async fn echo(&self, address: IpAddr, timeout: Duration) -> ProbeSample {
        let start = Instant::now();
        match icmp::probe(address, None, timeout).await {
            Ok(outcome) => ProbeSample::success(outcome.elapsed),
            // No reply means the destination is unreachable from here
            Err(e) if e.kind() == ErrorKind::Timeout => ProbeSample::failure(ErrorKind::Unreachable, timeout),
            Err(e) => ProbeSample::failure(e.kind(), start.elapsed()),
        }
    }

    async fn dns(&self, name: &str, record_type: RecordType, resolver: &ResolverSelection, timeout: Duration) -> DnsAnswer {
        let start = Instant::now();
        match self.dns.query(name, record_type, resolver, timeout).await {
            Ok(records) => Answer::ok(records, start.elapsed()),
            Err(e) => Answer::err(e.into(), start.elapsed()),
        }
    }

    async fn reverse_dns(&self, address: IpAddr, resolver: &ResolverSelection, timeout: Duration) -> ReverseAnswer {
        let start = Instant::now();
        match self.dns.reverse(address, resolver, timeout).await {
            Ok(names) => Answer::ok(names, start.elapsed()),
            Err(e) => Answer::err(e.into(), start.elapsed()),
        }
    }

    async fn tcp_connect(&self, addr: SocketAddr, timeout: Duration, grab_banner: bool) -> TcpProbe {
        tcp::connect(addr, timeout, grab_banner).await
    }

    async fn ttl(&self, address: IpAddr, ttl: u8, timeout: Duration) -> HopProbe {
        let start = Instant::now();
        match icmp::probe(address, Some(ttl), timeout).await {
            Ok(outcome) => hop_from_outcome(address, &outcome),
            Err(e) if e.kind() == ErrorKind::Timeout => HopProbe::silent(ProbeSample::timeout(timeout)),
            Err(e) => HopProbe::silent(ProbeSample::failure(e.kind(), start.elapsed())),
        }
    }
}

//! DNS resolution against an explicitly selected resolver
//!
//! A fresh resolver is built for every call from the caller's
//! [`ResolverSelection`], with the resolver cache disabled, so two calls with
//! the same inputs see exactly what the upstream servers answer.

pub mod doh;


pub use doh::DoHClient;

use crate::{
    error::{AppError, Result},
    models::results::DnsRecord,
    types::{RecordType, ResolverSelection},
};
use reqwest::Client;
use std::{
    collections::HashSet,
    net::{IpAddr, SocketAddr},
    time::Duration,
};
use trust_dns_resolver::{
    config::{NameServerConfig, Protocol, ResolverConfig, ResolverOpts},
    error::{ResolveError, ResolveErrorKind},
    proto::{
        error::ProtoErrorKind,
        op::ResponseCode,
        rr::{RData, RecordType as WireRecordType},
    },
    system_conf, TokioAsyncResolver,
};

/// Strip the trailing root dot from a presentation-format name
pub fn normalize_name(name: &str) -> String {
    name.trim().trim_end_matches('.').to_string()
}

/// `in-addr.arpa` / `ip6.arpa` owner name for a PTR query
pub fn reverse_name(address: IpAddr) -> String {
    match address {
        IpAddr::V4(v4) => {
            let [a, b, c, d] = v4.octets();
            format!("{}.{}.{}.{}.in-addr.arpa", d, c, b, a)
        }
        IpAddr::V6(v6) => {
            let mut labels = Vec::with_capacity(34);
            for byte in v6.octets().iter().rev() {
                labels.push(format!("{:x}", byte & 0x0f));
                labels.push(format!("{:x}", byte >> 4));
            }
            labels.push("ip6".to_string());
            labels.push("arpa".to_string());
            labels.join(".")
        }
    }
}

fn wire_type(record_type: RecordType) -> WireRecordType {
    match record_type {
        RecordType::A => WireRecordType::A,
        RecordType::Aaaa => WireRecordType::AAAA,
        RecordType::Mx => WireRecordType::MX,
        RecordType::Ns => WireRecordType::NS,
        RecordType::Txt => WireRecordType::TXT,
        RecordType::Cname => WireRecordType::CNAME,
        RecordType::Ptr => WireRecordType::PTR,
    }
}

/// Convert one answer into our record shape
pub(crate) fn record_from_rdata(rdata: &RData) -> Option<DnsRecord> {
    match rdata {
        RData::A(_) | RData::AAAA(_) => match rdata.ip_addr()? {
            IpAddr::V4(v4) => Some(DnsRecord::A(v4)),
            IpAddr::V6(v6) => Some(DnsRecord::Aaaa(v6)),
        },
        RData::MX(mx) => Some(DnsRecord::Mx {
            preference: mx.preference(),
            exchange: normalize_name(&mx.exchange().to_string()),
        }),
        RData::NS(ns) => Some(DnsRecord::Ns(normalize_name(&ns.to_string()))),
        RData::CNAME(cname) => Some(DnsRecord::Cname(normalize_name(&cname.to_string()))),
        RData::PTR(ptr) => Some(DnsRecord::Ptr(normalize_name(&ptr.to_string()))),
        RData::TXT(txt) => Some(DnsRecord::Txt(
            txt.txt_data()
                .iter()
                .map(|chunk| String::from_utf8_lossy(chunk).into_owned())
                .collect::<String>(),
        )),
        _ => None,
    }
}

/// Map a resolver failure onto the diagnostic taxonomy
pub(crate) fn classify_error(error: &ResolveError, name: &str, record_type: RecordType) -> AppError {
    match error.kind() {
        ResolveErrorKind::NoRecordsFound { response_code, .. } => match *response_code {
            ResponseCode::ServFail | ResponseCode::Refused => {
                AppError::resolver_unavailable(format!("resolver answered {} for {}", response_code, name))
            }
            _ if record_type == RecordType::Ptr => AppError::no_ptr_record(format!("no PTR record for {}", name)),
            ResponseCode::NXDomain => AppError::name_not_found(format!("{} does not exist (NXDOMAIN)", name)),
            _ => AppError::name_not_found(format!("no {} records for {}", record_type, name)),
        },
        ResolveErrorKind::Timeout => AppError::timeout(format!("{} lookup for {} timed out", record_type, name)),
        ResolveErrorKind::Proto(proto) if matches!(proto.kind(), ProtoErrorKind::Timeout) => {
            AppError::timeout(format!("{} lookup for {} timed out", record_type, name))
        }
        _ => AppError::resolver_unavailable(format!("{} lookup for {} failed: {}", record_type, name, error)),
    }
}

/// DNS query front-end that dispatches on the caller's resolver selection
#[derive(Clone)]
pub struct DnsManager {
    /// HTTP client for DoH requests
    http_client: Client,
}

impl DnsManager {
    /// Create a new DNS manager
    pub fn new() -> Result<Self> {
        let http_client = Client::builder()
            .user_agent(concat!("netdiag/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AppError::internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { http_client })
    }

    /// Use an existing HTTP client for DoH
    pub fn with_client(http_client: Client) -> Self {
        Self { http_client }
    }

    /// Build a resolver for one call. Caching is off and each server gets one
    /// attempt so the caller's timeout is the real bound.
    pub fn build_resolver(&self, selection: &ResolverSelection, timeout: Duration) -> Result<TokioAsyncResolver> {
        let (config, mut opts) = match selection {
            ResolverSelection::System => system_conf::read_system_conf()
                .map_err(|e| AppError::resolver_unavailable(format!("Failed to read system DNS config: {}", e)))?,
            ResolverSelection::Custom { servers } => {
                if servers.is_empty() {
                    return Err(AppError::validation("No DNS servers provided"));
                }

                let mut config = ResolverConfig::new();
                for &server in servers {
                    let socket_addr = SocketAddr::new(server, 53);
                    config.add_name_server(NameServerConfig::new(socket_addr, Protocol::Udp));
                    // TCP fallback for truncated answers
                    config.add_name_server(NameServerConfig::new(socket_addr, Protocol::Tcp));
                }
                (config, ResolverOpts::default())
            }
            ResolverSelection::DoH { url } => {
                return Err(AppError::internal(format!("{} is served over HTTPS, not a stub resolver", url)));
            }
        };

        opts.timeout = timeout;
        opts.attempts = 1;
        opts.cache_size = 0;
        Ok(TokioAsyncResolver::tokio(config, opts))
    }

    fn doh(&self, url: &str) -> DoHClient {
        DoHClient::new(url.to_string(), self.http_client.clone())
    }

    /// One forward query of `record_type` for `name`
    pub async fn query(
        &self,
        name: &str,
        record_type: RecordType,
        selection: &ResolverSelection,
        timeout: Duration,
    ) -> Result<Vec<DnsRecord>> {
        if let ResolverSelection::DoH { url } = selection {
            return self.doh(url).query(name, record_type, timeout).await;
        }

        let resolver = self.build_resolver(selection, timeout)?;
        let lookup = tokio::time::timeout(timeout, resolver.lookup(name, wire_type(record_type)))
            .await
            .map_err(|_| AppError::timeout(format!("{} lookup for {} timed out after {:?}", record_type, name, timeout)))?
            .map_err(|e| classify_error(&e, name, record_type))?;

        let records: Vec<DnsRecord> = lookup
            .iter()
            .filter_map(record_from_rdata)
            .filter(|record| record.record_type() == record_type)
            .collect();

        if records.is_empty() {
            return Err(AppError::name_not_found(format!("no {} records for {}", record_type, name)));
        }
        Ok(records)
    }

    /// PTR names for an address
    pub async fn reverse(&self, address: IpAddr, selection: &ResolverSelection, timeout: Duration) -> Result<Vec<String>> {
        if let ResolverSelection::DoH { url } = selection {
            return self.doh(url).reverse(address, timeout).await;
        }

        let resolver = self.build_resolver(selection, timeout)?;
        let lookup = tokio::time::timeout(timeout, resolver.reverse_lookup(address))
            .await
            .map_err(|_| AppError::timeout(format!("PTR lookup for {} timed out after {:?}", address, timeout)))?
            .map_err(|e| classify_error(&e, &address.to_string(), RecordType::Ptr))?;

        let hostnames: Vec<String> = lookup.iter().map(|ptr| normalize_name(&ptr.to_string())).collect();
        if hostnames.is_empty() {
            return Err(AppError::no_ptr_record(format!("no PTR record for {}", address)));
        }
        Ok(hostnames)
    }

    /// Addresses for a hostname, IPv4 first.
    ///
    /// The system selection goes through the OS resolver (hosts file and
    /// all); explicit servers are asked for A then AAAA.
    pub async fn resolve_host(&self, name: &str, selection: &ResolverSelection, timeout: Duration) -> Result<Vec<IpAddr>> {
        let mut addresses: Vec<IpAddr> = match selection {
            ResolverSelection::System => {
                let lookup = tokio::time::timeout(timeout, tokio::net::lookup_host((name, 0)))
                    .await
                    .map_err(|_| AppError::timeout(format!("resolving {} timed out after {:?}", name, timeout)))?
                    .map_err(|e| AppError::resolution_failed(format!("could not resolve {}: {}", name, e)))?;
                lookup.map(|addr| addr.ip()).collect()
            }
            _ => {
                let mut found = Vec::new();
                let mut last_error = None;
                for record_type in [RecordType::A, RecordType::Aaaa] {
                    match self.query(name, record_type, selection, timeout).await {
                        Ok(records) => found.extend(records.iter().filter_map(DnsRecord::ip)),
                        Err(e) => last_error = Some(e),
                    }
                }
                if found.is_empty() {
                    return Err(last_error.unwrap_or_else(|| AppError::resolution_failed(format!("no addresses for {}", name))));
                }
                found
            }
        };

        let mut seen = HashSet::new();
        addresses.retain(|ip| seen.insert(*ip));
        addresses.sort_by_key(|ip| ip.is_ipv6());
        if addresses.is_empty() {
            return Err(AppError::resolution_failed(format!("no addresses for {}", name)));
        }
        Ok(addresses)
    }
}

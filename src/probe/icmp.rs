//! ICMP echo and hop-limited probes over socket2
//!
//! Sockets are blocking and run inside `spawn_blocking` so receive timestamps
//! are taken right after the kernel hands the packet over. RAW sockets are
//! tried first; plain echo falls back to unprivileged DGRAM ICMP sockets where
//! the platform offers them. Hop-limited probes need RAW sockets because
//! time-exceeded messages are not delivered to DGRAM ICMP sockets.

use crate::error::{AppError, Result};
use socket2::{Domain, Protocol, SockAddr, Socket, Type};
use std::mem::MaybeUninit;
use std::net::{IpAddr, SocketAddr};
use std::sync::atomic::{AtomicU16, Ordering};
use std::time::{Duration, Instant};

const ICMPV4_ECHO_REPLY: u8 = 0;
const ICMPV4_DEST_UNREACHABLE: u8 = 3;
const ICMPV4_ECHO_REQUEST: u8 = 8;
const ICMPV4_TIME_EXCEEDED: u8 = 11;

const ICMPV6_DEST_UNREACHABLE: u8 = 1;
const ICMPV6_TIME_EXCEEDED: u8 = 3;
const ICMPV6_ECHO_REQUEST: u8 = 128;
const ICMPV6_ECHO_REPLY: u8 = 129;

const IPV6_HEADER_LEN: usize = 40;
const PAYLOAD_LEN: usize = 56;

static SEQUENCE: AtomicU16 = AtomicU16::new(0);

/// What kind of ICMP message answered a probe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IcmpReply {
    EchoReply,
    TimeExceeded,
    Unreachable { code: u8 },
}

/// A parsed ICMP message that refers back to one of our echo requests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedReply {
    pub reply: IcmpReply,
    pub identifier: u16,
    pub sequence: u16,
}

/// Answer to one probe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IcmpOutcome {
    pub reply: IcmpReply,
    pub responder: IpAddr,
    pub elapsed: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SocketMode {
    Raw,
    /// Kernel rewrites the identifier; match on sequence only
    Dgram,
}

/// Send one echo request and wait for the echo reply.
///
/// `ttl` limits the hop count; with a TTL set, time-exceeded and unreachable
/// messages from intermediate routers are returned as outcomes too.
pub async fn probe(destination: IpAddr, ttl: Option<u8>, timeout: Duration) -> Result<IcmpOutcome> {
    tokio::task::spawn_blocking(move || probe_blocking(destination, ttl, timeout))
        .await
        .map_err(|e| AppError::internal(format!("spawn_blocking failed: {}", e)))?
}

fn next_ids() -> (u16, u16) {
    let identifier: u16 = rand::random();
    let sequence = SEQUENCE.fetch_add(1, Ordering::Relaxed);
    (identifier, sequence)
}

fn open_socket(destination: IpAddr, require_raw: bool) -> Result<(Socket, SocketMode)> {
    let (domain, protocol) = match destination {
        IpAddr::V4(_) => (Domain::IPV4, Protocol::ICMPV4),
        IpAddr::V6(_) => (Domain::IPV6, Protocol::ICMPV6),
    };

    match Socket::new(domain, Type::RAW, Some(protocol)) {
        Ok(socket) => Ok((socket, SocketMode::Raw)),
        Err(raw_error) if require_raw => Err(socket_error(raw_error)),
        Err(raw_error) => Socket::new(domain, Type::DGRAM, Some(protocol))
            .map(|socket| (socket, SocketMode::Dgram))
            .map_err(|_| socket_error(raw_error)),
    }
}

fn socket_error(error: std::io::Error) -> AppError {
    if error.kind() == std::io::ErrorKind::PermissionDenied {
        AppError::permission_denied(format!(
            "ICMP sockets need raw socket privileges (root or CAP_NET_RAW): {}",
            error
        ))
    } else {
        AppError::internal(format!("Failed to create ICMP socket: {}", error))
    }
}

fn probe_blocking(destination: IpAddr, ttl: Option<u8>, timeout: Duration) -> Result<IcmpOutcome> {
    let (socket, mode) = open_socket(destination, ttl.is_some())?;

    if let Some(ttl) = ttl {
        match destination {
            IpAddr::V4(_) => socket.set_ttl(u32::from(ttl)),
            IpAddr::V6(_) => socket.set_unicast_hops_v6(u32::from(ttl)),
        }
        .map_err(|e| AppError::internal(format!("Failed to set hop limit: {}", e)))?;
    }
    socket
        .set_write_timeout(Some(timeout))
        .map_err(|e| AppError::internal(format!("Failed to set timeout: {}", e)))?;

    let (identifier, sequence) = next_ids();
    let packet = match destination {
        IpAddr::V4(_) => build_echo_request_v4(identifier, sequence),
        IpAddr::V6(_) => build_echo_request_v6(identifier, sequence),
    };
    let target: SockAddr = SocketAddr::new(destination, 0).into();

    let start = Instant::now();
    socket.send_to(&packet, &target).map_err(|e| match e.kind() {
        std::io::ErrorKind::PermissionDenied => AppError::permission_denied(format!("Failed to send: {}", e)),
        _ => AppError::network(format!("Failed to send to {}: {}", destination, e)),
    })?;

    loop {
        let remaining = timeout
            .checked_sub(start.elapsed())
            .filter(|left| !left.is_zero())
            .ok_or_else(|| AppError::timeout(format!("no reply from {} within {:?}", destination, timeout)))?;
        socket
            .set_read_timeout(Some(remaining))
            .map_err(|e| AppError::internal(format!("Failed to set timeout: {}", e)))?;

        let mut buf = [MaybeUninit::<u8>::uninit(); 1500];
        let (len, from) = match socket.recv_from(&mut buf) {
            Ok(received) => received,
            Err(e) if matches!(e.kind(), std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut) => {
                return Err(AppError::timeout(format!("no reply from {} within {:?}", destination, timeout)));
            }
            Err(e) => return Err(AppError::network(format!("Failed to receive: {}", e))),
        };
        let elapsed = start.elapsed();
        // SAFETY: recv_from initialized the first `len` bytes
        let data: &[u8] = unsafe { std::slice::from_raw_parts(buf.as_ptr() as *const u8, len) };

        let parsed = match destination {
            IpAddr::V4(_) => parse_icmpv4(data),
            IpAddr::V6(_) => parse_icmpv6(data),
        };
        let Some(parsed) = parsed else {
            continue;
        };
        if parsed.sequence != sequence || (mode == SocketMode::Raw && parsed.identifier != identifier) {
            continue;
        }

        let responder = from.as_socket().map(|addr| addr.ip()).unwrap_or(destination);
        if ttl.is_none() && parsed.reply != IcmpReply::EchoReply {
            // Plain echo: routers reporting trouble count as unreachable
            if let IcmpReply::Unreachable { code } = parsed.reply {
                return Err(AppError::network(format!("{} reported destination unreachable (code {})", responder, code)));
            }
            continue;
        }

        return Ok(IcmpOutcome {
            reply: parsed.reply,
            responder,
            elapsed,
        });
    }
}

/// Build an ICMP Echo Request packet (type 8, code 0).
pub fn build_echo_request_v4(identifier: u16, sequence: u16) -> Vec<u8> {
    let mut packet = build_echo(ICMPV4_ECHO_REQUEST, identifier, sequence);
    let checksum = icmp_checksum(&packet);
    packet[2..4].copy_from_slice(&checksum.to_be_bytes());
    packet
}

/// Build an ICMPv6 Echo Request packet (type 128); the kernel fills the
/// checksum since it covers the IPv6 pseudo-header.
pub fn build_echo_request_v6(identifier: u16, sequence: u16) -> Vec<u8> {
    build_echo(ICMPV6_ECHO_REQUEST, identifier, sequence)
}

fn build_echo(kind: u8, identifier: u16, sequence: u16) -> Vec<u8> {
    let mut packet = vec![0u8; 8 + PAYLOAD_LEN];
    packet[0] = kind;
    packet[4..6].copy_from_slice(&identifier.to_be_bytes());
    packet[6..8].copy_from_slice(&sequence.to_be_bytes());
    for (i, byte) in packet[8..].iter_mut().enumerate() {
        *byte = i as u8;
    }
    packet
}

/// Compute ICMP checksum (RFC 1071).
pub fn icmp_checksum(data: &[u8]) -> u16 {
    let mut sum: u32 = 0;
    let mut chunks = data.chunks_exact(2);
    for pair in &mut chunks {
        sum += u32::from(u16::from_be_bytes([pair[0], pair[1]]));
    }
    if let [last] = chunks.remainder() {
        sum += u32::from(*last) << 8;
    }
    while sum >> 16 != 0 {
        sum = (sum & 0xffff) + (sum >> 16);
    }
    !(sum as u16)
}

fn echo_ids(icmp: &[u8]) -> Option<(u16, u16)> {
    if icmp.len() < 8 {
        return None;
    }
    Some((
        u16::from_be_bytes([icmp[4], icmp[5]]),
        u16::from_be_bytes([icmp[6], icmp[7]]),
    ))
}

fn ipv4_header_len(packet: &[u8]) -> Option<usize> {
    let first = *packet.first()?;
    if first >> 4 != 4 {
        return None;
    }
    let len = usize::from(first & 0x0f) * 4;
    (len >= 20 && packet.len() >= len).then_some(len)
}

/// Parse an ICMPv4 message, with or without the leading IP header.
///
/// Error messages (time exceeded, unreachable) are matched through the
/// embedded copy of our original echo request.
pub fn parse_icmpv4(data: &[u8]) -> Option<ParsedReply> {
    // ICMP types we care about never start with 0x4_, so a leading 4 nibble
    // means the kernel included the IP header
    let icmp = match ipv4_header_len(data) {
        Some(len) => &data[len..],
        None => data,
    };
    let kind = *icmp.first()?;

    match kind {
        ICMPV4_ECHO_REPLY => {
            let (identifier, sequence) = echo_ids(icmp)?;
            Some(ParsedReply {
                reply: IcmpReply::EchoReply,
                identifier,
                sequence,
            })
        }
        ICMPV4_TIME_EXCEEDED | ICMPV4_DEST_UNREACHABLE => {
            let inner = icmp.get(8..)?;
            let inner_icmp = inner.get(ipv4_header_len(inner)?..)?;
            if *inner_icmp.first()? != ICMPV4_ECHO_REQUEST {
                return None;
            }
            let (identifier, sequence) = echo_ids(inner_icmp)?;
            let reply = if kind == ICMPV4_TIME_EXCEEDED {
                IcmpReply::TimeExceeded
            } else {
                IcmpReply::Unreachable { code: icmp[1] }
            };
            Some(ParsedReply {
                reply,
                identifier,
                sequence,
            })
        }
        _ => None,
    }
}

/// Parse an ICMPv6 message (kernels never include the IPv6 header)
pub fn parse_icmpv6(data: &[u8]) -> Option<ParsedReply> {
    let kind = *data.first()?;

    match kind {
        ICMPV6_ECHO_REPLY => {
            let (identifier, sequence) = echo_ids(data)?;
            Some(ParsedReply {
                reply: IcmpReply::EchoReply,
                identifier,
                sequence,
            })
        }
        ICMPV6_TIME_EXCEEDED | ICMPV6_DEST_UNREACHABLE => {
            let inner_icmp = data.get(8 + IPV6_HEADER_LEN..)?;
            if *inner_icmp.first()? != ICMPV6_ECHO_REQUEST {
                return None;
            }
            let (identifier, sequence) = echo_ids(inner_icmp)?;
            let reply = if kind == ICMPV6_TIME_EXCEEDED {
                IcmpReply::TimeExceeded
            } else {
                IcmpReply::Unreachable { code: data[1] }
            };
            Some(ParsedReply {
                reply,
                identifier,
                sequence,
            })
        }
        _ => None,
    }
}

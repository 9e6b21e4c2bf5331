//! TCP connect probe with optional banner grab

use crate::defaults;
use crate::error::ErrorKind;
use crate::models::metrics::ProbeSample;
use crate::types::PortStatus;
use std::net::SocketAddr;
use std::time::{Duration, Instant};
use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;
use tokio::time::timeout;

const MAX_BANNER_LEN: usize = 256;

/// Outcome of one connection attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TcpProbe {
    pub sample: ProbeSample,
    pub status: PortStatus,
    pub banner: Option<String>,
}

/// Map a connect error onto port status and diagnostic kind.
///
/// A refusal is a definitive answer from the peer: the port is closed.
/// Anything else leaves the port filtered.
pub fn classify_connect_error(error: &std::io::Error) -> (PortStatus, ErrorKind) {
    use std::io::ErrorKind as Io;

    match error.kind() {
        Io::ConnectionRefused | Io::ConnectionReset => (PortStatus::Closed, ErrorKind::ConnectionRefused),
        Io::TimedOut => (PortStatus::Filtered, ErrorKind::Timeout),
        Io::PermissionDenied => (PortStatus::Filtered, ErrorKind::PermissionDenied),
        _ => (PortStatus::Filtered, ErrorKind::Unreachable),
    }
}

/// Attempt a full TCP handshake with `addr` within `connect_timeout`
pub async fn connect(addr: SocketAddr, connect_timeout: Duration, grab_banner: bool) -> TcpProbe {
    let start = Instant::now();

    match timeout(connect_timeout, TcpStream::connect(addr)).await {
        Ok(Ok(mut stream)) => {
            let elapsed = start.elapsed();
            let banner = if grab_banner {
                read_banner(&mut stream).await
            } else {
                None
            };
            TcpProbe {
                sample: ProbeSample::success(elapsed),
                status: PortStatus::Open,
                banner,
            }
        }
        Ok(Err(e)) => {
            let (status, kind) = classify_connect_error(&e);
            TcpProbe {
                sample: ProbeSample::failure(kind, start.elapsed()),
                status,
                banner: None,
            }
        }
        Err(_) => TcpProbe {
            sample: ProbeSample::timeout(connect_timeout),
            status: PortStatus::Filtered,
            banner: None,
        },
    }
}

/// Services such as SSH and SMTP greet first; wait briefly for that line
async fn read_banner(stream: &mut TcpStream) -> Option<String> {
    let mut buf = [0u8; MAX_BANNER_LEN];
    let read = timeout(defaults::BANNER_READ_TIMEOUT, stream.read(&mut buf)).await.ok()?.ok()?;
    if read == 0 {
        return None;
    }

    let text = String::from_utf8_lossy(&buf[..read]);
    let line = text.lines().next().unwrap_or_default().trim();
    (!line.is_empty()).then(|| line.to_string())
}

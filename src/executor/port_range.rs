//! Port-range aggregator: one connect probe per port over a bounded pool

use crate::diagnostics::PortScanOptions;
use crate::models::results::{PortResult, PortScanReport};
use crate::probe::{Prober, TcpProbe};
use crate::types::PortStatus;
use crate::utils::service_name;
use std::collections::BTreeMap;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

fn blank_result(port: u16) -> PortResult {
    let mut result = PortResult::indeterminate(port);
    result.service = service_name(port).map(str::to_string);
    result
}

/// Fold one probe into the port's entry
fn port_result(port: u16, probe: TcpProbe) -> PortResult {
    let mut result = PortResult::new(port, probe.status);
    result.service = service_name(port).map(str::to_string);
    result.banner = probe.banner;
    match probe.status {
        PortStatus::Open | PortStatus::Closed => result.response_ms = Some(probe.sample.elapsed_ms()),
        PortStatus::Filtered => result.error = probe.sample.error,
        PortStatus::Indeterminate => {}
    }
    result
}

/// Scan `ports` (already validated and deduplicated) on `address`.
///
/// The pool size is fixed for the whole scan. When the deadline passes,
/// in-flight probes are aborted and every unfinished port stays
/// `Indeterminate`.
pub async fn scan_ports(
    prober: Arc<dyn Prober>,
    address: IpAddr,
    ports: &[u16],
    options: &PortScanOptions,
) -> PortScanReport {
    let concurrency = options.concurrency.clamp(1, ports.len().max(1));
    let semaphore = Arc::new(Semaphore::new(concurrency));
    let mut results: BTreeMap<u16, PortResult> = ports.iter().map(|&port| (port, blank_result(port))).collect();

    let mut tasks = JoinSet::new();
    for &port in results.keys() {
        let prober = prober.clone();
        let semaphore = semaphore.clone();
        let timeout = options.timeout;
        let grab_banners = options.grab_banners;

        tasks.spawn(async move {
            // Acquire a pool slot before touching the network
            let _permit = semaphore.acquire_owned().await.ok()?;
            let probe = prober
                .tcp_connect(SocketAddr::new(address, port), timeout, grab_banners)
                .await;
            Some((port, probe))
        });
    }

    let deadline = tokio::time::sleep(options.deadline_for(ports.len()));
    tokio::pin!(deadline);
    let mut cancelled = false;

    loop {
        tokio::select! {
            joined = tasks.join_next() => match joined {
                Some(Ok(Some((port, probe)))) => {
                    results.insert(port, port_result(port, probe));
                }
                Some(_) => {}
                None => break,
            },
            _ = &mut deadline => {
                cancelled = true;
                tasks.abort_all();
                break;
            }
        }
    }

    PortScanReport {
        address,
        ports: results,
        concurrency,
        cancelled,
    }
}

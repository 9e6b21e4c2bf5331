//! Hop aggregator: TTL 1, 2, 3, ... one hop at a time

use crate::defaults;
use crate::diagnostics::TracerouteOptions;
use crate::error::ErrorKind;
use crate::models::results::{HopRecord, TraceRoute};
use crate::probe::Prober;
use crate::stats;
use std::net::IpAddr;

/// Hops discovered so far, plus the environment failure that stopped
/// probing, if any
#[derive(Debug, Clone, PartialEq)]
pub struct HopTrace {
    pub route: TraceRoute,
    pub aborted: Option<ErrorKind>,
}

/// Walk the path to `destination`.
///
/// Every TTL gets a record even when nothing answers, so hop indices are
/// contiguous from 1. Probing stops at the destination, at a router that
/// reports the destination unreachable, or after `max_hops`.
/// If every probe of the first hop fails for lack of privilege the walk stops
/// there, since later hops would fail the same way.
pub async fn trace_hops(prober: &dyn Prober, destination: IpAddr, options: &TracerouteOptions) -> HopTrace {
    let mut hops = Vec::with_capacity(usize::from(options.max_hops));
    let mut destination_reached = false;
    let mut unreachable_at = None;
    let mut aborted = None;

    for ttl in 1..=options.max_hops {
        let mut responder = None;
        let mut rtts = Vec::with_capacity(usize::from(options.probes_per_hop));
        let mut denied = 0u8;

        for _ in 0..options.probes_per_hop {
            let probe = prober.ttl(destination, ttl, options.timeout).await;
            if probe.sample.succeeded {
                rtts.push(probe.sample.elapsed_ms());
                responder = responder.or(probe.responder);
                destination_reached |= probe.reached;
                if probe.unreachable {
                    unreachable_at = Some(ttl);
                }
            } else if probe.sample.error == Some(ErrorKind::PermissionDenied) {
                denied += 1;
            }
        }

        let mut hop = HopRecord::silent(ttl);
        hop.address = responder;
        hop.round_trip_ms = stats::summarize(&rtts).map(|s| s.mean);
        hop.rtts_ms = rtts;

        if options.resolve_hostnames {
            if let Some(address) = responder {
                let lookup_timeout = options.timeout.min(defaults::HOP_NAME_TIMEOUT);
                let answer = prober.reverse_dns(address, &options.resolver, lookup_timeout).await;
                hop.hostname = answer.outcome.ok().and_then(|names| names.into_iter().next());
            }
        }
        hops.push(hop);

        if ttl == 1 && denied == options.probes_per_hop {
            aborted = Some(ErrorKind::PermissionDenied);
            break;
        }
        if destination_reached || unreachable_at.is_some() {
            break;
        }
    }

    HopTrace {
        route: TraceRoute {
            destination,
            max_hops: options.max_hops,
            destination_reached,
            unreachable_at,
            hops,
        },
        aborted,
    }
}

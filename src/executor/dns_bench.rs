//! DNS performance aggregator: one query per (domain, resolver) pair

use crate::models::metrics::{LatencyStats, ProbeSample};
use crate::models::results::{DnsBenchmark, QueryFailure, ResolverTiming};
use crate::probe::Prober;
use crate::stats;
use crate::types::{RecordType, ResolverSelection};
use futures::future::join_all;
use std::time::Duration;

async fn time_resolver(
    prober: &dyn Prober,
    resolver: &ResolverSelection,
    domains: &[String],
    record_type: RecordType,
    timeout: Duration,
) -> ResolverTiming {
    let mut samples: Vec<ProbeSample> = Vec::with_capacity(domains.len());
    let mut failures = Vec::new();

    // Sequential per resolver so queries do not queue behind each other
    for domain in domains {
        let answer = prober.dns(domain, record_type, resolver, timeout).await;
        if let Err(error) = &answer.outcome {
            failures.push(QueryFailure {
                domain: domain.clone(),
                kind: error.kind,
            });
        }
        samples.push(answer.sample());
    }

    ResolverTiming {
        resolver: resolver.name(),
        latency: LatencyStats::from_samples(&samples),
        failures,
    }
}

/// Time every resolver against every domain and rank them by mean latency.
/// Resolvers that never answered rank last.
pub async fn benchmark_resolvers(
    prober: &dyn Prober,
    domains: &[String],
    resolvers: &[ResolverSelection],
    record_type: RecordType,
    timeout: Duration,
) -> DnsBenchmark {
    let timings = resolvers
        .iter()
        .map(|resolver| time_resolver(prober, resolver, domains, record_type, timeout));
    let mut resolvers = join_all(timings).await;
    stats::rank_by_mean(&mut resolvers, |timing| timing.latency.mean_ms);

    DnsBenchmark {
        record_type,
        domains: domains.to_vec(),
        resolvers,
    }
}

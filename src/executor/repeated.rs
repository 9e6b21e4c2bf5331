//! Repeated-probe aggregator

use crate::diagnostics::PingOptions;
use crate::models::metrics::ProbeSample;
use futures::stream::{self, StreamExt};
use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, timeout_at, Instant};

/// How a run of identical probes is issued
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RepeatPlan {
    pub count: u32,
    pub interval: Duration,
    /// 1 issues probes strictly one after another
    pub parallelism: usize,
    pub probe_timeout: Duration,
    /// Wall clock cap for the whole run
    pub ceiling: Duration,
}

impl From<&PingOptions> for RepeatPlan {
    fn from(options: &PingOptions) -> Self {
        Self {
            count: options.count,
            interval: options.interval,
            parallelism: options.parallelism.max(1),
            probe_timeout: options.timeout,
            ceiling: options.ceiling(),
        }
    }
}

/// Issue `plan.count` probes and return one sample per probe.
///
/// Probes still outstanding when the ceiling passes are recorded as timeouts,
/// so the sample count always equals `plan.count`. Sample order carries no
/// meaning.
pub async fn run_repeated<F, Fut>(plan: RepeatPlan, probe: F) -> Vec<ProbeSample>
where
    F: Fn(u32) -> Fut,
    Fut: Future<Output = ProbeSample>,
{
    let now = Instant::now();
    let deadline = now.checked_add(plan.ceiling).unwrap_or_else(|| far_future(now));
    let parallelism = plan.parallelism.max(1);

    if parallelism == 1 {
        let mut samples = Vec::with_capacity(plan.count as usize);
        for seq in 0..plan.count {
            if seq > 0 && !plan.interval.is_zero() {
                sleep(plan.interval).await;
            }
            let sample = timeout_at(deadline, probe(seq))
                .await
                .unwrap_or_else(|_| ProbeSample::timeout(plan.probe_timeout));
            samples.push(sample);
        }
        return samples;
    }

    // Probes go out in waves of `parallelism`, one interval apart
    let probe = &probe;
    stream::iter(0..plan.count)
        .map(|seq| async move {
            let wave = seq / parallelism as u32;
            if wave > 0 && !plan.interval.is_zero() {
                sleep(plan.interval * wave).await;
            }
            timeout_at(deadline, probe(seq))
                .await
                .unwrap_or_else(|_| ProbeSample::timeout(plan.probe_timeout))
        })
        .buffer_unordered(parallelism)
        .collect()
        .await
}

/// Latest deadline the clock can represent, about thirty years out
fn far_future(now: Instant) -> Instant {
    now + Duration::from_secs(86_400 * 365 * 30)
}

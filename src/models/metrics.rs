//! Probe samples and the latency statistics derived from them

use crate::error::ErrorKind;
use crate::stats;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Outcome of one elementary probe.
///
/// Produced by a probe primitive and consumed by its aggregator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeSample {
    pub succeeded: bool,
    pub elapsed: Duration,
    pub error: Option<ErrorKind>,
}

impl ProbeSample {
    /// A probe that got its answer after `elapsed`
    pub fn success(elapsed: Duration) -> Self {
        Self {
            succeeded: true,
            elapsed,
            error: None,
        }
    }

    /// A probe that failed with `kind` after `elapsed`
    pub fn failure(kind: ErrorKind, elapsed: Duration) -> Self {
        Self {
            succeeded: false,
            elapsed,
            error: Some(kind),
        }
    }

    /// Shorthand for a probe that waited out its whole timeout
    pub fn timeout(timeout: Duration) -> Self {
        Self::failure(ErrorKind::Timeout, timeout)
    }

    pub fn elapsed_ms(&self) -> f64 {
        self.elapsed.as_secs_f64() * 1000.0
    }
}

/// Summary statistics over a run of probes against one target.
///
/// Timing fields are `None` when no probe succeeded; they are never zero
/// stand-ins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatencyStats {
    pub sent: u32,
    pub received: u32,
    /// (sent - received) / sent, in [0, 1]
    pub loss_ratio: f64,
    pub min_ms: Option<f64>,
    pub max_ms: Option<f64>,
    pub mean_ms: Option<f64>,
    /// Population standard deviation of successful round trips
    pub jitter_ms: Option<f64>,
    pub p95_ms: Option<f64>,
    /// Successful round trips in milliseconds
    pub rtts_ms: Vec<f64>,
}

impl LatencyStats {
    /// Fold samples into statistics. Order of samples does not matter.
    pub fn from_samples(samples: &[ProbeSample]) -> Self {
        let rtts: Vec<f64> = samples
            .iter()
            .filter(|s| s.succeeded)
            .map(|s| s.elapsed_ms())
            .collect();

        Self::from_rtts(samples.len() as u32, rtts)
    }

    /// Build from a sent count and the successful round trips in ms
    pub fn from_rtts(sent: u32, rtts_ms: Vec<f64>) -> Self {
        let received = rtts_ms.len() as u32;
        let summary = stats::summarize(&rtts_ms);

        Self {
            sent,
            received,
            loss_ratio: stats::loss_ratio(sent, received),
            min_ms: summary.as_ref().map(|s| s.min),
            max_ms: summary.as_ref().map(|s| s.max),
            mean_ms: summary.as_ref().map(|s| s.mean),
            jitter_ms: summary.as_ref().map(|s| s.std_dev),
            p95_ms: summary.as_ref().map(|s| s.p95),
            rtts_ms,
        }
    }

    /// Statistics for a run where nothing was sent
    pub fn empty() -> Self {
        Self::from_rtts(0, Vec::new())
    }

    pub fn packet_loss_percent(&self) -> f64 {
        self.loss_ratio * 100.0
    }

    pub fn has_responses(&self) -> bool {
        self.received > 0
    }

    /// Format mean latency for display
    pub fn format_mean(&self) -> String {
        match self.mean_ms {
            Some(mean) => format!("{:.2}ms", mean),
            None => "n/a".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    #[test]
    fn test_all_lost_yields_null_statistics() {
        let samples = vec![ProbeSample::timeout(ms(1000)); 4];
        let stats = LatencyStats::from_samples(&samples);

        assert_eq!(stats.sent, 4);
        assert_eq!(stats.received, 0);
        assert_eq!(stats.loss_ratio, 1.0);
        assert_eq!(stats.min_ms, None);
        assert_eq!(stats.max_ms, None);
        assert_eq!(stats.mean_ms, None);
        assert_eq!(stats.jitter_ms, None);
        assert_eq!(stats.p95_ms, None);
        assert_eq!(stats.format_mean(), "n/a");
    }

    #[test]
    fn test_partial_loss() {
        let samples = vec![
            ProbeSample::success(ms(10)),
            ProbeSample::timeout(ms(1000)),
            ProbeSample::success(ms(30)),
            ProbeSample::failure(ErrorKind::Unreachable, ms(2)),
        ];
        let stats = LatencyStats::from_samples(&samples);

        assert_eq!(stats.sent, 4);
        assert_eq!(stats.received, 2);
        assert!((stats.loss_ratio - 0.5).abs() < f64::EPSILON);
        assert!((stats.packet_loss_percent() - 50.0).abs() < 1e-9);
        assert_eq!(stats.min_ms, Some(10.0));
        assert_eq!(stats.max_ms, Some(30.0));
        assert_eq!(stats.mean_ms, Some(20.0));
        // population std dev of {10, 30}
        assert!((stats.jitter_ms.unwrap() - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_sample_order_does_not_matter() {
        let forward = vec![
            ProbeSample::success(ms(5)),
            ProbeSample::success(ms(7)),
            ProbeSample::timeout(ms(100)),
            ProbeSample::success(ms(12)),
        ];
        let mut reversed = forward.clone();
        reversed.reverse();

        let a = LatencyStats::from_samples(&forward);
        let b = LatencyStats::from_samples(&reversed);
        assert_eq!(a.loss_ratio, b.loss_ratio);
        assert_eq!(a.mean_ms, b.mean_ms);
        assert_eq!(a.jitter_ms, b.jitter_ms);
        assert_eq!(a.p95_ms, b.p95_ms);
    }

    #[test]
    fn test_empty_run() {
        let stats = LatencyStats::empty();
        assert_eq!(stats.sent, 0);
        assert_eq!(stats.loss_ratio, 1.0);
        assert!(!stats.has_responses());
    }
}

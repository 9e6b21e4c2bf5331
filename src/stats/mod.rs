//! Statistical helpers for probe aggregation
//!
//! Everything here is order independent: feeding the same values in any
//! order yields the same summary.

pub mod quality;


pub use quality::{QualityCalculator, QualityWeights};

use crate::utils::comparison::{fastest_first, safe_float_cmp};

/// Percentile reported alongside min/mean/max
pub const REPORTED_PERCENTILE: f64 = 95.0;

/// Summary of a non-empty set of measurements (milliseconds)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Summary {
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
    pub p95: f64,
}

/// Summarize measurements. Returns `None` for an empty slice so callers
/// cannot mistake "no data" for zero latency.
pub fn summarize(values: &[f64]) -> Option<Summary> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if sorted.is_empty() {
        return None;
    }
    sorted.sort_by(|a, b| safe_float_cmp(*a, *b));

    let count = sorted.len();
    let min = sorted[0];
    let max = sorted[count - 1];
    let raw_mean = sorted.iter().sum::<f64>() / count as f64;
    // Summation error can push the mean a hair outside the observed range
    let mean = raw_mean.clamp(min, max);

    Some(Summary {
        count,
        min,
        max,
        mean,
        std_dev: population_std_dev(&sorted, mean),
        p95: percentile(&sorted, REPORTED_PERCENTILE),
    })
}

/// Fraction of probes without an answer. A run that sent nothing counts as
/// fully lost.
pub fn loss_ratio(sent: u32, received: u32) -> f64 {
    if sent == 0 {
        return 1.0;
    }
    let received = received.min(sent);
    (sent - received) as f64 / sent as f64
}

/// Population standard deviation (divides by n, not n - 1)
pub fn population_std_dev(values: &[f64], mean: f64) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let variance = values.iter().map(|&x| (x - mean).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

/// Linear interpolation between closest ranks on an ascending slice.
pub fn percentile(sorted_values: &[f64], percentile: f64) -> f64 {
    if sorted_values.is_empty() {
        return 0.0;
    }

    let index = (percentile.clamp(0.0, 100.0) / 100.0) * (sorted_values.len() as f64 - 1.0);
    let lower_index = index.floor() as usize;
    let upper_index = index.ceil() as usize;

    if lower_index == upper_index {
        sorted_values[lower_index]
    } else {
        let lower_value = sorted_values[lower_index];
        let upper_value = sorted_values[upper_index];
        let weight = index - lower_index as f64;
        lower_value + weight * (upper_value - lower_value)
    }
}

/// Order items by a mean latency key, fastest first. Items without a mean
/// (nothing succeeded) sort last, keeping their relative order.
pub fn rank_by_mean<T, F>(items: &mut [T], mean_of: F)
where
    F: Fn(&T) -> Option<f64>,
{
    items.sort_by(|a, b| fastest_first(mean_of(a), mean_of(b)));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentile_calculation() {
        let values = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(percentile(&values, 50.0), 3.0);
        assert_eq!(percentile(&values, 0.0), 1.0);
        assert_eq!(percentile(&values, 100.0), 5.0);
        assert!((percentile(&values, 95.0) - 4.8).abs() < 1e-9);
    }

    #[test]
    fn test_summarize_empty_is_none() {
        assert!(summarize(&[]).is_none());
        assert!(summarize(&[f64::NAN]).is_none());
    }

    #[test]
    fn test_summarize_single_value() {
        let summary = summarize(&[12.5]).unwrap();
        assert_eq!(summary.count, 1);
        assert_eq!(summary.min, 12.5);
        assert_eq!(summary.max, 12.5);
        assert_eq!(summary.mean, 12.5);
        assert_eq!(summary.std_dev, 0.0);
        assert_eq!(summary.p95, 12.5);
    }

    #[test]
    fn test_population_std_dev() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        let summary = summarize(&values).unwrap();
        assert_eq!(summary.mean, 5.0);
        assert!((summary.std_dev - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_mean_clamped_to_range() {
        let values = [0.1, 0.1, 0.1];
        let summary = summarize(&values).unwrap();
        assert!(summary.mean <= summary.max);
        assert!(summary.mean >= summary.min);
    }

    #[test]
    fn test_loss_ratio_bounds() {
        assert_eq!(loss_ratio(4, 4), 0.0);
        assert_eq!(loss_ratio(4, 0), 1.0);
        assert_eq!(loss_ratio(4, 1), 0.75);
        assert_eq!(loss_ratio(0, 0), 1.0);
        assert_eq!(loss_ratio(2, 5), 0.0);
    }

    #[test]
    fn test_rank_by_mean_puts_failures_last() {
        let mut items = vec![("slow", Some(40.0)), ("dead", None), ("fast", Some(5.0))];
        rank_by_mean(&mut items, |item| item.1);
        let order: Vec<&str> = items.iter().map(|i| i.0).collect();
        assert_eq!(order, vec!["fast", "slow", "dead"]);
    }
}

//! Connection quality scoring
//!
//! score = W_latency * (1 - min(mean / LATENCY_CEILING, 1))
//!       + W_jitter  * (1 - min(jitter / JITTER_CEILING, 1))
//!       + W_loss    * (1 - loss_ratio)
//!
//! rounded and clamped to 0..=100. With the default weights (40/20/40) a
//! perfect link scores 100 and a link with no replies scores 0. Every term is
//! non-increasing in its input, so lower latency, jitter or loss never lowers
//! the score.

use crate::models::metrics::LatencyStats;
use crate::models::results::{QualityRating, QualityScore, ScoreBreakdown};
use serde::{Deserialize, Serialize};

/// Fixed weights and normalization ceilings for the score
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QualityWeights {
    pub latency: f64,
    pub jitter: f64,
    pub loss: f64,
    /// Mean latency at or beyond which the latency term is zero
    pub latency_ceiling_ms: f64,
    /// Jitter at or beyond which the jitter term is zero
    pub jitter_ceiling_ms: f64,
}

impl Default for QualityWeights {
    fn default() -> Self {
        Self {
            latency: 40.0,
            jitter: 20.0,
            loss: 40.0,
            latency_ceiling_ms: 500.0,
            jitter_ceiling_ms: 100.0,
        }
    }
}

/// Turns latency statistics into a 0-100 score, rating and advice
#[derive(Debug, Clone, Default)]
pub struct QualityCalculator {
    weights: QualityWeights,
}

impl QualityCalculator {
    pub fn new(weights: QualityWeights) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> &QualityWeights {
        &self.weights
    }

    /// Score breakdown for a latency run
    pub fn breakdown(&self, latency: &LatencyStats) -> ScoreBreakdown {
        let w = &self.weights;
        let (latency_points, jitter_points) = match (latency.mean_ms, latency.jitter_ms) {
            (Some(mean), Some(jitter)) if latency.received > 0 => (
                w.latency * (1.0 - normalized(mean, w.latency_ceiling_ms)),
                w.jitter * (1.0 - normalized(jitter, w.jitter_ceiling_ms)),
            ),
            _ => (0.0, 0.0),
        };
        let loss_points = if latency.received > 0 {
            w.loss * (1.0 - latency.loss_ratio.clamp(0.0, 1.0))
        } else {
            0.0
        };

        ScoreBreakdown {
            latency: latency_points,
            jitter: jitter_points,
            loss: loss_points,
        }
    }

    /// Full quality assessment
    pub fn assess(&self, latency: LatencyStats) -> QualityScore {
        let breakdown = self.breakdown(&latency);
        let score = breakdown.total().round().clamp(0.0, 100.0) as u8;
        let recommendations = recommendations(&latency);

        QualityScore {
            score,
            rating: QualityRating::from_score(score),
            breakdown,
            latency,
            recommendations,
        }
    }
}

fn normalized(value: f64, ceiling: f64) -> f64 {
    if ceiling <= 0.0 || !value.is_finite() {
        return 1.0;
    }
    (value.max(0.0) / ceiling).min(1.0)
}

/// Plain-language advice for the weak spots of a run
pub fn recommendations(latency: &LatencyStats) -> Vec<String> {
    let mut advice = Vec::new();

    if !latency.has_responses() {
        advice.push("No replies received. Check that the target is reachable and that ICMP is not blocked.".to_string());
        return advice;
    }

    if let Some(mean) = latency.mean_ms {
        if mean > 100.0 {
            advice.push("High latency detected. May affect real-time applications (gaming, video calls).".to_string());
        } else if mean > 50.0 {
            advice.push("Moderate latency. Gaming and video calls may experience some lag.".to_string());
        }
    }

    let loss_percent = latency.packet_loss_percent();
    if loss_percent > 5.0 {
        advice.push("High packet loss detected. Check network stability and equipment.".to_string());
    } else if loss_percent > 1.0 {
        advice.push("Some packet loss detected. Monitor network for stability issues.".to_string());
    }

    if latency.jitter_ms.unwrap_or(0.0) > 20.0 {
        advice.push("High jitter detected. May cause inconsistent performance.".to_string());
    }

    if advice.is_empty() {
        advice.push("Connection quality looks good! No immediate issues detected.".to_string());
    }
    advice
}

use chrono::{DateTime, Local};
use serde::Serialize;

use crate::quality::{ConnectionBands, QualityTier};

/// Outcome of one probe attempt against one target.
///
/// A probe may send several packets; `success` records whether at least one
/// of them came back, and `latency_ms` is the mean of the returned ones.
#[derive(Debug, Clone, Serialize)]
pub struct ProbeResult {
    pub target: String,
    pub timestamp: DateTime<Local>,
    pub success: bool,
    pub latency_ms: Option<f64>,
    pub samples: Vec<f64>,
    pub sent_count: u32,
    pub received_count: u32,
}

impl ProbeResult {
    /// Builds a result from the latencies parsed out of a ping run.
    ///
    /// An empty `samples` list yields a failure. `received_count` is capped
    /// at `sent_count`.
    pub fn from_samples(target: impl Into<String>, sent_count: u32, samples: Vec<f64>) -> Self {
        if samples.is_empty() {
            return Self::failure(target, sent_count);
        }
        let sent_count = sent_count.max(1);
        let received_count = (samples.len() as u32).min(sent_count);
        let latency_ms = samples.iter().sum::<f64>() / samples.len() as f64;
        Self {
            target: target.into(),
            timestamp: Local::now(),
            success: true,
            latency_ms: Some(latency_ms),
            samples,
            sent_count,
            received_count,
        }
    }

    pub fn failure(target: impl Into<String>, sent_count: u32) -> Self {
        Self {
            target: target.into(),
            timestamp: Local::now(),
            success: false,
            latency_ms: None,
            samples: Vec::new(),
            sent_count: sent_count.max(1),
            received_count: 0,
        }
    }

    pub fn loss_percent(&self) -> f64 {
        let lost = self.sent_count - self.received_count;
        lost as f64 / self.sent_count as f64 * 100.0
    }

    /// Min/avg/max/jitter over the packets of this one probe.
    pub fn summary(&self) -> Option<LatencySummary> {
        LatencySummary::from_samples(&self.samples)
    }
}

/// Min/avg/max/jitter over a non-empty set of latencies.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LatencySummary {
    pub min_ms: f64,
    pub avg_ms: f64,
    pub max_ms: f64,
    pub jitter_ms: f64,
    pub samples: usize,
}

impl LatencySummary {
    /// Returns `None` for an empty slice so callers never divide by zero.
    pub fn from_samples(samples: &[f64]) -> Option<Self> {
        if samples.is_empty() {
            return None;
        }
        let min_ms = samples.iter().copied().fold(f64::INFINITY, f64::min);
        let max_ms = samples.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        // Clamp guards against float rounding pushing the mean outside the range
        let avg_ms = (samples.iter().sum::<f64>() / samples.len() as f64)
            .max(min_ms)
            .min(max_ms);
        Some(Self {
            min_ms,
            avg_ms,
            max_ms,
            jitter_ms: max_ms - min_ms,
            samples: samples.len(),
        })
    }
}

/// Statistics derived fresh from a run's samples and counters.
///
/// `latency` and `tier` are `None` when no attempt succeeded; presenters
/// render that as "no data".
#[derive(Debug, Clone, Serialize)]
pub struct AggregateStatistics {
    pub attempts: u64,
    pub successes: u64,
    pub failures: u64,
    pub loss_percent: f64,
    pub latency: Option<LatencySummary>,
    pub tier: Option<QualityTier>,
}

impl AggregateStatistics {
    /// `latencies` may be a rolling window while the counters span the whole run.
    pub fn compute(latencies: &[f64], successes: u64, failures: u64, bands: &ConnectionBands) -> Self {
        let attempts = successes + failures;
        let loss_percent = if attempts > 0 {
            failures as f64 / attempts as f64 * 100.0
        } else {
            0.0
        };
        let latency = LatencySummary::from_samples(latencies);
        let tier = latency.map(|l| bands.classify(l.avg_ms, loss_percent));
        Self {
            attempts,
            successes,
            failures,
            loss_percent,
            latency,
            tier,
        }
    }

    pub fn from_results(results: &[ProbeResult], bands: &ConnectionBands) -> Self {
        let latencies: Vec<f64> = results.iter().filter_map(|r| r.latency_ms).collect();
        let successes = results.iter().filter(|r| r.success).count() as u64;
        let failures = results.len() as u64 - successes;
        Self::compute(&latencies, successes, failures, bands)
    }

    pub fn has_data(&self) -> bool {
        self.latency.is_some()
    }
}

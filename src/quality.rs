use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Discrete quality rating for a latency, or for a whole connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QualityTier {
    Excellent,
    Good,
    Fair,
    Poor,
    VeryPoor,
    Unstable,
}

impl QualityTier {
    pub fn label(self) -> &'static str {
        match self {
            QualityTier::Excellent => "EXCELLENT",
            QualityTier::Good => "GOOD",
            QualityTier::Fair => "FAIR",
            QualityTier::Poor => "POOR",
            QualityTier::VeryPoor => "BAD",
            QualityTier::Unstable => "UNSTABLE",
        }
    }

    pub fn marker(self) -> &'static str {
        match self {
            QualityTier::Excellent => "💚",
            QualityTier::Good => "💛",
            QualityTier::Fair => "🟡",
            QualityTier::Poor => "🟠",
            QualityTier::VeryPoor | QualityTier::Unstable => "🔴",
        }
    }
}

impl std::fmt::Display for QualityTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.marker(), self.label())
    }
}

/// Upper bounds (exclusive, in ms) of the four best latency tiers.
/// Anything at or above `poor` is `VeryPoor`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatencyBands {
    pub excellent: f64,
    pub good: f64,
    pub fair: f64,
    pub poor: f64,
}

impl LatencyBands {
    /// Bands used when printing individual pings.
    pub const DISPLAY: LatencyBands = LatencyBands {
        excellent: 50.0,
        good: 100.0,
        fair: 200.0,
        poor: 500.0,
    };

    /// Tighter bands used when ranking targets against each other.
    pub const RANKING: LatencyBands = LatencyBands {
        excellent: 30.0,
        good: 80.0,
        fair: 150.0,
        poor: 300.0,
    };

    pub fn classify(&self, latency_ms: f64) -> QualityTier {
        match latency_ms {
            ms if ms < self.excellent => QualityTier::Excellent,
            ms if ms < self.good => QualityTier::Good,
            ms if ms < self.fair => QualityTier::Fair,
            ms if ms < self.poor => QualityTier::Poor,
            _ => QualityTier::VeryPoor,
        }
    }

    pub fn validate(&self, name: &str) -> Result<()> {
        let ascending = self.excellent > 0.0
            && self.excellent < self.good
            && self.good < self.fair
            && self.fair < self.poor;
        if ascending {
            Ok(())
        } else {
            Err(Error::InvalidConfiguration(format!(
                "{name} latency bands must be positive and strictly ascending"
            )))
        }
    }
}

impl Default for LatencyBands {
    fn default() -> Self {
        Self::DISPLAY
    }
}

/// One connection tier gate: average latency and loss must both be below.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TierGate {
    pub max_avg_ms: f64,
    pub max_loss_percent: f64,
}

impl TierGate {
    fn admits(&self, avg_ms: f64, loss_percent: f64) -> bool {
        avg_ms < self.max_avg_ms && loss_percent < self.max_loss_percent
    }
}

/// Thresholds for rating a whole run from its average latency and loss.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConnectionBands {
    /// Loss strictly above this is `Unstable` whatever the latency.
    pub unstable_loss_percent: f64,
    pub excellent: TierGate,
    pub good: TierGate,
    pub fair: TierGate,
}

impl Default for ConnectionBands {
    fn default() -> Self {
        Self::SINGLE
    }
}

impl ConnectionBands {
    /// Gates for a fixed-count run: a clean run must lose almost nothing.
    pub const SINGLE: ConnectionBands = ConnectionBands {
        unstable_loss_percent: 20.0,
        excellent: TierGate { max_avg_ms: 50.0, max_loss_percent: 1.0 },
        good: TierGate { max_avg_ms: 100.0, max_loss_percent: 5.0 },
        fair: TierGate { max_avg_ms: 200.0, max_loss_percent: 10.0 },
    };

    /// Looser loss gates for the live monitor.
    pub const MONITOR: ConnectionBands = ConnectionBands {
        unstable_loss_percent: 20.0,
        excellent: TierGate { max_avg_ms: 50.0, max_loss_percent: 5.0 },
        good: TierGate { max_avg_ms: 100.0, max_loss_percent: 10.0 },
        fair: TierGate { max_avg_ms: 200.0, max_loss_percent: 15.0 },
    };

    pub fn classify(&self, avg_latency_ms: f64, loss_percent: f64) -> QualityTier {
        if loss_percent > self.unstable_loss_percent {
            QualityTier::Unstable
        } else if self.excellent.admits(avg_latency_ms, loss_percent) {
            QualityTier::Excellent
        } else if self.good.admits(avg_latency_ms, loss_percent) {
            QualityTier::Good
        } else if self.fair.admits(avg_latency_ms, loss_percent) {
            QualityTier::Fair
        } else {
            QualityTier::Poor
        }
    }

    pub fn validate(&self) -> Result<()> {
        let gates = [self.excellent, self.good, self.fair];
        let ascending = gates.windows(2).all(|w| {
            w[0].max_avg_ms < w[1].max_avg_ms && w[0].max_loss_percent <= w[1].max_loss_percent
        });
        if ascending && gates[0].max_avg_ms > 0.0 && self.unstable_loss_percent >= 0.0 {
            Ok(())
        } else {
            Err(Error::InvalidConfiguration(
                "connection bands must be ascending from excellent to fair".to_string(),
            ))
        }
    }
}

/// Rates one latency with the single-ping display bands.
pub fn classify(latency_ms: f64) -> QualityTier {
    LatencyBands::DISPLAY.classify(latency_ms)
}

/// Rates a fixed-count run from its average latency and loss.
pub fn classify_connection(avg_latency_ms: f64, loss_percent: f64) -> QualityTier {
    ConnectionBands::SINGLE.classify(avg_latency_ms, loss_percent)
}

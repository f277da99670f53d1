use serde::Serialize;

use crate::config::SingleSettings;
use crate::error::{Error, Result};
use crate::ping::{AggregateStatistics, ProbeResult};
use crate::ping_executor::{ProbeExecutor, probe_deadline, probe_target};
use crate::presenter::Presenter;
use crate::quality::{ConnectionBands, LatencyBands, QualityTier};
use crate::stop::StopSignal;
use crate::targets::sanitize_target;

/// One attempt of a fixed-count run.
#[derive(Debug, Clone, Serialize)]
pub struct AttemptRecord {
    /// 1-based.
    pub attempt: u32,
    pub total: u32,
    pub result: ProbeResult,
    pub tier: Option<QualityTier>,
}

/// Everything a fixed-count run collected, including a run cut short by the user.
#[derive(Debug, Clone, Serialize)]
pub struct SingleRunReport {
    pub target: String,
    pub requested: u32,
    pub attempts: Vec<AttemptRecord>,
    pub statistics: AggregateStatistics,
    pub cancelled: bool,
}

/// Probes one host `count` times in sequence with a fixed pause in between.
pub struct SingleTargetProbeLoop<'a, E: ?Sized> {
    executor: &'a E,
    settings: SingleSettings,
    display_bands: LatencyBands,
    connection_bands: ConnectionBands,
}

impl<'a, E: ProbeExecutor + ?Sized> SingleTargetProbeLoop<'a, E> {
    pub fn new(executor: &'a E, settings: SingleSettings) -> Self {
        Self {
            executor,
            settings,
            display_bands: LatencyBands::DISPLAY,
            connection_bands: ConnectionBands::SINGLE,
        }
    }

    pub fn with_bands(mut self, display: LatencyBands, connection: ConnectionBands) -> Self {
        self.display_bands = display;
        self.connection_bands = connection;
        self
    }

    /// Runs all attempts unless `stop` fires first; failed probes only count as losses.
    ///
    /// # Errors
    /// `InvalidConfiguration` for a zero count, `InvalidTarget` for an unusable
    /// host. Both are reported before the first probe.
    pub async fn run<P: Presenter + ?Sized>(
        &self,
        target: &str,
        stop: &StopSignal,
        presenter: &mut P,
    ) -> Result<SingleRunReport> {
        let total = self.settings.count;
        if total == 0 {
            return Err(Error::InvalidConfiguration("ping count must be at least 1".into()));
        }
        let target = sanitize_target(target)?;
        let timeout = self.settings.timeout();
        let deadline = probe_deadline(1, timeout);

        log::info!("Pinging {target} {total} times");

        let mut attempts = Vec::with_capacity(total as usize);
        let mut cancelled = false;

        for attempt in 1..=total {
            if stop.is_stopped() {
                cancelled = true;
                break;
            }

            let result = probe_target(self.executor, &target, 1, timeout, deadline).await;
            let tier = result.latency_ms.map(|ms| self.display_bands.classify(ms));
            let record = AttemptRecord {
                attempt,
                total,
                result,
                tier,
            };
            presenter.probe_completed(&record);
            attempts.push(record);

            if attempt < total && !stop.pause(self.settings.interval()).await {
                cancelled = true;
                break;
            }
        }

        let results: Vec<ProbeResult> = attempts.iter().map(|a| a.result.clone()).collect();
        let statistics = AggregateStatistics::from_results(&results, &self.connection_bands);

        if cancelled {
            log::info!("Run against {target} stopped after {} of {total} attempts", attempts.len());
        }

        Ok(SingleRunReport {
            target,
            requested: total,
            attempts,
            statistics,
            cancelled,
        })
    }
}

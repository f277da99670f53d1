use chrono::{DateTime, Local};
use serde::Serialize;

use crate::config::MonitorSettings;
use crate::error::Result;
use crate::ping::{AggregateStatistics, LatencySummary};
use crate::ping_executor::{ProbeExecutor, probe_deadline, probe_target};
use crate::presenter::Presenter;
use crate::quality::{ConnectionBands, LatencyBands, QualityTier};
use crate::stop::StopSignal;
use crate::targets::sanitize_target;
use crate::window::RollingSampleWindow;

/// What the live display shows after each probe.
#[derive(Debug, Clone, Serialize)]
pub struct MonitorSnapshot {
    pub target: String,
    pub timestamp: DateTime<Local>,
    /// Latency of the probe just made; `None` if it failed.
    pub current_ms: Option<f64>,
    pub current_tier: Option<QualityTier>,
    pub window: Option<LatencySummary>,
    pub successes: u64,
    pub total: u64,
}

/// Final figures once monitoring stops.
///
/// Latency figures cover the rolling window only; the counters and the loss
/// rate cover every attempt since the start.
#[derive(Debug, Clone, Serialize)]
pub struct MonitorSummary {
    pub target: String,
    pub window_size: usize,
    pub statistics: AggregateStatistics,
}

/// Probes one host until stopped, keeping a moving window of latencies.
pub struct ContinuousProbeLoop<'a, E: ?Sized> {
    executor: &'a E,
    settings: MonitorSettings,
    display_bands: LatencyBands,
    connection_bands: ConnectionBands,
    window: RollingSampleWindow,
    successes: u64,
    failures: u64,
}

impl<'a, E: ProbeExecutor + ?Sized> ContinuousProbeLoop<'a, E> {
    pub fn new(executor: &'a E, settings: MonitorSettings) -> Self {
        Self {
            executor,
            settings,
            display_bands: LatencyBands::DISPLAY,
            connection_bands: ConnectionBands::MONITOR,
            window: RollingSampleWindow::new(settings.window_size),
            successes: 0,
            failures: 0,
        }
    }

    pub fn with_bands(mut self, display: LatencyBands, connection: ConnectionBands) -> Self {
        self.display_bands = display;
        self.connection_bands = connection;
        self
    }

    pub fn total(&self) -> u64 {
        self.successes + self.failures
    }

    /// Probes, records and reports until `stop` fires, then returns the summary.
    ///
    /// # Errors
    /// Only `InvalidTarget`, before the first probe.
    pub async fn run<P: Presenter + ?Sized>(
        &mut self,
        target: &str,
        stop: &StopSignal,
        presenter: &mut P,
    ) -> Result<MonitorSummary> {
        let target = sanitize_target(target)?;
        let timeout = self.settings.timeout();
        let deadline = probe_deadline(1, timeout);

        log::info!("Monitoring {target} every {:?}", self.settings.interval());

        while !stop.is_stopped() {
            let result = probe_target(self.executor, &target, 1, timeout, deadline).await;
            match result.latency_ms {
                Some(ms) => {
                    self.window.push(ms);
                    self.successes += 1;
                }
                None => self.failures += 1,
            }

            let snapshot = MonitorSnapshot {
                target: target.clone(),
                timestamp: result.timestamp,
                current_ms: result.latency_ms,
                current_tier: result.latency_ms.map(|ms| self.display_bands.classify(ms)),
                window: self.window.summary(),
                successes: self.successes,
                total: self.total(),
            };
            presenter.monitor_tick(&snapshot);

            if !stop.pause(self.settings.interval()).await {
                break;
            }
        }

        log::info!("Stopped monitoring {target} after {} probes", self.total());
        Ok(self.summary(target))
    }

    pub fn summary(&self, target: impl Into<String>) -> MonitorSummary {
        MonitorSummary {
            target: target.into(),
            window_size: self.window.len(),
            statistics: AggregateStatistics::compute(
                &self.window.snapshot(),
                self.successes,
                self.failures,
                &self.connection_bands,
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::error::ProbeError;
    use crate::ping_executor::RawProbeOutput;
    use crate::presenter::NullPresenter;

    /// Replays a script of latencies (negative = failure), then stops the loop.
    struct Script {
        steps: Mutex<Vec<f64>>,
        stop: StopSignal,
    }

    #[async_trait]
    impl ProbeExecutor for Script {
        async fn probe(&self, _: &str, packets: u32, _: Duration) -> std::result::Result<RawProbeOutput, ProbeError> {
            let step = {
                let mut steps = self.steps.lock().unwrap();
                let step = steps.remove(0);
                if steps.is_empty() {
                    self.stop.stop();
                }
                step
            };
            if step < 0.0 {
                Err(ProbeError::Timeout(1))
            } else {
                Ok(RawProbeOutput {
                    packets_sent: packets,
                    latencies_ms: vec![step],
                })
            }
        }
    }

    fn settings(window_size: usize) -> MonitorSettings {
        MonitorSettings {
            interval_ms: 0,
            timeout_ms: 1000,
            window_size,
        }
    }

    #[tokio::test]
    async fn counters_span_run_while_latency_is_windowed() {
        let stop = StopSignal::new();
        let executor = Script {
            steps: Mutex::new(vec![400.0, -1.0, 10.0, 20.0, 30.0]),
            stop: stop.clone(),
        };
        let mut monitor = ContinuousProbeLoop::new(&executor, settings(3));
        let summary = monitor.run("host", &stop, &mut NullPresenter).await.unwrap();

        let stats = summary.statistics;
        assert_eq!(stats.attempts, 5);
        assert_eq!(stats.successes, 4);
        assert_eq!(stats.failures, 1);
        assert_eq!(stats.loss_percent, 20.0);
        // The 400 ms sample has been evicted
        let latency = stats.latency.unwrap();
        assert_eq!(latency.max_ms, 30.0);
        assert_eq!(latency.avg_ms, 20.0);
        assert_eq!(summary.window_size, 3);
    }

    #[tokio::test]
    async fn monitor_tolerates_more_loss_than_a_fixed_run() {
        let stop = StopSignal::new();
        let mut steps = vec![30.0; 13];
        steps.insert(6, -1.0);
        let executor = Script {
            steps: Mutex::new(steps),
            stop: stop.clone(),
        };
        let mut monitor = ContinuousProbeLoop::new(&executor, settings(50));
        let summary = monitor.run("host", &stop, &mut NullPresenter).await.unwrap();

        let stats = summary.statistics;
        assert_eq!(stats.attempts, 14);
        assert!(stats.loss_percent > 7.0 && stats.loss_percent < 7.2);
        assert_eq!(stats.tier, Some(QualityTier::Good));
    }

    #[tokio::test]
    async fn all_failures_summarise_as_no_data() {
        let stop = StopSignal::new();
        let executor = Script {
            steps: Mutex::new(vec![-1.0, -1.0]),
            stop: stop.clone(),
        };
        let mut monitor = ContinuousProbeLoop::new(&executor, settings(50));
        let summary = monitor.run("host", &stop, &mut NullPresenter).await.unwrap();
        assert_eq!(summary.statistics.failures, 2);
        assert!(!summary.statistics.has_data());
    }

    #[tokio::test]
    async fn already_stopped_does_not_probe() {
        let stop = StopSignal::new();
        stop.stop();
        let executor = Script {
            steps: Mutex::new(vec![]),
            stop: stop.clone(),
        };
        let mut monitor = ContinuousProbeLoop::new(&executor, settings(50));
        let summary = monitor.run("host", &stop, &mut NullPresenter).await.unwrap();
        assert_eq!(summary.statistics.attempts, 0);
    }
}

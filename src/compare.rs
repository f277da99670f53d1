//! Concurrent latency comparison across many hosts.
//!
//! Every target gets one multi-packet probe job. At most `workers` jobs run at
//! once; the rest wait for a permit. Finished jobs are reported as they land,
//! and the ranking is built only once every job is done.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{Semaphore, mpsc};

use crate::config::CompareSettings;
use crate::error::{Error, Result};
use crate::ping::{LatencySummary, ProbeResult};
use crate::ping_executor::{ProbeExecutor, probe_target};
use crate::presenter::Presenter;
use crate::quality::{LatencyBands, QualityTier};
use crate::targets::TargetList;

/// One target's outcome in a comparison.
#[derive(Debug, Clone, Serialize)]
pub struct TargetReport {
    pub target: String,
    /// Position in the input list.
    pub index: usize,
    pub success: bool,
    pub latency: Option<LatencySummary>,
    pub packets_sent: u32,
    pub packets_received: u32,
    pub loss_percent: f64,
    pub tier: Option<QualityTier>,
}

impl TargetReport {
    fn from_probe(index: usize, result: &ProbeResult, bands: &LatencyBands) -> Self {
        let latency = result.summary();
        Self {
            target: result.target.clone(),
            index,
            success: result.success,
            latency,
            packets_sent: result.sent_count,
            packets_received: result.received_count,
            loss_percent: result.loss_percent(),
            tier: latency.map(|l| bands.classify(l.avg_ms)),
        }
    }

    pub fn avg_ms(&self) -> Option<f64> {
        self.latency.map(|l| l.avg_ms)
    }
}

/// Ranked outcome of a whole comparison.
#[derive(Debug, Clone, Serialize)]
pub struct ComparisonReport {
    /// Reachable targets, fastest average first. Equal averages keep input order.
    pub ranked: Vec<TargetReport>,
    /// Unreachable targets, in input order.
    pub failed: Vec<TargetReport>,
}

impl ComparisonReport {
    /// Splits reports (in any order) into the ranking and the failures.
    pub fn from_reports(mut reports: Vec<TargetReport>) -> Self {
        reports.sort_by_key(|r| r.index);
        let (mut ranked, failed): (Vec<_>, Vec<_>) = reports.into_iter().partition(|r| r.success);
        // sort_by is stable, so ties stay in input order
        ranked.sort_by(|a, b| {
            let a = a.avg_ms().unwrap_or(f64::INFINITY);
            let b = b.avg_ms().unwrap_or(f64::INFINITY);
            a.total_cmp(&b)
        });
        Self { ranked, failed }
    }

    pub fn fastest(&self) -> Option<&TargetReport> {
        self.ranked.first()
    }

    pub fn len(&self) -> usize {
        self.ranked.len() + self.failed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Fans one probe job per target out over a bounded pool.
pub struct MultiTargetComparator<E: ?Sized> {
    executor: Arc<E>,
    settings: CompareSettings,
    bands: LatencyBands,
}

impl<E: ProbeExecutor + ?Sized + 'static> MultiTargetComparator<E> {
    pub fn new(executor: Arc<E>, settings: CompareSettings) -> Self {
        Self {
            executor,
            settings,
            bands: LatencyBands::RANKING,
        }
    }

    pub fn with_bands(mut self, bands: LatencyBands) -> Self {
        self.bands = bands;
        self
    }

    /// Probes every target and ranks them once all jobs have finished.
    ///
    /// `presenter` sees each target as its job completes, in completion order.
    ///
    /// # Errors
    /// `InvalidConfiguration` for an empty target list, zero workers or zero
    /// packets. Nothing is probed in that case.
    pub async fn run_comparison<P: Presenter + ?Sized>(
        &self,
        targets: &TargetList,
        presenter: &mut P,
    ) -> Result<ComparisonReport> {
        if targets.is_empty() {
            return Err(Error::InvalidConfiguration("no targets to compare".into()));
        }
        if self.settings.workers == 0 {
            return Err(Error::InvalidConfiguration("worker count must be at least 1".into()));
        }
        if self.settings.packets == 0 {
            return Err(Error::InvalidConfiguration("packet count must be at least 1".into()));
        }

        log::info!(
            "Comparing {} targets with {} workers",
            targets.len(),
            self.settings.workers
        );

        let permits = Arc::new(Semaphore::new(self.settings.workers));
        let (tx, mut rx) = mpsc::unbounded_channel();

        // Detached tasks: if the caller abandons the run, in-flight probes
        // still finish or time out on their own.
        for (index, target) in targets.iter().enumerate() {
            let executor = Arc::clone(&self.executor);
            let permits = Arc::clone(&permits);
            let target = target.to_string();
            let settings = self.settings;
            let tx = tx.clone();

            tokio::spawn(async move {
                let _permit = permits.acquire_owned().await.ok();
                let result = Self::probe_job(executor, target, settings).await;
                let _ = tx.send((index, result));
            });
        }
        drop(tx);

        let mut reports = Vec::with_capacity(targets.len());
        let mut seen = vec![false; targets.len()];
        while let Some((index, result)) = rx.recv().await {
            let report = TargetReport::from_probe(index, &result, &self.bands);
            presenter.comparison_progress(&report);
            seen[index] = true;
            reports.push(report);
        }

        for (index, target) in targets.iter().enumerate().filter(|(i, _)| !seen[*i]) {
            log::warn!("Comparison job for {target} ended without a result");
            let result = ProbeResult::failure(target, self.settings.packets);
            reports.push(TargetReport::from_probe(index, &result, &self.bands));
        }

        Ok(ComparisonReport::from_reports(reports))
    }

    /// Runs the probe in its own task so a panicking executor only fails its target.
    async fn probe_job(executor: Arc<E>, target: String, settings: CompareSettings) -> ProbeResult {
        let probe_target_name = target.clone();
        let probe = tokio::spawn(async move {
            probe_target(
                executor.as_ref(),
                &probe_target_name,
                settings.packets,
                settings.packet_timeout(),
                settings.job_timeout(),
            )
            .await
        });

        match probe.await {
            Ok(result) => result,
            Err(e) => {
                log::warn!("Probe job for {target} aborted: {e}");
                ProbeResult::failure(target, settings.packets)
            }
        }
    }
}

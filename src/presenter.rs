use std::io::{self, Write};

use serde::Serialize;

use crate::compare::{ComparisonReport, TargetReport};
use crate::monitor::{MonitorSnapshot, MonitorSummary};
use crate::ping::AggregateStatistics;
use crate::quality::QualityTier;
use crate::single::{AttemptRecord, SingleRunReport};
use crate::targets::TargetList;

/// Width of the live latency bar, in cells.
const BAR_LENGTH: usize = 20;

/// Latency that fills the live bar completely.
const BAR_FULL_SCALE_MS: f64 = 300.0;

/// Receives structured progress and results from the probe loops.
///
/// Every hook defaults to doing nothing, so a presenter only implements what it shows.
pub trait Presenter {
    fn probe_completed(&mut self, _record: &AttemptRecord) {}
    fn monitor_tick(&mut self, _snapshot: &MonitorSnapshot) {}
    fn comparison_started(&mut self, _targets: &TargetList) {}
    fn comparison_progress(&mut self, _report: &TargetReport) {}
    fn single_finished(&mut self, _report: &SingleRunReport) {}
    fn monitor_finished(&mut self, _summary: &MonitorSummary) {}
    fn comparison_finished(&mut self, _report: &ComparisonReport) {}
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullPresenter;

impl Presenter for NullPresenter {}

/// `[████░░░░]` style bar for a latency.
pub fn latency_bar(latency_ms: f64) -> String {
    let normalized = (latency_ms / BAR_FULL_SCALE_MS).clamp(0.0, 1.0);
    let filled = (BAR_LENGTH as f64 * normalized) as usize;
    format!("{}{}", "█".repeat(filled), "░".repeat(BAR_LENGTH - filled))
}

/// Marker on the live monitor line: everything from 200 ms up is red.
fn live_marker(tier: QualityTier) -> &'static str {
    match tier {
        QualityTier::Poor | QualityTier::VeryPoor | QualityTier::Unstable => "🔴",
        tier => tier.marker(),
    }
}

/// Human-readable text output, as printed in the terminal.
pub struct TerminalPresenter<W: Write> {
    out: W,
}

impl TerminalPresenter<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> TerminalPresenter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn emit(&mut self, text: &str) {
        if let Err(e) = writeln!(self.out, "{text}").and_then(|_| self.out.flush()) {
            log::warn!("Failed to write output: {e}");
        }
    }

    fn statistics_lines(stats: &AggregateStatistics) -> Vec<String> {
        let mut lines = vec![
            format!("✅ Successful: {}", stats.successes),
            format!("❌ Failed: {}", stats.failures),
            format!("📊 Packet Loss: {:.1}%", stats.loss_percent),
        ];
        match (stats.latency, stats.tier) {
            (Some(latency), Some(tier)) => {
                lines.push(format!(
                    "⚡ Min/Avg/Max: {:.1}/{:.1}/{:.1} ms",
                    latency.min_ms, latency.avg_ms, latency.max_ms
                ));
                lines.push(format!("📈 Jitter: {:.1} ms", latency.jitter_ms));
                lines.push(format!("🏆 Overall Quality: {tier}"));
            }
            _ => lines.push("⚠️  No data: no ping succeeded".to_string()),
        }
        lines
    }

    fn heading(&mut self, title: &str, width: usize) {
        let rule = "=".repeat(width);
        self.emit(&format!("\n{rule}\n{title}\n{rule}"));
    }
}

impl<W: Write> Presenter for TerminalPresenter<W> {
    fn probe_completed(&mut self, record: &AttemptRecord) {
        let prefix = format!("[{}/{}] {}", record.attempt, record.total, record.result.target);
        let line = match (record.result.latency_ms, record.tier) {
            (Some(ms), Some(tier)) => format!("{prefix}: {ms:.1} ms {tier}"),
            _ => format!("{prefix}: ❌ request failed"),
        };
        self.emit(&line);
    }

    fn monitor_tick(&mut self, snapshot: &MonitorSnapshot) {
        let Some(window) = snapshot.window else {
            self.emit("⏳ Waiting for first ping...");
            return;
        };
        let clock = snapshot.timestamp.format("%H:%M:%S");
        let current = match (snapshot.current_ms, snapshot.current_tier) {
            (Some(ms), Some(tier)) => {
                format!("{} [{clock}] Current: {ms:5.1}ms [{}]", live_marker(tier), latency_bar(ms))
            }
            _ => format!("❌ [{clock}] Current:  FAIL [{}]", latency_bar(0.0)),
        };
        self.emit(&format!(
            "{current} Avg: {:5.1}ms | Min: {:5.1}ms | Max: {:5.1}ms | Success: {}/{}",
            window.avg_ms, window.min_ms, window.max_ms, snapshot.successes, snapshot.total
        ));
    }

    fn comparison_started(&mut self, targets: &TargetList) {
        self.emit(&format!("\n🔄 Testing {} targets simultaneously...", targets.len()));
    }

    fn comparison_progress(&mut self, report: &TargetReport) {
        let line = match report.avg_ms() {
            Some(avg) => format!("✅ {}: {avg:.1}ms", report.target),
            None => format!("❌ {}: Failed", report.target),
        };
        self.emit(&line);
    }

    fn single_finished(&mut self, report: &SingleRunReport) {
        self.heading("📊 PING SUMMARY", 50);
        let mut lines = vec![format!("🌐 Target: {}", report.target)];
        if report.cancelled {
            lines.push(format!(
                "⏹️  Stopped early: {} of {} pings sent",
                report.attempts.len(),
                report.requested
            ));
        }
        lines.extend(Self::statistics_lines(&report.statistics));
        self.emit(&lines.join("\n"));
    }

    fn monitor_finished(&mut self, summary: &MonitorSummary) {
        self.heading("📊 MONITORING SUMMARY", 50);
        let mut lines = vec![
            format!("🌐 Target: {}", summary.target),
            format!("⏱️  Duration: {} samples collected", summary.statistics.attempts),
        ];
        lines.extend(Self::statistics_lines(&summary.statistics));
        self.emit(&lines.join("\n"));
    }

    fn comparison_finished(&mut self, report: &ComparisonReport) {
        self.heading("🏆 PING PERFORMANCE RANKING", 80);

        if !report.ranked.is_empty() {
            let rule = "-".repeat(80);
            let mut lines = vec![
                "\n📊 SUCCESSFUL TARGETS:".to_string(),
                rule.clone(),
                format!(
                    "{:<4} {:<25} {:<10} {:<14} {:<14} {:<6}",
                    "Rank", "Target", "Avg Ping", "Min/Max", "Quality", "Loss"
                ),
                rule,
            ];
            for (rank, target) in report.ranked.iter().enumerate() {
                let Some(latency) = target.latency else { continue };
                let quality = target.tier.map(|t| t.to_string()).unwrap_or_default();
                lines.push(format!(
                    "{:<4} {:<25} {:>7.1}ms  {:<14} {:<14} {:<6}",
                    rank + 1,
                    target.target,
                    latency.avg_ms,
                    format!("{:.1}/{:.1}", latency.min_ms, latency.max_ms),
                    quality,
                    format!("{:.0}%", target.loss_percent),
                ));
            }
            self.emit(&lines.join("\n"));
        }

        if !report.failed.is_empty() {
            let mut lines = vec![format!("\n❌ FAILED TARGETS ({}):", report.failed.len())];
            lines.extend(report.failed.iter().map(|t| format!("   {} - No response", t.target)));
            self.emit(&lines.join("\n"));
        }
    }
}

/// Prints each final report as a JSON document; progress is not shown.
pub struct JsonPresenter<W: Write> {
    out: W,
}

impl JsonPresenter<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> JsonPresenter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn emit<T: Serialize>(&mut self, value: &T) {
        let written = serde_json::to_string_pretty(value)
            .map_err(io::Error::from)
            .and_then(|json| writeln!(self.out, "{json}"));
        if let Err(e) = written {
            log::warn!("Failed to write JSON output: {e}");
        }
    }
}

impl<W: Write> Presenter for JsonPresenter<W> {
    fn single_finished(&mut self, report: &SingleRunReport) {
        self.emit(report);
    }

    fn monitor_finished(&mut self, summary: &MonitorSummary) {
        self.emit(summary);
    }

    fn comparison_finished(&mut self, report: &ComparisonReport) {
        self.emit(report);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ping::{LatencySummary, ProbeResult};
    use crate::quality::ConnectionBands;

    fn text(presenter: TerminalPresenter<Vec<u8>>) -> String {
        String::from_utf8(presenter.into_inner()).unwrap()
    }

    #[test]
    fn bar_is_clamped() {
        assert_eq!(latency_bar(0.0), "░".repeat(20));
        assert_eq!(latency_bar(150.0), format!("{}{}", "█".repeat(10), "░".repeat(10)));
        assert_eq!(latency_bar(9000.0), "█".repeat(20));
    }

    #[test]
    fn single_summary_without_samples_says_no_data() {
        let results: Vec<ProbeResult> = (0..3).map(|_| ProbeResult::failure("h", 1)).collect();
        let report = SingleRunReport {
            target: "h".into(),
            requested: 3,
            attempts: Vec::new(),
            statistics: AggregateStatistics::from_results(&results, &ConnectionBands::default()),
            cancelled: false,
        };
        let mut presenter = TerminalPresenter::new(Vec::new());
        presenter.single_finished(&report);
        let out = text(presenter);
        assert!(out.contains("No data"));
        assert!(out.contains("Packet Loss: 100.0%"));
        assert!(!out.contains("NaN"));
    }

    #[test]
    fn ranking_table_lists_ranked_then_failed() {
        let ok = ProbeResult::from_samples("fast.example", 3, vec![10.0, 12.0, 14.0]);
        let down = ProbeResult::failure("down.example", 3);
        let report = ComparisonReport::from_reports(vec![
            TargetReport {
                target: ok.target.clone(),
                index: 0,
                success: true,
                latency: ok.summary(),
                packets_sent: 3,
                packets_received: 3,
                loss_percent: 0.0,
                tier: None,
            },
            TargetReport {
                target: down.target.clone(),
                index: 1,
                success: false,
                latency: None,
                packets_sent: 3,
                packets_received: 0,
                loss_percent: 100.0,
                tier: None,
            },
        ]);
        let mut presenter = TerminalPresenter::new(Vec::new());
        presenter.comparison_finished(&report);
        let out = text(presenter);
        let fast = out.find("fast.example").unwrap();
        let down = out.find("down.example - No response").unwrap();
        assert!(fast < down);
        assert!(out.contains("12.0ms"));
    }

    fn tick(ms: f64) -> String {
        let window = LatencySummary::from_samples(&[ms]);
        let snapshot = MonitorSnapshot {
            target: "h".into(),
            timestamp: chrono::Local::now(),
            current_ms: Some(ms),
            current_tier: Some(crate::quality::classify(ms)),
            window,
            successes: 1,
            total: 1,
        };
        let mut presenter = TerminalPresenter::new(Vec::new());
        presenter.monitor_tick(&snapshot);
        text(presenter)
    }

    #[test]
    fn live_line_turns_red_from_two_hundred_ms() {
        assert!(tick(40.0).starts_with("💚"));
        assert!(tick(150.0).starts_with("🟡"));
        assert!(tick(250.0).starts_with("🔴"));
        assert!(tick(800.0).starts_with("🔴"));
        assert!(!tick(250.0).contains("🟠"));
    }

    #[test]
    fn json_presenter_emits_parseable_report() {
        let report = ComparisonReport::from_reports(Vec::new());
        let mut presenter = JsonPresenter::new(Vec::new());
        presenter.comparison_finished(&report);
        let value: serde_json::Value = serde_json::from_slice(&presenter.into_inner()).unwrap();
        assert!(value["ranked"].as_array().unwrap().is_empty());
    }
}

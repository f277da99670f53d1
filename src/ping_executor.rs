use std::process::Stdio;
use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use tokio::process::Command;

use crate::error::ProbeError;
use crate::ping::ProbeResult;

/// Extra time granted to the ping process on top of its per-packet budget.
const PROCESS_GRACE: Duration = Duration::from_secs(1);

/// Matches `time=12.3 ms` (Unix), `time=12ms` and `time<1ms` (Windows).
static TIME_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"time([=<])\s*([0-9]+(?:\.[0-9]+)?)\s*ms").expect("Invalid time regex")
});

/// What one invocation of the probe primitive reported.
#[derive(Debug, Clone, PartialEq)]
pub struct RawProbeOutput {
    pub packets_sent: u32,
    pub latencies_ms: Vec<f64>,
}

/// Runs one reachability check against one host.
///
/// Implementations collapse every failure into a [`ProbeError`]; they never
/// panic on bad output.
#[async_trait]
pub trait ProbeExecutor: Send + Sync {
    async fn probe(
        &self,
        target: &str,
        packet_count: u32,
        packet_timeout: Duration,
    ) -> Result<RawProbeOutput, ProbeError>;
}

/// Extracts every latency reported in a ping transcript.
pub fn parse_latencies(output: &str) -> Vec<f64> {
    TIME_PATTERN
        .captures_iter(output)
        .filter_map(|caps| {
            let value = caps.get(2)?.as_str().parse::<f64>().ok()?;
            // "time<1ms" only bounds the value
            if &caps[1] == "<" { Some(value.max(1.0)) } else { Some(value) }
        })
        .collect()
}

/// Probes by invoking the platform's `ping` binary.
#[derive(Debug, Clone)]
pub struct SystemPingExecutor {
    program: String,
}

impl Default for SystemPingExecutor {
    fn default() -> Self {
        Self {
            program: "ping".to_string(),
        }
    }
}

impl SystemPingExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a different ping binary, e.g. an absolute path.
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn build_args(target: &str, packet_count: u32, packet_timeout: Duration) -> Vec<String> {
        let count = packet_count.max(1).to_string();
        if cfg!(target_os = "windows") {
            let wait_ms = packet_timeout.as_millis().max(1).to_string();
            vec!["-n".into(), count, "-w".into(), wait_ms, target.into()]
        } else if cfg!(target_os = "macos") {
            // macOS takes -W in milliseconds
            let wait_ms = packet_timeout.as_millis().max(1).to_string();
            vec!["-c".into(), count, "-W".into(), wait_ms, target.into()]
        } else {
            let wait_secs = packet_timeout.as_secs().max(1).to_string();
            vec!["-c".into(), count, "-W".into(), wait_secs, target.into()]
        }
    }
}

/// Hard deadline for a whole ping run: per-packet budget times packets,
/// plus the one-second pacing between packets and a little slack.
pub fn probe_deadline(packet_count: u32, packet_timeout: Duration) -> Duration {
    let packets = packet_count.max(1);
    packet_timeout * packets + Duration::from_secs((packets - 1) as u64) + PROCESS_GRACE
}

/// Runs one probe under `deadline` and folds any failure into a failed result.
pub async fn probe_target<E: ProbeExecutor + ?Sized>(
    executor: &E,
    target: &str,
    packet_count: u32,
    packet_timeout: Duration,
    deadline: Duration,
) -> ProbeResult {
    let outcome = match tokio::time::timeout(
        deadline,
        executor.probe(target, packet_count, packet_timeout),
    )
    .await
    {
        Ok(outcome) => outcome,
        Err(_) => Err(ProbeError::Timeout(deadline.as_millis() as u64)),
    };

    match outcome {
        Ok(raw) => {
            log::debug!(
                "Probe of {target}: {}/{} replies",
                raw.latencies_ms.len(),
                raw.packets_sent
            );
            // An empty reply list comes back as a failed result
            ProbeResult::from_samples(target, raw.packets_sent, raw.latencies_ms)
        }
        Err(e) => {
            log::debug!("Probe of {target} failed ({}): {e}", e.kind());
            ProbeResult::failure(target, packet_count)
        }
    }
}

#[async_trait]
impl ProbeExecutor for SystemPingExecutor {
    async fn probe(
        &self,
        target: &str,
        packet_count: u32,
        packet_timeout: Duration,
    ) -> Result<RawProbeOutput, ProbeError> {
        let args = Self::build_args(target, packet_count, packet_timeout);
        let deadline = probe_deadline(packet_count, packet_timeout);

        let child = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()?;

        let output = match tokio::time::timeout(deadline, child.wait_with_output()).await {
            Ok(result) => result?,
            Err(_) => return Err(ProbeError::Timeout(deadline.as_millis() as u64)),
        };

        if !output.status.success() {
            return Err(ProbeError::Unreachable(output.status.code()));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let latencies_ms = parse_latencies(&stdout);
        if latencies_ms.is_empty() {
            return Err(ProbeError::Unparseable);
        }

        Ok(RawProbeOutput {
            packets_sent: packet_count.max(1),
            latencies_ms,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LINUX_OUTPUT: &str = "\
PING 8.8.8.8 (8.8.8.8) 56(84) bytes of data.
64 bytes from 8.8.8.8: icmp_seq=1 ttl=117 time=14.2 ms
64 bytes from 8.8.8.8: icmp_seq=2 ttl=117 time=15.8 ms
64 bytes from 8.8.8.8: icmp_seq=3 ttl=117 time=13 ms

--- 8.8.8.8 ping statistics ---
3 packets transmitted, 3 received, 0% packet loss, time 2003ms
rtt min/avg/max/mdev = 13.000/14.333/15.800/1.147 ms
";

    const WINDOWS_OUTPUT: &str = "\
Pinging 1.1.1.1 with 32 bytes of data:
Reply from 1.1.1.1: bytes=32 time=9ms TTL=57
Reply from 1.1.1.1: bytes=32 time<1ms TTL=57
";

    #[test]
    fn parses_every_unix_reply_but_not_the_summary() {
        assert_eq!(parse_latencies(LINUX_OUTPUT), vec![14.2, 15.8, 13.0]);
    }

    #[test]
    fn parses_windows_replies() {
        assert_eq!(parse_latencies(WINDOWS_OUTPUT), vec![9.0, 1.0]);
    }

    #[test]
    fn no_reply_lines_means_nothing_parsed() {
        let output = "PING 10.255.255.1 (10.255.255.1) 56(84) bytes of data.\n\n\
                      --- 10.255.255.1 ping statistics ---\n\
                      1 packets transmitted, 0 received, 100% packet loss, time 0ms\n";
        assert!(parse_latencies(output).is_empty());
    }

    #[test]
    fn deadline_grows_with_packet_count() {
        let one = probe_deadline(1, Duration::from_secs(3));
        let three = probe_deadline(3, Duration::from_secs(2));
        assert_eq!(one, Duration::from_secs(4));
        assert_eq!(three, Duration::from_secs(9));
    }

    #[test]
    fn args_end_with_target() {
        let args = SystemPingExecutor::build_args("example.com", 3, Duration::from_secs(2));
        assert_eq!(args.last().map(String::as_str), Some("example.com"));
        assert!(args.contains(&"3".to_string()));
    }

    struct Scripted(Result<Vec<f64>, ()>);

    #[async_trait]
    impl ProbeExecutor for Scripted {
        async fn probe(&self, _: &str, packets: u32, _: Duration) -> Result<RawProbeOutput, ProbeError> {
            match &self.0 {
                Ok(latencies) => Ok(RawProbeOutput {
                    packets_sent: packets,
                    latencies_ms: latencies.clone(),
                }),
                Err(()) => Err(ProbeError::Unreachable(Some(1))),
            }
        }
    }

    struct Hangs;

    #[async_trait]
    impl ProbeExecutor for Hangs {
        async fn probe(&self, _: &str, _: u32, _: Duration) -> Result<RawProbeOutput, ProbeError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Err(ProbeError::Unparseable)
        }
    }

    #[tokio::test]
    async fn probe_target_maps_outcomes() {
        let budget = Duration::from_secs(1);
        let ok = probe_target(&Scripted(Ok(vec![10.0, 30.0])), "a", 3, budget, budget).await;
        assert!(ok.success);
        assert_eq!(ok.latency_ms, Some(20.0));
        assert_eq!(ok.received_count, 2);

        let empty = probe_target(&Scripted(Ok(vec![])), "a", 1, budget, budget).await;
        assert!(!empty.success);

        let failed = probe_target(&Scripted(Err(())), "a", 3, budget, budget).await;
        assert!(!failed.success);
        assert_eq!(failed.sent_count, 3);
    }

    #[tokio::test]
    async fn probe_target_enforces_deadline() {
        let started = std::time::Instant::now();
        let result = probe_target(&Hangs, "a", 1, Duration::from_secs(1), Duration::from_millis(50)).await;
        assert!(!result.success);
        assert!(started.elapsed() < Duration::from_secs(30));
    }

    #[tokio::test]
    async fn missing_binary_is_a_spawn_failure() {
        let executor = SystemPingExecutor::with_program("/nonexistent/ping-binary");
        let err = executor
            .probe("127.0.0.1", 1, Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, ProbeError::Spawn(_)));
    }
}

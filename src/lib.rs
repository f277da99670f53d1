//! Terminal tools that measure reachability and latency of network hosts
//! by running the system `ping` and aggregating what it reports.
//!
//! Three modes share the same pieces:
//! - [`single::SingleTargetProbeLoop`]: a fixed number of pings to one host
//! - [`monitor::ContinuousProbeLoop`]: live monitoring of one host until stopped
//! - [`compare::MultiTargetComparator`]: concurrent ranking of many hosts

pub mod compare;
pub mod config;
pub mod error;
pub mod monitor;
pub mod ping;
pub mod ping_executor;
pub mod presenter;
pub mod quality;
pub mod single;
pub mod stop;
pub mod targets;
pub mod window;

pub use compare::{ComparisonReport, MultiTargetComparator, TargetReport};
pub use config::AppConfig;
pub use error::{Error, ProbeError, Result};
pub use monitor::{ContinuousProbeLoop, MonitorSnapshot, MonitorSummary};
pub use ping::{AggregateStatistics, LatencySummary, ProbeResult};
pub use ping_executor::{ProbeExecutor, RawProbeOutput, SystemPingExecutor};
pub use presenter::{JsonPresenter, NullPresenter, Presenter, TerminalPresenter};
pub use quality::{ConnectionBands, LatencyBands, QualityTier, classify, classify_connection};
pub use single::{AttemptRecord, SingleRunReport, SingleTargetProbeLoop};
pub use stop::StopSignal;
pub use targets::TargetList;
pub use window::RollingSampleWindow;

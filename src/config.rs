use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::quality::{ConnectionBands, LatencyBands};
use crate::targets::{DEFAULT_COMPARE_TARGETS, TargetList};
use crate::window::DEFAULT_WINDOW_SIZE;

/// Fixed-count run against one host.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SingleSettings {
    pub count: u32,
    pub interval_ms: u64,
    pub timeout_ms: u64,
}

impl Default for SingleSettings {
    fn default() -> Self {
        Self {
            count: 10,
            interval_ms: 1000,
            timeout_ms: 5000,
        }
    }
}

impl SingleSettings {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Live monitor of one host.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorSettings {
    pub interval_ms: u64,
    pub timeout_ms: u64,
    pub window_size: usize,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            interval_ms: 2000,
            timeout_ms: 3000,
            window_size: DEFAULT_WINDOW_SIZE,
        }
    }
}

impl MonitorSettings {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Concurrent comparison across many hosts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompareSettings {
    pub workers: usize,
    pub packets: u32,
    pub packet_timeout_ms: u64,
    pub job_timeout_ms: u64,
}

impl Default for CompareSettings {
    fn default() -> Self {
        Self {
            workers: 5,
            packets: 3,
            packet_timeout_ms: 2000,
            job_timeout_ms: 10_000,
        }
    }
}

impl CompareSettings {
    pub fn packet_timeout(&self) -> Duration {
        Duration::from_millis(self.packet_timeout_ms)
    }

    pub fn job_timeout(&self) -> Duration {
        Duration::from_millis(self.job_timeout_ms)
    }
}

fn default_target() -> String {
    "8.8.8.8".to_string()
}

fn default_compare_targets() -> Vec<String> {
    DEFAULT_COMPARE_TARGETS.iter().map(|t| t.to_string()).collect()
}

fn default_ranking_bands() -> LatencyBands {
    LatencyBands::RANKING
}

fn default_single_connection_bands() -> ConnectionBands {
    ConnectionBands::SINGLE
}

fn default_monitor_connection_bands() -> ConnectionBands {
    ConnectionBands::MONITOR
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_target")]
    pub target: String,
    #[serde(default = "default_compare_targets")]
    pub compare_targets: Vec<String>,
    #[serde(default)]
    pub display_bands: LatencyBands,
    #[serde(default = "default_ranking_bands")]
    pub ranking_bands: LatencyBands,
    #[serde(default = "default_single_connection_bands")]
    pub single_connection_bands: ConnectionBands,
    #[serde(default = "default_monitor_connection_bands")]
    pub monitor_connection_bands: ConnectionBands,
    #[serde(default)]
    pub single: SingleSettings,
    #[serde(default)]
    pub monitor: MonitorSettings,
    #[serde(default)]
    pub compare: CompareSettings,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            target: default_target(),
            compare_targets: default_compare_targets(),
            display_bands: LatencyBands::DISPLAY,
            ranking_bands: LatencyBands::RANKING,
            single_connection_bands: ConnectionBands::SINGLE,
            monitor_connection_bands: ConnectionBands::MONITOR,
            single: SingleSettings::default(),
            monitor: MonitorSettings::default(),
            compare: CompareSettings::default(),
        }
    }
}

impl AppConfig {
    pub fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| Error::Config("could not find config directory".to_string()))?
            .join("PingToolkit");

        Ok(config_dir.join("config.json"))
    }

    /// Loads the user's config, falling back to defaults if it is missing or unreadable.
    pub fn load() -> Self {
        match Self::get_config_path() {
            Ok(path) => Self::load_from(&path),
            Err(e) => {
                log::warn!("{e}; using default settings");
                Self::default()
            }
        }
    }

    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            log::debug!("No config at {}; using defaults", path.display());
            return Self::default();
        }
        fs::read_to_string(path)
            .map_err(Error::from)
            .and_then(|content| serde_json::from_str::<AppConfig>(&content).map_err(Error::from))
            .unwrap_or_else(|e| {
                log::warn!("Ignoring config at {}: {e}", path.display());
                Self::default()
            })
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::get_config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        log::info!("Saved settings to {}", path.display());
        Ok(())
    }

    /// Rejects settings no run could honour.
    pub fn validate(&self) -> Result<()> {
        if self.single.count == 0 {
            return Err(Error::InvalidConfiguration("ping count must be at least 1".into()));
        }
        if self.monitor.window_size == 0 {
            return Err(Error::InvalidConfiguration("window size must be at least 1".into()));
        }
        if self.compare.workers == 0 {
            return Err(Error::InvalidConfiguration("worker count must be at least 1".into()));
        }
        if self.compare.packets == 0 {
            return Err(Error::InvalidConfiguration("packet count must be at least 1".into()));
        }
        let timeouts = [
            self.single.timeout_ms,
            self.monitor.timeout_ms,
            self.compare.packet_timeout_ms,
            self.compare.job_timeout_ms,
        ];
        if timeouts.contains(&0) {
            return Err(Error::InvalidConfiguration("timeouts must be positive".into()));
        }
        self.display_bands.validate("display")?;
        self.ranking_bands.validate("ranking")?;
        self.single_connection_bands.validate()?;
        self.monitor_connection_bands.validate()
    }

    /// Configured comparison targets; invalid or repeated entries are skipped.
    pub fn compare_target_list(&self) -> TargetList {
        let mut list = TargetList::new();
        for target in &self.compare_targets {
            if let Err(e) = list.push(target) {
                log::warn!("Skipping configured target: {e}");
            }
        }
        list
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.target, "8.8.8.8");
        assert_eq!(config.compare.workers, 5);
        assert_eq!(config.compare.packets, 3);
        assert_eq!(config.monitor.window_size, 50);
        assert_eq!(config.single.interval(), Duration::from_secs(1));
        assert_eq!(config.monitor.interval(), Duration::from_secs(2));
    }

    #[test]
    fn zero_values_are_invalid_configuration() {
        let mut config = AppConfig::default();
        config.single.count = 0;
        assert!(matches!(config.validate(), Err(Error::InvalidConfiguration(_))));

        let mut config = AppConfig::default();
        config.compare.workers = 0;
        assert!(matches!(config.validate(), Err(Error::InvalidConfiguration(_))));

        let mut config = AppConfig::default();
        config.compare.job_timeout_ms = 0;
        assert!(matches!(config.validate(), Err(Error::InvalidConfiguration(_))));
    }

    #[test]
    fn save_then_load_keeps_changes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let mut config = AppConfig::default();
        config.target = "1.1.1.1".to_string();
        config.compare.workers = 8;
        config.save_to(&path).unwrap();

        assert_eq!(AppConfig::load_from(&path), config);
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{ "target": "example.com", "monitor": { "window_size": 10 } }"#).unwrap();

        let config = AppConfig::load_from(&path);
        assert_eq!(config.target, "example.com");
        assert_eq!(config.monitor.window_size, 10);
        assert_eq!(config.monitor.interval_ms, 2000);
        assert_eq!(config.ranking_bands, LatencyBands::RANKING);
        assert_eq!(config.single_connection_bands, ConnectionBands::SINGLE);
        assert_eq!(config.monitor_connection_bands, ConnectionBands::MONITOR);
    }

    #[test]
    fn garbage_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "not json").unwrap();
        assert_eq!(AppConfig::load_from(&path), AppConfig::default());
    }

    #[test]
    fn configured_targets_skip_duplicates() {
        let mut config = AppConfig::default();
        config.compare_targets = vec!["a.example".into(), "a.example".into(), "b.example".into()];
        assert_eq!(config.compare_target_list().len(), 2);
    }
}

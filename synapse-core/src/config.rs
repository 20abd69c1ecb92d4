//! Configuration for actor brains.
//!
//! Maps directly to `synapse.toml`. Every section and field has a default, so
//! an empty file (or no file at all) yields the stock tuning.

use serde::{Deserialize, Serialize};

/// Top-level configuration, loadable from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BrainConfig {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,
    /// Scheduler and activity-schedule tuning.
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    /// Sensor refresh tuning.
    #[serde(default)]
    pub sensors: SensorConfig,
    /// Snapshot store settings.
    #[serde(default)]
    pub persistence: PersistenceConfig,
    /// Tick budget & slow-tick logging.
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

impl BrainConfig {
    /// Load configuration from a TOML string.
    ///
    /// # Errors
    /// Returns `BrainError::Config` if the TOML is invalid.
    pub fn from_toml(toml_str: &str) -> crate::error::Result<Self> {
        toml::from_str(toml_str).map_err(|e| crate::BrainError::Config(e.to_string()))
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }
}

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// General system settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Whether brains are ticked at all.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Log level: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            log_level: "info".to_string(),
        }
    }
}

/// Scheduler tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Minimum number of game ticks between two schedule evaluations.
    #[serde(default = "default_20")]
    pub schedule_update_interval_ticks: u64,
    /// Length of one in-game day, used to wrap schedule lookups.
    #[serde(default = "default_24000")]
    pub ticks_per_day: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            schedule_update_interval_ticks: 20,
            ticks_per_day: 24_000,
        }
    }
}

/// Sensor refresh tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorConfig {
    /// Scan rate applied to sensors registered without an explicit one.
    #[serde(default = "default_1")]
    pub default_scan_rate: u64,
    /// Spread sensor refreshes across ticks by drawing a random initial phase.
    #[serde(default)]
    pub randomize_initial_phase: bool,
    /// Seed for the phase RNG (keeps runs reproducible).
    #[serde(default)]
    pub seed: u64,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            default_scan_rate: 1,
            randomize_initial_phase: false,
            seed: 0,
        }
    }
}

/// Snapshot store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// Use WAL mode for concurrent reads.
    #[serde(default = "default_true")]
    pub wal_mode: bool,
    /// Detect save corruption via checksums.
    #[serde(default = "default_true")]
    pub checksum_enabled: bool,
    /// Number of save backups to keep.
    #[serde(default = "default_3")]
    pub backup_count: u32,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            wal_mode: true,
            checksum_enabled: true,
            backup_count: 3,
        }
    }
}

/// Tick budget and observability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Log any single brain tick exceeding this many microseconds.
    #[serde(default = "default_500")]
    pub log_slow_ticks_us: u64,
    /// Budget for one full simulation tick across all actors (ms).
    #[serde(default = "default_2_0")]
    pub tick_budget_ms: f64,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_slow_ticks_us: 500,
            tick_budget_ms: 2.0,
        }
    }
}

// ---------------------------------------------------------------------------
// Serde default helpers
// ---------------------------------------------------------------------------

fn default_true() -> bool { true }
fn default_log_level() -> String { "info".to_string() }
fn default_1() -> u64 { 1 }
fn default_3() -> u32 { 3 }
fn default_20() -> u64 { 20 }
fn default_500() -> u64 { 500 }
fn default_24000() -> u64 { 24_000 }
fn default_2_0() -> f64 { 2.0 }

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_yields_defaults() {
        let config = BrainConfig::from_toml("").expect("empty config parses");
        assert_eq!(config.scheduler.schedule_update_interval_ticks, 20);
        assert_eq!(config.scheduler.ticks_per_day, 24_000);
        assert_eq!(config.sensors.default_scan_rate, 1);
        assert!(!config.sensors.randomize_initial_phase);
        assert!(config.persistence.checksum_enabled);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = BrainConfig::from_toml(
            "[scheduler]\nschedule_update_interval_ticks = 40\n\n[sensors]\nseed = 7\n",
        )
        .expect("valid config");
        assert_eq!(config.scheduler.schedule_update_interval_ticks, 40);
        assert_eq!(config.scheduler.ticks_per_day, 24_000);
        assert_eq!(config.sensors.seed, 7);
        assert_eq!(config.sensors.default_scan_rate, 1);
    }

    #[test]
    fn invalid_toml_is_config_error() {
        let err = BrainConfig::from_toml("[scheduler\n").unwrap_err();
        assert!(matches!(err, crate::BrainError::Config(_)));
    }
}
